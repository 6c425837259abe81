use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fidelity::FidelityScorer;
use crate::hierarchy::HierarchyResolver;
use crate::models::{
    CostEffectivenessData, CostEntry, DataQualitySummary, FidelityDashboardData,
    LearningGainsData, PerformanceNode, RawRecord, ReportPeriod, Scope, Snapshot,
};
use crate::rate_limiter::RateLimiter;
use crate::{cost, eligibility, gains, quality, tree};

/// Every view of one scope, computed from the same snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineReport {
    pub scope: Scope,
    pub period: String,
    pub record_count: usize,
    pub tree: PerformanceNode,
    pub weaning_eligible_schools: Vec<String>,
    pub fidelity: FidelityDashboardData,
    pub gains: LearningGainsData,
    pub cost: CostEffectivenessData,
    pub quality: DataQualitySummary,
}

#[derive(Debug, Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    resolver: Arc<HierarchyResolver>,
    limiter: Option<Arc<RateLimiter>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let resolver = HierarchyResolver::new(&config);
        Self {
            config: Arc::new(config),
            resolver: Arc::new(resolver),
            limiter: None,
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &HierarchyResolver {
        &self.resolver
    }

    pub fn scope_records(
        &self,
        scope: &Scope,
        period: &ReportPeriod,
        records: &[RawRecord],
    ) -> Vec<RawRecord> {
        records
            .iter()
            .filter(|record| period.contains(record.date))
            .filter(|record| self.resolver.scope_contains(scope, record))
            .cloned()
            .collect()
    }

    pub fn tree(&self, scoped: &[RawRecord]) -> PerformanceNode {
        tree::build_tree(scoped, &self.resolver, &self.config)
    }

    pub fn fidelity(&self, scope: &Scope, scoped: &[RawRecord]) -> FidelityDashboardData {
        FidelityScorer::new(&self.config, &self.resolver).dashboard(scope, scoped)
    }

    pub fn gains(&self, period: &ReportPeriod, scoped: &[RawRecord]) -> LearningGainsData {
        gains::analyze(scoped, &self.config.learning_domains, period)
    }

    pub fn cost(
        &self,
        scope: &Scope,
        period: &ReportPeriod,
        costs: &[CostEntry],
        scoped: &[RawRecord],
    ) -> CostEffectivenessData {
        cost::analyze(scope, period, costs, scoped)
    }

    pub fn quality(&self, scoped: &[RawRecord]) -> DataQualitySummary {
        quality::summarize(scoped, &self.config)
    }

    /// Runs the analyzers as independent blocking tasks over one shared,
    /// read-only copy of the scoped records and joins them into a report.
    pub async fn analyze(
        &self,
        scope: &Scope,
        period: &ReportPeriod,
        snapshot: &Snapshot,
    ) -> Result<EngineReport, EngineError> {
        let started = Instant::now();
        let scoped = Arc::new(self.scope_records(scope, period, &snapshot.records));
        let costs = Arc::new(snapshot.costs.clone());
        tracing::info!(scope = %scope, records = scoped.len(), "analyzing scope");

        let tree_task = {
            let (engine, scoped) = (self.clone(), Arc::clone(&scoped));
            tokio::task::spawn_blocking(move || engine.tree(&scoped))
        };
        let fidelity_task = {
            let (engine, scoped, scope) = (self.clone(), Arc::clone(&scoped), scope.clone());
            tokio::task::spawn_blocking(move || engine.fidelity(&scope, &scoped))
        };
        let gains_task = {
            let (engine, scoped, period) = (self.clone(), Arc::clone(&scoped), period.clone());
            tokio::task::spawn_blocking(move || engine.gains(&period, &scoped))
        };
        let cost_task = {
            let (engine, scoped, scope, period) =
                (self.clone(), Arc::clone(&scoped), scope.clone(), period.clone());
            tokio::task::spawn_blocking(move || engine.cost(&scope, &period, &costs, &scoped))
        };
        let quality_task = {
            let (engine, scoped) = (self.clone(), Arc::clone(&scoped));
            tokio::task::spawn_blocking(move || engine.quality(&scoped))
        };

        let (tree, fidelity, gains, cost, quality) =
            tokio::join!(tree_task, fidelity_task, gains_task, cost_task, quality_task);
        let tree = joined("tree", tree)?;
        let weaning_eligible_schools = eligibility::eligible_schools(&tree)
            .into_iter()
            .map(|school| school.name.clone())
            .collect();

        let report = EngineReport {
            scope: scope.clone(),
            period: period.display(),
            record_count: scoped.len(),
            weaning_eligible_schools,
            tree,
            fidelity: joined("fidelity", fidelity)?,
            gains: joined("gains", gains)?,
            cost: joined("cost", cost)?,
            quality: joined("quality", quality)?,
        };
        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scope analysis joined"
        );
        Ok(report)
    }

    /// `analyze`, gated by the injected rate limiter when one is configured.
    pub async fn analyze_for(
        &self,
        caller: &str,
        scope: &Scope,
        period: &ReportPeriod,
        snapshot: &Snapshot,
    ) -> Result<EngineReport, EngineError> {
        if let Some(limiter) = &self.limiter {
            let now = Instant::now();
            let decision = limiter.check_at(caller, now);
            if !decision.allowed {
                let retry_after = decision.retry_after(now);
                tracing::warn!(caller, retry_after_secs = retry_after.as_secs(), "request limit reached");
                return Err(EngineError::RateLimited {
                    caller: caller.to_string(),
                    retry_after_secs: retry_after.as_secs().max(1),
                });
            }
        }
        self.analyze(scope, period, snapshot).await
    }
}

fn joined<T>(
    analyzer: &'static str,
    result: Result<T, tokio::task::JoinError>,
) -> Result<T, EngineError> {
    result.map_err(|err| EngineError::Worker {
        analyzer,
        reason: err.to_string(),
    })
}
