use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::models::{
    ActivityModule, CostBreakdown, CostEffectivenessData, CostEntry, RawRecord, ReportPeriod,
    Scope,
};
use crate::normalize::{self, TEACHERS_TRAINED_FIELD};

/// Coverage counts used as ratio denominators, all drawn from one scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coverage {
    pub schools_supported: usize,
    pub teachers_trained: usize,
    pub learners_assessed: usize,
}

impl Coverage {
    pub fn from_records(records: &[RawRecord]) -> Self {
        let schools: BTreeSet<&str> = records
            .iter()
            .filter(|record| record.has_school())
            .map(|record| record.school_id.trim())
            .collect();

        let mut teachers_trained = 0usize;
        let mut teacher_names = BTreeSet::new();
        for record in records
            .iter()
            .filter(|record| record.module == ActivityModule::Training && record.is_completed())
        {
            match record.number(TEACHERS_TRAINED_FIELD) {
                Some(count) => {
                    teachers_trained = teachers_trained.saturating_add(count.max(0.0).round() as usize)
                }
                None => teacher_names.extend(normalize::teacher_identities(record)),
            }
        }
        let teachers_trained = teachers_trained.saturating_add(teacher_names.len());

        let mut learners = BTreeSet::new();
        let mut anonymous_learners = 0usize;
        for record in records
            .iter()
            .filter(|record| normalize::assessment_stage(record).is_some())
        {
            match normalize::learner_identity(record) {
                Some(identity) => {
                    learners.insert((record.school_id.trim().to_lowercase(), identity));
                }
                None => anonymous_learners += 1,
            }
        }

        Self {
            schools_supported: schools.len(),
            teachers_trained,
            learners_assessed: learners.len() + anonymous_learners,
        }
    }
}

fn ratio(total: f64, denominator: usize) -> Option<f64> {
    (denominator > 0).then(|| total / denominator as f64)
}

/// Cost totals and per-unit ratios. Only entries booked against exactly
/// `scope` and matching the period label are counted; `records` must be the
/// same scope's records.
pub fn analyze(
    scope: &Scope,
    period: &ReportPeriod,
    costs: &[CostEntry],
    records: &[RawRecord],
) -> CostEffectivenessData {
    let entries: Vec<&CostEntry> = costs
        .iter()
        .filter(|entry| entry.matches_scope(scope) && period.matches_label(&entry.period))
        .collect();

    let totals = normalize::cost_totals(entries.iter().copied());
    let total_cost: f64 = totals.values().sum();
    let mut breakdown: Vec<CostBreakdown> = totals
        .into_iter()
        .map(|(category, amount)| CostBreakdown { category, amount })
        .collect();
    breakdown.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });

    let coverage = Coverage::from_records(records);
    tracing::debug!(
        scope = %scope,
        entries = entries.len(),
        total_cost,
        ?coverage,
        "cost effectiveness computed"
    );

    CostEffectivenessData {
        total_cost,
        cost_per_school: ratio(total_cost, coverage.schools_supported),
        cost_per_teacher: ratio(total_cost, coverage.teachers_trained),
        cost_per_learner_assessed: ratio(total_cost, coverage.learners_assessed),
        breakdown,
        period: period.display(),
        schools_supported: coverage.schools_supported,
        teachers_trained: coverage.teachers_trained,
        learners_assessed: coverage.learners_assessed,
    }
}
