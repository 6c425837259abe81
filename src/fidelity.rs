use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::{DriverKind, DriverSpec, EngineConfig};
use crate::hierarchy::HierarchyResolver;
use crate::models::{
    ActivityModule, Band, FidelityDashboardData, FidelityDriver, FidelityScore, Level, Ranking,
    RawRecord, Scope,
};
use crate::normalize::{self, AssessmentStage};

impl Band {
    /// Fixed cut points: 75 / 50 / 25.
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            Self::Strong
        } else if score >= 50.0 {
            Self::Developing
        } else if score >= 25.0 {
            Self::NeedsSupport
        } else {
            Self::HighPriority
        }
    }
}

/// Activity counts for one scope, gathered in a single pass.
#[derive(Debug, Default)]
struct ScopeActivity {
    schools: BTreeSet<String>,
    observed_schools: BTreeSet<String>,
    visits_logged: usize,
    visits_completed: usize,
    trainings_logged: usize,
    trainings_completed: usize,
    baseline_schools: BTreeSet<String>,
    endline_schools: BTreeSet<String>,
    scorecard_schools: BTreeSet<String>,
}

impl ScopeActivity {
    fn collect<'r>(records: impl IntoIterator<Item = &'r RawRecord>, scorecard_max: f64) -> Self {
        let mut activity = Self::default();
        for record in records {
            if !record.has_school() {
                continue;
            }
            let school = record.school_id.trim().to_string();
            match record.module {
                ActivityModule::Visit => {
                    activity.visits_logged += 1;
                    if record.is_completed() {
                        activity.visits_completed += 1;
                        activity.observed_schools.insert(school.clone());
                    }
                }
                ActivityModule::Training => {
                    activity.trainings_logged += 1;
                    if record.is_completed() {
                        activity.trainings_completed += 1;
                    }
                }
                ActivityModule::Assessment => {
                    match normalize::assessment_stage(record) {
                        Some(AssessmentStage::Baseline) => {
                            activity.baseline_schools.insert(school.clone());
                        }
                        Some(AssessmentStage::Endline) => {
                            activity.endline_schools.insert(school.clone());
                        }
                        None => {}
                    }
                    if normalize::score_card(record, scorecard_max).is_some() {
                        activity.scorecard_schools.insert(school.clone());
                    }
                }
                ActivityModule::Story => {}
            }
            activity.schools.insert(school);
        }
        activity
    }

    fn full_cycle_schools(&self) -> usize {
        self.baseline_schools
            .intersection(&self.endline_schools)
            .count()
    }

    fn driver(&self, spec: &DriverSpec) -> FidelityDriver {
        let schools = self.schools.len();
        let (ratio, detail) = match spec.kind {
            DriverKind::ObservationCoverage => {
                let observed = self.observed_schools.len();
                (
                    percent(observed, schools),
                    format!("{observed} of {schools} schools observed"),
                )
            }
            DriverKind::VisitCompletion => (
                percent(self.visits_completed, self.visits_logged),
                format!(
                    "{} of {} coaching visits completed",
                    self.visits_completed, self.visits_logged
                ),
            ),
            DriverKind::TrainingCompletion => (
                percent(self.trainings_completed, self.trainings_logged),
                format!(
                    "{} of {} trainings completed",
                    self.trainings_completed, self.trainings_logged
                ),
            ),
            DriverKind::AssessmentCycle => {
                let complete = self.full_cycle_schools();
                (
                    percent(complete, schools),
                    format!("{complete} of {schools} schools with baseline and endline"),
                )
            }
            DriverKind::ScorecardCoverage => {
                let scored = self.scorecard_schools.len();
                (
                    percent(scored, schools),
                    format!("{scored} of {schools} schools with a current scorecard"),
                )
            }
        };

        FidelityDriver {
            key: spec.kind.key().to_string(),
            label: spec.label.clone(),
            score: ratio,
            weight: spec.weight,
            detail: if ratio.is_some() {
                detail
            } else {
                "No planned activity recorded in scope".to_string()
            },
        }
    }
}

fn percent(completed: usize, planned: usize) -> Option<f64> {
    (planned > 0).then(|| (completed as f64 / planned as f64 * 100.0).min(100.0))
}

/// Weighted mean of the available driver scores. Drivers without a score or
/// with a non-positive weight are listed but do not count.
pub fn composite(drivers: &[FidelityDriver]) -> f64 {
    let (weighted, weights) = drivers
        .iter()
        .filter(|driver| driver.weight.is_finite() && driver.weight > 0.0)
        .filter_map(|driver| driver.score.map(|score| (score, driver.weight)))
        .fold((0.0, 0.0), |(sum, total), (score, weight)| {
            (sum + score * weight, total + weight)
        });
    if weights > 0.0 {
        weighted / weights
    } else {
        0.0
    }
}

pub struct FidelityScorer<'a> {
    config: &'a EngineConfig,
    resolver: &'a HierarchyResolver,
}

impl<'a> FidelityScorer<'a> {
    pub fn new(config: &'a EngineConfig, resolver: &'a HierarchyResolver) -> Self {
        Self { config, resolver }
    }

    /// Scores `records`, which the caller has already narrowed to `scope`.
    pub fn score(&self, scope: &Scope, records: &[RawRecord]) -> FidelityScore {
        let name = if scope.name.is_empty() {
            self.resolver.country().to_string()
        } else {
            scope.name.clone()
        };
        self.score_unit(scope.level, name, records)
    }

    fn score_unit<'r>(
        &self,
        level: Level,
        name: String,
        records: impl IntoIterator<Item = &'r RawRecord>,
    ) -> FidelityScore {
        let activity = ScopeActivity::collect(records, self.config.scorecard_max);
        let mut drivers: Vec<FidelityDriver> = self
            .config
            .drivers
            .for_level(level)
            .iter()
            .map(|spec| activity.driver(spec))
            .collect();

        let sample_size = activity.schools.len();
        let total_score = if sample_size == 0 {
            for driver in &mut drivers {
                driver.score = None;
                driver.detail = "No schools in scope".to_string();
            }
            0.0
        } else {
            composite(&drivers)
        };

        FidelityScore {
            name,
            level,
            total_score,
            band: Band::from_score(total_score),
            drivers,
            sample_size,
        }
    }

    /// Scope score, one score per unit directly below the scope, and those
    /// units ranked by score.
    pub fn dashboard(&self, scope: &Scope, records: &[RawRecord]) -> FidelityDashboardData {
        let scope_score = self.score(scope, records);

        let children: Vec<FidelityScore> = match scope.level.child() {
            None => Vec::new(),
            Some(child_level) => {
                let mut units: BTreeMap<String, (String, Vec<&RawRecord>)> = BTreeMap::new();
                for record in records.iter().filter(|record| record.has_school()) {
                    let ancestry = self.resolver.ancestry(record);
                    let (key, name) = if child_level == Level::School {
                        (ancestry.school_id.to_lowercase(), ancestry.school_name.clone())
                    } else {
                        let name = ancestry.name_at(child_level);
                        (name.to_lowercase(), name.to_string())
                    };
                    units
                        .entry(key)
                        .or_insert_with(|| (name, Vec::new()))
                        .1
                        .push(record);
                }
                units
                    .into_values()
                    .map(|(name, unit_records)| {
                        self.score_unit(child_level, name, unit_records.into_iter())
                    })
                    .collect()
            }
        };

        let mut rankings: Vec<Ranking> = children
            .iter()
            .map(|child| Ranking {
                name: child.name.clone(),
                score: child.total_score,
                band: child.band,
            })
            .collect();
        rankings.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });

        tracing::debug!(
            scope = %scope,
            total = scope_score.total_score,
            children = children.len(),
            "fidelity dashboard scored"
        );

        FidelityDashboardData {
            scope: scope_score,
            children,
            rankings,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::*;
    use crate::models::Payload;

    fn record(
        module: ActivityModule,
        school: &str,
        sub_county: &str,
        status: &str,
        payload: serde_json::Value,
    ) -> RawRecord {
        let mut payload: Payload = serde_json::from_value(payload).unwrap();
        payload.insert(
            "sub_county".into(),
            crate::models::PayloadValue::Text(sub_county.into()),
        );
        RawRecord {
            id: Uuid::new_v4(),
            module,
            school_id: school.into(),
            district: "Gulu".into(),
            date: NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
            status: status.into(),
            payload,
        }
    }

    fn district_records() -> Vec<RawRecord> {
        vec![
            record(ActivityModule::Visit, "S1", "Bardege", "completed", serde_json::json!({})),
            record(ActivityModule::Visit, "S2", "Laroo", "planned", serde_json::json!({})),
            record(ActivityModule::Training, "S1", "Bardege", "completed", serde_json::json!({})),
            record(ActivityModule::Training, "S2", "Laroo", "completed", serde_json::json!({})),
            record(ActivityModule::Training, "S2", "Laroo", "completed", serde_json::json!({})),
            record(
                ActivityModule::Assessment,
                "S1",
                "Bardege",
                "completed",
                serde_json::json!({"assessment_stage": "baseline"}),
            ),
            record(
                ActivityModule::Assessment,
                "S1",
                "Bardege",
                "completed",
                serde_json::json!({"assessment_stage": "endline"}),
            ),
        ]
    }

    #[test]
    fn band_cut_points() {
        assert_eq!(Band::from_score(75.0), Band::Strong);
        assert_eq!(Band::from_score(74.9), Band::Developing);
        assert_eq!(Band::from_score(50.0), Band::Developing);
        assert_eq!(Band::from_score(49.9), Band::NeedsSupport);
        assert_eq!(Band::from_score(25.0), Band::NeedsSupport);
        assert_eq!(Band::from_score(24.9), Band::HighPriority);
        assert_eq!(Band::from_score(f64::NAN), Band::HighPriority);
    }

    #[test]
    fn equal_weighted_drivers_average() {
        let config = EngineConfig::default();
        let resolver = HierarchyResolver::new(&config);
        let scorer = FidelityScorer::new(&config, &resolver);

        let score = scorer.score(&Scope::new(Level::District, "Gulu"), &district_records());
        let by_key: BTreeMap<&str, Option<f64>> = score
            .drivers
            .iter()
            .map(|driver| (driver.key.as_str(), driver.score))
            .collect();
        assert_eq!(by_key["observation_coverage"], Some(50.0));
        assert_eq!(by_key["visit_completion"], Some(50.0));
        assert_eq!(by_key["training_completion"], Some(100.0));
        assert_eq!(by_key["assessment_cycle"], Some(50.0));
        assert!((score.total_score - 62.5).abs() < 1e-9);
        assert_eq!(score.band, Band::Developing);
        assert_eq!(score.sample_size, 2);
    }

    #[test]
    fn configured_weights_shift_the_composite() {
        let mut config = EngineConfig::default();
        for driver in &mut config.drivers.district {
            if driver.kind == DriverKind::TrainingCompletion {
                driver.weight = 3.0;
            }
        }
        let resolver = HierarchyResolver::new(&config);
        let score = FidelityScorer::new(&config, &resolver)
            .score(&Scope::new(Level::District, "Gulu"), &district_records());
        assert!((score.total_score - 75.0).abs() < 1e-9);
        assert_eq!(score.band, Band::Strong);
    }

    #[test]
    fn empty_scope_is_high_priority_not_an_error() {
        let config = EngineConfig::default();
        let resolver = HierarchyResolver::new(&config);
        let score = FidelityScorer::new(&config, &resolver)
            .score(&Scope::new(Level::District, "Lira"), &[]);
        assert_eq!(score.total_score, 0.0);
        assert_eq!(score.band, Band::HighPriority);
        assert_eq!(score.sample_size, 0);
        assert_eq!(score.drivers.len(), 4);
        assert!(score.drivers.iter().all(|driver| driver.score.is_none()));
    }

    #[test]
    fn unplanned_activity_is_left_out_of_the_composite() {
        let config = EngineConfig::default();
        let resolver = HierarchyResolver::new(&config);
        let records: Vec<RawRecord> = district_records()
            .into_iter()
            .filter(|r| r.school_id == "S1" && r.module != ActivityModule::Training)
            .collect();
        let score = FidelityScorer::new(&config, &resolver)
            .score(&Scope::new(Level::School, "S1"), &records);

        let training = score
            .drivers
            .iter()
            .find(|driver| driver.key == "training_completion")
            .unwrap();
        assert_eq!(training.score, None);
        assert_eq!(training.detail, "No planned activity recorded in scope");
        assert!((score.total_score - 100.0).abs() < 1e-9);
        assert_eq!(score.band, Band::Strong);
    }

    #[test]
    fn dashboard_ranks_child_units() {
        let config = EngineConfig::default();
        let resolver = HierarchyResolver::new(&config);
        let dashboard = FidelityScorer::new(&config, &resolver)
            .dashboard(&Scope::new(Level::District, "Gulu"), &district_records());

        assert_eq!(dashboard.children.len(), 2);
        assert!(dashboard
            .children
            .iter()
            .all(|child| child.level == Level::SubCounty));
        assert_eq!(dashboard.rankings[0].name, "Bardege");
        assert_eq!(dashboard.rankings[0].band, Band::Strong);
        assert_eq!(dashboard.rankings[1].name, "Laroo");
        assert!(dashboard.rankings[0].score >= dashboard.rankings[1].score);
    }

    #[test]
    fn school_scope_has_no_children() {
        let config = EngineConfig::default();
        let resolver = HierarchyResolver::new(&config);
        let records: Vec<RawRecord> = district_records()
            .into_iter()
            .filter(|r| r.school_id == "S1")
            .collect();
        let dashboard = FidelityScorer::new(&config, &resolver)
            .dashboard(&Scope::new(Level::School, "S1"), &records);
        assert!(dashboard.children.is_empty());
        assert_eq!(dashboard.scope.drivers.len(), 3);
        assert!((dashboard.scope.total_score - 100.0).abs() < 1e-9);
    }
}
