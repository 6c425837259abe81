//! Findings are counts only. Learner and teacher names never leave this module.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};

use crate::config::EngineConfig;
use crate::models::{ActivityModule, DataQualitySummary, RawRecord, ScoreCard};
use crate::normalize::{self, AssessmentStage};

pub fn count_outliers(records: &[RawRecord], config: &EngineConfig) -> usize {
    let out_of_range = |value: f64, max: f64| value < 0.0 || value > max;
    records
        .iter()
        .filter(|record| record.module == ActivityModule::Assessment)
        .map(|record| {
            let scorecard = ScoreCard::DIMENSIONS
                .iter()
                .filter_map(|key| record.number(key))
                .filter(|value| out_of_range(*value, config.scorecard_max))
                .count();
            let domains = config
                .learning_domains
                .iter()
                .filter_map(|domain| record.number(&domain.key))
                .filter(|value| out_of_range(*value, config.assessment_max))
                .count();
            scorecard + domains
        })
        .sum()
}

/// Cohort label: an explicit `cohort` field, else the calendar year.
fn cohort_window(record: &RawRecord) -> String {
    record
        .text("cohort")
        .map(str::to_lowercase)
        .unwrap_or_else(|| record.date.year().to_string())
}

fn surplus(counts: impl IntoIterator<Item = usize>) -> usize {
    counts.into_iter().map(|count| count.saturating_sub(1)).sum()
}

/// Learners assessed more than once for the same school, stage and cohort.
/// Each extra occurrence counts once.
pub fn count_duplicate_learners(records: &[RawRecord]) -> usize {
    let mut seen: BTreeMap<(String, Option<AssessmentStage>, String, String), usize> = BTreeMap::new();
    for record in records
        .iter()
        .filter(|record| record.module == ActivityModule::Assessment)
    {
        let Some(identity) = normalize::learner_identity(record) else {
            continue;
        };
        let key = (
            record.school_id.trim().to_lowercase(),
            normalize::assessment_stage(record),
            cohort_window(record),
            identity,
        );
        *seen.entry(key).or_insert(0) += 1;
    }
    surplus(seen.into_values())
}

pub fn count_duplicate_teachers(records: &[RawRecord]) -> usize {
    let mut seen: BTreeMap<(String, NaiveDate, String), usize> = BTreeMap::new();
    for record in records
        .iter()
        .filter(|record| record.module == ActivityModule::Training)
    {
        for identity in normalize::teacher_identities(record) {
            let key = (record.school_id.trim().to_lowercase(), record.date, identity);
            *seen.entry(key).or_insert(0) += 1;
        }
    }
    surplus(seen.into_values())
}

pub fn summarize(records: &[RawRecord], config: &EngineConfig) -> DataQualitySummary {
    let schools: BTreeSet<&str> = records
        .iter()
        .filter(|record| record.has_school())
        .map(|record| record.school_id.trim())
        .collect();

    let mut baseline: BTreeSet<&str> = BTreeSet::new();
    let mut endline: BTreeSet<&str> = BTreeSet::new();
    for record in records.iter().filter(|record| record.has_school()) {
        match normalize::assessment_stage(record) {
            Some(AssessmentStage::Baseline) => {
                baseline.insert(record.school_id.trim());
            }
            Some(AssessmentStage::Endline) => {
                endline.insert(record.school_id.trim());
            }
            None => {}
        }
    }

    let expected = schools.len() * 2;
    let present = baseline.len() + endline.len();
    let completeness_score = if expected == 0 {
        0.0
    } else {
        present as f64 / expected as f64 * 100.0
    };

    let summary = DataQualitySummary {
        completeness_score,
        schools_missing_baseline: schools.len() - baseline.len(),
        schools_missing_endline: schools.len() - endline.len(),
        outlier_count: count_outliers(records, config),
        duplicate_learners_detected: count_duplicate_learners(records),
        duplicate_teachers_detected: count_duplicate_teachers(records),
    };
    if summary.outlier_count > 0 || summary.duplicate_learners_detected > 0 {
        tracing::warn!(
            outliers = summary.outlier_count,
            duplicate_learners = summary.duplicate_learners_detected,
            "data quality issues flagged"
        );
    }
    summary
}
