use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::config::LearningDomain;
use crate::models::{ActivityModule, CostCategory, CostEntry, RawRecord, ScoreCard};

pub const STAGE_FIELDS: [&str; 2] = ["assessment_stage", "stage"];
pub const LEARNER_FIELDS: [&str; 2] = ["learner_name", "learner_id"];
pub const TEACHER_FIELD: &str = "teacher_name";
pub const PARTICIPANTS_FIELD: &str = "participants";
pub const TEACHERS_TRAINED_FIELD: &str = "teachers_trained";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssessmentStage {
    Baseline,
    Endline,
}

impl AssessmentStage {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "baseline" | "base" | "pre" => Some(Self::Baseline),
            "endline" | "end" | "post" => Some(Self::Endline),
            _ => None,
        }
    }
}

pub fn assessment_stage(record: &RawRecord) -> Option<AssessmentStage> {
    if record.module != ActivityModule::Assessment {
        return None;
    }
    STAGE_FIELDS
        .iter()
        .find_map(|key| record.text(key))
        .and_then(AssessmentStage::parse)
}

/// Present-but-unparseable values read as `0`; absent values are `None`.
pub fn coerced_number(record: &RawRecord, key: &str) -> Option<f64> {
    record
        .field(key)
        .map(|value| value.as_number().unwrap_or(0.0))
}

/// Extracts the five-dimension scorecard from an assessment record, clamped
/// to `[0, max]`. Records carrying none of the dimensions yield `None`.
pub fn score_card(record: &RawRecord, max: f64) -> Option<ScoreCard> {
    if record.module != ActivityModule::Assessment {
        return None;
    }
    let values = ScoreCard::DIMENSIONS.map(|key| coerced_number(record, key));
    if values.iter().all(Option::is_none) {
        return None;
    }
    Some(ScoreCard::from_dimensions(
        values.map(|value| value.unwrap_or(0.0).clamp(0.0, max)),
    ))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchoolScoreCard {
    pub school_id: String,
    pub school_name: String,
    pub district: String,
    pub sub_county: Option<String>,
    pub date: NaiveDate,
    pub card: ScoreCard,
}

/// Current scorecard per school: the most recent record wins, and on equal
/// dates the one later in the snapshot wins.
pub fn latest_score_cards(records: &[RawRecord], max: f64) -> BTreeMap<String, SchoolScoreCard> {
    let mut latest: BTreeMap<String, SchoolScoreCard> = BTreeMap::new();
    for record in records.iter().filter(|record| record.has_school()) {
        let Some(card) = score_card(record, max) else {
            continue;
        };
        let school_id = record.school_id.trim().to_string();
        if latest
            .get(&school_id)
            .is_some_and(|current| current.date > record.date)
        {
            continue;
        }
        latest.insert(
            school_id.clone(),
            SchoolScoreCard {
                school_id,
                school_name: record.school_name().to_string(),
                district: record.district.clone(),
                sub_county: record.sub_county().map(str::to_string),
                date: record.date,
                card,
            },
        );
    }
    latest
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainSamples {
    pub baseline: Vec<f64>,
    pub endline: Vec<f64>,
}

pub fn domain_samples(
    records: &[RawRecord],
    domains: &[LearningDomain],
) -> Vec<(LearningDomain, DomainSamples)> {
    let mut samples: Vec<(LearningDomain, DomainSamples)> = domains
        .iter()
        .map(|domain| (domain.clone(), DomainSamples::default()))
        .collect();

    for record in records {
        let Some(stage) = assessment_stage(record) else {
            continue;
        };
        for (domain, bucket) in samples.iter_mut() {
            let Some(value) = coerced_number(record, &domain.key) else {
                continue;
            };
            match stage {
                AssessmentStage::Baseline => bucket.baseline.push(value),
                AssessmentStage::Endline => bucket.endline.push(value),
            }
        }
    }
    samples
}

pub fn cost_totals<'a>(entries: impl IntoIterator<Item = &'a CostEntry>) -> BTreeMap<CostCategory, f64> {
    let mut totals = BTreeMap::new();
    for entry in entries {
        let amount = if entry.amount.is_finite() { entry.amount } else { 0.0 };
        *totals.entry(entry.category).or_insert(0.0) += amount;
    }
    totals
}

pub fn normalize_identity(raw: &str) -> Option<String> {
    let normalized = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    (!normalized.is_empty()).then_some(normalized)
}

pub fn learner_identity(record: &RawRecord) -> Option<String> {
    LEARNER_FIELDS
        .iter()
        .find_map(|key| record.text(key))
        .and_then(normalize_identity)
}

pub fn teacher_identities(record: &RawRecord) -> Vec<String> {
    let mut identities: Vec<String> = record
        .field(PARTICIPANTS_FIELD)
        .and_then(|value| value.as_list())
        .unwrap_or_default()
        .iter()
        .filter_map(|name| normalize_identity(name))
        .collect();
    if let Some(name) = record.text(TEACHER_FIELD).and_then(normalize_identity) {
        identities.push(name);
    }
    identities
}
