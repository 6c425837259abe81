use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::models::Level;
use crate::rate_limiter::RateLimitPolicy;

pub const CONFIG_ENV: &str = "FIDELITY_ENGINE_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// Share of schools with at least one completed coaching visit.
    ObservationCoverage,
    /// Completed visits over all visits logged.
    VisitCompletion,
    /// Completed trainings over all trainings logged.
    TrainingCompletion,
    /// Share of schools holding both a baseline and an endline assessment.
    AssessmentCycle,
    /// Share of schools with a current scorecard.
    ScorecardCoverage,
}

impl DriverKind {
    pub const fn key(self) -> &'static str {
        match self {
            Self::ObservationCoverage => "observation_coverage",
            Self::VisitCompletion => "visit_completion",
            Self::TrainingCompletion => "training_completion",
            Self::AssessmentCycle => "assessment_cycle",
            Self::ScorecardCoverage => "scorecard_coverage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSpec {
    pub kind: DriverKind,
    pub label: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl DriverSpec {
    pub fn new(kind: DriverKind, label: &str) -> Self {
        Self {
            kind,
            label: label.to_string(),
            weight: default_weight(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverSets {
    pub country: Vec<DriverSpec>,
    pub region: Vec<DriverSpec>,
    pub district: Vec<DriverSpec>,
    pub sub_county: Vec<DriverSpec>,
    pub school: Vec<DriverSpec>,
}

impl DriverSets {
    pub fn for_level(&self, level: Level) -> &[DriverSpec] {
        match level {
            Level::Country => &self.country,
            Level::Region => &self.region,
            Level::District => &self.district,
            Level::SubCounty => &self.sub_county,
            Level::School => &self.school,
        }
    }
}

impl Default for DriverSets {
    fn default() -> Self {
        let area = vec![
            DriverSpec::new(DriverKind::ObservationCoverage, "Observation coverage"),
            DriverSpec::new(DriverKind::VisitCompletion, "Coaching visit completion"),
            DriverSpec::new(DriverKind::TrainingCompletion, "Training completion rate"),
            DriverSpec::new(DriverKind::AssessmentCycle, "Assessment cycle completeness"),
        ];
        let school = vec![
            DriverSpec::new(DriverKind::VisitCompletion, "Coaching visit completion"),
            DriverSpec::new(DriverKind::TrainingCompletion, "Training completion rate"),
            DriverSpec::new(DriverKind::AssessmentCycle, "Assessment cycle completeness"),
        ];
        Self {
            country: area.clone(),
            region: area.clone(),
            district: area.clone(),
            sub_county: area,
            school,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningDomain {
    pub key: String,
    pub label: String,
}

impl LearningDomain {
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
        }
    }
}

fn default_domains() -> Vec<LearningDomain> {
    vec![
        LearningDomain::new("letter_identification", "Letter identification"),
        LearningDomain::new("sound_identification", "Sound identification"),
        LearningDomain::new("decodable_words", "Decodable words"),
        LearningDomain::new("invented_words", "Invented words"),
        LearningDomain::new("oral_reading_fluency", "Oral reading fluency"),
        LearningDomain::new("reading_comprehension", "Reading comprehension"),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub country_name: String,
    pub weaning_threshold: f64,
    pub scorecard_max: f64,
    pub assessment_max: f64,
    pub learning_domains: Vec<LearningDomain>,
    /// Extra or corrected district → region mappings, layered over the
    /// built-in administrative table.
    pub district_regions: BTreeMap<String, String>,
    pub drivers: DriverSets,
    pub rate_limit: RateLimitPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            country_name: "Uganda".to_string(),
            weaning_threshold: 8.0,
            scorecard_max: 10.0,
            assessment_max: 100.0,
            learning_domains: default_domains(),
            district_regions: BTreeMap::new(),
            drivers: DriverSets::default(),
            rate_limit: RateLimitPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Reads the JSON config at `path`, or at `$FIDELITY_ENGINE_CONFIG`, or
    /// falls back to defaults when neither is set.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        let Some(path) = path else {
            tracing::debug!("no engine config supplied; using defaults");
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid engine config {}", path.display()))?;
        tracing::info!(path = %path.display(), "loaded engine config");
        Ok(config)
    }
}
