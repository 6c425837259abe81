use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityModule {
    Training,
    Visit,
    Assessment,
    Story,
}

impl ActivityModule {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Training => "training",
            Self::Visit => "visit",
            Self::Assessment => "assessment",
            Self::Story => "story",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "training" | "trainings" => Some(Self::Training),
            "visit" | "visits" | "observation" => Some(Self::Visit),
            "assessment" | "assessments" => Some(Self::Assessment),
            "story" | "stories" => Some(Self::Story),
            _ => None,
        }
    }
}

/// One value of an open-ended record payload.
///
/// Deserialization never fails: arrays collapse to their scalar elements
/// rendered as text and nested objects are kept as their JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum PayloadValue {
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<String>),
    Null,
}

impl PayloadValue {
    /// Numeric view of the value. Numeric strings parse; everything else is `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) if value.is_finite() => Some(*value),
            Self::Text(text) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<serde_json::Value> for PayloadValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Number(number) => number.as_f64().map_or(Self::Null, Self::Number),
            Value::String(text) => Self::Text(text),
            Value::Array(items) => Self::List(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Null => None,
                        Value::String(text) => Some(text),
                        other => Some(other.to_string()),
                    })
                    .collect(),
            ),
            object @ Value::Object(_) => Self::Text(object.to_string()),
        }
    }
}

impl From<PayloadValue> for serde_json::Value {
    fn from(value: PayloadValue) -> Self {
        match value {
            PayloadValue::Text(text) => Self::String(text),
            PayloadValue::Number(number) => {
                serde_json::Number::from_f64(number).map_or(Self::Null, Self::Number)
            }
            PayloadValue::Bool(flag) => Self::Bool(flag),
            PayloadValue::List(items) => Self::Array(items.into_iter().map(Self::String).collect()),
            PayloadValue::Null => Self::Null,
        }
    }
}

pub type Payload = BTreeMap<String, PayloadValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "serde_json::Value")]
pub struct RawRecord {
    pub id: Uuid,
    pub module: ActivityModule,
    pub school_id: String,
    pub district: String,
    pub date: NaiveDate,
    pub status: String,
    pub payload: Payload,
}

/// Accepts ISO dates, day-first slash or dash dates, and RFC 3339 timestamps.
pub fn parse_record_date(text: &str) -> Option<NaiveDate> {
    const FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];
    let text = text.trim();
    FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|timestamp| timestamp.date_naive())
        })
}

fn loose_text(row: &serde_json::Map<String, serde_json::Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| match row.get(*key)? {
            serde_json::Value::String(text) => Some(text.trim().to_string()),
            serde_json::Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

impl TryFrom<serde_json::Value> for RawRecord {
    type Error = String;

    /// Only an unknown module or an unreadable date loses the record; every
    /// other field falls back to blank.
    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let serde_json::Value::Object(mut row) = value else {
            return Err("record is not a JSON object".to_string());
        };
        let module_name = loose_text(&row, &["module"]);
        let module = ActivityModule::parse(&module_name)
            .ok_or_else(|| format!("unknown module `{module_name}`"))?;
        let date_text = loose_text(&row, &["date", "recordDate", "record_date"]);
        let date = parse_record_date(&date_text)
            .ok_or_else(|| format!("unreadable date `{date_text}`"))?;
        let id = row
            .get("id")
            .and_then(serde_json::Value::as_str)
            .and_then(|id| Uuid::parse_str(id.trim()).ok())
            .unwrap_or_else(Uuid::new_v4);
        let school_id = loose_text(&row, &["schoolId", "school_id"]);
        let district = loose_text(&row, &["district"]);
        let status = loose_text(&row, &["status"]);
        let payload = match row.remove("payload") {
            Some(payload @ serde_json::Value::Object(_)) => {
                serde_json::from_value(payload).unwrap_or_default()
            }
            _ => Payload::new(),
        };

        Ok(Self {
            id,
            module,
            school_id,
            district,
            date,
            status,
            payload,
        })
    }
}

impl RawRecord {
    /// Payload field, with explicit `null` treated as absent.
    pub fn field(&self, key: &str) -> Option<&PayloadValue> {
        self.payload.get(key).filter(|value| !value.is_null())
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(PayloadValue::as_text)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.field(key).and_then(PayloadValue::as_number)
    }

    pub fn school_name(&self) -> &str {
        self.text("school_name").unwrap_or(self.school_id.trim())
    }

    pub fn sub_county(&self) -> Option<&str> {
        self.text("sub_county").or_else(|| self.text("subcounty"))
    }

    pub fn is_completed(&self) -> bool {
        matches!(
            self.status.trim().to_ascii_lowercase().as_str(),
            "completed" | "complete" | "done" | "conducted"
        )
    }

    pub fn has_school(&self) -> bool {
        !self.school_id.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub instruction: f64,
    pub outcomes: f64,
    pub leadership: f64,
    pub community: f64,
    pub environment: f64,
}

impl ScoreCard {
    pub const DIMENSIONS: [&'static str; 5] =
        ["instruction", "outcomes", "leadership", "community", "environment"];

    pub const fn from_dimensions(values: [f64; 5]) -> Self {
        Self {
            instruction: values[0],
            outcomes: values[1],
            leadership: values[2],
            community: values[3],
            environment: values[4],
        }
    }

    pub const fn dimensions(&self) -> [f64; 5] {
        [
            self.instruction,
            self.outcomes,
            self.leadership,
            self.community,
            self.environment,
        ]
    }

    /// Field-wise arithmetic mean; an empty input yields all zeros.
    pub fn mean<'a>(cards: impl IntoIterator<Item = &'a ScoreCard>) -> Self {
        let mut totals = [0.0; 5];
        let mut count = 0usize;
        for card in cards {
            for (total, value) in totals.iter_mut().zip(card.dimensions()) {
                *total += value;
            }
            count += 1;
        }
        if count == 0 {
            return Self::default();
        }
        Self::from_dimensions(totals.map(|total| total / count as f64))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    Country,
    Region,
    District,
    #[serde(rename = "Sub-County")]
    SubCounty,
    School,
}

impl Level {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Country => "Country",
            Self::Region => "Region",
            Self::District => "District",
            Self::SubCounty => "Sub-County",
            Self::School => "School",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "country" | "national" => Some(Self::Country),
            "region" => Some(Self::Region),
            "district" => Some(Self::District),
            "subcounty" => Some(Self::SubCounty),
            "school" => Some(Self::School),
            _ => None,
        }
    }

    /// The administrative level directly below this one.
    pub const fn child(self) -> Option<Self> {
        match self {
            Self::Country => Some(Self::Region),
            Self::Region => Some(Self::District),
            Self::District => Some(Self::SubCounty),
            Self::SubCounty => Some(Self::School),
            Self::School => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An administrative selection: level plus identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub level: Level,
    pub name: String,
}

impl Scope {
    pub fn new(level: Level, name: impl Into<String>) -> Self {
        Self {
            level,
            name: name.into().trim().to_string(),
        }
    }

    pub fn country() -> Self {
        Self::new(Level::Country, "")
    }

    /// Parses a caller-supplied scope. Country scopes may omit the name.
    pub fn parse(level: &str, name: Option<&str>) -> Result<Self, EngineError> {
        let level = Level::parse(level).ok_or_else(|| EngineError::InvalidScope {
            level: level.to_string(),
        })?;
        let name = name.map(str::trim).unwrap_or_default();
        if name.is_empty() && level != Level::Country {
            return Err(EngineError::MissingScopeName {
                level: level.to_string(),
            });
        }
        Ok(Self::new(level, name))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.level)
        } else {
            write!(f, "{}: {}", self.level, self.name)
        }
    }
}

/// Optional reporting window. `label` selects cost entries by period;
/// `start`/`end` bound record dates, inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub label: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ReportPeriod {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }

    pub fn matches_label(&self, period: &str) -> bool {
        self.label
            .as_deref()
            .map_or(true, |label| label.trim().eq_ignore_ascii_case(period.trim()))
    }

    pub fn display(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        match (self.start, self.end) {
            (Some(start), Some(end)) => format!("{start} to {end}"),
            (Some(start), None) => format!("since {start}"),
            (None, Some(end)) => format!("until {end}"),
            (None, None) => "All periods".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceNode {
    pub id: String,
    pub name: String,
    pub level: Level,
    pub scores: ScoreCard,
    pub children: Vec<PerformanceNode>,
    pub school_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weaning_eligible: Option<bool>,
}

impl PerformanceNode {
    /// A node without descendant schools carries placeholder zeros, not scores.
    pub fn has_data(&self) -> bool {
        self.school_count > 0
    }

    /// Depth-first, pre-order traversal of this node and its descendants.
    pub fn descendants(&self) -> Vec<&PerformanceNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    pub fn find(&self, level: Level, name: &str) -> Option<&PerformanceNode> {
        self.descendants().into_iter().find(|node| {
            node.level == level
                && (node.name.eq_ignore_ascii_case(name.trim())
                    || node.id.eq_ignore_ascii_case(name.trim()))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Band {
    Strong,
    Developing,
    #[serde(rename = "Needs support")]
    NeedsSupport,
    #[serde(rename = "High priority")]
    HighPriority,
}

impl Band {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Strong => "Strong",
            Self::Developing => "Developing",
            Self::NeedsSupport => "Needs support",
            Self::HighPriority => "High priority",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FidelityDriver {
    pub key: String,
    pub label: String,
    /// `None` when nothing was planned for this driver; such drivers are
    /// listed but left out of the composite.
    pub score: Option<f64>,
    pub weight: f64,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FidelityScore {
    pub name: String,
    pub level: Level,
    pub total_score: f64,
    pub band: Band,
    pub drivers: Vec<FidelityDriver>,
    pub sample_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub name: String,
    pub score: f64,
    pub band: Band,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FidelityDashboardData {
    pub scope: FidelityScore,
    pub children: Vec<FidelityScore>,
    pub rankings: Vec<Ranking>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningDomainGain {
    pub domain: String,
    pub label: String,
    pub baseline_avg: Option<f64>,
    pub endline_avg: Option<f64>,
    pub change: Option<f64>,
    pub sample_size: usize,
    pub baseline_samples: usize,
    pub endline_samples: usize,
}

impl LearningDomainGain {
    pub fn has_sufficient_data(&self) -> bool {
        self.change.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningGainsData {
    pub period: String,
    pub domains: Vec<LearningDomainGain>,
    pub school_improvement_index: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum CostCategory {
    Transport,
    Meals,
    Printing,
    StaffTime,
    Materials,
    Training,
    Assessment,
    Other,
}

impl CostCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Meals => "meals",
            Self::Printing => "printing",
            Self::StaffTime => "staff_time",
            Self::Materials => "materials",
            Self::Training => "training",
            Self::Assessment => "assessment",
            Self::Other => "other",
        }
    }

    /// Unrecognized categories are booked as `Other`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "transport" => Self::Transport,
            "meals" => Self::Meals,
            "printing" => Self::Printing,
            "staff_time" => Self::StaffTime,
            "materials" => Self::Materials,
            "training" => Self::Training,
            "assessment" => Self::Assessment,
            _ => Self::Other,
        }
    }
}

impl From<String> for CostCategory {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEntry {
    pub category: CostCategory,
    #[serde(deserialize_with = "coerced_amount")]
    pub amount: f64,
    pub scope_type: String,
    pub scope_value: String,
    #[serde(default)]
    pub period: String,
}

fn coerced_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(PayloadValue::deserialize(deserializer)?
        .as_number()
        .unwrap_or(0.0))
}

impl CostEntry {
    /// Entries only count toward the exact scope they were booked against.
    pub fn matches_scope(&self, scope: &Scope) -> bool {
        Level::parse(&self.scope_type) == Some(scope.level)
            && ((scope.level == Level::Country && scope.name.is_empty())
                || self.scope_value.trim().eq_ignore_ascii_case(&scope.name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub category: CostCategory,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEffectivenessData {
    pub total_cost: f64,
    pub cost_per_school: Option<f64>,
    pub cost_per_teacher: Option<f64>,
    pub cost_per_learner_assessed: Option<f64>,
    pub breakdown: Vec<CostBreakdown>,
    pub period: String,
    pub schools_supported: usize,
    pub teachers_trained: usize,
    pub learners_assessed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualitySummary {
    pub completeness_score: f64,
    pub schools_missing_baseline: usize,
    pub schools_missing_endline: usize,
    pub outlier_count: usize,
    pub duplicate_learners_detected: usize,
    pub duplicate_teachers_detected: usize,
}

/// A read-only snapshot handed over by the data store for one request.
/// Rows that cannot be read are dropped with a warning; the rest load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "SnapshotRows")]
pub struct Snapshot {
    pub records: Vec<RawRecord>,
    pub costs: Vec<CostEntry>,
}

#[derive(Deserialize)]
struct SnapshotRows {
    #[serde(default)]
    records: Vec<serde_json::Value>,
    #[serde(default)]
    costs: Vec<serde_json::Value>,
}

impl From<SnapshotRows> for Snapshot {
    fn from(rows: SnapshotRows) -> Self {
        let mut skipped_records = 0usize;
        let records = rows
            .records
            .into_iter()
            .filter_map(|row| match RawRecord::try_from(row) {
                Ok(record) => Some(record),
                Err(reason) => {
                    skipped_records += 1;
                    tracing::debug!(%reason, "snapshot record skipped");
                    None
                }
            })
            .collect();

        let mut skipped_costs = 0usize;
        let costs = rows
            .costs
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<CostEntry>(row) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    skipped_costs += 1;
                    tracing::debug!(%err, "snapshot cost entry skipped");
                    None
                }
            })
            .collect();

        if skipped_records > 0 || skipped_costs > 0 {
            tracing::warn!(skipped_records, skipped_costs, "snapshot rows read with gaps");
        }
        Self { records, costs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_values_tolerate_mixed_json() {
        let payload: Payload = serde_json::from_value(serde_json::json!({
            "instruction": "7.5",
            "outcomes": 6,
            "participants": ["Amos", 3, null],
            "notes": {"k": "v"},
            "missing": null
        }))
        .unwrap();

        assert_eq!(payload["instruction"].as_number(), Some(7.5));
        assert_eq!(payload["outcomes"].as_number(), Some(6.0));
        assert_eq!(
            payload["participants"].as_list(),
            Some(&["Amos".to_string(), "3".to_string()][..])
        );
        assert!(payload["notes"].as_text().is_some());
        assert!(payload["missing"].is_null());
    }

    #[test]
    fn score_card_mean_of_nothing_is_zero() {
        assert_eq!(ScoreCard::mean(std::iter::empty()), ScoreCard::default());
    }

    #[test]
    fn scope_parse_rejects_unknown_levels() {
        assert_eq!(
            Scope::parse("parish", Some("x")),
            Err(EngineError::InvalidScope {
                level: "parish".to_string()
            })
        );
        assert_eq!(
            Scope::parse("sub-county", Some("Bardege")).unwrap().level,
            Level::SubCounty
        );
        assert!(Scope::parse("district", None).is_err());
        assert_eq!(Scope::parse("country", None).unwrap(), Scope::country());
    }

    #[test]
    fn cost_category_falls_back_to_other() {
        assert_eq!(CostCategory::parse("Staff Time"), CostCategory::StaffTime);
        assert_eq!(CostCategory::parse("fuel"), CostCategory::Other);
    }

    #[test]
    fn snapshot_keeps_readable_rows() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{
                "records": [
                    {"module": "visit", "schoolId": "S1", "district": "Gulu", "date": "2024-02-01", "status": "completed"},
                    {"module": "survey", "schoolId": "S1", "district": "Gulu", "date": "2024-02-01"},
                    {"module": "assessment", "schoolId": 7, "district": "Gulu", "date": "01/02/2024", "payload": {"instruction": "6"}},
                    {"module": "training", "schoolId": "S2", "date": "last tuesday"},
                    "not a record"
                ],
                "costs": [
                    {"category": "fuel", "amount": "1200", "scopeType": "district", "scopeValue": "Gulu", "period": "2024"},
                    {"category": "meals", "amount": 300, "scopeType": "district", "scopeValue": "Gulu"},
                    {"category": "meals"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(snapshot.records.len(), 2);
        assert_eq!(snapshot.records[0].module, ActivityModule::Visit);
        assert_eq!(snapshot.records[1].school_id, "7");
        assert_eq!(
            snapshot.records[1].date,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
        assert_eq!(snapshot.records[1].number("instruction"), Some(6.0));

        assert_eq!(snapshot.costs.len(), 2);
        assert_eq!(snapshot.costs[0].category, CostCategory::Other);
        assert_eq!(snapshot.costs[0].amount, 1200.0);
        assert_eq!(snapshot.costs[1].period, "");
    }

    #[test]
    fn serialized_records_read_back() {
        let record = RawRecord {
            id: Uuid::new_v4(),
            module: ActivityModule::Story,
            school_id: "S9".into(),
            district: "Lira".into(),
            date: NaiveDate::from_ymd_opt(2025, 7, 14).unwrap(),
            status: "done".into(),
            payload: Payload::new(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(RawRecord::try_from(json).unwrap(), record);
    }

    #[test]
    fn cost_scope_type_spellings_match() {
        let entry = CostEntry {
            category: CostCategory::Transport,
            amount: 10.0,
            scope_type: "subcounty".into(),
            scope_value: "Bardege ".into(),
            period: "2026".into(),
        };
        assert!(entry.matches_scope(&Scope::new(Level::SubCounty, "bardege")));
        assert!(!entry.matches_scope(&Scope::new(Level::District, "Bardege")));
    }

    #[test]
    fn period_bounds_are_inclusive() {
        let period = ReportPeriod {
            label: None,
            start: NaiveDate::from_ymd_opt(2024, 1, 1),
            end: NaiveDate::from_ymd_opt(2024, 12, 31),
        };
        assert!(period.contains(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert!(period.contains(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
    }
}
