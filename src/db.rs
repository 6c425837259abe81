use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::hierarchy::UNKNOWN_DISTRICT;
use crate::models::{
    ActivityModule, CostCategory, CostEntry, Level, Payload, PayloadValue, RawRecord,
    ReportPeriod, Scope,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn insert_record(pool: &PgPool, record: &RawRecord, source_key: &str) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO literacy.activity_records
        (id, module, school_id, district, record_date, status, payload, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(record.id)
    .bind(record.module.as_str())
    .bind(record.school_id.trim())
    .bind(record.district.trim())
    .bind(record.date)
    .bind(&record.status)
    .bind(Json(&record.payload))
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

async fn insert_cost(pool: &PgPool, entry: &CostEntry, source_key: &str) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO literacy.cost_entries
        (id, category, amount, scope_type, scope_value, period, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.category.as_str())
    .bind(entry.amount)
    .bind(entry.scope_type.trim())
    .bind(entry.scope_value.trim())
    .bind(entry.period.trim())
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn seed_record(
    module: ActivityModule,
    school: (&str, &str, &str, &str),
    date: NaiveDate,
    status: &str,
    payload: serde_json::Value,
) -> anyhow::Result<RawRecord> {
    let (school_id, school_name, district, sub_county) = school;
    let mut payload: Payload = serde_json::from_value(payload)?;
    payload.insert("school_name".into(), PayloadValue::Text(school_name.into()));
    payload.insert("sub_county".into(), PayloadValue::Text(sub_county.into()));
    Ok(RawRecord {
        id: Uuid::new_v4(),
        module,
        school_id: school_id.to_string(),
        district: district.to_string(),
        date,
        status: status.to_string(),
        payload,
    })
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let schools = vec![
        (("GUL-001", "Awach Primary School", "Gulu", "Bardege"), [8.0, 8.0, 8.0, 8.0, 8.0], (14.0, 31.0)),
        (("GUL-002", "Bobi Primary School", "Gulu", "Bardege"), [6.0, 7.0, 6.0, 5.0, 6.0], (9.0, 17.0)),
        (("GUL-003", "Coorom Primary School", "Gulu", "Bardege"), [9.0, 9.0, 9.0, 9.0, 9.0], (18.0, 40.0)),
        (("GUL-004", "Laroo Boarding Primary", "Gulu", "Laroo"), [5.0, 4.5, 6.0, 3.0, 5.5], (7.0, 12.0)),
        (("LIR-001", "Adyel Primary School", "Lira", "Adyel"), [7.0, 6.5, 8.0, 7.5, 7.0], (11.0, 22.0)),
        (("KLA-001", "Nakawa Model School", "Kampala", "Nakawa"), [8.5, 9.0, 8.0, 8.5, 9.0], (25.0, 44.0)),
    ];
    let baseline_date = NaiveDate::from_ymd_opt(2026, 2, 9).context("invalid date")?;
    let endline_date = NaiveDate::from_ymd_opt(2026, 11, 16).context("invalid date")?;
    let visit_date = NaiveDate::from_ymd_opt(2026, 5, 12).context("invalid date")?;
    let training_date = NaiveDate::from_ymd_opt(2026, 1, 27).context("invalid date")?;

    let mut inserted = 0usize;
    for (index, (school, dims, (baseline, endline))) in schools.into_iter().enumerate() {
        let id = school.0;
        let records = vec![
            (
                format!("seed-{id}-scorecard"),
                seed_record(
                    ActivityModule::Assessment,
                    school,
                    visit_date,
                    "completed",
                    serde_json::json!({
                        "instruction": dims[0],
                        "outcomes": dims[1],
                        "leadership": dims[2],
                        "community": dims[3],
                        "environment": dims[4],
                    }),
                )?,
            ),
            (
                format!("seed-{id}-baseline"),
                seed_record(
                    ActivityModule::Assessment,
                    school,
                    baseline_date,
                    "completed",
                    serde_json::json!({
                        "assessment_stage": "baseline",
                        "learner_name": format!("Learner {index}"),
                        "letter_identification": baseline,
                        "oral_reading_fluency": baseline / 2.0,
                    }),
                )?,
            ),
            (
                format!("seed-{id}-endline"),
                seed_record(
                    ActivityModule::Assessment,
                    school,
                    endline_date,
                    "completed",
                    serde_json::json!({
                        "assessment_stage": "endline",
                        "learner_name": format!("Learner {index}"),
                        "letter_identification": endline,
                    }),
                )?,
            ),
            (
                format!("seed-{id}-visit"),
                seed_record(
                    ActivityModule::Visit,
                    school,
                    visit_date,
                    if index % 3 == 2 { "planned" } else { "completed" },
                    serde_json::json!({"coach": "Field coach"}),
                )?,
            ),
            (
                format!("seed-{id}-training"),
                seed_record(
                    ActivityModule::Training,
                    school,
                    training_date,
                    "completed",
                    serde_json::json!({"participants": ["Okello James", "Akello Ruth", "Opio Denis"]}),
                )?,
            ),
        ];

        for (source_key, record) in records {
            if insert_record(pool, &record, &source_key).await? {
                inserted += 1;
            }
        }
    }

    let costs = vec![
        ("seed-cost-gulu-transport", CostCategory::Transport, 4200.0, "District", "Gulu"),
        ("seed-cost-gulu-printing", CostCategory::Printing, 1800.0, "District", "Gulu"),
        ("seed-cost-gulu-training", CostCategory::Training, 6500.0, "District", "Gulu"),
        ("seed-cost-lira-transport", CostCategory::Transport, 2100.0, "District", "Lira"),
        ("seed-cost-northern-staff", CostCategory::StaffTime, 9000.0, "Region", "Northern"),
    ];
    for (source_key, category, amount, scope_type, scope_value) in costs {
        let entry = CostEntry {
            category,
            amount,
            scope_type: scope_type.to_string(),
            scope_value: scope_value.to_string(),
            period: "2026".to_string(),
        };
        if insert_cost(pool, &entry, source_key).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// Records for `scope` within the period's date bounds. District and school
/// scopes narrow in SQL; wider scopes are narrowed by the engine, which owns
/// the district → region lookup.
pub async fn fetch_records(
    pool: &PgPool,
    scope: &Scope,
    period: &ReportPeriod,
) -> anyhow::Result<Vec<RawRecord>> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT id, module, school_id, district, record_date, status, payload \
         FROM literacy.activity_records WHERE TRUE",
    );
    match scope.level {
        Level::District if !scope.name.eq_ignore_ascii_case(UNKNOWN_DISTRICT) => {
            query.push(" AND lower(district) = lower(").push_bind(scope.name.clone()).push(")");
        }
        Level::School => {
            query
                .push(" AND (school_id = ")
                .push_bind(scope.name.clone())
                .push(" OR lower(payload->>'school_name') = lower(")
                .push_bind(scope.name.clone())
                .push("))");
        }
        _ => {}
    }
    if let Some(start) = period.start {
        query.push(" AND record_date >= ").push_bind(start);
    }
    if let Some(end) = period.end {
        query.push(" AND record_date <= ").push_bind(end);
    }
    query.push(" ORDER BY record_date, created_at");

    let rows = query
        .build()
        .fetch_all(pool)
        .await
        .context("failed to query activity records")?;

    let mut records = Vec::with_capacity(rows.len());
    let mut unknown_modules = 0usize;
    let mut unreadable_payloads = 0usize;
    for row in rows {
        let module_name: String = row.get("module");
        let Some(module) = ActivityModule::parse(&module_name) else {
            unknown_modules += 1;
            continue;
        };
        let payload = match row.try_get::<Json<Payload>, _>("payload") {
            Ok(Json(payload)) => payload,
            Err(_) => {
                unreadable_payloads += 1;
                Payload::new()
            }
        };
        records.push(RawRecord {
            id: row.get("id"),
            module,
            school_id: row.get("school_id"),
            district: row.get("district"),
            date: row.get("record_date"),
            status: row.get("status"),
            payload,
        });
    }
    if unknown_modules > 0 || unreadable_payloads > 0 {
        tracing::warn!(
            unknown_modules,
            unreadable_payloads,
            "activity rows read with gaps"
        );
    }

    Ok(records)
}

pub async fn fetch_cost_entries(
    pool: &PgPool,
    scope: &Scope,
    period: &ReportPeriod,
) -> anyhow::Result<Vec<CostEntry>> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT category, amount, scope_type, scope_value, period \
         FROM literacy.cost_entries WHERE TRUE",
    );
    if !scope.name.is_empty() {
        query
            .push(" AND lower(trim(scope_value)) = lower(")
            .push_bind(scope.name.clone())
            .push(")");
    }
    if let Some(label) = &period.label {
        query
            .push(" AND lower(period) = lower(")
            .push_bind(label.clone())
            .push(")");
    }

    let rows = query
        .build()
        .fetch_all(pool)
        .await
        .context("failed to query cost entries")?;

    // Scope type spellings vary in older imports; the level match happens here.
    Ok(rows
        .into_iter()
        .map(|row| {
            let category: String = row.get("category");
            CostEntry {
                category: CostCategory::parse(&category),
                amount: row.get("amount"),
                scope_type: row.get("scope_type"),
                scope_value: row.get("scope_value"),
                period: row.get("period"),
            }
        })
        .filter(|entry| entry.matches_scope(scope))
        .collect())
}

pub async fn import_records_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        module: String,
        school_id: String,
        school_name: Option<String>,
        district: String,
        sub_county: Option<String>,
        date: NaiveDate,
        status: String,
        payload: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;
    let mut skipped = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("malformed row {}", line + 2))?;
        let Some(module) = ActivityModule::parse(&row.module) else {
            skipped += 1;
            continue;
        };

        let mut payload: Payload = match row.payload.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => serde_json::from_str(raw).unwrap_or_else(|err| {
                tracing::warn!(row = line + 2, %err, "payload is not a JSON object; importing without it");
                Payload::new()
            }),
            _ => Payload::new(),
        };
        if let Some(name) = row.school_name.filter(|name| !name.trim().is_empty()) {
            payload.insert("school_name".into(), PayloadValue::Text(name));
        }
        if let Some(name) = row.sub_county.filter(|name| !name.trim().is_empty()) {
            payload.insert("sub_county".into(), PayloadValue::Text(name));
        }

        let record = RawRecord {
            id: Uuid::new_v4(),
            module,
            school_id: row.school_id,
            district: row.district,
            date: row.date,
            status: row.status,
            payload,
        };
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", record.id));
        if insert_record(pool, &record, &source_key).await? {
            inserted += 1;
        }
    }

    if skipped > 0 {
        tracing::warn!(skipped, "rows with an unknown module were not imported");
    }
    Ok(inserted)
}

/// Stored scope types use the level's display spelling when it parses.
fn canonical_scope_type(raw: &str) -> String {
    Level::parse(raw).map_or_else(|| raw.trim().to_string(), |level| level.as_str().to_string())
}

pub async fn import_costs_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        category: String,
        amount: f64,
        scope_type: String,
        scope_value: String,
        period: String,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("malformed row {}", line + 2))?;
        let entry = CostEntry {
            category: CostCategory::parse(&row.category),
            amount: row.amount,
            scope_type: canonical_scope_type(&row.scope_type),
            scope_value: row.scope_value,
            period: row.period,
        };
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-cost-{}", Uuid::new_v4()));
        if insert_cost(pool, &entry, &source_key).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imported_scope_types_use_level_spelling() {
        assert_eq!(canonical_scope_type("subcounty"), "Sub-County");
        assert_eq!(canonical_scope_type(" sub_county "), "Sub-County");
        assert_eq!(canonical_scope_type("national"), "Country");
        assert_eq!(canonical_scope_type(" parish "), "parish");
    }

    #[test]
    fn stored_spellings_still_match_their_scope() {
        let entry = CostEntry {
            category: CostCategory::Meals,
            amount: 250.0,
            scope_type: "Sub County".into(),
            scope_value: "Laroo".into(),
            period: "2026".into(),
        };
        assert!(entry.matches_scope(&Scope::new(Level::SubCounty, "Laroo")));
    }
}
