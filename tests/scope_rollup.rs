use chrono::NaiveDate;
use uuid::Uuid;

use literacy_fidelity_engine::models::{
    ActivityModule, Band, CostCategory, CostEntry, Level, Payload,
};
use literacy_fidelity_engine::{report, Engine, EngineConfig, RawRecord, ReportPeriod, Scope, Snapshot};

fn record(module: ActivityModule, school: &str, mut payload: serde_json::Value) -> RawRecord {
    payload["sub_county"] = serde_json::Value::String("Bardege".to_string());
    RawRecord {
        id: Uuid::new_v4(),
        module,
        school_id: school.to_string(),
        district: "Gulu".to_string(),
        date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
        status: "completed".to_string(),
        payload: serde_json::from_value::<Payload>(payload).unwrap(),
    }
}

fn scorecard(school: &str, dims: [f64; 5]) -> RawRecord {
    record(
        ActivityModule::Assessment,
        school,
        serde_json::json!({
            "school_name": school,
            "instruction": dims[0],
            "outcomes": dims[1],
            "leadership": dims[2],
            "community": dims[3],
            "environment": dims[4],
        }),
    )
}

fn snapshot() -> Snapshot {
    Snapshot {
        records: vec![
            scorecard("Awach", [8.0, 8.0, 8.0, 8.0, 8.0]),
            scorecard("Bobi", [6.0, 7.0, 6.0, 5.0, 6.0]),
            scorecard("Coorom", [9.0, 9.0, 9.0, 9.0, 9.0]),
            record(
                ActivityModule::Assessment,
                "Awach",
                serde_json::json!({"assessment_stage": "baseline", "learner_name": "jane doe", "letter_identification": 12}),
            ),
            record(
                ActivityModule::Assessment,
                "Awach",
                serde_json::json!({"assessment_stage": "baseline", "learner_name": "Jane   Doe", "letter_identification": 14}),
            ),
            record(ActivityModule::Visit, "Bobi", serde_json::json!({})),
        ],
        costs: vec![CostEntry {
            category: CostCategory::Materials,
            amount: 5000.0,
            scope_type: "sub-county".to_string(),
            scope_value: "Bardege".to_string(),
            period: "2026".to_string(),
        }],
    }
}

#[tokio::test]
async fn sub_county_rollup_end_to_end() {
    let engine = Engine::new(EngineConfig::default());
    let scope = Scope::new(Level::SubCounty, "Bardege");
    let result = engine
        .analyze(&scope, &ReportPeriod::default(), &snapshot())
        .await
        .unwrap();

    let sub_county = result.tree.find(Level::SubCounty, "Bardege").unwrap();
    let expected = [7.67, 8.0, 7.67, 7.33, 7.67];
    for (actual, expected) in sub_county.scores.dimensions().iter().zip(expected) {
        assert!((actual - expected).abs() < 0.01);
    }
    assert_eq!(sub_county.school_count, 3);
    assert_eq!(result.tree.school_count, 3);

    assert!(result.weaning_eligible_schools.contains(&"Awach".to_string()));
    assert!(result.weaning_eligible_schools.contains(&"Coorom".to_string()));
    assert!(!result.weaning_eligible_schools.contains(&"Bobi".to_string()));

    assert_eq!(result.quality.duplicate_learners_detected, 1);
    assert_eq!(result.quality.schools_missing_endline, 3);
    assert_eq!(result.gains.school_improvement_index, None);

    assert_eq!(result.cost.total_cost, 5000.0);
    assert_eq!(result.cost.cost_per_teacher, None);
    assert!((result.cost.cost_per_school.unwrap() - 5000.0 / 3.0).abs() < 1e-9);

    assert_eq!(result.fidelity.scope.sample_size, 3);
    assert_eq!(result.fidelity.children.len(), 3);
    assert_ne!(result.fidelity.scope.band, Band::Strong);

    let markdown = report::build_report(&result);
    assert!(markdown.contains("Cost per teacher trained: Data not available"));
    assert!(markdown.contains("Improvement index: insufficient data"));
}

#[tokio::test]
async fn unknown_district_scope_still_succeeds() {
    let engine = Engine::new(EngineConfig::default());
    let result = engine
        .analyze(
            &Scope::new(Level::District, "Atlantis"),
            &ReportPeriod::default(),
            &snapshot(),
        )
        .await
        .unwrap();

    assert_eq!(result.record_count, 0);
    assert!(!result.tree.has_data());
    assert_eq!(result.fidelity.scope.total_score, 0.0);
    assert_eq!(result.fidelity.scope.band, Band::HighPriority);
    assert_eq!(result.cost.cost_per_school, None);
    assert_eq!(result.quality.completeness_score, 0.0);
}
