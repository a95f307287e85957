//! End-to-end pipeline scenarios against in-memory collaborators.

mod common;

use common::{harness, unlocated_options, HarnessOptions};
use field_guardian::pipeline::run_consultation;
use serde_json::json;

#[test]
fn happy_path_uses_one_model_call_per_step() {
    let harness = harness(HarnessOptions {
        llm: vec![
            Ok(r#"{"problems": ["Nitrogen is running low"]}"#.to_string()),
            Ok(r#"{"solutions": ["Apply compost before transplanting"]}"#.to_string()),
        ],
        ..HarnessOptions::default()
    });

    let outcome = run_consultation(&harness.services, "F1", "A1");

    assert_eq!(outcome.problems, vec!["Nitrogen is running low"]);
    assert_eq!(
        outcome.solutions,
        vec!["Apply compost before transplanting"]
    );
    assert_eq!(harness.llm_calls.get(), 2);
    assert_eq!(harness.satellite_calls.get(), 1);
    assert_eq!(harness.carbon_calls.get(), 1);
    assert_eq!(harness.flood_calls.get(), 1);

    let records = harness.records.borrow();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].problems, outcome.problems);
    assert_eq!(records[0].carbon_data, Some(json!({"ndvi": 0.35})));
}

#[test]
fn fenced_model_output_still_counts_as_first_try() {
    let harness = harness(HarnessOptions {
        llm: vec![
            Ok("```json\n{\"problems\": [\"p\"]}\n```".to_string()),
            Ok("```json\n{\"solutions\": [\"s\"]}\n```".to_string()),
        ],
        ..HarnessOptions::default()
    });

    let outcome = run_consultation(&harness.services, "F1", "A1");

    assert_eq!(outcome.problems, vec!["p"]);
    assert_eq!(outcome.solutions, vec!["s"]);
    assert_eq!(harness.llm_calls.get(), 2);
}

#[test]
fn invalid_model_output_retries_once_then_falls_back() {
    // Four invalid responses: two per reasoning step.
    let harness = harness(HarnessOptions {
        llm: vec![
            Ok("I think the field looks dry.".to_string()),
            Ok("{broken".to_string()),
            Ok("Some prose about solutions.".to_string()),
            Ok("also not json".to_string()),
        ],
        iot: json!({
            "has_data": true,
            "latest": {"soilMoisture": 15, "soilTemp": 31},
            "recent": [],
        }),
        ..HarnessOptions::default()
    });

    let outcome = run_consultation(&harness.services, "F1", "A1");

    assert_eq!(harness.llm_calls.get(), 4);
    assert_eq!(
        outcome.problems,
        vec!["Soil moisture is low (15). Irrigation needed."]
    );
    assert!(outcome.solutions.is_empty());
}

#[test]
fn model_transport_failures_behave_like_invalid_output() {
    let harness = harness(HarnessOptions::default());

    let outcome = run_consultation(&harness.services, "F1", "A1");

    // Empty script: every call errors, both steps fall back.
    assert_eq!(harness.llm_calls.get(), 4);
    assert_eq!(
        outcome.problems,
        vec!["No specific issues detected, but monitoring recommended.".to_string()]
    );
    assert!(outcome.solutions.is_empty());
    assert_eq!(harness.records.borrow().len(), 1);
}

#[test]
fn high_flood_risk_surfaces_through_the_fallback_rules() {
    let harness = harness(HarnessOptions {
        flood: json!({"flood_risk": "high", "predicted_rainfall_mm": 320.0}),
        ..HarnessOptions::default()
    });

    let outcome = run_consultation(&harness.services, "F1", "A1");

    assert!(outcome
        .problems
        .iter()
        .any(|problem| problem == "High flood risk detected."));
}

#[test]
fn directory_miss_still_reaches_persistence() {
    let harness = harness(unlocated_options());

    let outcome = run_consultation(&harness.services, "F1", "A1");

    // Location never resolves, so no location-dependent service is called.
    assert_eq!(harness.satellite_calls.get(), 0);
    assert_eq!(harness.carbon_calls.get(), 0);
    assert_eq!(harness.flood_calls.get(), 0);

    // The run still answers and persists.
    assert_eq!(
        outcome.problems,
        vec!["No specific issues detected, but monitoring recommended.".to_string()]
    );
    assert!(outcome.solutions.is_empty());

    let records = harness.records.borrow();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].carbon_data, None);
}

#[test]
fn store_failure_does_not_affect_the_returned_consultation() {
    let harness = harness(HarnessOptions {
        llm: vec![
            Ok(r#"{"problems": ["p"]}"#.to_string()),
            Ok(r#"{"solutions": ["s"]}"#.to_string()),
        ],
        store_fails: true,
        ..HarnessOptions::default()
    });

    let outcome = run_consultation(&harness.services, "F1", "A1");

    assert_eq!(outcome.problems, vec!["p"]);
    assert_eq!(outcome.solutions, vec!["s"]);
    assert!(harness.records.borrow().is_empty());
}

#[test]
fn outcome_always_has_exactly_problems_and_solutions() {
    let harness = harness(unlocated_options());
    let outcome = run_consultation(&harness.services, "F1", "A1");

    let value = serde_json::to_value(&outcome).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert!(object["problems"].is_array());
    assert!(object["solutions"].is_array());
}

#[test]
fn bare_array_model_response_is_recovered() {
    let harness = harness(HarnessOptions {
        llm: vec![
            Ok(r#"["x", "y"]"#.to_string()),
            Ok(r#"["do x"]"#.to_string()),
        ],
        ..HarnessOptions::default()
    });

    let outcome = run_consultation(&harness.services, "F1", "A1");

    assert_eq!(outcome.problems, vec!["x", "y"]);
    assert_eq!(outcome.solutions, vec!["do x"]);
    assert_eq!(harness.llm_calls.get(), 2);
}
