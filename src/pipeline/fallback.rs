//! Deterministic problem generation when the model cannot be validated.
//!
//! Detected problems must never silently vanish, so the problem-detection
//! step falls back to these rules. Each rule reports an explicit outcome;
//! a rule whose input is missing contributes nothing but does not stop the
//! others.
use crate::state::ConsultationState;
use serde_json::Value;

/// Outcome of evaluating one fallback rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The rule fired and produced a problem message.
    Matched(String),
    /// Inputs were present but the condition did not hold.
    NotApplicable,
    /// The data the rule needs was never collected.
    InputMissing,
}

type Rule = fn(&ConsultationState) -> RuleOutcome;

const RULES: &[(&str, Rule)] = &[
    ("soil_moisture", soil_moisture_rule),
    ("nitrogen", nitrogen_rule),
    ("salinity", salinity_rule),
    ("flood", flood_rule),
];

const GENERIC_MESSAGE: &str = "No specific issues detected, but monitoring recommended.";

/// Evaluate every rule independently; emit the generic message when none
/// matched.
pub fn fallback_problems(state: &ConsultationState) -> Vec<String> {
    let mut problems = Vec::new();
    for (name, rule) in RULES {
        match rule(state) {
            RuleOutcome::Matched(message) => {
                tracing::debug!(rule = name, "fallback rule matched");
                problems.push(message);
            }
            RuleOutcome::NotApplicable => {}
            RuleOutcome::InputMissing => {
                tracing::debug!(rule = name, "fallback rule input missing");
            }
        }
    }
    if problems.is_empty() {
        problems.push(GENERIC_MESSAGE.to_string());
    }
    problems
}

/// Latest soil-moisture reading below 20 (treated as a percentage).
fn soil_moisture_rule(state: &ConsultationState) -> RuleOutcome {
    let Some(moisture) = state
        .iot_data
        .as_ref()
        .and_then(|data| data.get("latest"))
        .and_then(|latest| latest.get("soilMoisture"))
        .and_then(Value::as_f64)
    else {
        return RuleOutcome::InputMissing;
    };
    if moisture < 20.0 {
        RuleOutcome::Matched(format!(
            "Soil moisture is low ({moisture}). Irrigation needed."
        ))
    } else {
        RuleOutcome::NotApplicable
    }
}

fn nitrogen_rule(state: &ConsultationState) -> RuleOutcome {
    let Some(status) = state
        .field_config
        .as_ref()
        .and_then(|config| config.latest_prediction.as_ref())
        .and_then(|prediction| prediction.nitrogen_status.as_deref())
    else {
        return RuleOutcome::InputMissing;
    };
    if status == "slightly deficient" {
        RuleOutcome::Matched(
            "Nitrogen deficiency detected from satellite prediction.".to_string(),
        )
    } else {
        RuleOutcome::NotApplicable
    }
}

fn salinity_rule(state: &ConsultationState) -> RuleOutcome {
    let Some(risk) = state
        .field_config
        .as_ref()
        .and_then(|config| config.latest_prediction.as_ref())
        .and_then(|prediction| prediction.salinity_risk.as_deref())
    else {
        return RuleOutcome::InputMissing;
    };
    if risk == "moderate" {
        RuleOutcome::Matched("Moderate salinity risk in the field.".to_string())
    } else {
        RuleOutcome::NotApplicable
    }
}

fn flood_rule(state: &ConsultationState) -> RuleOutcome {
    let Some(risk) = state
        .flood_risk
        .as_ref()
        .and_then(|flood| flood.get("flood_risk"))
        .and_then(Value::as_str)
    else {
        return RuleOutcome::InputMissing;
    };
    if risk == "high" {
        RuleOutcome::Matched("High flood risk detected.".to_string())
    } else {
        RuleOutcome::NotApplicable
    }
}
