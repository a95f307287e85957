//! Shared reasoning-step algorithm for the two model-backed steps.
//!
//! Both steps follow the same contract: one strict attempt, one terse
//! retry, then the caller's fallback. A model-call failure is handled
//! exactly like a malformed response; a reasoning step never errors.
use super::extract::recover_json;
use crate::providers::LanguageModel;
use serde_json::Value;

/// Parameterization of one reasoning step.
pub struct ReasoningStep {
    pub name: &'static str,
    pub system_prompt: &'static str,
    pub retry_prompt: &'static str,
    pub expected_key: &'static str,
}

pub const DETECT_PROBLEMS: ReasoningStep = ReasoningStep {
    name: "detect_problems",
    system_prompt: include_str!("../../prompts/detect_problems.md"),
    retry_prompt: include_str!("../../prompts/detect_problems_retry.md"),
    expected_key: "problems",
};

pub const PLAN_SOLUTIONS: ReasoningStep = ReasoningStep {
    name: "plan_solutions",
    system_prompt: include_str!("../../prompts/plan_solutions.md"),
    retry_prompt: include_str!("../../prompts/plan_solutions_retry.md"),
    expected_key: "solutions",
};

/// Invoke the model for one step, validating and repairing its output.
///
/// Returns `None` when both attempts fail; the caller applies the
/// step-specific fallback.
pub fn run_reasoning(
    llm: &dyn LanguageModel,
    step: &ReasoningStep,
    payload: &Value,
) -> Option<Vec<String>> {
    let payload_text = payload.to_string();
    let prompts = [step.system_prompt, step.retry_prompt];

    for (attempt, prompt) in prompts.iter().enumerate() {
        let response = match llm.complete(prompt, &payload_text) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(
                    step = step.name,
                    attempt,
                    error = %format!("{err:#}"),
                    "model call failed"
                );
                continue;
            }
        };

        if let Some(items) = validate_response(&response, step.expected_key) {
            if attempt > 0 {
                tracing::info!(step = step.name, "model retry succeeded");
            }
            return Some(items);
        }
        tracing::warn!(
            step = step.name,
            attempt,
            response_bytes = response.len(),
            "model response failed validation"
        );
    }
    None
}

/// A response validates when it recovers to an object whose expected key
/// holds a list; every element is coerced to a string.
fn validate_response(response: &str, expected_key: &str) -> Option<Vec<String>> {
    let object = recover_json(response, expected_key)?;
    let items = object.get(expected_key)?.as_array()?;
    Some(coerce_strings(items))
}

fn coerce_strings(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .map(|item| match item {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;
    use std::cell::RefCell;

    /// Scripted model: pops one canned result per invocation.
    struct ScriptedModel {
        responses: RefCell<Vec<anyhow::Result<String>>>,
        calls: RefCell<u32>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<anyhow::Result<String>>) -> Self {
            Self {
                responses: RefCell::new(responses),
                calls: RefCell::new(0),
            }
        }

        fn call_count(&self) -> u32 {
            *self.calls.borrow()
        }
    }

    impl LanguageModel for ScriptedModel {
        fn complete(&self, _system: &str, _payload: &str) -> anyhow::Result<String> {
            *self.calls.borrow_mut() += 1;
            let mut responses = self.responses.borrow_mut();
            if responses.is_empty() {
                return Err(anyhow!("script exhausted"));
            }
            responses.remove(0)
        }
    }

    #[test]
    fn valid_first_response_skips_the_retry() {
        let model = ScriptedModel::new(vec![Ok(r#"{"problems": ["a", "b"]}"#.to_string())]);
        let items = run_reasoning(&model, &DETECT_PROBLEMS, &json!({})).unwrap();
        assert_eq!(items, vec!["a", "b"]);
        assert_eq!(model.call_count(), 1);
    }

    #[test]
    fn invalid_first_response_consumes_exactly_one_retry() {
        let model = ScriptedModel::new(vec![
            Ok("sorry, here you go: nothing".to_string()),
            Ok(r#"{"problems": ["late"]}"#.to_string()),
        ]);
        let items = run_reasoning(&model, &DETECT_PROBLEMS, &json!({})).unwrap();
        assert_eq!(items, vec!["late"]);
        assert_eq!(model.call_count(), 2);
    }

    #[test]
    fn two_invalid_responses_signal_fallback() {
        let model = ScriptedModel::new(vec![
            Ok("not json".to_string()),
            Ok("still not json".to_string()),
        ]);
        assert!(run_reasoning(&model, &DETECT_PROBLEMS, &json!({})).is_none());
        assert_eq!(model.call_count(), 2);
    }

    #[test]
    fn model_errors_are_treated_as_validation_failures() {
        let model = ScriptedModel::new(vec![
            Err(anyhow!("connection refused")),
            Ok(r#"{"solutions": ["mulch"]}"#.to_string()),
        ]);
        let items = run_reasoning(&model, &PLAN_SOLUTIONS, &json!({})).unwrap();
        assert_eq!(items, vec!["mulch"]);
        assert_eq!(model.call_count(), 2);
    }

    #[test]
    fn expected_key_must_hold_a_list() {
        let model = ScriptedModel::new(vec![
            Ok(r#"{"problems": "just one"}"#.to_string()),
            Ok(r#"{"answers": ["wrong key"]}"#.to_string()),
        ]);
        assert!(run_reasoning(&model, &DETECT_PROBLEMS, &json!({})).is_none());
    }

    #[test]
    fn non_string_list_elements_are_coerced() {
        let model =
            ScriptedModel::new(vec![Ok(r#"{"problems": ["a", 3, true]}"#.to_string())]);
        let items = run_reasoning(&model, &DETECT_PROBLEMS, &json!({})).unwrap();
        assert_eq!(items, vec!["a", "3", "true"]);
    }
}
