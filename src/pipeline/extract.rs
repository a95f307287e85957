//! Best-effort JSON recovery for model responses.
//!
//! Models are instructed to return a single JSON object, but the response
//! carries no structural guarantee. Recovery runs an ordered chain of
//! parse strategies over the fence-stripped text and stops at the first
//! that yields an object. The chain repairs common failure shapes only;
//! it is not a general JSON fixer.
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

type ParseStrategy = fn(&str, &str) -> Option<Map<String, Value>>;

/// Strategies in attempt order. Later entries only see input the earlier
/// ones rejected.
const PARSE_STRATEGIES: &[(&str, ParseStrategy)] = &[
    ("strict", parse_object),
    ("quote_repair", parse_quote_repaired),
    ("bare_array", parse_bare_array),
    ("comma_repair", parse_comma_repaired),
];

/// Recover a JSON object from raw model output. `expected_key` names the
/// list a bare-array response is wrapped under.
pub fn recover_json(text: &str, expected_key: &str) -> Option<Map<String, Value>> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return None;
    }
    for (name, strategy) in PARSE_STRATEGIES {
        if let Some(object) = strategy(&cleaned, expected_key) {
            tracing::debug!(strategy = name, "recovered model response");
            return Some(object);
        }
    }
    None
}

/// Remove a surrounding markdown code fence, language tag included.
fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let mut lines: Vec<&str> = trimmed.lines().collect();
    if let Some(first) = lines.first() {
        if first.trim_start().starts_with("```") {
            lines.remove(0);
        }
    }
    if let Some(last) = lines.last() {
        if last.trim_start().starts_with("```") {
            lines.pop();
        }
    }
    lines.join("\n").trim().to_string()
}

fn as_object(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn parse_object(text: &str, _expected_key: &str) -> Option<Map<String, Value>> {
    serde_json::from_str(text).ok().and_then(as_object)
}

/// Models occasionally emit Python-style single-quoted JSON.
fn parse_quote_repaired(text: &str, _expected_key: &str) -> Option<Map<String, Value>> {
    if !text.contains('\'') {
        return None;
    }
    serde_json::from_str(&text.replace('\'', "\"")).ok().and_then(as_object)
}

/// A bare array response is wrapped under the expected key.
fn parse_bare_array(text: &str, expected_key: &str) -> Option<Map<String, Value>> {
    if !(text.starts_with('[') && text.ends_with(']')) {
        return None;
    }
    let value: Value = serde_json::from_str(text).ok()?;
    if !value.is_array() {
        return None;
    }
    let mut object = Map::new();
    object.insert(expected_key.to_string(), value);
    Some(object)
}

fn trailing_comma_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("trailing comma regex"))
}

/// Trailing commas before a closing brace or bracket.
fn parse_comma_repaired(text: &str, _expected_key: &str) -> Option<Map<String, Value>> {
    let repaired = trailing_comma_regex().replace_all(text, "$1");
    serde_json::from_str(repaired.as_ref()).ok().and_then(as_object)
}
