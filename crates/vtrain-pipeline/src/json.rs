//! Lenient extraction of JSON from model output.

use serde_json::{Map, Value};
use vtrain_models::clamp_score;

/// Remove a surrounding markdown code fence (```json ... ```), if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string ("json") on the opening fence line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };

    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse model output as a JSON object.
///
/// Only a surrounding code fence is tolerated; any other text around the
/// object makes the output invalid.
pub fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(strip_code_fences(text)) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Interpret a JSON value as a score: numbers or numeric strings, rounded
/// and clamped into range.
pub fn score_value(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    number
        .is_finite()
        .then(|| clamp_score(number.round() as i64))
}

/// Interpret a JSON value as a list of strings. Non-string items are
/// rendered as JSON; a bare non-empty string becomes a one-item list.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Interpret a JSON value as text; numbers and booleans are rendered.
pub fn text_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```  "), "{}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_object() {
        let map = parse_object("```json\n{\"score\": 5}\n```").unwrap();
        assert_eq!(map["score"], json!(5));

        assert!(parse_object("Here you go: {\"score\": 5} hope it helps").is_none());
        assert!(parse_object("[1, 2, 3]").is_none());
        assert!(parse_object("not json").is_none());
        assert!(parse_object("} {").is_none());
    }

    #[test]
    fn test_score_value() {
        assert_eq!(score_value(&json!(72.6)), Some(73));
        assert_eq!(score_value(&json!("88")), Some(88));
        assert_eq!(score_value(&json!(140)), Some(100));
        assert_eq!(score_value(&json!(-3)), Some(0));
        assert_eq!(score_value(&json!("high")), None);
        assert_eq!(score_value(&json!(null)), None);
    }

    #[test]
    fn test_string_list() {
        assert_eq!(string_list(Some(&json!(["a", 2]))), vec!["a", "2"]);
        assert_eq!(string_list(Some(&json!("solo"))), vec!["solo"]);
        assert!(string_list(Some(&json!(null))).is_empty());
        assert!(string_list(None).is_empty());
    }
}
