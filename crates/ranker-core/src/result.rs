//! Canonical result records.
//!
//! [`canonicalize`] is total: whatever shape the scorer's object has, the
//! caller gets a fully populated [`CanonicalResult`]. Fields of the wrong
//! type degrade to their defaults instead of failing the candidate.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix of the single reason carried by a hard failure.
pub const FAILURE_REASON_PREFIX: &str = "LLM error: ";

/// The uniform per-candidate output record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalResult {
    pub id: String,
    pub name: String,

    /// Score as returned by the scorer, unclamped
    pub llm_score: Option<f64>,

    /// `llm_score * 10`
    pub score_10: Option<f64>,

    pub breakdown: Map<String, Value>,
    pub passed_required: bool,
    pub reasons: Vec<String>,

    /// Unparsed scorer reply; `None` only for hard failures
    pub raw_output: Option<String>,

    pub explanation: Option<String>,
}

impl CanonicalResult {
    /// Record for a candidate whose invocation or parsing failed.
    pub fn failed(id: impl Into<String>, name: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            llm_score: None,
            score_10: None,
            breakdown: Map::new(),
            passed_required: false,
            reasons: vec![format!("{}{}", FAILURE_REASON_PREFIX, error)],
            raw_output: None,
            explanation: None,
        }
    }

    /// Whether this record came from [`CanonicalResult::failed`].
    pub fn is_failure(&self) -> bool {
        self.raw_output.is_none()
    }

    /// The failure message without its prefix, for hard failures.
    pub fn failure_message(&self) -> Option<&str> {
        if !self.is_failure() {
            return None;
        }
        self.reasons
            .first()
            .map(|reason| reason.strip_prefix(FAILURE_REASON_PREFIX).unwrap_or(reason))
    }

    /// Name for display: name, then id, then "Unknown".
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else if !self.id.is_empty() {
            &self.id
        } else {
            "Unknown"
        }
    }
}

/// Map a parsed reply to a [`CanonicalResult`]. Never fails.
pub fn canonicalize(
    parsed: &Map<String, Value>,
    id: &str,
    name: &str,
    raw: &str,
) -> CanonicalResult {
    let llm_score = match parsed.get("score") {
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    };

    let breakdown = match parsed.get("breakdown") {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };

    CanonicalResult {
        id: id.to_string(),
        name: name.to_string(),
        llm_score,
        score_10: llm_score.map(|score| score * 10.0),
        breakdown,
        passed_required: coerce_flag(parsed.get("passed_required")),
        reasons: coerce_reasons(parsed.get("reasons")),
        raw_output: Some(raw.to_string()),
        explanation: coerce_explanation(parsed.get("explanation")),
    }
}

fn coerce_flag(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => {
            matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "y" | "1")
        }
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

fn coerce_reasons(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(text_of).collect(),
        Some(other) => vec![text_of(other)],
    }
}

fn coerce_explanation(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(other) => Some(text_of(other)),
    }
}

/// Strings verbatim, everything else as compact JSON.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn canon(value: Value) -> CanonicalResult {
        canonicalize(&object(value), "resumes/a.pdf", "a.pdf", "raw")
    }

    #[test]
    fn test_full_reply() {
        let result = canon(json!({
            "score": 0.82,
            "breakdown": { "experience": 0.9, "education": 0.6 },
            "passed_required": true,
            "reasons": ["python 4y", "aws 3y"],
            "explanation": "Strong match"
        }));

        assert_eq!(result.llm_score, Some(0.82));
        assert!((result.score_10.unwrap() - 8.2).abs() < 1e-9);
        assert_eq!(result.breakdown["experience"], json!(0.9));
        assert!(result.passed_required);
        assert_eq!(result.reasons, vec!["python 4y", "aws 3y"]);
        assert_eq!(result.raw_output.as_deref(), Some("raw"));
        assert_eq!(result.explanation.as_deref(), Some("Strong match"));
        assert!(!result.is_failure());
    }

    #[test]
    fn test_empty_object_defaults() {
        let result = canon(json!({}));
        assert_eq!(result.llm_score, None);
        assert_eq!(result.score_10, None);
        assert!(result.breakdown.is_empty());
        assert!(!result.passed_required);
        assert!(result.reasons.is_empty());
        assert_eq!(result.explanation, None);
        assert!(result.raw_output.is_some());
    }

    #[test]
    fn test_score_must_be_numeric() {
        assert_eq!(canon(json!({ "score": "0.8" })).llm_score, None);
        assert_eq!(canon(json!({ "score": true })).llm_score, None);
        assert_eq!(canon(json!({ "score": 7 })).llm_score, Some(7.0));
    }

    #[test]
    fn test_score_is_not_clamped() {
        let result = canon(json!({ "score": 1.5 }));
        assert_eq!(result.llm_score, Some(1.5));
        assert_eq!(result.score_10, Some(15.0));

        let result = canon(json!({ "score": -0.25 }));
        assert_eq!(result.score_10, Some(-2.5));
    }

    #[test]
    fn test_breakdown_must_be_object() {
        assert!(canon(json!({ "breakdown": [0.1, 0.2] })).breakdown.is_empty());
        assert!(canon(json!({ "breakdown": "high" })).breakdown.is_empty());
    }

    #[test]
    fn test_passed_required_coercion() {
        let cases = [
            (json!(true), true),
            (json!(false), false),
            (json!(1), true),
            (json!(0), false),
            (json!(0.0), false),
            (json!("Yes"), true),
            (json!("y"), true),
            (json!("TRUE"), true),
            (json!("1"), true),
            (json!("no"), false),
            (json!("passed"), false),
            (json!([]), false),
            (json!(["python"]), true),
            (json!({}), false),
            (json!({ "python": true }), true),
            (Value::Null, false),
        ];
        for (value, expected) in cases {
            let result = canon(json!({ "passed_required": value.clone() }));
            assert_eq!(result.passed_required, expected, "for {}", value);
        }
    }

    #[test]
    fn test_reasons_coercion() {
        assert_eq!(canon(json!({ "reasons": "single" })).reasons, vec!["single"]);
        assert_eq!(canon(json!({ "reasons": 3 })).reasons, vec!["3"]);
        assert_eq!(
            canon(json!({ "reasons": ["a", 2, { "k": "v" }] })).reasons,
            vec!["a", "2", r#"{"k":"v"}"#]
        );
        assert!(canon(json!({ "reasons": null })).reasons.is_empty());
    }

    #[test]
    fn test_explanation_coercion() {
        assert_eq!(canon(json!({ "explanation": null })).explanation, None);
        assert_eq!(
            canon(json!({ "explanation": ["a", "b"] })).explanation.as_deref(),
            Some(r#"["a","b"]"#)
        );
    }

    #[test]
    fn test_failed_record() {
        let result = CanonicalResult::failed("resumes/b.pdf", "b.pdf", "Request timed out");
        assert!(result.is_failure());
        assert_eq!(result.reasons, vec!["LLM error: Request timed out"]);
        assert_eq!(result.failure_message(), Some("Request timed out"));
        assert_eq!(result.llm_score, None);
        assert!(!result.passed_required);
    }

    #[test]
    fn test_failure_message_absent_for_scored() {
        assert_eq!(canon(json!({ "score": 0.5 })).failure_message(), None);
    }

    #[test]
    fn test_serializes_with_exact_keys() {
        let value = serde_json::to_value(CanonicalResult::failed("x", "y", "boom")).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "id",
                "name",
                "llm_score",
                "score_10",
                "breakdown",
                "passed_required",
                "reasons",
                "raw_output",
                "explanation"
            ]
        );
        assert_eq!(value["raw_output"], Value::Null);
    }
}
