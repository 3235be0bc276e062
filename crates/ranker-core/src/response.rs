//! Scorer reply parsing.
//!
//! The scorer is a free-text producer; it is asked for one JSON object but
//! may wrap it in fences, surround it with prose, or drop the final brace.
//! Recovery is a fixed pipeline:
//!
//! 1. Trim surrounding whitespace
//! 2. Strip a leading fence line and a single trailing fence
//! 3. Slice from the first `{` to the last `}`
//! 4. Parse the slice
//! 5. On failure, apply each [`Repair`] once, in order, and re-parse
//! 6. Otherwise fail with the decoder position and a short preview
//!
//! Nothing is ever fabricated: if no object can be salvaged the caller gets
//! a [`ParseError`].

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// Maximum characters of the offending snippet kept in errors.
pub const PREVIEW_CHARS: usize = 200;

const FENCE: &str = "```";

lazy_static! {
    /// Line breaks flattened in previews
    static ref LINE_BREAK: Regex = Regex::new(r"\r?\n").unwrap();
}

/// Errors from reply parsing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("No JSON object found in LLM response")]
    NoObject,

    #[error("Failed to parse JSON snippet: {message} (line {line}, column {column}). Snippet preview: {preview}")]
    Malformed {
        message: String,
        line: usize,
        column: usize,
        preview: String,
    },
}

/// A bounded, deterministic fix applied to a snippet that failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repair {
    /// The model stopped before the outermost closing brace.
    AppendClosingBrace,
}

impl Repair {
    /// Every repair, in the order they are attempted.
    pub const ALL: [Repair; 1] = [Repair::AppendClosingBrace];

    fn apply(self, snippet: &str) -> String {
        match self {
            Repair::AppendClosingBrace => format!("{}}}", snippet),
        }
    }
}

/// Parse one JSON object out of a raw scorer reply.
pub fn parse_reply(raw: &str) -> Result<Map<String, Value>, ParseError> {
    let text = strip_fences(raw.trim());
    let snippet = locate_object(text).ok_or(ParseError::NoObject)?;

    let first_error = match parse_object(snippet) {
        Ok(object) => return Ok(object),
        Err(e) => e,
    };

    for repair in Repair::ALL {
        if let Ok(object) = parse_object(&repair.apply(snippet)) {
            tracing::debug!(repair = ?repair, "Recovered reply after repair");
            return Ok(object);
        }
    }

    Err(ParseError::Malformed {
        message: first_error.message,
        line: first_error.line,
        column: first_error.column,
        preview: preview(snippet),
    })
}

/// Remove a leading fence line (e.g. "```json") and a single trailing fence.
fn strip_fences(text: &str) -> &str {
    let mut text = text;
    if text.starts_with(FENCE) {
        if let Some(newline) = text.find('\n') {
            text = &text[newline + 1..];
        }
    }
    if let Some(stripped) = text.strip_suffix(FENCE) {
        text = stripped.trim();
    }
    text
}

/// Slice from the first `{` to the last `}` inclusive.
fn locate_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

struct DecodeFailure {
    message: String,
    line: usize,
    column: usize,
}

fn parse_object(snippet: &str) -> Result<Map<String, Value>, DecodeFailure> {
    match serde_json::from_str::<Value>(snippet) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(DecodeFailure {
            message: format!("expected a JSON object, found {}", json_type(&other)),
            line: 1,
            column: 1,
        }),
        Err(e) => Err(DecodeFailure {
            message: e.to_string(),
            line: e.line(),
            column: e.column(),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn preview(snippet: &str) -> String {
    let head: String = snippet.chars().take(PREVIEW_CHARS).collect();
    LINE_BREAK.replace_all(&head, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const OBJECT: &str = r#"{"score": 0.75, "passed_required": true, "reasons": ["python 4y"]}"#;

    fn expected() -> Map<String, Value> {
        match serde_json::from_str(OBJECT).unwrap() {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_plain_object() {
        assert_eq!(parse_reply(OBJECT).unwrap(), expected());
    }

    #[test]
    fn test_fenced_object_matches_unfenced() {
        let fenced = format!("```json\n{}\n```", OBJECT);
        assert_eq!(parse_reply(&fenced).unwrap(), expected());

        let bare_fence = format!("```\n{}\n```\n\n", OBJECT);
        assert_eq!(parse_reply(&bare_fence).unwrap(), expected());
    }

    #[test]
    fn test_surrounding_prose_is_ignored() {
        let noisy = format!("Sure! Here is the evaluation:\n{}\nLet me know if you need more.", OBJECT);
        assert_eq!(parse_reply(&noisy).unwrap(), expected());
    }

    #[test]
    fn test_missing_final_brace_is_repaired() {
        let truncated = r#"{"score": 0.6, "breakdown": {"experience": 0.5}"#;
        let parsed = parse_reply(truncated).unwrap();
        assert_eq!(parsed["score"], json!(0.6));
        assert_eq!(parsed["breakdown"], json!({ "experience": 0.5 }));
    }

    #[test]
    fn test_no_braces_fails() {
        assert_eq!(parse_reply("I cannot score this candidate."), Err(ParseError::NoObject));
        assert_eq!(parse_reply(""), Err(ParseError::NoObject));
    }

    #[test]
    fn test_closing_before_opening_fails() {
        assert_eq!(parse_reply("} nothing here {"), Err(ParseError::NoObject));
    }

    #[test]
    fn test_unrepairable_reports_position_and_preview() {
        let broken = "{\n  \"score\": 0.5,\n  \"reasons\": [oops]\n}";
        match parse_reply(broken) {
            Err(ParseError::Malformed { line, column, preview, .. }) => {
                assert_eq!(line, 3);
                assert!(column > 0);
                assert!(!preview.contains('\n'));
                assert!(preview.starts_with("{ "));
            }
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_preview_is_bounded() {
        let long = format!("{{\"explanation\": \"{}\", bad}}", "x".repeat(500));
        match parse_reply(&long) {
            Err(ParseError::Malformed { preview, .. }) => {
                assert_eq!(preview.chars().count(), PREVIEW_CHARS);
            }
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_error_message_is_descriptive() {
        let err = parse_reply("{ not json }").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Failed to parse JSON snippet"));
        assert!(message.contains("line 1"));
        assert!(message.contains("Snippet preview: { not json }"));
    }

    #[test]
    fn test_repairs_are_bounded() {
        // Two braces missing: a single repair is not enough
        let truncated = r#"{"score": 0.6, "breakdown": {"experience": {"years": 2}"#;
        assert!(matches!(parse_reply(truncated), Err(ParseError::Malformed { .. })));
    }
}
