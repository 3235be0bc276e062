//! Report rendering.
//!
//! Two renderings of the same ranked list:
//! - the persisted report ([`write_report`] / [`render_report`])
//! - the console summary ([`render_summary`]), which adds pass markers and
//!   the first reasons for each candidate

use std::fmt::Write as _;
use std::io;

use crate::result::CanonicalResult;

/// Width of the `=` rules.
pub const RULE_WIDTH: usize = 70;

/// Characters of a failure message kept in the persisted report.
pub const REPORT_ERROR_CHARS: usize = 100;

/// Reasons shown on the console `Details:` line.
pub const SUMMARY_REASONS: usize = 2;

/// Cut `message` to at most `max_chars` characters.
pub fn error_preview(message: &str, max_chars: usize) -> &str {
    match message.char_indices().nth(max_chars) {
        Some((index, _)) => &message[..index],
        None => message,
    }
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn score_line(result: &CanonicalResult) -> String {
    match result.score_10 {
        Some(score) => format!("   Score: {:.1}/10", score),
        None => "   Score: N/A".to_string(),
    }
}

fn explanation(result: &CanonicalResult) -> Option<&str> {
    result.explanation.as_deref().filter(|text| !text.is_empty())
}

/// Render the persisted report.
pub fn render_report(results: &[CanonicalResult]) -> String {
    let mut out = String::new();
    out.push_str("RESUME RANKING RESULTS\n");
    out.push_str(&rule());
    out.push_str("\n\n");

    for (index, result) in results.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", index + 1, result.display_name());
        let _ = writeln!(out, "{}", score_line(result));
        let _ = writeln!(
            out,
            "   Passed Required: {}",
            if result.passed_required { "Yes" } else { "No" }
        );
        if let Some(text) = explanation(result) {
            let _ = writeln!(out, "   {}", text);
        }
        if let Some(message) = result.failure_message() {
            let _ = writeln!(
                out,
                "   Status: FAILED - {}",
                error_preview(message, REPORT_ERROR_CHARS)
            );
        }
        out.push('\n');
    }
    out
}

/// Write the persisted report to `writer`.
pub fn write_report(results: &[CanonicalResult], mut writer: impl io::Write) -> io::Result<()> {
    writer.write_all(render_report(results).as_bytes())?;
    writer.flush()
}

/// Render the console summary.
pub fn render_summary(results: &[CanonicalResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", rule());
    out.push_str("RANKING RESULTS\n");
    let _ = writeln!(out, "{}\n", rule());

    for (index, result) in results.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", index + 1, result.display_name());
        let _ = writeln!(out, "{}", score_line(result));
        let _ = writeln!(
            out,
            "   Passed Required: {}",
            if result.passed_required { "✓ Yes" } else { "✗ No" }
        );
        if let Some(text) = explanation(result) {
            let _ = writeln!(out, "   {}", text);
        }
        if !result.reasons.is_empty() {
            let details: Vec<&str> = result
                .reasons
                .iter()
                .take(SUMMARY_REASONS)
                .map(String::as_str)
                .collect();
            let _ = writeln!(out, "   Details: {}", details.join(", "));
        }
        out.push('\n');
    }
    out
}
