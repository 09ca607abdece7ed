use serde_json::Value;

use crate::error::{InsightsError, Result};
use crate::models::RawAnalysisReport;

/// Longest output excerpt carried on a parse error
const EXCERPT_CHARS: usize = 200;

/// Parse the routine's stdout into a raw report.
///
/// The routine may print banners around its JSON, so when the whole output
/// does not parse, the outermost `{ ... }` span is tried before giving up.
pub fn parse_report_output(stdout: &str) -> Result<RawAnalysisReport> {
    let trimmed = stdout.trim();

    let whole_error = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => return Ok(RawAnalysisReport::new(value)),
        Err(e) => e,
    };

    if let Some(span) = outermost_object(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(span) {
            tracing::debug!(
                skipped = trimmed.len() - span.len(),
                "Recovered JSON object from surrounding output"
            );
            return Ok(RawAnalysisReport::new(value));
        }
    }

    Err(InsightsError::AnalysisOutputParse {
        detail: whole_error.to_string(),
        excerpt: excerpt(trimmed),
    })
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}
