use std::path::Path;

use anyhow::{Context, Result};

use crate::models::{RawAnalysisReport, TranscriptSegment};
use crate::stages::segment_transcript;

/// Read a stored transcript file and segment it
pub fn read_transcript_file(path: &Path) -> Result<Vec<TranscriptSegment>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    Ok(segment_transcript(&content))
}

/// Read a saved raw analysis report
pub fn read_report_file(path: &Path) -> Result<RawAnalysisReport> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    parse_report_json(&content)
}

/// Parse a raw analysis report from a JSON string
pub fn parse_report_json(json: &str) -> Result<RawAnalysisReport> {
    let value: serde_json::Value =
        serde_json::from_str(json).context("Failed to parse analysis report JSON")?;
    Ok(RawAnalysisReport::new(value))
}
