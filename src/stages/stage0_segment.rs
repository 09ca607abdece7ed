use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::models::{FALLBACK_SPEAKER, TranscriptSegment};

/// Delimiter between consecutive speaker turns
pub const TURN_DELIMITER: &str = "\n\n";

/// `Label: remainder`, remainder captured verbatim across newlines
static SPEAKER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A([^:\n]+):(?: (.*))?\z").expect("speaker prefix pattern is valid")
});

/// Execute Stage 0: split a stored transcript into ordered speaker turns
///
/// Stored transcripts are either plain text (turns separated by a blank
/// line, each starting with `Label: `) or an already structured JSON
/// document. Malformed chunks are attributed to the fallback speaker rather
/// than dropped. Empty input yields no segments.
pub fn segment_transcript(raw: &str) -> Vec<TranscriptSegment> {
    if let Some(segments) = segment_structured(raw) {
        debug!("Segmented structured transcript into {} turns", segments.len());
        return segments;
    }

    let segments: Vec<TranscriptSegment> = normalize_newlines(raw)
        .split(TURN_DELIMITER)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .enumerate()
        .map(|(index, chunk)| {
            let (speaker, text) = split_speaker(chunk);
            TranscriptSegment::at(index, speaker, text)
        })
        .collect();

    debug!("Segmented text transcript into {} turns", segments.len());
    segments
}

/// Speaker label and text of one chunk, falling back to the default speaker
fn split_speaker(chunk: &str) -> (&str, &str) {
    if let Some(captures) = SPEAKER_PREFIX.captures(chunk) {
        let label = captures.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        if !label.is_empty() {
            let text = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
            return (label, text);
        }
    }
    (FALLBACK_SPEAKER, chunk)
}

fn normalize_newlines(raw: &str) -> String {
    raw.replace("\r\n", "\n")
}

/// Segments from `{"transcript": [...]}` or a bare `[{speaker, text}]` array
fn segment_structured(raw: &str) -> Option<Vec<TranscriptSegment>> {
    let trimmed = raw.trim_start();
    if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
        return None;
    }

    let value: Value = serde_json::from_str(raw).ok()?;
    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => map.get("transcript")?.as_array()?,
        _ => return None,
    };

    let segments = items
        .iter()
        .filter_map(|item| {
            let text = item.get("text")?.as_str()?.trim();
            if text.is_empty() {
                return None;
            }
            let speaker = item
                .get("speaker")
                .and_then(speaker_label)
                .unwrap_or_else(|| FALLBACK_SPEAKER.to_string());
            Some((speaker, text.to_string()))
        })
        .enumerate()
        .map(|(index, (speaker, text))| TranscriptSegment::at(index, speaker, text))
        .collect();

    Some(segments)
}

fn speaker_label(value: &Value) -> Option<String> {
    match value {
        Value::String(label) if !label.trim().is_empty() => Some(label.trim().to_string()),
        Value::Number(n) => Some(format!("Speaker {}", n)),
        _ => None,
    }
}
