use serde::{Deserialize, Serialize};

/// Width of one synthetic segment slot, in arbitrary units
pub const SEGMENT_SLOT: u64 = 5;

/// Speaker assigned to chunks that carry no `Label:` prefix
pub const FALLBACK_SPEAKER: &str = "Speaker 1";

/// One speaker turn extracted from a raw transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Speaker label as written in the transcript (e.g. "Speaker 2")
    pub speaker: String,
    /// Verbatim turn text, may contain newlines
    pub text: String,
    /// Synthetic start offset (`index * SEGMENT_SLOT`), not wall-clock time
    #[serde(rename = "startOffset")]
    pub start_offset: u64,
    /// Synthetic end offset (`(index + 1) * SEGMENT_SLOT`)
    #[serde(rename = "endOffset")]
    pub end_offset: u64,
}

impl TranscriptSegment {
    /// Build the segment occupying slot `index`
    pub fn at(index: usize, speaker: impl Into<String>, text: impl Into<String>) -> Self {
        let index = index as u64;
        Self {
            speaker: speaker.into(),
            text: text.into(),
            start_offset: index * SEGMENT_SLOT,
            end_offset: (index + 1) * SEGMENT_SLOT,
        }
    }

    pub fn duration(&self) -> u64 {
        self.end_offset.saturating_sub(self.start_offset)
    }
}

/// Document handed to the analysis routine: `{"transcript": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptDocument {
    pub transcript: Vec<TranscriptSegment>,
}

impl TranscriptDocument {
    pub fn new(segments: &[TranscriptSegment]) -> Self {
        Self {
            transcript: segments.to_vec(),
        }
    }
}

/// Format segments as `Speaker: text` lines
pub fn render_lines(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| format!("{}: {}", s.speaker, s.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_offsets() {
        let seg = TranscriptSegment::at(3, "Speaker 2", "hello");
        assert_eq!(seg.start_offset, 15);
        assert_eq!(seg.end_offset, 20);
        assert_eq!(seg.duration(), SEGMENT_SLOT);
    }

    #[test]
    fn test_document_shape() {
        let segments = vec![TranscriptSegment::at(0, "Speaker 1", "Hi")];
        let value = serde_json::to_value(TranscriptDocument::new(&segments)).unwrap();

        assert_eq!(value["transcript"][0]["speaker"], "Speaker 1");
        assert_eq!(value["transcript"][0]["text"], "Hi");
        assert_eq!(value["transcript"][0]["startOffset"], 0);
        assert_eq!(value["transcript"][0]["endOffset"], 5);
    }

    #[test]
    fn test_render_lines() {
        let segments = vec![
            TranscriptSegment::at(0, "Speaker 1", "Hello"),
            TranscriptSegment::at(1, "Speaker 2", "Hi there"),
        ];
        assert_eq!(render_lines(&segments), "Speaker 1: Hello\nSpeaker 2: Hi there");
    }
}
