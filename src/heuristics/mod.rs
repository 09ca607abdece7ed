pub mod bullets;
pub mod topics;

pub use bullets::*;
pub use topics::*;

use serde_json::Value;

/// Configuration for the value-level normalization rules
#[derive(Debug, Clone)]
pub struct HeuristicsConfig {
    /// Delimiter between entries of bullet-text lists
    pub bullet_delimiter: String,
    /// Vocabulary scanned for topics, in priority order
    pub topic_vocabulary: Vec<String>,
    /// Maximum number of topics reported
    pub max_topics: usize,
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            bullet_delimiter: "\n• ".to_string(),
            topic_vocabulary: default_vocabulary(),
            max_topics: 5,
        }
    }
}

/// Trimmed text for strings and numbers, `None` when blank or not textual
pub fn coerce_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Score in 0..=100 from a number or numeric string
pub fn coerce_score(value: &Value) -> Option<u32> {
    let raw = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(0.0, 100.0) as u32)
}
