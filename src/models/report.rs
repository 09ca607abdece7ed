use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw multi-section report as produced by the analysis routine.
///
/// Kept opaque: it is only inspected through [`RawAnalysisReport::section`]
/// and otherwise carried verbatim as an audit attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawAnalysisReport(pub Value);

impl Default for RawAnalysisReport {
    fn default() -> Self {
        Self(Value::Object(Map::new()))
    }
}

/// Named sections of a raw report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    CallSummary,
    BuyerIntent,
    CustomRagAnalysis,
    ProfanityCheck,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::CallSummary,
        Section::BuyerIntent,
        Section::CustomRagAnalysis,
        Section::ProfanityCheck,
    ];

    /// Key of the section in the raw report
    pub fn key(self) -> &'static str {
        match self {
            Section::CallSummary => "call_summary",
            Section::BuyerIntent => "buyer_intent",
            Section::CustomRagAnalysis => "custom_rag_analysis",
            Section::ProfanityCheck => "profanity_check",
        }
    }
}

/// Shape a section's payload was found in after decoding
#[derive(Debug, Clone, PartialEq)]
pub enum SectionPayload {
    /// Section key missing or null
    Absent,
    /// Section present with an empty string
    Empty,
    /// Section present but not decodable into an object
    Malformed(String),
    /// One decoding pass produced the fields
    Decoded(Map<String, Value>),
    /// Fields came from a same-named nested `output` string
    DoubleEncoded(Map<String, Value>),
}

impl SectionPayload {
    /// Decoded fields, empty for every non-decoded shape
    pub fn into_fields(self) -> Map<String, Value> {
        match self {
            SectionPayload::Decoded(fields) | SectionPayload::DoubleEncoded(fields) => fields,
            _ => Map::new(),
        }
    }

    pub fn is_decoded(&self) -> bool {
        matches!(
            self,
            SectionPayload::Decoded(_) | SectionPayload::DoubleEncoded(_)
        )
    }
}

/// Outer wrapping a section value arrives in
enum Envelope<'a> {
    Missing,
    Text(&'a str),
    Object(&'a Map<String, Value>),
    Unsupported(&'static str),
}

impl RawAnalysisReport {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Object(map) => map.is_empty(),
            Value::Null => true,
            _ => false,
        }
    }

    /// Error message when the routine reported its own failure as `{"error": "..."}`
    pub fn reported_error(&self) -> Option<&str> {
        let map = self.0.as_object()?;
        if Section::ALL.iter().any(|s| map.contains_key(s.key())) {
            return None;
        }
        map.get("error")?.as_str()
    }

    /// Decode one section, unwrapping at most one level of same-named nesting
    pub fn section(&self, section: Section) -> SectionPayload {
        match self.0.get(section.key()) {
            Some(value) => decode_section(section.key(), value),
            None => SectionPayload::Absent,
        }
    }
}

fn envelope(value: &Value) -> Envelope<'_> {
    match value {
        Value::Null => Envelope::Missing,
        Value::String(text) => Envelope::Text(text),
        Value::Object(map) => match map.get("output") {
            Some(Value::String(text)) => Envelope::Text(text),
            Some(Value::Object(inner)) => Envelope::Object(inner),
            Some(Value::Null) => Envelope::Missing,
            Some(other) => Envelope::Unsupported(kind(other)),
            None => Envelope::Object(map),
        },
        other => Envelope::Unsupported(kind(other)),
    }
}

fn decode_section(name: &str, value: &Value) -> SectionPayload {
    let outer = match envelope(value) {
        Envelope::Missing => return SectionPayload::Absent,
        Envelope::Text(text) if text.trim().is_empty() => return SectionPayload::Empty,
        Envelope::Text(text) => match parse_object(text) {
            Ok(map) => map,
            Err(e) => return SectionPayload::Malformed(e),
        },
        Envelope::Object(map) => map.clone(),
        Envelope::Unsupported(kind) => {
            return SectionPayload::Malformed(format!("unsupported section value: {}", kind));
        }
    };

    match nested_output(name, &outer) {
        Some(Ok(inner)) => SectionPayload::DoubleEncoded(inner),
        Some(Err(e)) => {
            tracing::debug!(section = name, error = %e, "nested output not decodable, keeping outer fields");
            SectionPayload::Decoded(outer)
        }
        None => SectionPayload::Decoded(outer),
    }
}

/// `{ "<name>": { "output": "<json>" } }` inside an already decoded section
fn nested_output(name: &str, outer: &Map<String, Value>) -> Option<Result<Map<String, Value>, String>> {
    let nested = outer.get(name)?.as_object()?;
    let text = nested.get("output")?.as_str()?;
    Some(parse_object(text))
}

fn parse_object(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected an object, got {}", kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
