use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::insights::NormalizedInsights;

/// Identifier column a call record can be looked up by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyField {
    /// Newer string identifier
    CallId,
    /// Legacy numeric primary key
    Id,
}

impl KeyField {
    pub fn column(self) -> &'static str {
        match self {
            KeyField::CallId => "call_id",
            KeyField::Id => "id",
        }
    }

    /// Whether `identifier` can name a record through this column
    pub fn accepts(self, identifier: &str) -> bool {
        match self {
            KeyField::CallId => !identifier.is_empty(),
            KeyField::Id => identifier.parse::<i64>().is_ok(),
        }
    }
}

impl std::fmt::Display for KeyField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// A concrete column/value pair used against the record store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub field: KeyField,
    pub value: String,
}

impl RecordKey {
    pub fn new(field: KeyField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.field, self.value)
    }
}

/// Precedence between the two identifier columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupStrategy {
    pub primary: KeyField,
    pub secondary: KeyField,
}

impl Default for LookupStrategy {
    fn default() -> Self {
        Self {
            primary: KeyField::CallId,
            secondary: KeyField::Id,
        }
    }
}

impl LookupStrategy {
    /// Keys to try for `identifier`, in precedence order
    pub fn candidates(&self, identifier: &str) -> Vec<RecordKey> {
        let identifier = identifier.trim();
        [self.primary, self.secondary]
            .into_iter()
            .filter(|field| field.accepts(identifier))
            .map(|field| RecordKey::new(field, identifier))
            .collect()
    }
}

/// Call record as held by the external store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub transcription: Option<String>,
    /// Kept untyped: older rows hold raw report shapes
    #[serde(default)]
    pub insights: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub processed_at: Option<DateTime<Utc>>,
}

impl CallRecord {
    /// Cached insights, if present and in the normalized shape
    pub fn cached_insights(&self) -> Option<NormalizedInsights> {
        let value = self.insights.as_ref().filter(|v| !v.is_null())?;
        match serde_json::from_value(value.clone()) {
            Ok(insights) => Some(insights),
            Err(e) => {
                tracing::debug!(error = %e, "stored insights are not normalized, ignoring");
                None
            }
        }
    }

    /// Transcript text, `None` when missing or blank
    pub fn transcript_text(&self) -> Option<&str> {
        self.transcription
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    /// Key that addresses this exact record for writes
    pub fn write_key(&self) -> Option<RecordKey> {
        if let Some(call_id) = self.call_id.as_deref().filter(|c| !c.is_empty()) {
            return Some(RecordKey::new(KeyField::CallId, call_id));
        }
        self.id.map(|id| RecordKey::new(KeyField::Id, id.to_string()))
    }

    /// Whether this record is the one `key` names
    pub fn matches(&self, key: &RecordKey) -> bool {
        match key.field {
            KeyField::CallId => self.call_id.as_deref() == Some(key.value.as_str()),
            KeyField::Id => self.id.map(|id| id.to_string()).as_deref() == Some(key.value.as_str()),
        }
    }
}

/// Fields written back when caching insights
#[derive(Debug, Clone, Serialize)]
pub struct RecordUpdate {
    pub insights: NormalizedInsights,
    pub processed_at: DateTime<Utc>,
}

impl RecordUpdate {
    pub fn now(insights: NormalizedInsights) -> Self {
        Self {
            insights,
            processed_at: Utc::now(),
        }
    }
}

/// Accepts RFC 3339 or naive ISO timestamps; anything else reads as unset
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|text| {
        DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
                    .map(|naive| naive.and_utc())
                    .ok()
            })
    }))
}
