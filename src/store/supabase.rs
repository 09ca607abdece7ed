use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::RecordStore;
use crate::error::{InsightsError, Result};
use crate::models::{CallRecord, RecordKey, RecordUpdate};

pub const DEFAULT_TABLE: &str = "call_logs";

/// Credentials for the hosted record store
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Project URL (from SUPABASE_URL env var)
    pub url: Option<String>,
    /// API key (from SUPABASE_KEY env var)
    pub key: Option<String>,
    /// Table holding call records
    pub table: String,
}

impl StoreConfig {
    /// Create config from environment variables, leaving missing values unset
    pub fn from_env() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            url: non_empty("SUPABASE_URL"),
            key: non_empty("SUPABASE_KEY"),
            table: std::env::var("SUPABASE_CALLS_TABLE").unwrap_or_else(|_| DEFAULT_TABLE.to_string()),
        }
    }

    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            key: Some(key.into()),
            table: DEFAULT_TABLE.to_string(),
        }
    }

    /// Names of the required variables that are not set
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.url.is_none() {
            missing.push("SUPABASE_URL");
        }
        if self.key.is_none() {
            missing.push("SUPABASE_KEY");
        }
        missing
    }
}

#[derive(Debug, Clone)]
struct Connection {
    base_url: String,
    key: String,
    table: String,
}

/// PostgREST client for the call records table.
///
/// Built in a disabled state when credentials are incomplete; every
/// operation then fails fast with a configuration error.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    connection: std::result::Result<Connection, String>,
    http_client: Client,
}

impl SupabaseStore {
    pub fn new(config: StoreConfig) -> Self {
        let missing = config.missing();
        let connection = match (config.url, config.key) {
            (Some(url), Some(key)) => Ok(Connection {
                base_url: url.trim_end_matches('/').to_string(),
                key,
                table: config.table,
            }),
            _ => {
                let reason = format!("record store disabled: {} not set", missing.join(" and "));
                warn!("{}", reason);
                Err(reason)
            }
        };

        Self {
            connection,
            http_client: Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.connection.is_ok()
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .map_err(|reason| InsightsError::Config(reason.clone()))
    }

    fn table_url(connection: &Connection) -> String {
        format!("{}/rest/v1/{}", connection.base_url, connection.table)
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<CallRecord>> {
        let connection = self.connection()?;
        let filter = format!("eq.{}", key.value);

        let response = self
            .http_client
            .get(Self::table_url(connection))
            .query(&[(key.field.column(), filter.as_str()), ("select", "*"), ("limit", "1")])
            .header("apikey", &connection.key)
            .header("Authorization", format!("Bearer {}", connection.key))
            .send()
            .await
            .map_err(|e| InsightsError::RecordStore(format!("lookup of {} failed: {}", key, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InsightsError::RecordStore(format!(
                "lookup of {} failed: {} - {}",
                key, status, body
            )));
        }

        let records: Vec<CallRecord> = response.json().await.map_err(|e| {
            InsightsError::RecordStore(format!("unexpected lookup response for {}: {}", key, e))
        })?;
        debug!("Lookup of {} returned {} rows", key, records.len());

        Ok(records.into_iter().next())
    }

    async fn update(&self, key: &RecordKey, update: &RecordUpdate) -> Result<()> {
        let connection = self.connection()?;
        let filter = format!("eq.{}", key.value);

        let response = self
            .http_client
            .patch(Self::table_url(connection))
            .query(&[(key.field.column(), filter.as_str())])
            .header("apikey", &connection.key)
            .header("Authorization", format!("Bearer {}", connection.key))
            .header("Prefer", "return=representation")
            .json(update)
            .send()
            .await
            .map_err(|e| InsightsError::RecordStore(format!("update of {} failed: {}", key, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InsightsError::RecordStore(format!(
                "update of {} failed: {} - {}",
                key, status, body
            )));
        }

        let updated: Vec<serde_json::Value> = response.json().await.unwrap_or_default();
        if updated.is_empty() {
            return Err(InsightsError::RecordStore(format!("no record matched {}", key)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        extract::{Query, State},
        http::{HeaderMap, StatusCode},
        routing::get,
    };
    use serde_json::{Value, json};

    use crate::models::{KeyField, NormalizedInsights, RawAnalysisReport};

    #[derive(Clone, Default)]
    struct MockRest {
        rows: Arc<Mutex<Vec<Value>>>,
    }

    fn matching(rows: &[Value], params: &HashMap<String, String>) -> Vec<usize> {
        rows.iter()
            .enumerate()
            .filter(|(_, row)| {
                ["call_id", "id"].iter().all(|column| match params.get(*column) {
                    Some(filter) => {
                        let wanted = filter.trim_start_matches("eq.");
                        match &row[*column] {
                            Value::String(s) => s == wanted,
                            Value::Number(n) => n.to_string() == wanted,
                            _ => false,
                        }
                    }
                    None => true,
                })
            })
            .map(|(i, _)| i)
            .collect()
    }

    async fn list(
        State(mock): State<MockRest>,
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> std::result::Result<Json<Vec<Value>>, StatusCode> {
        if headers.get("apikey").map(|v| v.as_bytes()) != Some(b"secret".as_slice()) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        let rows = mock.rows.lock().unwrap();
        let found = matching(&rows, &params).into_iter().map(|i| rows[i].clone()).collect();
        Ok(Json(found))
    }

    async fn patch(
        State(mock): State<MockRest>,
        Query(params): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> Json<Vec<Value>> {
        let mut rows = mock.rows.lock().unwrap();
        let mut updated = Vec::new();
        for i in matching(&rows, &params) {
            rows[i]["insights"] = body["insights"].clone();
            rows[i]["processed_at"] = body["processed_at"].clone();
            updated.push(rows[i].clone());
        }
        Json(updated)
    }

    async fn spawn_mock(rows: Vec<Value>) -> (String, MockRest) {
        let mock = MockRest {
            rows: Arc::new(Mutex::new(rows)),
        };
        let app = Router::new()
            .route("/rest/v1/call_logs", get(list).patch(patch))
            .with_state(mock.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/", addr), mock)
    }

    #[test]
    fn test_missing_credentials_disable_store() {
        let store = SupabaseStore::new(StoreConfig {
            url: Some("http://localhost".to_string()),
            key: None,
            table: DEFAULT_TABLE.to_string(),
        });
        assert!(!store.is_configured());

        assert_eq!(StoreConfig::default().missing(), vec!["SUPABASE_URL", "SUPABASE_KEY"]);
    }

    #[tokio::test]
    async fn test_disabled_store_fails_fast() {
        let store = SupabaseStore::new(StoreConfig::default());

        match store.get(&RecordKey::new(KeyField::Id, "1")).await {
            Err(InsightsError::Config(reason)) => {
                assert!(reason.contains("SUPABASE_URL"));
                assert!(reason.contains("SUPABASE_KEY"));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let update = RecordUpdate::now(NormalizedInsights::fallback(RawAnalysisReport::default()));
        assert!(matches!(
            store.update(&RecordKey::new(KeyField::Id, "1"), &update).await,
            Err(InsightsError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_get_and_update_over_rest() {
        let (url, mock) = spawn_mock(vec![
            json!({"id": 76569, "call_id": "CA1", "transcription": "Speaker 1: Hi", "insights": null}),
            json!({"id": 2, "call_id": null, "transcription": null, "insights": null}),
        ])
        .await;
        let store = SupabaseStore::new(StoreConfig::new(url, "secret"));

        let record = store
            .get(&RecordKey::new(KeyField::CallId, "CA1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.id, Some(76569));
        assert_eq!(record.transcript_text(), Some("Speaker 1: Hi"));

        let legacy = store.get(&RecordKey::new(KeyField::Id, "2")).await.unwrap().unwrap();
        assert_eq!(legacy.call_id, None);

        assert!(store
            .get(&RecordKey::new(KeyField::CallId, "missing"))
            .await
            .unwrap()
            .is_none());

        let insights = NormalizedInsights::fallback(RawAnalysisReport::default());
        store
            .update(&RecordKey::new(KeyField::CallId, "CA1"), &RecordUpdate::now(insights.clone()))
            .await
            .unwrap();
        assert_eq!(mock.rows.lock().unwrap()[0]["insights"]["buyer_intent"], "Neutral");

        let refreshed = store
            .get(&RecordKey::new(KeyField::CallId, "CA1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refreshed.cached_insights(), Some(insights));
        assert!(refreshed.processed_at.is_some());
    }

    #[tokio::test]
    async fn test_update_without_match_is_error() {
        let (url, _mock) = spawn_mock(vec![]).await;
        let store = SupabaseStore::new(StoreConfig::new(url, "secret"));
        let update = RecordUpdate::now(NormalizedInsights::fallback(RawAnalysisReport::default()));

        assert!(matches!(
            store.update(&RecordKey::new(KeyField::Id, "5"), &update).await,
            Err(InsightsError::RecordStore(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_request_is_store_error() {
        let (url, _mock) = spawn_mock(vec![]).await;
        let store = SupabaseStore::new(StoreConfig::new(url, "wrong"));

        assert!(matches!(
            store.get(&RecordKey::new(KeyField::Id, "1")).await,
            Err(InsightsError::RecordStore(_))
        ));
    }
}
