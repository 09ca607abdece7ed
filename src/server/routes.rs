use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::AppState;
use crate::error::{InsightsError, Result};
use crate::models::NormalizedInsights;

#[derive(Debug, Default, Deserialize)]
pub struct RefreshParams {
    #[serde(default)]
    pub refresh: bool,
}

/// Body of the process-insights request; the UI sends the id as a string or a number
#[derive(Debug, Deserialize)]
pub struct ProcessInsightsRequest {
    #[serde(rename = "callLogId", default)]
    pub call_log_id: Option<Value>,
}

impl ProcessInsightsRequest {
    fn identifier(&self) -> Result<String> {
        let id = match &self.call_log_id {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(InsightsError::BadRequest("callLogId is required".to_string())),
        };
        Ok(id)
    }
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_call_insights(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<NormalizedInsights>> {
    info!("GET insights for call {}", call_id);
    let insights = state.pipeline.get_insights(&call_id).await?;
    Ok(Json(insights))
}

pub async fn trigger_call_insights(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
    params: std::result::Result<Query<RefreshParams>, QueryRejection>,
) -> Result<Json<NormalizedInsights>> {
    let Query(params) = params.map_err(|rejection| InsightsError::BadRequest(rejection.body_text()))?;
    info!("POST insights for call {} (refresh={})", call_id, params.refresh);
    let insights = if params.refresh {
        state.pipeline.reprocess(&call_id).await?
    } else {
        state.pipeline.get_insights(&call_id).await?
    };
    Ok(Json(insights))
}

pub async fn process_insights(
    State(state): State<AppState>,
    request: std::result::Result<Json<ProcessInsightsRequest>, JsonRejection>,
) -> Result<Json<NormalizedInsights>> {
    let Json(request) = request.map_err(|rejection| InsightsError::BadRequest(rejection.body_text()))?;
    let call_id = request.identifier()?;
    info!("Processing insights for call log {}", call_id);
    let insights = state.pipeline.get_insights(&call_id).await?;
    Ok(Json(insights))
}

pub async fn legacy_output(State(state): State<AppState>) -> Result<Json<NormalizedInsights>> {
    info!("Serving legacy insights");
    let insights = state.pipeline.get_legacy_insights().await?;
    Ok(Json(insights))
}
