use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, InsightsError>;

/// Body returned to the UI on failure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Error)]
pub enum InsightsError {
    /// The record exists but has nothing to analyze
    #[error("No transcription found for call {call_id}. Please create a transcription first.")]
    NoTranscription { call_id: String },

    #[error("Call {call_id} not found")]
    CallNotFound { call_id: String },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// The analysis routine did not run or crashed
    #[error("Failed to run analysis: {0}")]
    AnalysisProcess(String),

    #[error("Analysis did not finish within {}s", .0.as_secs())]
    AnalysisTimeout(Duration),

    /// The analysis routine ran but its output was not JSON
    #[error("Invalid JSON output from analysis: {detail}")]
    AnalysisOutputParse { detail: String, excerpt: String },

    #[error("Record store error: {0}")]
    RecordStore(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl InsightsError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AnalysisProcess(_) | Self::AnalysisTimeout(_) | Self::RecordStore(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NoTranscription { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::CallNotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::AnalysisProcess(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::AnalysisOutputParse { .. } => StatusCode::BAD_GATEWAY,
            Self::AnalysisTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::RecordStore(_) | Self::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Short human-readable headline for the UI
    fn headline(&self) -> &'static str {
        match self {
            Self::NoTranscription { .. } => "No transcription found for this call",
            Self::CallNotFound { .. } => "Call not found",
            Self::BadRequest(_) => "Invalid request",
            Self::AnalysisProcess(_) => "Failed to run analysis",
            Self::AnalysisTimeout(_) => "Analysis timed out",
            Self::AnalysisOutputParse { .. } => "Invalid JSON output from analysis",
            Self::RecordStore(_) => "Record store unavailable",
            Self::Config(_) => "Service not configured",
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::AnalysisOutputParse { detail, excerpt } if !excerpt.is_empty() => {
                Some(format!("{} (output began: {})", detail, excerpt))
            }
            other => Some(other.to_string()),
        }
    }
}

impl IntoResponse for InsightsError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request_failed");
        } else {
            tracing::warn!(error = %self, "request_rejected");
        }

        let body = Json(ErrorResponse {
            error: self.headline().to_string(),
            details: self.details(),
        });

        (status, body).into_response()
    }
}
