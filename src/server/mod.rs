pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::pipeline::InsightsPipeline;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<InsightsPipeline>,
}

impl AppState {
    pub fn new(pipeline: InsightsPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/api/call-insights/:call_id",
            get(routes::get_call_insights).post(routes::trigger_call_insights),
        )
        .route("/api/process-insights", post(routes::process_insights))
        .route("/api/output", get(routes::legacy_output))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the insights API on `addr` until the process is stopped
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Insights service listening on http://{}", addr);

    axum::serve(listener, router(state))
        .await
        .context("Insights service stopped unexpectedly")
}
