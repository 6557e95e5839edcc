//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::models::IngestState;
use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// Module name ("rollcall-reconciler")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Commit, profile and time of the build
    pub build: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Current roster ingestion state
    pub ingest_state: IngestState,
    /// Participations in the current snapshot
    pub participations: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "rollcall-reconciler".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: env!("ROLLCALL_BUILD_ID").to_string(),
        uptime_seconds,
        ingest_state: state.service.ingest_status().state,
        participations: state.service.participations().await.len(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
