//! Batch confirmation handler

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use crate::{
    error::ApiResult,
    models::{BatchOutcome, BatchSummary},
    AppState,
};

/// POST /batch/confirm response
#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    #[serde(flatten)]
    pub summary: BatchSummary,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

/// POST /batch/confirm
///
/// Per-item failures are reported in the body, never as an error status.
/// 409 when another batch is still running.
pub async fn confirm_batch(State(state): State<AppState>) -> ApiResult<Json<ConfirmResponse>> {
    let outcome = state.service.confirm().await?;
    Ok(Json(ConfirmResponse {
        summary: outcome.summary(),
        outcome,
    }))
}

/// Build batch routes
pub fn batch_routes() -> Router<AppState> {
    Router::new().route("/batch/confirm", post(confirm_batch))
}
