//! Roster upload API handlers
//!
//! POST /attendance/upload, GET /attendance/status, DELETE /attendance

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{error::ApiResult, models::IngestSession, AppState};

/// POST /attendance/upload query
#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub file_name: Option<String>,
}

/// POST /attendance/upload response
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Generation of the build that was started
    pub generation: u64,
}

/// POST /attendance/upload
///
/// Body is the raw workbook. Size and format are checked synchronously
/// (413 / 415); the build runs in the background and reports over SSE.
/// Returns 202 Accepted with the build generation.
pub async fn upload_roster(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let generation = state
        .service
        .start_ingest(body.to_vec(), query.file_name)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(UploadResponse { generation })))
}

/// GET /attendance/status
pub async fn ingest_status(State(state): State<AppState>) -> Json<IngestSession> {
    Json(state.service.ingest_status())
}

/// DELETE /attendance
///
/// Drops the index, cancels any in-flight build and recomputes.
pub async fn clear_attendance(State(state): State<AppState>) -> Json<IngestSession> {
    state.service.clear_attendance().await;
    Json(state.service.ingest_status())
}

/// Build attendance routes
///
/// The body limit sits one byte above the configured cap so the ingestor's
/// own size check produces the FILE_TOO_LARGE response at the boundary.
pub fn attendance_routes(max_upload_bytes: u64) -> Router<AppState> {
    let limit = usize::try_from(max_upload_bytes.saturating_add(1)).unwrap_or(usize::MAX);
    Router::new()
        .route(
            "/attendance/upload",
            post(upload_roster).layer(DefaultBodyLimit::max(limit)),
        )
        .route("/attendance/status", get(ingest_status))
        .route("/attendance", axum::routing::delete(clear_attendance))
}
