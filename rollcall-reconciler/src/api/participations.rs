//! Participation API handlers

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    models::{Participation, ParticipationFilter},
    AppState,
};

/// POST /participations/refresh response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub count: usize,
    pub filter: ParticipationFilter,
}

/// GET /participations/search query
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// POST /participations/:id/attendance request
#[derive(Debug, Deserialize)]
pub struct MarkAttendanceRequest {
    pub attended: bool,
}

/// POST /participations/:id/attendance response
#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAttendanceResponse {
    pub participation_id: String,
    pub attended: bool,
}

/// POST /participations/refresh
///
/// Re-fetches from the store with the given filter and recomputes decisions.
/// An empty body means no filter; a body that is not a valid filter is 400.
pub async fn refresh_participations(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<RefreshResponse>> {
    let filter = parse_filter(&body)?;
    let count = state.service.refresh_participations(filter.clone()).await?;
    Ok(Json(RefreshResponse { count, filter }))
}

fn parse_filter(body: &[u8]) -> ApiResult<ParticipationFilter> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ParticipationFilter::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid participation filter: {}", e)))
}

/// GET /participations
pub async fn list_participations(State(state): State<AppState>) -> Json<Vec<Participation>> {
    Json(state.service.participations().await.as_ref().clone())
}

/// GET /participations/search?q=
///
/// 404 NO_SEARCH_MATCH when nothing matches.
pub async fn search_participations(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Participation>>> {
    let matches = state.service.search(&query.q).await;
    if matches.is_empty() {
        return Err(ApiError::NoSearchMatch(query.q));
    }
    Ok(Json(matches))
}

/// POST /participations/:id/attendance
pub async fn mark_attendance(
    State(state): State<AppState>,
    Path(participation_id): Path<String>,
    Json(request): Json<MarkAttendanceRequest>,
) -> ApiResult<Json<MarkAttendanceResponse>> {
    state
        .service
        .mark_attendance(&participation_id, request.attended)
        .await?;
    Ok(Json(MarkAttendanceResponse {
        participation_id,
        attended: request.attended,
    }))
}

/// Build participation routes
pub fn participation_routes() -> Router<AppState> {
    Router::new()
        .route("/participations", get(list_participations))
        .route("/participations/refresh", post(refresh_participations))
        .route("/participations/search", get(search_participations))
        .route("/participations/:participation_id/attendance", post(mark_attendance))
}
