//! Decision review API handlers

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiResult,
    models::{Decision, DecisionMap, Verdict},
    services::DecisionSummary,
    AppState,
};

/// GET /decisions response
#[derive(Debug, Serialize, Deserialize)]
pub struct DecisionsResponse {
    pub decisions: DecisionMap,
    pub summary: DecisionSummary,
}

/// GET /decisions/:id/draft response
#[derive(Debug, Serialize, Deserialize)]
pub struct DraftResponse {
    pub participation_id: String,
    pub draft: Verdict,
}

/// PUT /decisions/:id request
///
/// `draft: null` (or absent) means "no change" and removes the entry.
#[derive(Debug, Deserialize)]
pub struct CommitEditRequest {
    #[serde(default)]
    pub draft: Option<Verdict>,
}

/// PUT /decisions/:id response
#[derive(Debug, Serialize, Deserialize)]
pub struct CommitEditResponse {
    pub participation_id: String,
    pub decision: Option<Decision>,
}

/// GET /decisions
pub async fn get_decisions(State(state): State<AppState>) -> Json<DecisionsResponse> {
    let decisions = state.service.decisions().await.as_ref().clone();
    let summary = state.service.summary().await;
    Json(DecisionsResponse { decisions, summary })
}

/// GET /decisions/:id/draft
pub async fn begin_edit(
    State(state): State<AppState>,
    Path(participation_id): Path<String>,
) -> ApiResult<Json<DraftResponse>> {
    let draft = state.service.begin_edit(&participation_id).await?;
    Ok(Json(DraftResponse {
        participation_id,
        draft,
    }))
}

/// PUT /decisions/:id
pub async fn commit_edit(
    State(state): State<AppState>,
    Path(participation_id): Path<String>,
    Json(request): Json<CommitEditRequest>,
) -> ApiResult<Json<CommitEditResponse>> {
    let decision = state
        .service
        .commit_edit(&participation_id, request.draft)
        .await?;
    Ok(Json(CommitEditResponse {
        participation_id,
        decision,
    }))
}

/// Build decision routes
pub fn decision_routes() -> Router<AppState> {
    Router::new()
        .route("/decisions", get(get_decisions))
        .route("/decisions/:participation_id/draft", get(begin_edit))
        .route("/decisions/:participation_id", axum::routing::put(commit_edit))
}
