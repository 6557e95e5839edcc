//! Server-Sent Events for reconciliation progress
//!
//! Streams every ReconcileEvent: ingestion progress and outcome, participation
//! refreshes, recomputes, edits and batch results.

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /events
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    rollcall_common::sse::create_event_sse_stream(&state.event_bus, "rollcall-reconciler")
}
