//! rollcall-reconciler library interface
//!
//! Exposes the reconciliation services and the HTTP router for the binary and
//! for integration testing.

pub mod api;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use rollcall_common::config::ReconcilerConfig;
use rollcall_common::events::EventBus;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::{ParticipationStore, ReconciliationService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Owner of participations, attendance index and decisions
    pub service: Arc<ReconciliationService>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Resolved configuration
    pub config: Arc<ReconcilerConfig>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ReconcilerConfig, store: Arc<dyn ParticipationStore>) -> Self {
        let event_bus = EventBus::new(config.event_bus_capacity);
        let service = Arc::new(ReconciliationService::new(
            &config,
            store,
            event_bus.clone(),
        ));
        Self {
            service,
            event_bus,
            config: Arc::new(config),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::attendance_routes(state.config.ingest.max_upload_bytes))
        .merge(api::participation_routes())
        .merge(api::decision_routes())
        .merge(api::batch_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
