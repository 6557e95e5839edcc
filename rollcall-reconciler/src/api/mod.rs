//! HTTP API handlers for rollcall-reconciler
//!
//! Thin adapters over `ReconciliationService`; all state lives there.

pub mod attendance;
pub mod batch;
pub mod decisions;
pub mod health;
pub mod participations;
pub mod sse;

pub use attendance::attendance_routes;
pub use batch::batch_routes;
pub use decisions::decision_routes;
pub use health::health_routes;
pub use participations::participation_routes;
pub use sse::event_stream;
