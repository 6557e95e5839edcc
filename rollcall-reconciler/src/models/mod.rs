//! Data models for rollcall-reconciler
//!
//! - Participation snapshots read from the external store
//! - Decisions with provenance
//! - Roster ingestion session state
//! - Batch execution outcomes

pub mod batch_outcome;
pub mod decision;
pub mod ingest_session;
pub mod participation;

pub use batch_outcome::{BatchFailure, BatchOutcome, BatchSuccess, BatchSummary};
pub use decision::{Decision, DecisionMap, DecisionSource, Verdict};
pub use ingest_session::{IngestFailure, IngestProgress, IngestSession, IngestState};
pub use participation::{
    EventSummary, Participation, ParticipationFilter, ParticipationId, ParticipationStatus,
    Student,
};
