//! Reconciliation services
//!
//! Leaves first: normalizer → ingestor → index → resolver → decision engine
//! → manual overrides → batch reconciler, with the store client beside them
//! and `ReconciliationService` owning the session state on top.

pub mod attendance_index;
pub mod batch_reconciler;
pub mod decision_engine;
pub mod identity_normalizer;
pub mod manual_override;
pub mod match_resolver;
pub mod participation_store;
pub mod reconciliation_service;
pub mod spreadsheet_ingestor;

pub use attendance_index::{AttendanceIndex, ChunkedIndexBuilder, IndexBuildReport};
pub use batch_reconciler::{actionable_items, BatchReconciler, BatchRun};
pub use decision_engine::{DecisionEngine, DecisionSummary};
pub use identity_normalizer::normalize;
pub use match_resolver::{MatchOutcome, MatchResolver, MatchTier};
pub use participation_store::{HttpParticipationStore, ParticipationStore, StoreError};
pub use reconciliation_service::{IngestOutcome, ReconciliationService, ServiceError};
pub use spreadsheet_ingestor::{IngestError, RosterLayout, SpreadsheetIngestor};
