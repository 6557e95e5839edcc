//! Event types for the Rollcall event system
//!
//! Provides the shared event definitions and the EventBus used to publish
//! ingestion progress, recompute results and batch outcomes to SSE clients.

mod reconcile_types;

pub use reconcile_types::{BatchFailureInfo, DecisionTally};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Rollcall event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReconcileEvent {
    /// A roster upload passed the size and format checks and a build started
    IngestStarted {
        /// Generation token of the build
        generation: u64,
        /// File name supplied by the uploader
        file_name: Option<String>,
        /// Upload size in bytes
        size_bytes: u64,
        /// When the build started
        timestamp: DateTime<Utc>,
    },

    /// A chunk of roster rows was indexed
    ///
    /// Emitted once per chunk. Receivers should ignore generations other
    /// than the most recent IngestStarted.
    IngestProgress {
        /// Generation token of the build
        generation: u64,
        /// Data rows processed so far
        processed_rows: usize,
        /// Data rows in the sheet
        total_rows: usize,
        /// processed_rows / total_rows (0.0-1.0)
        fraction: f64,
        /// Progress timestamp
        timestamp: DateTime<Utc>,
    },

    /// A build committed its index
    IngestCompleted {
        /// Generation token of the build
        generation: u64,
        /// Distinct normalized identifiers in the committed index
        distinct_identifiers: usize,
        /// Rows omitted for a missing identifier or percentage
        skipped_rows: usize,
        /// When the index was committed
        timestamp: DateTime<Utc>,
    },

    /// A roster upload was rejected
    ///
    /// The attendance index is left "not loaded".
    IngestFailed {
        /// Generation token of the build
        generation: u64,
        /// Machine-readable error code (e.g. HEADER_NOT_FOUND)
        code: String,
        /// Error description
        message: String,
        /// Corrective guidance shown to the reviewer
        guidance: String,
        /// When the failure was detected
        timestamp: DateTime<Utc>,
    },

    /// The attendance index was cleared by a reviewer
    AttendanceCleared {
        /// When the index was cleared
        timestamp: DateTime<Utc>,
    },

    /// The participation snapshot was re-fetched from the store
    ParticipationsRefreshed {
        /// Participations in the new snapshot
        count: usize,
        /// Refresh timestamp
        timestamp: DateTime<Utc>,
    },

    /// A new decision map replaced the previous one
    DecisionsRecomputed {
        /// Counts for the new map
        tally: DecisionTally,
        /// Recompute timestamp
        timestamp: DateTime<Utc>,
    },

    /// A reviewer committed a manual decision or cleared one
    DecisionEdited {
        /// Participation the edit applies to
        participation_id: String,
        /// "approve", "reject", or None when the entry was removed
        verdict: Option<String>,
        /// Edit timestamp
        timestamp: DateTime<Utc>,
    },

    /// A confirmed batch finished executing
    BatchCompleted {
        /// Identifier for correlating logs with this batch
        batch_id: Uuid,
        /// Remote mutations that succeeded
        success_count: usize,
        /// Remote mutations that failed
        failure_count: usize,
        /// Itemized failures
        failures: Vec<BatchFailureInfo>,
        /// Completion timestamp
        timestamp: DateTime<Utc>,
    },

    /// Attendance flag was set on a participation
    AttendanceMarked {
        /// Participation updated
        participation_id: String,
        /// New attended flag
        attended: bool,
        /// Update timestamp
        timestamp: DateTime<Utc>,
    },
}

impl ReconcileEvent {
    /// Event type name, used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            ReconcileEvent::IngestStarted { .. } => "IngestStarted",
            ReconcileEvent::IngestProgress { .. } => "IngestProgress",
            ReconcileEvent::IngestCompleted { .. } => "IngestCompleted",
            ReconcileEvent::IngestFailed { .. } => "IngestFailed",
            ReconcileEvent::AttendanceCleared { .. } => "AttendanceCleared",
            ReconcileEvent::ParticipationsRefreshed { .. } => "ParticipationsRefreshed",
            ReconcileEvent::DecisionsRecomputed { .. } => "DecisionsRecomputed",
            ReconcileEvent::DecisionEdited { .. } => "DecisionEdited",
            ReconcileEvent::BatchCompleted { .. } => "BatchCompleted",
            ReconcileEvent::AttendanceMarked { .. } => "AttendanceMarked",
        }
    }
}

/// Broadcast channel for ReconcileEvents
///
/// Cloning the bus shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ReconcileEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers drop old events
    ///
    /// # Examples
    ///
    /// ```
    /// use rollcall_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ReconcileEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ReconcileEvent,
    ) -> Result<usize, broadcast::error::SendError<ReconcileEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ReconcileEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
