//! Roster ingestion state
//!
//! A session progresses IDLE → INGESTING → LOADED | FAILED. Every upload
//! starts a new session with a fresh generation; clearing returns to IDLE.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ingestion state of the attendance index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestState {
    /// No roster loaded
    Idle,
    /// Chunked build in progress
    Ingesting,
    /// Index committed and immutable until the next upload
    Loaded,
    /// Last upload was rejected; index not loaded
    Failed,
}

/// Fatal ingestion failure as shown to the reviewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestFailure {
    /// Machine-readable error code
    pub code: String,
    /// Error description
    pub message: String,
    /// Corrective guidance
    pub guidance: String,
}

/// Chunked build progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestProgress {
    /// Data rows processed so far
    pub processed_rows: usize,
    /// Data rows in the sheet
    pub total_rows: usize,
    /// processed_rows / total_rows (0.0-1.0)
    pub fraction: f64,
}

/// Current ingestion session (in-memory only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSession {
    /// Generation token of the most recent upload (0 before any upload)
    pub generation: u64,

    /// Current state
    pub state: IngestState,

    /// File name supplied by the uploader
    pub file_name: Option<String>,

    /// Progress tracking
    pub progress: IngestProgress,

    /// Distinct identifiers in the committed index
    pub distinct_identifiers: usize,

    /// Rows omitted for a missing identifier or percentage
    pub skipped_rows: usize,

    /// Failure details when state is FAILED
    pub failure: Option<IngestFailure>,

    /// Upload start time
    pub started_at: Option<DateTime<Utc>>,

    /// Time the session reached LOADED or FAILED
    pub ended_at: Option<DateTime<Utc>>,
}

impl IngestSession {
    /// Session with nothing loaded
    pub fn idle(generation: u64) -> Self {
        Self {
            generation,
            state: IngestState::Idle,
            file_name: None,
            progress: IngestProgress::default(),
            distinct_identifiers: 0,
            skipped_rows: 0,
            failure: None,
            started_at: None,
            ended_at: None,
        }
    }

    /// Session for a newly accepted upload
    pub fn begin(generation: u64, file_name: Option<String>) -> Self {
        Self {
            state: IngestState::Ingesting,
            file_name,
            started_at: Some(Utc::now()),
            ..Self::idle(generation)
        }
    }

    /// Update progress
    pub fn update_progress(&mut self, processed_rows: usize, total_rows: usize) {
        self.progress.processed_rows = processed_rows;
        self.progress.total_rows = total_rows;
        self.progress.fraction = progress_fraction(processed_rows, total_rows);
    }

    /// Mark the index committed
    pub fn complete(&mut self, distinct_identifiers: usize, skipped_rows: usize) {
        self.state = IngestState::Loaded;
        self.distinct_identifiers = distinct_identifiers;
        self.skipped_rows = skipped_rows;
        self.progress.fraction = 1.0;
        self.ended_at = Some(Utc::now());
    }

    /// Mark the upload rejected
    pub fn fail(&mut self, failure: IngestFailure) {
        self.state = IngestState::Failed;
        self.distinct_identifiers = 0;
        self.failure = Some(failure);
        self.ended_at = Some(Utc::now());
    }

    /// Check if session is terminal (finished)
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, IngestState::Loaded | IngestState::Failed)
    }
}

/// processed / total, treating an empty sheet as complete
pub fn progress_fraction(processed: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        (processed as f64 / total as f64).min(1.0)
    }
}
