//! Confirmed batch results
//!
//! Every attempted mutation lands in exactly one of `successes` or `failures`.

use chrono::{DateTime, Utc};
use rollcall_common::events::BatchFailureInfo;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::decision::Verdict;
use super::participation::ParticipationId;

/// A remote mutation that the store accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSuccess {
    pub participation_id: ParticipationId,
    pub action: Verdict,
}

/// A remote mutation that failed or timed out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub participation_id: ParticipationId,
    pub action: Verdict,
    pub error: String,
}

/// Aggregate counts reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub success_count: usize,
    pub failure_count: usize,
}

/// Result of executing a confirmed batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    pub successes: Vec<BatchSuccess>,
    pub failures: Vec<BatchFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchOutcome {
    pub fn new() -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            successes: Vec::new(),
            failures: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Record one item's result
    pub fn record(
        &mut self,
        participation_id: ParticipationId,
        action: Verdict,
        result: Result<(), String>,
    ) {
        match result {
            Ok(()) => self.successes.push(BatchSuccess {
                participation_id,
                action,
            }),
            Err(error) => self.failures.push(BatchFailure {
                participation_id,
                action,
                error,
            }),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn attempted(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            success_count: self.successes.len(),
            failure_count: self.failures.len(),
        }
    }

    /// Failures in event payload form
    pub fn failure_infos(&self) -> Vec<BatchFailureInfo> {
        self.failures
            .iter()
            .map(|f| BatchFailureInfo {
                participation_id: f.participation_id.clone(),
                action: f.action.to_string(),
                error: f.error.clone(),
            })
            .collect()
    }
}

impl Default for BatchOutcome {
    fn default() -> Self {
        Self::new()
    }
}
