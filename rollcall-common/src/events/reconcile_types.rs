//! Reconciliation event payload types
//!
//! Supporting types for rollcall-reconciler progress and outcome events.

use serde::{Deserialize, Serialize};

/// One failed remote mutation in a confirmed batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailureInfo {
    /// Participation the mutation targeted
    pub participation_id: String,
    /// Mutation that was attempted ("approve" or "reject")
    pub action: String,
    /// Error reported by the store or the client
    pub error: String,
}

/// Decision map counts published after every recompute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTally {
    /// Entries in the decision map
    pub total: usize,
    /// Entries queued as approve
    pub approve: usize,
    /// Entries queued as reject
    pub reject: usize,
    /// Entries set by a reviewer
    pub manual: usize,
    /// Entries computed from the threshold
    pub auto: usize,
    /// Entries whose application would change persisted status
    pub actionable: usize,
}
