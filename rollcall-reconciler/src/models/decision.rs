//! Queued approve/reject decisions with provenance

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::participation::{ParticipationId, ParticipationStatus};

/// Recommended status change for a participation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Approve,
    Reject,
}

impl Verdict {
    /// Status the participation ends up in once this verdict is applied
    pub fn target_status(&self) -> ParticipationStatus {
        match self {
            Verdict::Approve => ParticipationStatus::Approved,
            Verdict::Reject => ParticipationStatus::Rejected,
        }
    }

    /// True when applying the verdict would change the persisted status
    pub fn changes(&self, status: ParticipationStatus) -> bool {
        status != self.target_status()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Approve => "approve",
            Verdict::Reject => "reject",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionSource {
    /// Derived from the attendance threshold; recomputed freely
    Auto,
    /// Set by a reviewer; recompute may only refresh the cached attendance
    Manual,
}

/// A queued, not-yet-applied decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(rename = "decision")]
    pub verdict: Verdict,
    pub source: DecisionSource,
    /// Attendance percentage last resolved for the participation
    pub attendance: Option<f64>,
}

impl Decision {
    pub fn auto(verdict: Verdict, attendance: f64) -> Self {
        Self {
            verdict,
            source: DecisionSource::Auto,
            attendance: Some(attendance),
        }
    }

    pub fn manual(verdict: Verdict, attendance: Option<f64>) -> Self {
        Self {
            verdict,
            source: DecisionSource::Manual,
            attendance,
        }
    }

    pub fn is_manual(&self) -> bool {
        self.source == DecisionSource::Manual
    }

    /// Copy of this decision with a refreshed attendance cache
    pub fn with_attendance(self, attendance: f64) -> Self {
        Self {
            attendance: Some(attendance),
            ..self
        }
    }
}

/// Decisions keyed by participation id
///
/// Ordered so that serialized output and iteration are deterministic.
pub type DecisionMap = BTreeMap<ParticipationId, Decision>;
