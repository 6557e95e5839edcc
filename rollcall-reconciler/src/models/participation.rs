//! Participation snapshot types
//!
//! Participations are owned by the external ParticipationStore. The reconciler
//! only holds read snapshots and requests status changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned participation identifier
pub type ParticipationId = String;

/// Participation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationStatus {
    /// Registered, awaiting review
    Pending,
    /// Approved by a reviewer
    Approved,
    /// Rejected by a reviewer
    Rejected,
    /// Marked as attended
    Attended,
    /// Participation completed
    Completed,
}

impl ParticipationStatus {
    /// Wire name used in store queries
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipationStatus::Pending => "pending",
            ParticipationStatus::Approved => "approved",
            ParticipationStatus::Rejected => "rejected",
            ParticipationStatus::Attended => "attended",
            ParticipationStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ParticipationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Student summary embedded in a participation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Institutional registration number, the join key against the roster
    #[serde(default)]
    pub external_registration_id: String,
}

/// Event summary embedded in a participation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: String,
    pub title: String,
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
}

/// A student's registration for an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participation {
    pub id: ParticipationId,
    pub student: Student,
    pub event: EventSummary,
    pub status: ParticipationStatus,
    #[serde(default)]
    pub registered_at: Option<DateTime<Utc>>,
}

/// Filter applied when listing participations from the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationFilter {
    /// Restrict to one event
    #[serde(default)]
    pub event_id: Option<String>,
    /// Restrict to one status
    #[serde(default)]
    pub status: Option<ParticipationStatus>,
}

impl ParticipationFilter {
    /// Query parameters in the store's naming
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(event_id) = &self.event_id {
            pairs.push(("eventId", event_id.clone()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        pairs
    }
}
