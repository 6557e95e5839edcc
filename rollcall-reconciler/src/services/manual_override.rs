//! Reviewer overrides
//!
//! A reviewer opens a draft for one participation, picks approve, reject or
//! "no change", and commits. Committed verdicts are tagged manual and are
//! never changed by recompute.

use crate::models::{Decision, DecisionMap, Participation, ParticipationStatus, Verdict};

/// Initial draft for the edit dialog
///
/// Seeds from the queued decision if there is one, otherwise from the
/// participation's current status (rejected → reject, anything else → approve).
pub fn begin_edit(decisions: &DecisionMap, participation: &Participation) -> Verdict {
    if let Some(existing) = decisions.get(&participation.id) {
        return existing.verdict;
    }
    match participation.status {
        ParticipationStatus::Rejected => Verdict::Reject,
        _ => Verdict::Approve,
    }
}

/// Apply a committed draft, returning the new decision map
///
/// `None` ("no change") removes the entry. A verdict becomes a manual
/// decision that keeps the previously cached attendance.
pub fn commit_edit(
    decisions: &DecisionMap,
    participation_id: &str,
    draft: Option<Verdict>,
) -> DecisionMap {
    let mut next = decisions.clone();
    match draft {
        None => {
            next.remove(participation_id);
        }
        Some(verdict) => {
            let attendance = decisions
                .get(participation_id)
                .and_then(|d| d.attendance);
            next.insert(
                participation_id.to_string(),
                Decision::manual(verdict, attendance),
            );
        }
    }
    next
}
