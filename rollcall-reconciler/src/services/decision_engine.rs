//! Decision map recomputation
//!
//! Merges the attendance signal, the approval threshold and reviewer
//! overrides into a new decision map. Recompute is a pure function of
//! `(previous map, index, participations)`: the previous map is never
//! mutated, and identical inputs always produce an identical map.
//!
//! Rules per participation:
//! - no roster match: drop an auto decision, keep a manual one as is
//! - manual decision: refresh its cached attendance only
//! - pending: auto decision, approve iff attendance >= threshold
//! - other statuses: refresh the cached attendance of an existing entry
//!
//! Entries for participations outside the current list are dropped.

use rollcall_common::config::DEFAULT_ATTENDANCE_THRESHOLD;
use rollcall_common::events::DecisionTally;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::attendance_index::AttendanceIndex;
use super::match_resolver::{MatchResolver, MatchTier};
use crate::models::{
    Decision, DecisionMap, Participation, ParticipationId, ParticipationStatus, Verdict,
};

/// Threshold policy applied during recompute
#[derive(Debug, Clone, Copy)]
pub struct DecisionEngine {
    threshold: f64,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_ATTENDANCE_THRESHOLD)
    }
}

impl DecisionEngine {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Verdict the policy assigns to an attendance percentage
    pub fn verdict_for(&self, attendance: f64) -> Verdict {
        if attendance >= self.threshold {
            Verdict::Approve
        } else {
            Verdict::Reject
        }
    }

    /// Produce the next decision map
    ///
    /// `index` is None when no roster is loaded; every participation is then
    /// treated as unmatched.
    pub fn recompute(
        &self,
        previous: &DecisionMap,
        index: Option<&AttendanceIndex>,
        participations: &[Participation],
    ) -> DecisionMap {
        let resolver = index.map(MatchResolver::new);
        let mut next = DecisionMap::new();

        for p in participations {
            let existing = previous.get(&p.id).copied();
            let attendance = resolver
                .as_ref()
                .and_then(|r| r.resolve(&p.student.external_registration_id));

            let decision = match (attendance, existing) {
                (None, Some(d)) if d.is_manual() => Some(d),
                (None, _) => None,
                (Some(a), Some(d)) if d.is_manual() => Some(d.with_attendance(a)),
                (Some(a), _) if p.status == ParticipationStatus::Pending => {
                    Some(Decision::auto(self.verdict_for(a), a))
                }
                (Some(a), existing) => existing.map(|d| d.with_attendance(a)),
            };

            if let Some(decision) = decision {
                next.insert(p.id.clone(), decision);
            }
        }

        next
    }
}

/// Number of decisions whose application would change persisted status
pub fn actionable_count(decisions: &DecisionMap, participations: &[Participation]) -> usize {
    participations
        .iter()
        .filter(|p| {
            decisions
                .get(&p.id)
                .is_some_and(|d| d.verdict.changes(p.status))
        })
        .count()
}

/// Counts for the decision map against the current participation list
pub fn tally(decisions: &DecisionMap, participations: &[Participation]) -> DecisionTally {
    let mut tally = DecisionTally {
        total: decisions.len(),
        actionable: actionable_count(decisions, participations),
        ..DecisionTally::default()
    };
    for decision in decisions.values() {
        match decision.verdict {
            Verdict::Approve => tally.approve += 1,
            Verdict::Reject => tally.reject += 1,
        }
        if decision.is_manual() {
            tally.manual += 1;
        } else {
            tally.auto += 1;
        }
    }
    tally
}

/// Reviewer-facing overview of the current decision state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSummary {
    pub tally: DecisionTally,
    /// Participations matched by the exact tier
    pub exact_matches: usize,
    /// Participations matched by the suffix tier
    pub suffix_matches: usize,
    /// Participations matched by the substring tier
    pub substring_matches: usize,
    /// Participations with no roster match, in list order
    pub unmatched: Vec<ParticipationId>,
}

/// Summarize decisions plus match provenance for the current list
pub fn summarize(
    decisions: &DecisionMap,
    index: Option<&AttendanceIndex>,
    participations: &[Participation],
) -> DecisionSummary {
    let mut summary = DecisionSummary {
        tally: tally(decisions, participations),
        exact_matches: 0,
        suffix_matches: 0,
        substring_matches: 0,
        unmatched: Vec::new(),
    };

    let Some(index) = index else {
        return summary;
    };
    let resolver = MatchResolver::new(index);

    let mut seen = HashSet::new();
    for p in participations {
        if !seen.insert(p.id.as_str()) {
            continue;
        }
        match resolver.resolve_with_tier(&p.student.external_registration_id) {
            Some(m) => match m.tier {
                MatchTier::Exact => summary.exact_matches += 1,
                MatchTier::Suffix => summary.suffix_matches += 1,
                MatchTier::Substring => summary.substring_matches += 1,
            },
            None => summary.unmatched.push(p.id.clone()),
        }
    }

    summary
}
