//! Confirmed batch execution
//!
//! Applies actionable decisions to the ParticipationStore one at a time, in
//! participation list order. Each remote call is isolated: a failure or a
//! timeout is recorded against that participation and the pass continues.
//! After the pass the participation list is re-fetched.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::participation_store::{ParticipationStore, StoreError};
use crate::models::{
    BatchOutcome, DecisionMap, Participation, ParticipationFilter, ParticipationId, Verdict,
};

/// Result of one confirm pass
#[derive(Debug, Clone)]
pub struct BatchRun {
    pub outcome: BatchOutcome,
    /// Post-batch participation list, None when the refresh failed
    pub refreshed: Option<Vec<Participation>>,
}

/// Decisions that would change persisted status, in list order
pub fn actionable_items(
    decisions: &DecisionMap,
    participations: &[Participation],
) -> Vec<(ParticipationId, Verdict)> {
    let mut seen = HashSet::new();
    participations
        .iter()
        .filter(|p| seen.insert(p.id.as_str()))
        .filter_map(|p| {
            decisions
                .get(&p.id)
                .filter(|d| d.verdict.changes(p.status))
                .map(|d| (p.id.clone(), d.verdict))
        })
        .collect()
}

/// Sequential executor over a ParticipationStore
#[derive(Clone)]
pub struct BatchReconciler {
    store: Arc<dyn ParticipationStore>,
    call_timeout: Duration,
}

impl BatchReconciler {
    pub fn new(store: Arc<dyn ParticipationStore>, call_timeout: Duration) -> Self {
        Self {
            store,
            call_timeout,
        }
    }

    /// Apply one verdict, bounded by the per-call timeout
    async fn apply(&self, participation_id: &str, verdict: Verdict) -> Result<(), StoreError> {
        let call = async {
            match verdict {
                Verdict::Approve => self.store.approve(participation_id).await,
                Verdict::Reject => self.store.reject(participation_id).await,
            }
        };

        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.call_timeout.as_millis() as u64)),
        }
    }

    /// Execute every actionable decision, then refresh the list
    ///
    /// Never fails as a whole; per-item errors land in the outcome.
    pub async fn confirm(
        &self,
        decisions: &DecisionMap,
        participations: &[Participation],
        filter: &ParticipationFilter,
    ) -> BatchRun {
        let items = actionable_items(decisions, participations);
        let mut outcome = BatchOutcome::new();

        info!(
            batch_id = %outcome.batch_id,
            actionable = items.len(),
            "Confirming batch"
        );

        for (participation_id, verdict) in items {
            let result = self.apply(&participation_id, verdict).await;
            if let Err(e) = &result {
                warn!(
                    batch_id = %outcome.batch_id,
                    participation_id = %participation_id,
                    action = %verdict,
                    error = %e,
                    "Remote mutation failed"
                );
            }
            outcome.record(participation_id, verdict, result.map_err(|e| e.to_string()));
        }
        outcome.finish();

        let summary = outcome.summary();
        info!(
            batch_id = %outcome.batch_id,
            success_count = summary.success_count,
            failure_count = summary.failure_count,
            "Batch complete"
        );

        let refreshed = match self.store.list(filter).await {
            Ok(list) => Some(list),
            Err(e) => {
                warn!(
                    batch_id = %outcome.batch_id,
                    error = %e,
                    "Post-batch participation refresh failed"
                );
                None
            }
        };

        BatchRun { outcome, refreshed }
    }
}
