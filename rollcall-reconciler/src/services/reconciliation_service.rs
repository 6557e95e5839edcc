//! Reconciliation session state
//!
//! Owns the participation snapshot, the committed attendance index and the
//! decision map, and sequences every operation that touches them:
//!
//! - roster uploads (generation-guarded background builds)
//! - participation refreshes
//! - reviewer edits
//! - batch confirmation
//!
//! Every recompute replaces the decision map with a new `Arc` built from the
//! previous map, the current index and the current participations. Readers
//! holding an older `Arc` keep a consistent view.

use chrono::Utc;
use rollcall_common::config::ReconcilerConfig;
use rollcall_common::events::{DecisionTally, EventBus, ReconcileEvent};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::attendance_index::{AttendanceIndex, ChunkedIndexBuilder, IndexBuildReport};
use super::batch_reconciler::BatchReconciler;
use super::decision_engine::{self, DecisionEngine, DecisionSummary};
use super::identity_normalizer::normalize;
use super::manual_override;
use super::participation_store::{ParticipationStore, StoreError};
use super::spreadsheet_ingestor::{IngestError, ParsedRoster, SpreadsheetIngestor};
use crate::models::{
    BatchOutcome, Decision, DecisionMap, IngestFailure, IngestSession, Participation,
    ParticipationFilter, Verdict,
};

/// Errors surfaced by ReconciliationService operations
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Participation not found: {0}")]
    UnknownParticipation(String),

    #[error("A batch is already being confirmed")]
    BatchInProgress,

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How a roster build ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Index committed and decisions recomputed
    Committed {
        generation: u64,
        distinct_identifiers: usize,
        skipped_rows: usize,
    },
    /// A newer upload or a clear invalidated this build; nothing committed
    Superseded { generation: u64 },
}

struct ReconcileState {
    participations: Arc<Vec<Participation>>,
    filter: ParticipationFilter,
    index: Option<Arc<AttendanceIndex>>,
    decisions: Arc<DecisionMap>,
}

struct IngestSlot {
    session: IngestSession,
    cancel: CancellationToken,
}

/// Single owner of reconciliation state
pub struct ReconciliationService {
    store: Arc<dyn ParticipationStore>,
    ingestor: SpreadsheetIngestor,
    builder: ChunkedIndexBuilder,
    engine: DecisionEngine,
    batch: BatchReconciler,
    event_bus: EventBus,
    state: RwLock<ReconcileState>,
    ingest: Mutex<IngestSlot>,
    confirm_lock: tokio::sync::Mutex<()>,
}

impl ReconciliationService {
    pub fn new(
        config: &ReconcilerConfig,
        store: Arc<dyn ParticipationStore>,
        event_bus: EventBus,
    ) -> Self {
        let call_timeout = Duration::from_millis(config.store.request_timeout_ms);
        Self {
            ingestor: SpreadsheetIngestor::new(
                config.ingest.max_upload_bytes,
                config.ingest.header_scan_rows,
            ),
            builder: ChunkedIndexBuilder::new(config.ingest.chunk_size),
            engine: DecisionEngine::new(config.policy.attendance_threshold),
            batch: BatchReconciler::new(store.clone(), call_timeout),
            store,
            event_bus,
            state: RwLock::new(ReconcileState {
                participations: Arc::new(Vec::new()),
                filter: ParticipationFilter::default(),
                index: None,
                decisions: Arc::new(DecisionMap::new()),
            }),
            ingest: Mutex::new(IngestSlot {
                session: IngestSession::idle(0),
                cancel: CancellationToken::new(),
            }),
            confirm_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    fn slot(&self) -> MutexGuard<'_, IngestSlot> {
        self.ingest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Roster ingestion
    // ========================================================================

    /// Invalidate any in-flight build, drop the committed index and open a
    /// new generation
    ///
    /// Auto decisions from the previous roster are withdrawn at once so a
    /// confirm during the build cannot apply them.
    async fn begin_generation(
        &self,
        file_name: Option<String>,
        size_bytes: u64,
    ) -> (u64, CancellationToken) {
        let mut state = self.state.write().await;
        let (generation, cancel) = {
            let mut slot = self.slot();
            slot.cancel.cancel();
            let generation = slot.session.generation + 1;
            let cancel = CancellationToken::new();
            slot.cancel = cancel.clone();
            slot.session = IngestSession::begin(generation, file_name.clone());
            (generation, cancel)
        };
        state.index = None;
        let tally = self.recompute(&mut state);
        drop(state);

        info!(generation, file_name = ?file_name, size_bytes, "Roster ingestion started");
        self.event_bus.emit_lossy(ReconcileEvent::IngestStarted {
            generation,
            file_name,
            size_bytes,
            timestamp: Utc::now(),
        });
        self.emit_recomputed(tally);

        (generation, cancel)
    }

    /// Accept a workbook upload and build its index in the background
    ///
    /// Size and format are checked before anything else; a rejected upload
    /// leaves all state untouched. Returns the generation of the new build.
    pub async fn start_ingest(
        self: &Arc<Self>,
        bytes: Vec<u8>,
        file_name: Option<String>,
    ) -> Result<u64, IngestError> {
        self.ingestor.check_upload(&bytes)?;

        let (generation, cancel) = self
            .begin_generation(file_name, bytes.len() as u64)
            .await;
        let service = Arc::clone(self);

        tokio::spawn(async move {
            let ingestor = service.ingestor.clone();
            let parsed = tokio::task::spawn_blocking(move || ingestor.parse(bytes))
                .await
                .unwrap_or_else(|e| {
                    Err(IngestError::Workbook(format!("parser task failed: {}", e)))
                });

            if let Err(e) = service.build_and_commit(generation, cancel, parsed).await {
                debug!(generation, error = %e, "Background ingestion ended with error");
            }
        });

        Ok(generation)
    }

    /// Ingest rows that are already in tabular form, waiting for the commit
    pub async fn ingest_rows(
        &self,
        rows: Vec<Vec<String>>,
        file_name: Option<String>,
    ) -> Result<IngestOutcome, IngestError> {
        let (generation, cancel) = self.begin_generation(file_name, 0).await;
        let parsed = self
            .ingestor
            .locate(&rows)
            .map(|layout| ParsedRoster { rows, layout });
        self.build_and_commit(generation, cancel, parsed).await
    }

    async fn build_and_commit(
        &self,
        generation: u64,
        cancel: CancellationToken,
        parsed: Result<ParsedRoster, IngestError>,
    ) -> Result<IngestOutcome, IngestError> {
        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                self.fail_ingest(generation, &e).await;
                return Err(e);
            }
        };

        let built = self
            .builder
            .build(&parsed.rows, parsed.layout, &cancel, |processed, total| {
                self.report_progress(generation, processed, total)
            })
            .await;

        match built {
            Some((index, report)) => Ok(self.commit_index(generation, index, report).await),
            None => {
                info!(generation, "Roster build superseded, discarding");
                Ok(IngestOutcome::Superseded { generation })
            }
        }
    }

    fn report_progress(&self, generation: u64, processed: usize, total: usize) {
        let fraction = {
            let mut slot = self.slot();
            if slot.session.generation != generation {
                return;
            }
            slot.session.update_progress(processed, total);
            slot.session.progress.fraction
        };

        debug!(generation, processed, total, "Roster chunk indexed");
        self.event_bus.emit_lossy(ReconcileEvent::IngestProgress {
            generation,
            processed_rows: processed,
            total_rows: total,
            fraction,
            timestamp: Utc::now(),
        });
    }

    async fn commit_index(
        &self,
        generation: u64,
        index: AttendanceIndex,
        report: IndexBuildReport,
    ) -> IngestOutcome {
        let mut state = self.state.write().await;

        {
            let mut slot = self.slot();
            if slot.session.generation != generation {
                info!(generation, "Roster build finished after supersession, discarding");
                return IngestOutcome::Superseded { generation };
            }
            slot.session
                .complete(report.distinct_identifiers, report.skipped_rows);
        }

        state.index = Some(Arc::new(index));
        let tally = self.recompute(&mut state);
        drop(state);

        info!(
            generation,
            distinct_identifiers = report.distinct_identifiers,
            skipped_rows = report.skipped_rows,
            "Roster index committed"
        );
        self.event_bus.emit_lossy(ReconcileEvent::IngestCompleted {
            generation,
            distinct_identifiers: report.distinct_identifiers,
            skipped_rows: report.skipped_rows,
            timestamp: Utc::now(),
        });
        self.emit_recomputed(tally);

        IngestOutcome::Committed {
            generation,
            distinct_identifiers: report.distinct_identifiers,
            skipped_rows: report.skipped_rows,
        }
    }

    /// Parsing failed: reset to "not loaded" and notify
    async fn fail_ingest(&self, generation: u64, err: &IngestError) {
        let mut state = self.state.write().await;

        let failure = IngestFailure {
            code: err.code().to_string(),
            message: err.to_string(),
            guidance: err.guidance(),
        };
        {
            let mut slot = self.slot();
            if slot.session.generation != generation {
                return;
            }
            slot.session.fail(failure.clone());
        }

        state.index = None;
        let tally = self.recompute(&mut state);
        drop(state);

        warn!(
            generation,
            code = %failure.code,
            error = %failure.message,
            "Roster ingestion failed"
        );
        self.event_bus.emit_lossy(ReconcileEvent::IngestFailed {
            generation,
            code: failure.code,
            message: failure.message,
            guidance: failure.guidance,
            timestamp: Utc::now(),
        });
        self.emit_recomputed(tally);
    }

    /// Drop the index, cancel any in-flight build, and recompute
    pub async fn clear_attendance(&self) {
        let mut state = self.state.write().await;
        {
            let mut slot = self.slot();
            slot.cancel.cancel();
            let generation = slot.session.generation + 1;
            slot.cancel = CancellationToken::new();
            slot.session = IngestSession::idle(generation);
        }
        state.index = None;
        let tally = self.recompute(&mut state);
        drop(state);

        info!("Attendance index cleared");
        self.event_bus.emit_lossy(ReconcileEvent::AttendanceCleared {
            timestamp: Utc::now(),
        });
        self.emit_recomputed(tally);
    }

    pub fn ingest_status(&self) -> IngestSession {
        self.slot().session.clone()
    }

    pub async fn attendance_index(&self) -> Option<Arc<AttendanceIndex>> {
        self.state.read().await.index.clone()
    }

    // ========================================================================
    // Participations
    // ========================================================================

    /// Re-fetch the participation list with a new filter and recompute
    pub async fn refresh_participations(
        &self,
        filter: ParticipationFilter,
    ) -> Result<usize, StoreError> {
        let list = self.store.list(&filter).await?;
        let count = list.len();

        let mut state = self.state.write().await;
        state.filter = filter;
        state.participations = Arc::new(list);
        let tally = self.recompute(&mut state);
        drop(state);

        info!(count, "Participations refreshed");
        self.event_bus.emit_lossy(ReconcileEvent::ParticipationsRefreshed {
            count,
            timestamp: Utc::now(),
        });
        self.emit_recomputed(tally);
        Ok(count)
    }

    /// Re-fetch using the current filter
    pub async fn reload_participations(&self) -> Result<usize, StoreError> {
        let filter = self.state.read().await.filter.clone();
        self.refresh_participations(filter).await
    }

    pub async fn participations(&self) -> Arc<Vec<Participation>> {
        self.state.read().await.participations.clone()
    }

    pub async fn filter(&self) -> ParticipationFilter {
        self.state.read().await.filter.clone()
    }

    /// Case-insensitive lookup over name, email and registration id
    ///
    /// The registration id is compared in normalized form. A blank query
    /// returns the whole snapshot.
    pub async fn search(&self, query: &str) -> Vec<Participation> {
        let participations = self.participations().await;
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return participations.as_ref().clone();
        }
        let normalized = normalize(query);

        participations
            .iter()
            .filter(|p| {
                p.student.name.to_lowercase().contains(&needle)
                    || p.student.email.to_lowercase().contains(&needle)
                    || (!normalized.is_empty()
                        && normalize(&p.student.external_registration_id).contains(&normalized))
            })
            .cloned()
            .collect()
    }

    async fn find_participation(
        &self,
        participation_id: &str,
    ) -> Result<Participation, ServiceError> {
        self.participations()
            .await
            .iter()
            .find(|p| p.id == participation_id)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownParticipation(participation_id.to_string()))
    }

    // ========================================================================
    // Decisions
    // ========================================================================

    /// Replace the decision map from current inputs; caller holds the write lock
    fn recompute(&self, state: &mut ReconcileState) -> DecisionTally {
        let next = self.engine.recompute(
            &state.decisions,
            state.index.as_deref(),
            &state.participations,
        );
        let tally = decision_engine::tally(&next, &state.participations);
        state.decisions = Arc::new(next);
        tally
    }

    fn emit_recomputed(&self, tally: DecisionTally) {
        debug!(
            total = tally.total,
            actionable = tally.actionable,
            manual = tally.manual,
            "Decisions recomputed"
        );
        self.event_bus.emit_lossy(ReconcileEvent::DecisionsRecomputed {
            tally,
            timestamp: Utc::now(),
        });
    }

    pub async fn decisions(&self) -> Arc<DecisionMap> {
        self.state.read().await.decisions.clone()
    }

    pub async fn summary(&self) -> DecisionSummary {
        let state = self.state.read().await;
        decision_engine::summarize(
            &state.decisions,
            state.index.as_deref(),
            &state.participations,
        )
    }

    pub async fn actionable_count(&self) -> usize {
        let state = self.state.read().await;
        decision_engine::actionable_count(&state.decisions, &state.participations)
    }

    /// Draft verdict for the edit dialog
    pub async fn begin_edit(&self, participation_id: &str) -> Result<Verdict, ServiceError> {
        let participation = self.find_participation(participation_id).await?;
        let decisions = self.decisions().await;
        Ok(manual_override::begin_edit(&decisions, &participation))
    }

    /// Commit a reviewer draft; `None` removes the queued decision
    pub async fn commit_edit(
        &self,
        participation_id: &str,
        draft: Option<Verdict>,
    ) -> Result<Option<Decision>, ServiceError> {
        let mut state = self.state.write().await;
        if !state.participations.iter().any(|p| p.id == participation_id) {
            return Err(ServiceError::UnknownParticipation(participation_id.to_string()));
        }

        let next = manual_override::commit_edit(&state.decisions, participation_id, draft);
        let committed = next.get(participation_id).copied();
        state.decisions = Arc::new(next);
        drop(state);

        info!(participation_id, verdict = ?draft, "Decision edited");
        self.event_bus.emit_lossy(ReconcileEvent::DecisionEdited {
            participation_id: participation_id.to_string(),
            verdict: draft.map(|v| v.to_string()),
            timestamp: Utc::now(),
        });
        Ok(committed)
    }

    // ========================================================================
    // Store mutations
    // ========================================================================

    /// Apply every actionable decision, then refresh and recompute
    ///
    /// Only one batch runs at a time.
    pub async fn confirm(&self) -> Result<BatchOutcome, ServiceError> {
        let _guard = self
            .confirm_lock
            .try_lock()
            .map_err(|_| ServiceError::BatchInProgress)?;

        let (decisions, participations, filter) = {
            let state = self.state.read().await;
            (
                state.decisions.clone(),
                state.participations.clone(),
                state.filter.clone(),
            )
        };

        let run = self.batch.confirm(&decisions, &participations, &filter).await;

        if let Some(list) = run.refreshed {
            let count = list.len();
            let mut state = self.state.write().await;
            state.participations = Arc::new(list);
            let tally = self.recompute(&mut state);
            drop(state);

            self.event_bus.emit_lossy(ReconcileEvent::ParticipationsRefreshed {
                count,
                timestamp: Utc::now(),
            });
            self.emit_recomputed(tally);
        }

        let outcome = run.outcome;
        let summary = outcome.summary();
        self.event_bus.emit_lossy(ReconcileEvent::BatchCompleted {
            batch_id: outcome.batch_id,
            success_count: summary.success_count,
            failure_count: summary.failure_count,
            failures: outcome.failure_infos(),
            timestamp: Utc::now(),
        });

        Ok(outcome)
    }

    /// Set the attended flag on one participation, then refresh
    pub async fn mark_attendance(
        &self,
        participation_id: &str,
        attended: bool,
    ) -> Result<(), ServiceError> {
        self.find_participation(participation_id).await?;
        self.store.set_attendance(participation_id, attended).await?;

        info!(participation_id, attended, "Attendance marked");
        self.event_bus.emit_lossy(ReconcileEvent::AttendanceMarked {
            participation_id: participation_id.to_string(),
            attended,
            timestamp: Utc::now(),
        });

        if let Err(e) = self.reload_participations().await {
            warn!(participation_id, error = %e, "Refresh after attendance update failed");
        }
        Ok(())
    }
}
