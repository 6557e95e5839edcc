//! Test Helper Utilities
//!
//! In-memory participation store, fixture builders and a service factory
//! shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use rollcall_common::config::ReconcilerConfig;
use rollcall_common::events::{EventBus, ReconcileEvent};
use rollcall_reconciler::models::{
    EventSummary, Participation, ParticipationFilter, ParticipationStatus, Student,
};
use rollcall_reconciler::services::{ParticipationStore, ReconciliationService, StoreError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use rust_xlsxwriter::Workbook;
use tokio::sync::broadcast;

/// Participation store backed by a Vec
///
/// approve/reject update the stored status, so a post-batch refresh sees the
/// result. Ids in `failing` return HTTP 500.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<Vec<Participation>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    attendance: Mutex<HashMap<String, bool>>,
    list_fails: AtomicBool,
}

impl InMemoryStore {
    pub fn with(records: Vec<Participation>) -> Arc<Self> {
        let store = Self::default();
        *store.records.lock().unwrap() = records;
        Arc::new(store)
    }

    pub fn fail_for(&self, participation_id: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(participation_id.to_string());
    }

    pub fn set_list_fails(&self, fails: bool) {
        self.list_fails.store(fails, Ordering::SeqCst);
    }

    /// Mutation calls in order, as "action:id"
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn status_of(&self, participation_id: &str) -> Option<ParticipationStatus> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == participation_id)
            .map(|p| p.status)
    }

    pub fn attended(&self, participation_id: &str) -> Option<bool> {
        self.attendance
            .lock()
            .unwrap()
            .get(participation_id)
            .copied()
    }

    fn transition(&self, id: &str, action: &str, status: ParticipationStatus) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(format!("{}:{}", action, id));
        if self.failing.lock().unwrap().contains(id) {
            return Err(StoreError::Status {
                status: 500,
                body: format!("cannot {} {}", action, id),
            });
        }
        let mut records = self.records.lock().unwrap();
        match records.iter_mut().find(|p| p.id == id) {
            Some(p) => {
                p.status = status;
                Ok(())
            }
            None => Err(StoreError::Status {
                status: 404,
                body: format!("unknown participation {}", id),
            }),
        }
    }
}

#[async_trait]
impl ParticipationStore for InMemoryStore {
    async fn list(&self, filter: &ParticipationFilter) -> Result<Vec<Participation>, StoreError> {
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(StoreError::Network("connection refused".to_string()));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|p| filter.event_id.as_ref().map_or(true, |e| &p.event.id == e))
            .filter(|p| filter.status.map_or(true, |s| p.status == s))
            .cloned()
            .collect())
    }

    async fn approve(&self, participation_id: &str) -> Result<(), StoreError> {
        self.transition(participation_id, "approve", ParticipationStatus::Approved)
    }

    async fn reject(&self, participation_id: &str) -> Result<(), StoreError> {
        self.transition(participation_id, "reject", ParticipationStatus::Rejected)
    }

    async fn set_attendance(&self, participation_id: &str, attended: bool) -> Result<(), StoreError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("attendance:{}", participation_id));
        if self.failing.lock().unwrap().contains(participation_id) {
            return Err(StoreError::Network("reset by peer".to_string()));
        }
        self.attendance
            .lock()
            .unwrap()
            .insert(participation_id.to_string(), attended);
        Ok(())
    }
}

/// Participation fixture
pub fn participation(
    id: &str,
    registration_id: &str,
    status: ParticipationStatus,
) -> Participation {
    Participation {
        id: id.to_string(),
        student: Student {
            id: format!("student-{}", id),
            name: format!("Student {}", id.to_uppercase()),
            email: format!("{}@campus.example.edu", id),
            external_registration_id: registration_id.to_string(),
        },
        event: EventSummary {
            id: "event-1".to_string(),
            title: "Industry Workshop".to_string(),
            event_type: Some("workshop".to_string()),
            location: Some("Hall B".to_string()),
            start_date: None,
        },
        status,
        registered_at: None,
    }
}

/// Roster sheet: four preamble rows, header on row 5, then `(regd, total)` rows
pub fn roster(entries: &[(&str, &str)]) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = vec![
        vec!["Attendance Report".to_string()],
        vec!["Department of CSE".to_string()],
        vec![],
        vec!["Semester".to_string(), "II".to_string()],
        vec![
            "S.No".to_string(),
            "Regd No".to_string(),
            "Name".to_string(),
            "Total %".to_string(),
        ],
    ];
    for (i, (regd, total)) in entries.iter().enumerate() {
        rows.push(vec![
            (i + 1).to_string(),
            regd.to_string(),
            format!("Name {}", i + 1),
            total.to_string(),
        ]);
    }
    rows
}

/// Registration cell in a generated workbook
pub enum Regd<'a> {
    Text(&'a str),
    Number(f64),
}

/// xlsx roster: five preamble rows, header on the sixth row, numeric totals
pub fn roster_workbook(entries: &[(Regd<'_>, f64)]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Attendance Report").unwrap();
    sheet.write_string(1, 0, "Department of CSE").unwrap();
    sheet.write_string(3, 0, "Semester").unwrap();
    sheet.write_string(3, 1, "II").unwrap();
    sheet.write_string(4, 0, "Section A").unwrap();

    let header: u32 = 5;
    for (col, title) in ["S.No", "Regd No", "Name", "Total %"].iter().enumerate() {
        sheet.write_string(header, col as u16, *title).unwrap();
    }
    for (i, (regd, total)) in entries.iter().enumerate() {
        let row = header + 1 + i as u32;
        sheet.write_number(row, 0, (i + 1) as f64).unwrap();
        match regd {
            Regd::Text(text) => sheet.write_string(row, 1, *text),
            Regd::Number(number) => sheet.write_number(row, 1, *number),
        }
        .unwrap();
        sheet.write_string(row, 2, format!("Name {}", i + 1)).unwrap();
        sheet.write_number(row, 3, *total).unwrap();
    }

    workbook.save_to_buffer().unwrap()
}

pub fn test_config() -> ReconcilerConfig {
    let mut config = ReconcilerConfig::default();
    config.store.request_timeout_ms = 2_000;
    config
}

/// Service over `store` with its participation list already loaded
pub async fn service_with(
    config: ReconcilerConfig,
    store: Arc<InMemoryStore>,
) -> Arc<ReconciliationService> {
    let event_bus = EventBus::new(config.event_bus_capacity);
    let service = Arc::new(ReconciliationService::new(&config, store, event_bus));
    service
        .refresh_participations(ParticipationFilter::default())
        .await
        .unwrap();
    service
}

/// Wait for the first event matching `pred`
pub async fn wait_for_event<F>(
    rx: &mut broadcast::Receiver<ReconcileEvent>,
    mut pred: F,
) -> ReconcileEvent
where
    F: FnMut(&ReconcileEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}
