//! Attendance index and its chunked builder
//!
//! The index maps normalized registration numbers to attendance percentages.
//! It is built once per upload and never mutated after it is committed; a new
//! upload produces a new index.
//!
//! The builder walks the data rows in fixed-size chunks and yields to the
//! runtime between chunks, so a 100k-row roster never monopolizes a worker
//! thread. Cancellation is checked between chunks.

use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

use super::identity_normalizer::normalize;
use super::spreadsheet_ingestor::RosterLayout;

/// Normalized identifier → attendance percentage
///
/// Keys remember the roster row where they first appeared; fallback matching
/// walks keys in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceIndex {
    entries: HashMap<String, f64>,
    key_order: Vec<String>,
}

impl AttendanceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a percentage
    ///
    /// Overwriting keeps the key's original row position.
    pub fn insert(&mut self, key: String, percentage: f64) {
        if self.entries.insert(key.clone(), percentage).is_none() {
            self.key_order.push(key);
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.get(key).copied()
    }

    /// Keys with their percentages in first-occurrence row order
    pub fn iter_in_row_order(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.key_order
            .iter()
            .map(move |key| (key.as_str(), self.entries[key]))
    }

    /// Distinct identifiers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build synchronously from parsed rows (no chunking)
    pub fn from_rows(rows: &[Vec<String>], layout: RosterLayout) -> (Self, IndexBuildReport) {
        let mut index = Self::new();
        let mut report = IndexBuildReport::default();
        for row in data_rows(rows, layout) {
            index_row(&mut index, &mut report, row, layout);
        }
        report.distinct_identifiers = index.len();
        (index, report)
    }
}

/// Counts reported when a build finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexBuildReport {
    /// Data rows examined (rows after the header)
    pub processed_rows: usize,
    /// Rows omitted for a missing identifier or percentage
    pub skipped_rows: usize,
    /// Distinct normalized identifiers in the index
    pub distinct_identifiers: usize,
}

/// Rows after the header
fn data_rows(rows: &[Vec<String>], layout: RosterLayout) -> &[Vec<String>] {
    rows.get(layout.header_row + 1..).unwrap_or(&[])
}

/// Extract `(normalized id, percentage)` from a data row
///
/// Returns None (a row skip) when the identifier or percentage cell is
/// missing or blank, or the identifier has no alphanumeric characters.
pub fn parse_row(row: &[String], layout: RosterLayout) -> Option<(String, f64)> {
    let identifier = row.get(layout.identifier_column)?.trim();
    let percentage = row.get(layout.percentage_column)?.trim();
    if identifier.is_empty() || percentage.is_empty() {
        return None;
    }

    let key = normalize(identifier);
    if key.is_empty() {
        return None;
    }

    Some((key, parse_percentage(percentage)))
}

fn index_row(
    index: &mut AttendanceIndex,
    report: &mut IndexBuildReport,
    row: &[String],
    layout: RosterLayout,
) {
    report.processed_rows += 1;
    match parse_row(row, layout) {
        Some((key, percentage)) => index.insert(key, percentage),
        None => report.skipped_rows += 1,
    }
}

/// Parse the leading decimal number of a cell, or 0 when there is none
///
/// "82" → 82, "82.5 %" → 82.5, "N/A" → 0.
pub fn parse_percentage(raw: &str) -> f64 {
    let s = raw.trim();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return 0.0;
    }

    // Optional exponent, only when followed by at least one digit
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().unwrap_or(0.0)
}

/// Cooperative, cancellable index builder
#[derive(Debug, Clone, Copy)]
pub struct ChunkedIndexBuilder {
    chunk_size: usize,
}

impl ChunkedIndexBuilder {
    /// `chunk_size` of 0 is treated as 1
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Build the index chunk by chunk
    ///
    /// `on_progress(processed, total)` is called after every chunk, then the
    /// task yields. Returns None if `cancel` fires before the build finishes.
    pub async fn build<F>(
        &self,
        rows: &[Vec<String>],
        layout: RosterLayout,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Option<(AttendanceIndex, IndexBuildReport)>
    where
        F: FnMut(usize, usize),
    {
        let data = data_rows(rows, layout);
        let total = data.len();
        let mut index = AttendanceIndex::new();
        let mut report = IndexBuildReport::default();

        for chunk in data.chunks(self.chunk_size) {
            if cancel.is_cancelled() {
                return None;
            }

            for row in chunk {
                index_row(&mut index, &mut report, row, layout);
            }

            on_progress(report.processed_rows, total);
            tokio::task::yield_now().await;
        }

        if cancel.is_cancelled() {
            return None;
        }

        report.distinct_identifiers = index.len();
        Some((index, report))
    }
}
