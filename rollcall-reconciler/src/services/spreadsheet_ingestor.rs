//! Attendance roster workbook parsing
//!
//! Turns an uploaded workbook into raw string rows and locates the roster
//! header. Size and format checks run before any parsing so a rejected upload
//! never touches the attendance index.
//!
//! # Header contract
//! Within the first `header_scan_rows` rows, the first row whose concatenated
//! cell text contains both "REGD" and "TOTAL" (case-insensitive) is the
//! header. The first cell containing "REGD" marks the identifier column and
//! the first cell containing "TOTAL" marks the percentage column.

use calamine::{open_workbook_auto_from_rs, Reader};
use std::io::Cursor;
use thiserror::Error;

/// Header marker for the registration number column
pub const IDENTIFIER_MARKER: &str = "REGD";

/// Header marker for the attendance percentage column
pub const PERCENTAGE_MARKER: &str = "TOTAL";

/// Fatal roster ingestion errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// Upload exceeds the configured cap
    #[error("Workbook is {size} bytes, larger than the {max} byte limit")]
    FileTooLarge { size: u64, max: u64 },

    /// Leading bytes do not match any supported workbook container
    #[error("File is not a recognized spreadsheet workbook")]
    UnrecognizedFormat,

    /// Container recognized but the workbook could not be read
    #[error("Workbook could not be read: {0}")]
    Workbook(String),

    /// Workbook has no worksheets
    #[error("Workbook contains no worksheets")]
    EmptyWorkbook,

    /// No qualifying header row in the scan window
    #[error("No header row containing \"REGD\" and \"TOTAL\" found in the first {scanned} rows")]
    HeaderNotFound { scanned: usize },

    /// Header row lacks one of the required columns
    #[error("Header row {row} has no column containing \"{column}\"")]
    ColumnNotFound { row: usize, column: &'static str },
}

impl IngestError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            IngestError::UnrecognizedFormat => "UNRECOGNIZED_FORMAT",
            IngestError::Workbook(_) => "WORKBOOK_UNREADABLE",
            IngestError::EmptyWorkbook => "EMPTY_WORKBOOK",
            IngestError::HeaderNotFound { .. } => "HEADER_NOT_FOUND",
            IngestError::ColumnNotFound { .. } => "COLUMN_NOT_FOUND",
        }
    }

    /// Corrective guidance for the reviewer
    pub fn guidance(&self) -> String {
        match self {
            IngestError::FileTooLarge { max, .. } => format!(
                "Split the roster or remove unused sheets so the file is under {} MB.",
                max / (1024 * 1024)
            ),
            IngestError::UnrecognizedFormat => {
                "Upload an Excel (.xlsx, .xlsm, .xlsb, .xls) or OpenDocument (.ods) workbook."
                    .to_string()
            }
            IngestError::Workbook(_) | IngestError::EmptyWorkbook => {
                "Re-export the roster from the attendance system and upload it again.".to_string()
            }
            IngestError::HeaderNotFound { .. } => {
                "Make sure the first sheet has a header row with a \"Regd No\" column and a \"Total %\" column."
                    .to_string()
            }
            IngestError::ColumnNotFound { column, .. } => format!(
                "Add a column whose heading contains \"{}\" to the header row.",
                column
            ),
        }
    }
}

/// Workbook container detected from magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
    /// ZIP container (xlsx, xlsm, xlsb, ods)
    Zip,
    /// OLE compound document (xls)
    Ole,
}

/// Detect the workbook container from leading bytes
pub fn sniff_format(bytes: &[u8]) -> Option<WorkbookFormat> {
    match bytes {
        [b'P', b'K', 0x03, 0x04, ..] => Some(WorkbookFormat::Zip),
        [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, ..] => Some(WorkbookFormat::Ole),
        _ => None,
    }
}

/// Position of the header and the two roster columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterLayout {
    /// Zero-based index of the header row
    pub header_row: usize,
    /// Column holding registration numbers
    pub identifier_column: usize,
    /// Column holding attendance percentages
    pub percentage_column: usize,
}

/// Parsed first worksheet plus its located layout
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRoster {
    pub rows: Vec<Vec<String>>,
    pub layout: RosterLayout,
}

/// Find the first qualifying header row within `scan_rows` rows
pub fn locate_header(rows: &[Vec<String>], scan_rows: usize) -> Result<usize, IngestError> {
    let window = scan_rows.min(rows.len());
    rows[..window]
        .iter()
        .position(|row| {
            let joined = row.concat().to_uppercase();
            joined.contains(IDENTIFIER_MARKER) && joined.contains(PERCENTAGE_MARKER)
        })
        .ok_or(IngestError::HeaderNotFound { scanned: window })
}

/// Locate the identifier and percentage columns in the header row
pub fn locate_columns(rows: &[Vec<String>], header_row: usize) -> Result<RosterLayout, IngestError> {
    let header = rows.get(header_row).map(Vec::as_slice).unwrap_or(&[]);
    let find = |marker: &'static str| {
        header
            .iter()
            .position(|cell| cell.to_uppercase().contains(marker))
            .ok_or(IngestError::ColumnNotFound {
                row: header_row,
                column: marker,
            })
    };

    Ok(RosterLayout {
        header_row,
        identifier_column: find(IDENTIFIER_MARKER)?,
        percentage_column: find(PERCENTAGE_MARKER)?,
    })
}

/// Workbook parser with size and header-scan limits
#[derive(Debug, Clone)]
pub struct SpreadsheetIngestor {
    max_upload_bytes: u64,
    header_scan_rows: usize,
}

impl SpreadsheetIngestor {
    pub fn new(max_upload_bytes: u64, header_scan_rows: usize) -> Self {
        Self {
            max_upload_bytes,
            header_scan_rows,
        }
    }

    /// Size and format gate, run before any parsing
    pub fn check_upload(&self, bytes: &[u8]) -> Result<WorkbookFormat, IngestError> {
        let size = bytes.len() as u64;
        if size > self.max_upload_bytes {
            return Err(IngestError::FileTooLarge {
                size,
                max: self.max_upload_bytes,
            });
        }
        sniff_format(bytes).ok_or(IngestError::UnrecognizedFormat)
    }

    /// Read the first worksheet as trimmed string cells
    ///
    /// CPU-bound; callers on the async runtime should use `spawn_blocking`.
    pub fn read_rows(&self, bytes: Vec<u8>) -> Result<Vec<Vec<String>>, IngestError> {
        self.check_upload(&bytes)?;

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| IngestError::Workbook(e.to_string()))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or(IngestError::EmptyWorkbook)?
            .map_err(|e| IngestError::Workbook(e.to_string()))?;

        let rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect())
            .collect();

        Ok(rows)
    }

    /// Locate header and columns in already-read rows
    pub fn locate(&self, rows: &[Vec<String>]) -> Result<RosterLayout, IngestError> {
        let header_row = locate_header(rows, self.header_scan_rows)?;
        locate_columns(rows, header_row)
    }

    /// Full parse: gate, read, locate
    pub fn parse(&self, bytes: Vec<u8>) -> Result<ParsedRoster, IngestError> {
        let rows = self.read_rows(bytes)?;
        let layout = self.locate(&rows)?;

        tracing::debug!(
            rows = rows.len(),
            header_row = layout.header_row,
            identifier_column = layout.identifier_column,
            percentage_column = layout.percentage_column,
            "Roster header located"
        );

        Ok(ParsedRoster { rows, layout })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn roster_with_header_at(index: usize) -> Vec<Vec<String>> {
        let mut rows: Vec<Vec<String>> = (0..index)
            .map(|i| row(&["Attendance report", &format!("line {}", i)]))
            .collect();
        rows.push(row(&["S.No", "Regd No", "Name", "Total %"]));
        rows.push(row(&["1", "231FA04C33", "Asha", "82"]));
        rows
    }

    #[test]
    fn test_locate_header_at_row_five() {
        let rows = roster_with_header_at(5);
        let ingestor = SpreadsheetIngestor::new(1024, 100);
        let layout = ingestor.locate(&rows).unwrap();
        assert_eq!(
            layout,
            RosterLayout {
                header_row: 5,
                identifier_column: 1,
                percentage_column: 3,
            }
        );
    }

    #[test]
    fn test_header_match_is_case_insensitive_and_first_wins() {
        let rows = vec![
            row(&["regd number", "total"]),
            row(&["REGD", "TOTAL"]),
        ];
        assert_eq!(locate_header(&rows, 100).unwrap(), 0);
    }

    #[test]
    fn test_header_outside_scan_window_is_not_found() {
        let rows = roster_with_header_at(10);
        assert_eq!(
            locate_header(&rows, 5),
            Err(IngestError::HeaderNotFound { scanned: 5 })
        );
    }

    #[test]
    fn test_header_requires_both_markers() {
        let rows = vec![row(&["Regd No", "Name", "Percentage"])];
        assert!(matches!(
            locate_header(&rows, 100),
            Err(IngestError::HeaderNotFound { .. })
        ));
    }

    #[test]
    fn test_markers_split_across_cells_fail_column_location() {
        // Concatenation qualifies the row, but no single cell holds "REGD".
        let rows = vec![row(&["RE", "GD", "Total"])];
        assert_eq!(locate_header(&rows, 100).unwrap(), 0);
        assert_eq!(
            locate_columns(&rows, 0),
            Err(IngestError::ColumnNotFound {
                row: 0,
                column: IDENTIFIER_MARKER,
            })
        );
    }

    #[test]
    fn test_check_upload_rejects_oversized_file_before_sniffing() {
        let ingestor = SpreadsheetIngestor::new(8, 100);
        let bytes = vec![b'x'; 9];
        assert_eq!(
            ingestor.check_upload(&bytes),
            Err(IngestError::FileTooLarge { size: 9, max: 8 })
        );
    }

    #[test]
    fn test_check_upload_rejects_unknown_format() {
        let ingestor = SpreadsheetIngestor::new(1024, 100);
        assert_eq!(
            ingestor.check_upload(b"Regd No,Total %\n"),
            Err(IngestError::UnrecognizedFormat)
        );
    }

    #[test]
    fn test_sniff_format() {
        assert_eq!(sniff_format(b"PK\x03\x04rest"), Some(WorkbookFormat::Zip));
        assert_eq!(
            sniff_format(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0x00]),
            Some(WorkbookFormat::Ole)
        );
        assert_eq!(sniff_format(b"PK"), None);
    }

    #[test]
    fn test_corrupt_zip_is_workbook_error() {
        let ingestor = SpreadsheetIngestor::new(1024, 100);
        let result = ingestor.read_rows(b"PK\x03\x04 definitely not a workbook".to_vec());
        assert!(matches!(result, Err(IngestError::Workbook(_))));
    }

    #[test]
    fn test_parse_xlsx_with_numeric_cells() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Attendance report").unwrap();
        sheet.write_string(2, 0, "Regd No").unwrap();
        sheet.write_string(2, 1, "Name").unwrap();
        sheet.write_string(2, 2, "Total %").unwrap();
        sheet.write_number(3, 0, 12345.0).unwrap();
        sheet.write_string(3, 1, " Asha ").unwrap();
        sheet.write_number(3, 2, 74.5).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let parsed = SpreadsheetIngestor::new(1 << 20, 100).parse(bytes).unwrap();
        assert_eq!(
            parsed.layout,
            RosterLayout {
                header_row: 2,
                identifier_column: 0,
                percentage_column: 2,
            }
        );
        assert_eq!(parsed.rows[1], row(&["", "", ""]));
        assert_eq!(parsed.rows[3], row(&["12345", "Asha", "74.5"]));
    }

    #[test]
    fn test_error_codes_and_guidance() {
        let err = IngestError::ColumnNotFound {
            row: 2,
            column: PERCENTAGE_MARKER,
        };
        assert_eq!(err.code(), "COLUMN_NOT_FOUND");
        assert!(err.guidance().contains("TOTAL"));
        assert_eq!(IngestError::UnrecognizedFormat.code(), "UNRECOGNIZED_FORMAT");
    }
}
