#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Attendance extraction from vendor timesheet PDFs.
//!
//! Timesheet exports carry no table markup, only positioned runs of text.
//! Each page goes through four stages:
//!
//! 1. [`extract`] replays the content stream and collects
//!    [`TextFragment`]s with their (x, y) positions.
//! 2. [`rows`] clusters fragments into visual rows by baseline.
//! 3. [`header`] finds the `Date | Check In | Check Out` header and records
//!    where each column sits.
//! 4. [`fields`] reads each row's date and times, either from under the
//!    header columns or, with no header, by pattern matching the row text.
//!
//! Per-page results are concatenated in page order. Vendor differences in
//! label vocabulary and spacing are handled by [`VendorPreset`]s.
//!
//! The primary entry points are [`parse_attendance`] for bytes already in
//! memory and [`parse_attendance_file`] for async callers.

pub mod cancel;
pub mod extract;
pub mod fields;
pub mod header;
pub mod metadata;
pub mod normalize;
pub mod progress;
pub mod rows;

use std::path::Path;
use std::sync::Arc;

use chrono::Datelike as _;
use timesheet_attendance_models::{EmployeeMetadata, ParsedAttendanceRow, TextFragment};
use timesheet_vendor::VendorPreset;

pub use cancel::CancellationFlag;
pub use progress::{NullProgress, ProgressCallback, null_progress};

/// Errors that can occur while parsing a timesheet.
#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    /// The bytes are not a decodable PDF.
    #[error("Document parse error: {0}")]
    Document(String),

    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The parse was cancelled before it finished.
    #[error("Parse cancelled")]
    Cancelled,

    /// The blocking decode task panicked or was aborted.
    #[error("Decode task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Runs row reconstruction, header inference, and field extraction over
/// one page's fragments.
#[must_use]
pub fn parse_page(
    fragments: &[TextFragment],
    preset: &VendorPreset,
    default_year: i32,
) -> Vec<ParsedAttendanceRow> {
    let rows = rows::reconstruct_rows(fragments, preset.y_tolerance);
    let anchors = header::infer_anchors(&rows, preset);
    fields::extract_attendance(&rows, &anchors, preset, default_year)
}

/// Parses already-extracted pages, concatenating results in page order.
#[must_use]
pub fn parse_pages(
    pages: &[Vec<TextFragment>],
    preset: &VendorPreset,
    default_year: i32,
) -> Vec<ParsedAttendanceRow> {
    pages
        .iter()
        .flat_map(|fragments| parse_page(fragments, preset, default_year))
        .collect()
}

/// Parses timesheet PDF bytes into attendance records.
///
/// Dates printed without a year are placed in the current calendar year.
///
/// # Errors
///
/// Returns [`AttendanceError::Document`] if the bytes are not a decodable
/// PDF.
pub fn parse_attendance(
    bytes: &[u8],
    preset: &VendorPreset,
) -> Result<Vec<ParsedAttendanceRow>, AttendanceError> {
    parse_attendance_with(bytes, preset, &CancellationFlag::new(), &NullProgress)
}

/// Like [`parse_attendance`], checking `cancel` before every page and
/// reporting page progress.
///
/// # Errors
///
/// Returns [`AttendanceError::Document`] if the bytes are not a decodable
/// PDF, or [`AttendanceError::Cancelled`] if `cancel` fires before the
/// last page is done. A cancelled parse returns no partial rows.
pub fn parse_attendance_with(
    bytes: &[u8],
    preset: &VendorPreset,
    cancel: &CancellationFlag,
    progress: &dyn ProgressCallback,
) -> Result<Vec<ParsedAttendanceRow>, AttendanceError> {
    let doc = extract::load_document(bytes)?;
    let pages = doc.get_pages();
    let default_year = chrono::Local::now().year();

    progress.set_total(pages.len() as u64);

    let mut records = Vec::new();
    for (number, page_id) in pages {
        if cancel.is_cancelled() {
            log::info!("Parse cancelled at page {number}");
            return Err(AttendanceError::Cancelled);
        }

        let fragments = extract::page_fragments(&doc, number, page_id);
        let page_records = parse_page(&fragments, preset, default_year);
        log::debug!(
            "Page {number}: {} fragments, {} records",
            fragments.len(),
            page_records.len()
        );
        records.extend(page_records);
        progress.set_message(format!("{} records", records.len()));
        progress.inc(1);
    }

    if cancel.is_cancelled() {
        return Err(AttendanceError::Cancelled);
    }

    log::info!(
        "Parsed {} attendance records with preset '{}'",
        records.len(),
        preset.id
    );
    progress.finish(format!("{} records", records.len()));

    Ok(records)
}

/// Reads a PDF from disk and parses it on the blocking thread pool.
///
/// # Errors
///
/// Returns [`AttendanceError::Io`] if the file cannot be read,
/// [`AttendanceError::Join`] if the decode task panics, or any error from
/// [`parse_attendance_with`].
pub async fn parse_attendance_file(
    path: impl AsRef<Path>,
    preset: VendorPreset,
    cancel: CancellationFlag,
    progress: Arc<dyn ProgressCallback>,
) -> Result<Vec<ParsedAttendanceRow>, AttendanceError> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    log::debug!("Read {} bytes from {}", bytes.len(), path.as_ref().display());

    tokio::task::spawn_blocking(move || {
        parse_attendance_with(&bytes, &preset, &cancel, progress.as_ref())
    })
    .await?
}

/// Searches the document's pages, in order, for employee identity.
///
/// Returns the first page's non-empty result, or empty metadata if no
/// page yields any.
///
/// # Errors
///
/// Returns [`AttendanceError::Document`] if the bytes are not a decodable
/// PDF.
pub fn parse_metadata(
    bytes: &[u8],
    preset: &VendorPreset,
) -> Result<EmployeeMetadata, AttendanceError> {
    let doc = extract::load_document(bytes)?;

    for (number, page_id) in doc.get_pages() {
        let fragments = extract::page_fragments(&doc, number, page_id);
        let rows = rows::reconstruct_rows(&fragments, preset.y_tolerance);
        let found = metadata::parse_employee_metadata(&rows, preset);
        if !found.is_empty() {
            return Ok(found);
        }
    }

    Ok(EmployeeMetadata::default())
}

/// Async counterpart of [`parse_metadata`] reading from disk.
///
/// # Errors
///
/// Returns [`AttendanceError::Io`] if the file cannot be read,
/// [`AttendanceError::Join`] if the decode task panics, or
/// [`AttendanceError::Document`] if the file is not a PDF.
pub async fn parse_metadata_file(
    path: impl AsRef<Path>,
    preset: VendorPreset,
) -> Result<EmployeeMetadata, AttendanceError> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    tokio::task::spawn_blocking(move || parse_metadata(&bytes, &preset)).await?
}

#[cfg(test)]
mod tests {
    use timesheet_vendor::registry::{default_preset, find_preset};

    use super::*;
    use crate::extract::build_pdf;

    const TABLE_PAGE: &str = "BT /F1 10 Tf \
        1 0 0 1 50 700 Tm (Date) Tj \
        1 0 0 1 150 700 Tm (Check In) Tj \
        1 0 0 1 250 700 Tm (Check Out) Tj \
        1 0 0 1 52 680 Tm (3-Nov-25) Tj \
        1 0 0 1 148 680 Tm (08.13) Tj \
        1 0 0 1 252 680 Tm (-) Tj \
        1 0 0 1 52 660 Tm (4-Nov-25) Tj \
        1 0 0 1 148 660 Tm (07:55) Tj \
        1 0 0 1 252 660 Tm (17:01) Tj \
        ET";

    const PATTERN_PAGE: &str = "BT /F1 10 Tf \
        1 0 0 1 50 700 Tm (27 November 2025) Tj \
        1 0 0 1 200 700 Tm (08:15) Tj \
        1 0 0 1 300 700 Tm (17:02) Tj \
        ET";

    fn record(date: &str, checkin: Option<&str>, checkout: Option<&str>) -> ParsedAttendanceRow {
        ParsedAttendanceRow {
            date: date.to_owned(),
            checkin: checkin.map(str::to_owned),
            checkout: checkout.map(str::to_owned),
        }
    }

    #[test]
    fn parses_anchored_table() {
        let out = parse_attendance(&build_pdf(&[TABLE_PAGE]), &default_preset()).unwrap();
        assert_eq!(
            out,
            vec![
                record("2025-11-03", Some("08:13"), None),
                record("2025-11-04", Some("07:55"), Some("17:01")),
            ]
        );
    }

    #[test]
    fn concatenates_pages_in_order() {
        let pdf = build_pdf(&[TABLE_PAGE, "0 0 612 792 re f", PATTERN_PAGE]);
        let out = parse_attendance(&pdf, &default_preset()).unwrap();
        let dates: Vec<&str> = out.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2025-11-03", "2025-11-04", "2025-11-27"]);
        assert_eq!(out[2], record("2025-11-27", Some("08:15"), Some("17:02")));
    }

    #[test]
    fn image_only_page_is_empty_not_an_error() {
        let out = parse_attendance(&build_pdf(&["0 0 612 792 re f"]), &default_preset()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn invalid_bytes_are_a_document_error() {
        let err = parse_attendance(b"not a pdf at all", &default_preset()).unwrap_err();
        assert!(matches!(err, AttendanceError::Document(_)));
    }

    #[test]
    fn cancelled_parse_is_distinct_from_empty() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let err = parse_attendance_with(
            &build_pdf(&[TABLE_PAGE]),
            &default_preset(),
            &cancel,
            &NullProgress,
        )
        .unwrap_err();
        assert!(matches!(err, AttendanceError::Cancelled));
    }

    /// Fires the cancellation flag once the first page is reported done.
    struct CancelAfterFirstPage {
        cancel: CancellationFlag,
        messages: std::sync::Mutex<Vec<String>>,
    }

    impl ProgressCallback for CancelAfterFirstPage {
        fn set_total(&self, _pages: u64) {}

        fn inc(&self, _pages: u64) {
            self.cancel.cancel();
        }

        fn set_message(&self, msg: String) {
            self.messages.lock().unwrap().push(msg);
        }

        fn finish(&self, msg: String) {
            panic!("cancelled parse must not finish: {msg}");
        }
    }

    #[test]
    fn cancelling_between_pages_returns_no_partial_rows() {
        let cancel = CancellationFlag::new();
        let progress = CancelAfterFirstPage {
            cancel: cancel.clone(),
            messages: std::sync::Mutex::new(Vec::new()),
        };
        let err = parse_attendance_with(
            &build_pdf(&[TABLE_PAGE, PATTERN_PAGE]),
            &default_preset(),
            &cancel,
            &progress,
        )
        .unwrap_err();
        assert!(matches!(err, AttendanceError::Cancelled));
        assert_eq!(*progress.messages.lock().unwrap(), vec!["2 records"]);
    }

    #[test]
    fn parse_pages_matches_document_parse() {
        let pdf = build_pdf(&[TABLE_PAGE]);
        let pages = extract::extract_fragments(&pdf).unwrap();
        let year = chrono::Local::now().year();
        assert_eq!(
            parse_pages(&pages, &default_preset(), year),
            parse_attendance(&pdf, &default_preset()).unwrap()
        );
    }

    #[test]
    fn reads_metadata_from_header() {
        let pdf = build_pdf(&["BT /F1 10 Tf \
            1 0 0 1 50 760 Tm (PIN) Tj \
            1 0 0 1 90 760 Tm (: 1042) Tj \
            1 0 0 1 50 745 Tm (Nama) Tj \
            1 0 0 1 90 745 Tm (: Dewi Lestari) Tj \
            ET"]);
        let meta = parse_metadata(&pdf, &find_preset("fingerspot").unwrap()).unwrap();
        assert_eq!(meta.employee_id.as_deref(), Some("1042"));
        assert_eq!(meta.name.as_deref(), Some("Dewi Lestari"));
    }

    #[tokio::test]
    async fn parses_file_on_blocking_pool() {
        let path = std::env::temp_dir().join(format!(
            "timesheet-pdf-{}-parse.pdf",
            std::process::id()
        ));
        tokio::fs::write(&path, build_pdf(&[PATTERN_PAGE])).await.unwrap();

        let out = parse_attendance_file(
            &path,
            default_preset(),
            CancellationFlag::new(),
            null_progress(),
        )
        .await;
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(
            out.unwrap(),
            vec![record("2025-11-27", Some("08:15"), Some("17:02"))]
        );
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let err = parse_attendance_file(
            "/nonexistent/timesheet.pdf",
            default_preset(),
            CancellationFlag::new(),
            null_progress(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttendanceError::Io(_)));
    }
}
