//! Field extraction: turns reconstructed rows into attendance records.
//!
//! Two modes, chosen per page:
//!
//! - **Anchor mode** (any column anchor detected): values are read from
//!   the cells sitting under each header within `x_tolerance`.
//! - **Pattern mode** (no anchors): each row's concatenated text is
//!   searched for a date token and the first two time tokens.
//!
//! Rows whose date cannot be normalized are dropped with a debug log.

use timesheet_attendance_models::{ColumnAnchors, ParsedAttendanceRow, Row, TextFragment};
use timesheet_vendor::VendorPreset;

use crate::normalize::{
    find_broad_dates, find_times, has_full_date_shape, has_partial_date_shape, is_placeholder,
    is_time_shaped, normalize_date_in_year, normalize_time, take_time,
};

fn cells_near(row: &Row, anchor: f64, tolerance: f64) -> impl Iterator<Item = &TextFragment> {
    row.cells
        .iter()
        .filter(move |cell| (cell.x - anchor).abs() <= tolerance)
}

/// Closest time-shaped, non-placeholder cell under `anchor`, normalized.
fn anchored_time(row: &Row, anchor: Option<f64>, tolerance: f64) -> Option<String> {
    let anchor = anchor?;
    cells_near(row, anchor, tolerance)
        .filter(|cell| !is_placeholder(&cell.content) && is_time_shaped(&cell.content))
        .min_by(|a, b| (a.x - anchor).abs().total_cmp(&(b.x - anchor).abs()))
        .and_then(|cell| normalize_time(&cell.content))
}

/// Date text under the date anchor, plus any time token embedded in it.
fn anchored_date(row: &Row, anchor: f64, tolerance: f64) -> (String, Option<String>) {
    let joined = cells_near(row, anchor, tolerance)
        .map(|cell| cell.content.trim())
        .collect::<Vec<_>>()
        .join(" ");

    match take_time(&joined) {
        Some((rest, time)) => (rest, normalize_time(time)),
        None => (joined, None),
    }
}

fn first_normalized_date(text: &str, default_year: i32) -> Option<String> {
    find_broad_dates(text)
        .into_iter()
        .find_map(|candidate| normalize_date_in_year(&candidate, default_year))
}

fn extract_anchored_row(
    row: &Row,
    anchors: &ColumnAnchors,
    preset: &VendorPreset,
    default_year: i32,
) -> Option<ParsedAttendanceRow> {
    let tolerance = preset.x_tolerance;

    let (date, de_facto_checkin) = if let Some(anchor) = anchors.date {
        let (text, embedded) = anchored_date(row, anchor, tolerance);
        if !has_full_date_shape(&text) && !has_partial_date_shape(&text) {
            log::debug!("Dropping row at y={:.1}: no date shape in {text:?}", row.y);
            return None;
        }
        let Some(date) = normalize_date_in_year(&text, default_year) else {
            log::debug!("Dropping row at y={:.1}: unrecognized date {text:?}", row.y);
            return None;
        };
        (date, embedded)
    } else {
        let text = row.text();
        let Some(date) = first_normalized_date(&text, default_year) else {
            log::debug!("Dropping row at y={:.1}: no date in {text:?}", row.y);
            return None;
        };
        (date, None)
    };

    let mut checkin = anchored_time(row, anchors.checkin, tolerance).or(de_facto_checkin);
    let mut checkout = anchored_time(row, anchors.checkout, tolerance);

    // Only slots whose column was never detected may borrow from the row.
    // A detected column that is empty for this row stays empty.
    let checkin_open = checkin.is_none() && anchors.checkin.is_none();
    let checkout_open = checkout.is_none() && anchors.checkout.is_none();
    if checkin_open || checkout_open {
        let text = row.text();
        let times = find_times(&text);
        if checkin_open {
            checkin = times.first().and_then(|t| normalize_time(t));
        }
        if checkout_open {
            checkout = times.get(1).and_then(|t| normalize_time(t));
        }
    }

    Some(ParsedAttendanceRow {
        date,
        checkin,
        checkout,
    })
}

fn extract_pattern_row(row: &Row, default_year: i32) -> Option<ParsedAttendanceRow> {
    let text = row.text();
    let Some(date) = first_normalized_date(&text, default_year) else {
        log::debug!("Dropping row at y={:.1}: no date in {text:?}", row.y);
        return None;
    };

    let times = find_times(&text);
    Some(ParsedAttendanceRow {
        date,
        checkin: times.first().and_then(|t| normalize_time(t)),
        checkout: times.get(1).and_then(|t| normalize_time(t)),
    })
}

/// Extracts attendance records from one page's rows.
///
/// `default_year` fills in dates printed without a year. Output preserves
/// row order and never has more entries than `rows`.
#[must_use]
pub fn extract_attendance(
    rows: &[Row],
    anchors: &ColumnAnchors,
    preset: &VendorPreset,
    default_year: i32,
) -> Vec<ParsedAttendanceRow> {
    let records: Vec<ParsedAttendanceRow> = if anchors.is_empty() {
        rows.iter()
            .filter_map(|row| extract_pattern_row(row, default_year))
            .collect()
    } else {
        rows.iter()
            .filter_map(|row| extract_anchored_row(row, anchors, preset, default_year))
            .collect()
    };

    log::debug!(
        "Extracted {} of {} rows ({} mode)",
        records.len(),
        rows.len(),
        if anchors.is_empty() { "pattern" } else { "anchor" }
    );

    records
}
