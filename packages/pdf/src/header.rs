//! Header row detection and column anchor inference.
//!
//! A row is a header *candidate* when its text contains one of the preset's
//! date labels. Titles and footnotes mention "date" too, so a candidate is
//! only accepted when one of the next `header_lookahead` rows actually
//! holds a date-shaped token. The accepted header's cell positions become
//! the column anchors used by anchor-based field extraction.

use timesheet_attendance_models::{ColumnAnchors, Row};
use timesheet_vendor::VendorPreset;

use crate::normalize::has_full_date_shape;

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

/// Returns `true` if `rows[index]` mentions a date label and is followed
/// within the lookahead window by a row with a date-shaped token.
fn is_validated_header(rows: &[Row], index: usize, preset: &VendorPreset) -> bool {
    if !contains_any(&rows[index].lowercase_text(), &preset.date_labels) {
        return false;
    }

    rows.iter()
        .skip(index + 1)
        .take(preset.header_lookahead)
        .any(|row| has_full_date_shape(&row.text()))
}

/// Reads column anchors off a validated header row.
fn anchors_from_header(header: &Row, preset: &VendorPreset) -> ColumnAnchors {
    let mut anchors = ColumnAnchors::default();

    for cell in &header.cells {
        let lower = cell.content.to_lowercase();

        if anchors.date.is_none() && contains_any(&lower, &preset.date_labels) {
            anchors.date = Some(cell.x);
        }

        // Aggregate columns ("Total Work Time", "Durasi Kerja") can contain
        // label substrings but never hold a punch time.
        if contains_any(&lower, &preset.exclusion_terms) {
            continue;
        }

        if contains_any(&lower, &preset.checkin_labels) {
            if anchors.checkin.is_none() {
                anchors.checkin = Some(cell.x);
            }
        } else if anchors.checkout.is_none() && contains_any(&lower, &preset.checkout_labels) {
            anchors.checkout = Some(cell.x);
        }
    }

    anchors
}

/// Scans rows top to bottom for the first validated header and returns
/// its column anchors.
///
/// Returns empty anchors when no row validates, which switches field
/// extraction to whole-row pattern matching for the page.
#[must_use]
pub fn infer_anchors(rows: &[Row], preset: &VendorPreset) -> ColumnAnchors {
    for (index, row) in rows.iter().enumerate() {
        if is_validated_header(rows, index, preset) {
            let anchors = anchors_from_header(row, preset);
            log::debug!(
                "Header row at y={:.1} ({:?}): date={:?} checkin={:?} checkout={:?}",
                row.y,
                row.text(),
                anchors.date,
                anchors.checkin,
                anchors.checkout
            );
            return anchors;
        }
    }

    log::debug!("No validated header row; falling back to pattern matching");
    ColumnAnchors::default()
}
