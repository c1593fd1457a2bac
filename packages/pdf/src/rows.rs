//! Row reconstruction from positioned text fragments.
//!
//! PDF text layers carry no table structure, only runs of text at (x, y)
//! coordinates. Fragments whose baselines sit within `y_tolerance` of each
//! other are treated as one visual table line.
//!
//! Clustering is greedy: each fragment joins the first existing row within
//! tolerance, in fragment order. Vendor PDFs have well-separated lines, so
//! this is good enough; evenly spaced baselines right at the tolerance can
//! merge or split rows.

use timesheet_attendance_models::{Row, TextFragment};

/// Groups one page's fragments into rows.
///
/// Rows come back top of page first (descending `y`) with cells left to
/// right (ascending `x`). Fragments that are blank after trimming are
/// dropped.
#[must_use]
pub fn reconstruct_rows(fragments: &[TextFragment], y_tolerance: f64) -> Vec<Row> {
    let mut rows: Vec<Row> = Vec::new();

    for fragment in fragments {
        if fragment.content.trim().is_empty() {
            continue;
        }

        match rows
            .iter_mut()
            .find(|row| (row.y - fragment.y).abs() <= y_tolerance)
        {
            Some(row) => row.cells.push(fragment.clone()),
            None => rows.push(Row {
                y: fragment.y,
                cells: vec![fragment.clone()],
            }),
        }
    }

    rows.sort_by(|a, b| b.y.total_cmp(&a.y));
    for row in &mut rows {
        row.cells.sort_by(|a, b| a.x.total_cmp(&b.x));
    }

    log::trace!(
        "Reconstructed {} rows from {} fragments",
        rows.len(),
        fragments.len()
    );

    rows
}
