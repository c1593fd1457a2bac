//! Employee identity parsing from a timesheet's page header.
//!
//! The ID is searched three ways, first hit wins:
//!
//! 1. a vendor-issued ID with one of the preset's prefixes (`EMP-0042`)
//! 2. a labelled value (`Employee ID: 0042`, `NIK | 3174...`)
//! 3. any standalone alphanumeric token of five or more characters that
//!    mixes letters and digits
//!
//! The name only comes from a labelled value.

use regex::Regex;
use timesheet_attendance_models::{EmployeeMetadata, Row};
use timesheet_vendor::VendorPreset;

const MIN_GENERIC_ID_LEN: usize = 5;

fn prefix_regex(prefixes: &[String]) -> Option<Regex> {
    if prefixes.is_empty() {
        return None;
    }
    let alternatives = prefixes
        .iter()
        .map(|p| regex::escape(p.trim()))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternatives})[-_]?\d+\b")).ok()
}

fn find_prefixed_id(rows: &[Row], preset: &VendorPreset) -> Option<String> {
    let re = prefix_regex(&preset.employee_id_prefixes)?;
    rows.iter()
        .find_map(|row| re.find(&row.text()).map(|m| m.as_str().to_owned()))
}

/// Truncates `value` where another known label starts.
fn cut_at_labels<'a>(value: &'a str, labels: &[&String]) -> &'a str {
    let lower = value.to_ascii_lowercase();
    let end = labels
        .iter()
        .filter_map(|label| lower.find(&format!(" {label}")))
        .min()
        .unwrap_or(value.len());
    value[..end].trim()
}

/// Byte range of the earliest label occurrence that starts a word and is
/// not followed by further letters.
fn locate_label(lower: &str, labels: &[String]) -> Option<(usize, usize)> {
    labels
        .iter()
        .filter_map(|label| {
            lower.match_indices(label.as_str()).find_map(|(start, _)| {
                let end = start + label.len();
                let starts_word = start == 0 || lower[..start].ends_with(' ');
                let ends_word = !lower[end..].starts_with(|c: char| c.is_ascii_alphanumeric());
                (starts_word && ends_word).then_some((start, end))
            })
        })
        .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
}

/// Finds the value following one of `labels`, either in the same cell
/// after the label or in the next cell.
fn find_labelled(rows: &[Row], labels: &[String], all_labels: &[&String]) -> Option<String> {
    for row in rows {
        for (index, cell) in row.cells.iter().enumerate() {
            let content = cell.content.trim();
            let Some((_, end)) = locate_label(&content.to_ascii_lowercase(), labels) else {
                continue;
            };

            let inline = content[end..].trim_start_matches([':', ' ']).trim();
            let value = if inline.is_empty() {
                row.cells
                    .get(index + 1)
                    .map_or("", |next| next.content.trim().trim_start_matches([':', ' ']))
            } else {
                inline
            };

            let value = cut_at_labels(value, all_labels);
            if !value.is_empty() {
                return Some(value.to_owned());
            }
        }
    }
    None
}

fn is_generic_id(token: &str) -> bool {
    token.len() >= MIN_GENERIC_ID_LEN
        && token.chars().all(|c| c.is_ascii_alphanumeric())
        && token.chars().any(|c| c.is_ascii_digit())
        && token.chars().any(|c| c.is_ascii_alphabetic())
}

fn find_generic_id(rows: &[Row]) -> Option<String> {
    rows.iter().find_map(|row| {
        row.text()
            .split_whitespace()
            .find(|token| is_generic_id(token))
            .map(str::to_owned)
    })
}

/// Searches rows for the employee ID and name.
#[must_use]
pub fn parse_employee_metadata(rows: &[Row], preset: &VendorPreset) -> EmployeeMetadata {
    let all_labels: Vec<&String> = preset
        .employee_id_labels
        .iter()
        .chain(&preset.employee_name_labels)
        .collect();

    let employee_id = find_prefixed_id(rows, preset)
        .or_else(|| find_labelled(rows, &preset.employee_id_labels, &all_labels))
        .or_else(|| find_generic_id(rows));
    let name = find_labelled(rows, &preset.employee_name_labels, &all_labels);

    log::debug!("Employee metadata: id={employee_id:?} name={name:?}");

    EmployeeMetadata { employee_id, name }
}

#[cfg(test)]
mod tests {
    use timesheet_attendance_models::TextFragment;
    use timesheet_vendor::registry::{default_preset, find_preset};

    use super::*;

    fn row(y: f64, cells: &[(&str, f64)]) -> Row {
        Row {
            y,
            cells: cells
                .iter()
                .map(|&(text, x)| TextFragment::new(text, x, y))
                .collect(),
        }
    }

    #[test]
    fn prefixed_id_wins_over_label() {
        let rows = vec![
            row(800.0, &[("Employee ID: 12345", 50.0)]),
            row(780.0, &[("Badge EMP-0042", 50.0)]),
            row(760.0, &[("Employee Name: Siti Rahma", 50.0)]),
        ];
        let meta = parse_employee_metadata(&rows, &default_preset());
        assert_eq!(meta.employee_id.as_deref(), Some("EMP-0042"));
        assert_eq!(meta.name.as_deref(), Some("Siti Rahma"));
    }

    #[test]
    fn reads_label_value_from_next_cell() {
        let rows = vec![row(
            800.0,
            &[("NIK", 50.0), (": 3174012", 90.0), ("Nama", 200.0), (": Budi", 240.0)],
        )];
        let meta = parse_employee_metadata(&rows, &default_preset());
        assert_eq!(meta.employee_id.as_deref(), Some("3174012"));
        assert_eq!(meta.name.as_deref(), Some("Budi"));
    }

    #[test]
    fn cuts_value_at_following_label() {
        let rows = vec![row(800.0, &[("Nama: Budi Santoso NIK: 3174012", 50.0)])];
        let meta = parse_employee_metadata(&rows, &default_preset());
        assert_eq!(meta.name.as_deref(), Some("Budi Santoso"));
        assert_eq!(meta.employee_id.as_deref(), Some("3174012"));
    }

    #[test]
    fn falls_back_to_generic_id() {
        let rows = vec![
            row(800.0, &[("Attendance Report", 50.0)]),
            row(780.0, &[("3-Nov-25", 50.0), ("AB12345", 200.0)]),
        ];
        let meta = parse_employee_metadata(&rows, &default_preset());
        assert_eq!(meta.employee_id.as_deref(), Some("AB12345"));
        assert_eq!(meta.name, None);
    }

    #[test]
    fn vendor_prefixes_come_from_preset() {
        let rows = vec![row(
            800.0,
            &[("PIN", 50.0), ("FP-77", 90.0), ("Nama", 200.0), ("Dewi", 240.0)],
        )];
        let meta = parse_employee_metadata(&rows, &find_preset("fingerspot").unwrap());
        assert_eq!(meta.employee_id.as_deref(), Some("FP-77"));
        assert_eq!(meta.name.as_deref(), Some("Dewi"));
    }

    #[test]
    fn nothing_found_is_empty() {
        let rows = vec![row(800.0, &[("Date", 50.0), ("Check In", 150.0)])];
        assert!(parse_employee_metadata(&rows, &default_preset()).is_empty());
    }
}
