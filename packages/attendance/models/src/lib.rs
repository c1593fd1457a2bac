#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Positioned text, row, and attendance record types.
//!
//! These types flow through every stage of the timesheet parser: the PDF
//! text layer produces [`TextFragment`]s, row reconstruction groups them
//! into [`Row`]s, header inference derives [`ColumnAnchors`], and field
//! extraction emits [`ParsedAttendanceRow`]s.
//!
//! The comparison helpers at the bottom ([`dedupe_by_date`] and
//! [`time_warnings`]) implement the conventions expected by consumers that
//! diff two attendance lists. The parser itself never calls them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One positioned run of text from a page's text layer.
///
/// Coordinates are in PDF user space, so `y` increases towards the top of
/// the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    /// The decoded text. Never empty after trimming.
    pub content: String,
    /// Horizontal baseline position.
    pub x: f64,
    /// Vertical baseline position.
    pub y: f64,
}

impl TextFragment {
    /// Creates a fragment at the given position.
    #[must_use]
    pub fn new(content: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            content: content.into(),
            x,
            y,
        }
    }
}

/// A set of fragments inferred to share one visual table line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Representative vertical position (the first fragment assigned).
    pub y: f64,
    /// Cells sorted left to right.
    pub cells: Vec<TextFragment>,
}

impl Row {
    /// Joins all cell contents with single spaces, left to right.
    #[must_use]
    pub fn text(&self) -> String {
        self.cells
            .iter()
            .map(|c| c.content.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Lowercased [`Row::text`], used for label matching.
    #[must_use]
    pub fn lowercase_text(&self) -> String {
        self.text().to_lowercase()
    }
}

/// Inferred x-positions of the date, check-in, and check-out columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnAnchors {
    /// Date column header position.
    pub date: Option<f64>,
    /// Check-in column header position.
    pub checkin: Option<f64>,
    /// Check-out column header position.
    pub checkout: Option<f64>,
}

impl ColumnAnchors {
    /// Returns `true` if no anchor was detected at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.date.is_none() && self.checkin.is_none() && self.checkout.is_none()
    }
}

/// A normalized attendance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAttendanceRow {
    /// Canonical `YYYY-MM-DD` date.
    pub date: String,
    /// Canonical `HH:MM` check-in time.
    pub checkin: Option<String>,
    /// Canonical `HH:MM` check-out time.
    pub checkout: Option<String>,
}

/// Employee identity found in a timesheet's page header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeMetadata {
    /// Employee number or ID as printed.
    pub employee_id: Option<String>,
    /// Employee display name.
    pub name: Option<String>,
}

impl EmployeeMetadata {
    /// Returns `true` if neither field was found.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.employee_id.is_none() && self.name.is_none()
    }
}

/// Which time column a [`TimeWarning`] refers to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimeField {
    /// The check-in column.
    Checkin,
    /// The check-out column.
    Checkout,
}

/// Why a normalized time looks suspicious.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeWarningKind {
    /// Hour component is 24 or greater.
    HourOutOfRange,
    /// Minute component is 60 or greater.
    MinuteOutOfRange,
    /// The value is not `HH:MM` at all (best-effort normalization output).
    Unparseable,
}

/// A data-quality warning for one time value of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWarning {
    /// Date of the affected row.
    pub date: String,
    /// Which column the value came from.
    pub field: TimeField,
    /// What is wrong with it.
    pub kind: TimeWarningKind,
    /// The normalized value as emitted.
    pub value: String,
}

/// Collapses rows sharing a date, keeping the last occurrence in document
/// order.
#[must_use]
pub fn dedupe_by_date(rows: &[ParsedAttendanceRow]) -> BTreeMap<String, ParsedAttendanceRow> {
    let mut by_date = BTreeMap::new();
    for row in rows {
        by_date.insert(row.date.clone(), row.clone());
    }
    by_date
}

/// Checks both times of a row for values no clock could show.
#[must_use]
pub fn time_warnings(row: &ParsedAttendanceRow) -> Vec<TimeWarning> {
    [
        (TimeField::Checkin, row.checkin.as_deref()),
        (TimeField::Checkout, row.checkout.as_deref()),
    ]
    .into_iter()
    .filter_map(|(field, value)| {
        let value = value?;
        let kind = classify_time(value)?;
        Some(TimeWarning {
            date: row.date.clone(),
            field,
            kind,
            value: value.to_owned(),
        })
    })
    .collect()
}

fn classify_time(value: &str) -> Option<TimeWarningKind> {
    let Some((hour, minute)) = value.split_once(':') else {
        return Some(TimeWarningKind::Unparseable);
    };
    let (Ok(hour), Ok(minute)) = (hour.parse::<u32>(), minute.parse::<u32>()) else {
        return Some(TimeWarningKind::Unparseable);
    };
    if hour >= 24 {
        Some(TimeWarningKind::HourOutOfRange)
    } else if minute >= 60 {
        Some(TimeWarningKind::MinuteOutOfRange)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, checkin: Option<&str>, checkout: Option<&str>) -> ParsedAttendanceRow {
        ParsedAttendanceRow {
            date: date.to_owned(),
            checkin: checkin.map(str::to_owned),
            checkout: checkout.map(str::to_owned),
        }
    }

    #[test]
    fn row_text_joins_cells_left_to_right() {
        let r = Row {
            y: 700.0,
            cells: vec![
                TextFragment::new("27", 50.0, 700.0),
                TextFragment::new(" November 2025 ", 70.0, 700.0),
            ],
        };
        assert_eq!(r.text(), "27 November 2025");
        assert_eq!(r.lowercase_text(), "27 november 2025");
    }

    #[test]
    fn anchors_empty_only_when_all_absent() {
        assert!(ColumnAnchors::default().is_empty());
        let anchors = ColumnAnchors {
            checkout: Some(250.0),
            ..ColumnAnchors::default()
        };
        assert!(!anchors.is_empty());
    }

    #[test]
    fn dedupe_keeps_last_occurrence() {
        let rows = vec![
            row("2025-11-03", Some("08:00"), None),
            row("2025-11-04", Some("08:10"), Some("17:00")),
            row("2025-11-03", Some("08:13"), Some("17:05")),
        ];
        let deduped = dedupe_by_date(&rows);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped["2025-11-03"].checkin.as_deref(), Some("08:13"));
        assert_eq!(deduped["2025-11-03"].checkout.as_deref(), Some("17:05"));
    }

    #[test]
    fn flags_out_of_range_times() {
        let warnings = time_warnings(&row("2025-11-03", Some("25:10"), Some("17:75")));
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].field, TimeField::Checkin);
        assert_eq!(warnings[0].kind, TimeWarningKind::HourOutOfRange);
        assert_eq!(warnings[1].field, TimeField::Checkout);
        assert_eq!(warnings[1].kind, TimeWarningKind::MinuteOutOfRange);
    }

    #[test]
    fn flags_unparseable_times() {
        let warnings = time_warnings(&row("2025-11-03", Some("lembur"), None));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, TimeWarningKind::Unparseable);
    }

    #[test]
    fn clean_times_have_no_warnings() {
        assert!(time_warnings(&row("2025-11-03", Some("08:00"), Some("23:59"))).is_empty());
        assert!(time_warnings(&row("2025-11-03", None, None)).is_empty());
    }

    #[test]
    fn serializes_metadata_camel_case() {
        let meta = EmployeeMetadata {
            employee_id: Some("EMP-001".to_owned()),
            name: Some("Budi Santoso".to_owned()),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["employeeId"], "EMP-001");
        assert_eq!(json["name"], "Budi Santoso");
    }

    #[test]
    fn warning_kind_display() {
        assert_eq!(
            TimeWarningKind::HourOutOfRange.to_string(),
            "HOUR_OUT_OF_RANGE"
        );
        assert_eq!(TimeField::Checkout.as_ref(), "checkout");
    }
}
