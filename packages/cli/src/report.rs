//! JSON report shapes printed by the CLI, one document per input file.

use std::path::Path;

use serde::Serialize;
use timesheet_attendance_models::{
    EmployeeMetadata, ParsedAttendanceRow, TimeWarning, dedupe_by_date, time_warnings,
};
use timesheet_pdf::AttendanceError;

/// Result of `timesheet parse` for one file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseReport {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<ParsedAttendanceRow>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<TimeWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParseReport {
    /// Builds the report for a finished parse. With `dedupe`, rows sharing
    /// a date collapse to the last one and come back sorted by date.
    #[must_use]
    pub fn new(
        file: &Path,
        result: Result<Vec<ParsedAttendanceRow>, AttendanceError>,
        dedupe: bool,
    ) -> Self {
        let file = file.display().to_string();
        match result {
            Ok(rows) => {
                let rows: Vec<ParsedAttendanceRow> = if dedupe {
                    dedupe_by_date(&rows).into_values().collect()
                } else {
                    rows
                };
                let warnings: Vec<TimeWarning> = rows.iter().flat_map(time_warnings).collect();
                for warning in &warnings {
                    log::warn!(
                        "{file}: suspicious {} time {} on {} ({})",
                        warning.field,
                        warning.value,
                        warning.date,
                        warning.kind
                    );
                }
                Self {
                    file,
                    rows: Some(rows),
                    warnings,
                    error: None,
                }
            }
            Err(e) => Self {
                file,
                rows: None,
                warnings: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Result of `timesheet metadata` for one file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataReport {
    pub file: String,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EmployeeMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MetadataReport {
    #[must_use]
    pub fn new(file: &Path, result: Result<EmployeeMetadata, AttendanceError>) -> Self {
        let file = file.display().to_string();
        match result {
            Ok(metadata) => Self {
                file,
                metadata: Some(metadata),
                error: None,
            },
            Err(e) => Self {
                file,
                metadata: None,
                error: Some(e.to_string()),
            },
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Serializes a report as one JSON line, or indented with `pretty`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json<T: Serialize>(report: &T, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, checkin: Option<&str>) -> ParsedAttendanceRow {
        ParsedAttendanceRow {
            date: date.to_owned(),
            checkin: checkin.map(str::to_owned),
            checkout: None,
        }
    }

    #[test]
    fn successful_report_lists_rows() {
        let report = ParseReport::new(
            Path::new("a.pdf"),
            Ok(vec![record("2025-11-03", Some("08:13"))]),
            false,
        );
        let json = to_json(&report, false).unwrap();
        assert_eq!(
            json,
            r#"{"file":"a.pdf","rows":[{"date":"2025-11-03","checkin":"08:13","checkout":null}]}"#
        );
        assert!(!report.is_error());
    }

    #[test]
    fn dedupe_keeps_last_row_per_date() {
        let report = ParseReport::new(
            Path::new("a.pdf"),
            Ok(vec![
                record("2025-11-04", Some("08:00")),
                record("2025-11-03", Some("07:00")),
                record("2025-11-04", Some("09:00")),
            ]),
            true,
        );
        let rows = report.rows.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "2025-11-03");
        assert_eq!(rows[1].checkin.as_deref(), Some("09:00"));
    }

    #[test]
    fn reports_time_warnings() {
        let report = ParseReport::new(
            Path::new("a.pdf"),
            Ok(vec![record("2025-11-03", Some("27:10"))]),
            false,
        );
        assert_eq!(report.warnings.len(), 1);
        let json = to_json(&report, false).unwrap();
        assert!(json.contains(r#""kind":"HOUR_OUT_OF_RANGE""#));
    }

    #[test]
    fn failed_parse_reports_error_only() {
        let report = ParseReport::new(Path::new("bad.pdf"), Err(AttendanceError::Cancelled), false);
        assert!(report.is_error());
        assert_eq!(
            to_json(&report, false).unwrap(),
            r#"{"file":"bad.pdf","error":"Parse cancelled"}"#
        );
    }

    #[test]
    fn metadata_report_flattens_fields() {
        let report = MetadataReport::new(
            Path::new("a.pdf"),
            Ok(EmployeeMetadata {
                employee_id: Some("EMP-1".to_owned()),
                name: None,
            }),
        );
        assert_eq!(
            to_json(&report, false).unwrap(),
            r#"{"file":"a.pdf","employeeId":"EMP-1","name":null}"#
        );
    }
}
