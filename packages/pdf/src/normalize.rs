//! Date and time shape detection and normalization.
//!
//! Vendor exports spell the same date many ways (`3-Nov-25`,
//! `27 November 2025`, `27 Nov`, `27/11/2025`) and separate hours from
//! minutes with colons, periods, or commas. Everything is normalized to
//! `YYYY-MM-DD` and `HH:MM` here so the rest of the pipeline only deals
//! with canonical strings.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Datelike as _, NaiveDate};
use regex::Regex;
use strum_macros::{AsRefStr, Display};

/// `H:MM`, `H.MM` or `H,MM`, optionally followed by `:SS`.
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[:.,](\d{2})(?::\d{2})?\b").expect("valid regex"));

/// A cell holding nothing but an hour number.
static BARE_HOUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})$").expect("valid regex"));

/// Full date shapes accepted as evidence that a header row is real:
/// `D-MMM-YY[YY]` or `D Month YY[YY]`.
static FULL_DATE_SHAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,2}[-\s]+[a-z]{3,}[-\s]+(?:\d{4}|\d{2})\b").expect("valid regex")
});

/// A day number, optionally followed by a month word but no year.
static PARTIAL_DATE_SHAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*\d{1,2}(?:[\s-]+[a-z]{3,})?\s*$").expect("valid regex")
});

/// Broad date detector for whole-row pattern matching: hyphenated,
/// slash-separated, or space-separated with a month name.
static BROAD_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b\d{1,2}[-/](?:\d{1,2}|[a-z]{3,})[-/](?:\d{4}|\d{2})\b|\b\d{1,2}\s+[a-z]{3,}(?:\s+(?:\d{4}|\d{2}))?\b",
    )
    .expect("valid regex")
});

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{4})-(\d{2})-(\d{2})\s*$").expect("valid regex"));

static DAY_MONTH_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s+([a-z]+)\s+(\d{4})\b").expect("valid regex")
});

static HYPHENATED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})-([a-z]+)-(\d{4}|\d{2})\b").expect("valid regex")
});

static SPACED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s+([a-z]+)\s+(\d{4}|\d{2})\b").expect("valid regex")
});

static DAY_MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})[\s-]+([a-z]+)\b").expect("valid regex"));

static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})\b").expect("valid regex")
});

/// English and Indonesian month names and abbreviations.
static MONTHS: LazyLock<BTreeMap<&'static str, u32>> = LazyLock::new(|| {
    BTreeMap::from([
        // English
        ("january", 1),
        ("jan", 1),
        ("february", 2),
        ("feb", 2),
        ("march", 3),
        ("mar", 3),
        ("april", 4),
        ("apr", 4),
        ("may", 5),
        ("june", 6),
        ("jun", 6),
        ("july", 7),
        ("jul", 7),
        ("august", 8),
        ("aug", 8),
        ("september", 9),
        ("sep", 9),
        ("sept", 9),
        ("october", 10),
        ("oct", 10),
        ("november", 11),
        ("nov", 11),
        ("december", 12),
        ("dec", 12),
        // Indonesian
        ("januari", 1),
        ("februari", 2),
        ("pebruari", 2),
        ("maret", 3),
        ("mei", 5),
        ("juni", 6),
        ("juli", 7),
        ("agustus", 8),
        ("agu", 8),
        ("agt", 8),
        ("ags", 8),
        ("agust", 8),
        ("oktober", 10),
        ("okt", 10),
        ("nopember", 11),
        ("desember", 12),
        ("des", 12),
    ])
});

/// Which textual date encoding a string was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum DateShape {
    /// Already canonical `YYYY-MM-DD`.
    Iso,
    /// `27 November 2025`, anywhere in the string.
    DayMonthYear,
    /// `3-Nov-25` or `3-Nov-2025`.
    Hyphenated,
    /// `3 Nov 25` or `3 Nov 2025`.
    Spaced,
    /// `27 Nov` with the year left out.
    DayMonth,
    /// Day-first numeric `27/11/2025`.
    Numeric,
}

/// Looks up a month name or abbreviation, ignoring case.
#[must_use]
pub fn month_number(name: &str) -> Option<u32> {
    MONTHS.get(name.to_lowercase().as_str()).copied()
}

/// Blanks out time tokens so an hour can't be read as a two-digit year
/// (`27 Nov 08:00` is not the 27th of November 2008).
fn without_times(raw: &str) -> Cow<'_, str> {
    TIME_RE.replace_all(raw, " ")
}

fn expand_year(digits: &str) -> Option<i32> {
    if digits.len() == 2 {
        format!("20{digits}").parse().ok()
    } else {
        digits.parse().ok()
    }
}

fn day_month_year(re: &Regex, raw: &str, default_year: Option<i32>) -> Option<NaiveDate> {
    re.captures_iter(raw).find_map(|caps| {
        let whole = caps.get(0)?;
        // A yearless match directly followed by digits is a dated string
        // whose year failed to validate, not a day-month pair.
        if default_year.is_some()
            && raw[whole.end()..]
                .trim_start_matches([' ', '-'])
                .starts_with(|c: char| c.is_ascii_digit())
        {
            return None;
        }
        let day: u32 = caps.get(1)?.as_str().parse().ok()?;
        let month = month_number(caps.get(2)?.as_str())?;
        let year = match caps.get(3) {
            Some(y) => expand_year(y.as_str())?,
            None => default_year?,
        };
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

/// Recognizes a date string and returns its shape and calendar date.
///
/// Shapes are tried in priority order; a shape only matches if its month
/// word is known and the resulting date exists on the calendar. Dates
/// without a year get `default_year`.
#[must_use]
pub fn parse_date(raw: &str, default_year: i32) -> Option<(DateShape, NaiveDate)> {
    if let Some(caps) = ISO_DATE_RE.captures(raw) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day).map(|d| (DateShape::Iso, d));
    }

    let masked = without_times(raw);
    let raw: &str = &masked;

    let ordered: [(DateShape, &Regex, Option<i32>); 4] = [
        (DateShape::DayMonthYear, &DAY_MONTH_YEAR_RE, None),
        (DateShape::Hyphenated, &HYPHENATED_RE, None),
        (DateShape::Spaced, &SPACED_RE, None),
        (DateShape::DayMonth, &DAY_MONTH_RE, Some(default_year)),
    ];
    for (shape, re, year) in ordered {
        if let Some(date) = day_month_year(re, raw, year) {
            return Some((shape, date));
        }
    }

    NUMERIC_RE.captures_iter(raw).find_map(|caps| {
        let day = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let year = expand_year(&caps[3])?;
        NaiveDate::from_ymd_opt(year, month, day).map(|d| (DateShape::Numeric, d))
    })
}

/// Normalizes a date to `YYYY-MM-DD`, defaulting a missing year to the
/// current calendar year.
#[must_use]
pub fn normalize_date(raw: &str) -> Option<String> {
    normalize_date_in_year(raw, chrono::Local::now().year())
}

/// Normalizes a date to `YYYY-MM-DD`, defaulting a missing year to
/// `default_year`.
#[must_use]
pub fn normalize_date_in_year(raw: &str, default_year: i32) -> Option<String> {
    parse_date(raw, default_year).map(|(_, date)| date.format("%Y-%m-%d").to_string())
}

/// Returns `true` for cells that stand for "no value" (`-` or blank).
#[must_use]
pub fn is_placeholder(raw: &str) -> bool {
    raw.trim().chars().all(|c| matches!(c, '-' | '\u{2013}' | '\u{2014}'))
}

/// Normalizes a time to zero-padded `HH:MM`.
///
/// The first time-shaped token wins. A bare hour gets `:00`. Anything else
/// that isn't a placeholder falls back to swapping `.`/`,` for `:` as a
/// best effort, so callers should still sanity-check the result.
#[must_use]
pub fn normalize_time(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if is_placeholder(trimmed) {
        return None;
    }

    if let Some(caps) = TIME_RE.captures(trimmed) {
        let hour: u32 = caps[1].parse().ok()?;
        return Some(format!("{hour:02}:{}", &caps[2]));
    }

    if let Some(caps) = BARE_HOUR_RE.captures(trimmed) {
        let hour: u32 = caps[1].parse().ok()?;
        return Some(format!("{hour:02}:00"));
    }

    Some(trimmed.replace(['.', ','], ":"))
}

/// Returns `true` if the text contains a time-shaped token.
#[must_use]
pub fn is_time_shaped(raw: &str) -> bool {
    TIME_RE.is_match(raw)
}

/// All time-shaped tokens in the text, left to right.
#[must_use]
pub fn find_times(raw: &str) -> Vec<&str> {
    TIME_RE.find_iter(raw).map(|m| m.as_str()).collect()
}

/// Splits the first time-shaped token out of `raw`.
///
/// Returns the remaining text (whitespace collapsed) and the token, or
/// `None` if the text holds no time.
#[must_use]
pub fn take_time(raw: &str) -> Option<(String, &str)> {
    let m = TIME_RE.find(raw)?;
    let rest = format!("{} {}", &raw[..m.start()], &raw[m.end()..]);
    let rest = rest.split_whitespace().collect::<Vec<_>>().join(" ");
    Some((rest, m.as_str()))
}

/// Returns `true` if the text contains `D-MMM-YY[YY]` or `D Month YY[YY]`.
#[must_use]
pub fn has_full_date_shape(raw: &str) -> bool {
    FULL_DATE_SHAPE_RE.is_match(&without_times(raw))
}

/// Returns `true` if the text is a bare day or a day plus month word.
#[must_use]
pub fn has_partial_date_shape(raw: &str) -> bool {
    PARTIAL_DATE_SHAPE_RE.is_match(raw)
}

/// Every broadly date-like substring of a row's text, left to right,
/// ignoring time tokens.
#[must_use]
pub fn find_broad_dates(raw: &str) -> Vec<String> {
    BROAD_DATE_RE
        .find_iter(&without_times(raw))
        .map(|m| m.as_str().to_owned())
        .collect()
}
