// src/matching/date.rs
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const MIN_YEAR: i32 = 1800;
const MAX_YEAR: i32 = 2100;

/// Parses a birth date in any of the export formats. Unparseable or
/// implausible values (outside 1800..=2100) are `None`, never an error.
pub fn parse_dob(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = parse_compact(raw)
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        })
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))?;

    if (MIN_YEAR..=MAX_YEAR).contains(&parsed.year()) {
        Some(parsed)
    } else {
        None
    }
}

/// `YYYYMMDD` with no separators.
fn parse_compact(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = raw[0..4].parse().ok()?;
    let month = raw[4..6].parse().ok()?;
    let day = raw[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Canonical `YYYY-MM-DD` rendering; re-normalizing the output is a no-op.
pub fn normalize_dob(raw: Option<&str>) -> Option<String> {
    parse_dob(raw).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Fixed-width `YYYYMMDD` digits, used for edit-distance comparison.
pub fn dob_digits(dob: NaiveDate) -> String {
    dob.format("%Y%m%d").to_string()
}

/// Same year, with month and day transposed between the two dates.
pub fn month_day_swapped(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.day() && a.day() == b.month()
}
