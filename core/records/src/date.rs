//! FILENAME: core/records/src/date.rs
//! Lenient calendar-date extraction from scalar values.

use chrono::{NaiveDate, NaiveDateTime};

use crate::scalar::Scalar;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses an ISO-like date or date-time string, keeping only the calendar date.
/// A trailing `Z` or UTC offset on a date-time is ignored.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    let local = strip_offset(text);
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(local, format) {
            return Some(datetime.date());
        }
    }

    None
}

/// Returns the calendar date a scalar denotes, if any.
pub fn scalar_to_date(value: &Scalar) -> Option<NaiveDate> {
    match value {
        Scalar::Date(d) => Some(*d),
        Scalar::Text(s) => parse_date(s),
        _ => None,
    }
}

fn strip_offset(text: &str) -> &str {
    if let Some(stripped) = text.strip_suffix('Z') {
        return stripped;
    }
    // "+hh:mm" / "-hh:mm" after the time part
    if let Some(t_pos) = text.find(['T', ' ']) {
        if let Some(rel) = text[t_pos..].rfind(['+', '-']) {
            return &text[..t_pos + rel];
        }
    }
    text
}
