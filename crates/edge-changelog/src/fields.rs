//! Version and date extraction from entry headings.
//!
//! Extraction never fails: a heading without a version or a recognizable
//! date simply yields `None`.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+(?:\.\d+)?").unwrap());

static TEXT_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"on\s+([A-Za-z]+\s+\d+,\s+\d+)").unwrap());

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").unwrap());

/// `June 1, 2024`: full month name, unpadded day.
const TEXT_DATE_FORMAT: &str = "%B %-d, %Y";
const TEXT_DATE_PARSE: &str = "%B %d, %Y";
const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Placeholder shown for entries without a date.
pub const NO_DATE_LABEL: &str = "No date available";

/// Placeholder shown when a stored date cannot be read back.
pub const INVALID_DATE_LABEL: &str = "Invalid date";

/// First `major.minor[.patch]` in the heading.
pub fn extract_version(heading: &str) -> Option<&str> {
    VERSION_RE.find(heading).map(|m| m.as_str())
}

/// Release date of a heading as ISO-8601 (`YYYY-MM-DDT00:00:00+00:00`).
///
/// Tries `on <Month> <Day>, <Year>` first, then a bare `YYYY-MM-DD`. A
/// candidate only counts if formatting the parsed date gives back exactly the
/// matched text, so `June 01, 2024` or `2024-02-30` are rejected.
pub fn extract_date(heading: &str) -> Option<String> {
    if let Some(caps) = TEXT_DATE_RE.captures(heading) {
        let matched = &caps[1];
        if let Some(date) = parse_round_trip(matched, TEXT_DATE_PARSE, TEXT_DATE_FORMAT) {
            return Some(to_iso(date));
        }
        tracing::debug!(candidate = matched, "rejected textual date");
    }

    if let Some(caps) = ISO_DATE_RE.captures(heading) {
        let matched = &caps[1];
        if let Some(date) = parse_round_trip(matched, ISO_DATE_FORMAT, ISO_DATE_FORMAT) {
            return Some(to_iso(date));
        }
        tracing::debug!(candidate = matched, "rejected ISO date");
    }

    None
}

/// Display form of a stored date (`June 1, 2024`).
pub fn format_date_safely(date: Option<&str>) -> String {
    let Some(date) = date.filter(|d| !d.trim().is_empty()) else {
        return NO_DATE_LABEL.to_string();
    };

    match DateTime::parse_from_rfc3339(date) {
        Ok(parsed) => parsed.format(TEXT_DATE_FORMAT).to_string(),
        Err(e) => {
            tracing::warn!(date, error = %e, "stored entry date does not parse");
            INVALID_DATE_LABEL.to_string()
        }
    }
}

fn parse_round_trip(text: &str, parse: &str, format: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(text, parse).ok()?;
    (date.format(format).to_string() == text).then_some(date)
}

fn to_iso(date: NaiveDate) -> String {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().to_rfc3339())
        .unwrap_or_default()
}
