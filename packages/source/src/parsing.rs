//! Shared parsing utilities for displacement data sources.
//!
//! Date parsing functions used across multiple adapter implementations.
//! Numeric leniency (the `"-"` placeholder and string-encoded numbers)
//! lives on `RawNumber` in the source models crate; everything here is
//! about dates.

use chrono::{NaiveDate, NaiveDateTime};

/// Parses an ACLED event date (`YYYY-MM-DD`).
#[must_use]
pub fn parse_event_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Parses an IOM reporting date, which arrives either as a bare date or as
/// an ISO 8601 datetime depending on the endpoint version.
#[must_use]
pub fn parse_reporting_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    None
}
