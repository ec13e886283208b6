#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical displacement domain types shared across the entire system.
//!
//! Every data source (UNHCR, UNRWA, IOM DTM, ACLED) normalizes its raw API
//! shape into these records. Downstream consumers (aggregation, caching,
//! globe rendering) only ever see these types.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Aggregate displacement from one country to another in one year.
///
/// All numeric fields are always present; sources that don't track a field
/// (UNRWA has no asylum-seeker figures) contribute zero at normalization
/// time rather than an optional field downstream.
///
/// Invariants: `origin_iso != asylum_iso` (self-flows are dropped during
/// normalization) and `total_displaced = refugees + asylum_seekers > 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationFlow {
    /// ISO3 code of the origin country.
    pub origin_iso: String,
    /// Display name of the origin country.
    pub origin_name: String,
    /// ISO3 code of the asylum (destination) country.
    pub asylum_iso: String,
    /// Display name of the asylum country.
    pub asylum_name: String,
    /// Number of recognized refugees.
    pub refugees: u64,
    /// Number of pending asylum seekers.
    pub asylum_seekers: u64,
    /// Total displaced persons (`refugees + asylum_seekers`).
    pub total_displaced: u64,
    /// Reporting year.
    pub year: i32,
}

impl MigrationFlow {
    /// Returns the `(origin, asylum)` pair identifying this flow for merging.
    #[must_use]
    pub fn key(&self) -> (String, String) {
        (self.origin_iso.clone(), self.asylum_iso.clone())
    }
}

/// One discrete recorded conflict incident from ACLED.
///
/// Immutable once fetched; a later fetch for the same country-year replaces
/// the whole event set rather than updating individual events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictEvent {
    /// ACLED event identifier (unique within a country).
    pub event_id: String,
    /// Date the event occurred.
    pub date: NaiveDate,
    /// Event year as reported by the source.
    pub year: i32,
    /// Top-level event type (e.g., "Battles", "Riots").
    pub event_type: String,
    /// More specific sub-event type.
    pub sub_event_type: String,
    /// Primary actor.
    pub actor1: String,
    /// Secondary actor, empty when none recorded.
    pub actor2: String,
    /// First-level administrative region.
    pub admin1: String,
    /// Second-level administrative region.
    pub admin2: String,
    /// Third-level administrative region.
    pub admin3: String,
    /// Named location of the event.
    pub location: String,
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lng: f64,
    /// Reported fatalities.
    pub fatalities: u64,
    /// Civilian targeting flag text, empty when not flagged.
    pub civilian_targeting: String,
}

/// A location and how many events were recorded there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCount {
    /// Admin1 region, falling back to the event's location name.
    pub location: String,
    /// Number of events recorded at this location.
    pub count: u64,
}

/// Events and fatalities bucketed into one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBucket {
    /// Calendar month key in `YYYY-MM` form.
    pub month: String,
    /// Number of events in this month.
    pub events: u64,
    /// Total fatalities in this month.
    pub fatalities: u64,
}

/// Derived per-country conflict statistics.
///
/// Recomputed on demand from a [`ConflictEvent`] set; never persisted
/// independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictSummary {
    /// Total number of events.
    pub total_events: u64,
    /// Sum of fatalities across all events.
    pub total_fatalities: u64,
    /// Event counts keyed by event type.
    pub event_type_counts: BTreeMap<String, u64>,
    /// Top 5 locations by event count.
    pub top_locations: Vec<LocationCount>,
    /// Top 5 events by fatality count (ties keep fetch order).
    pub most_deadly_events: Vec<ConflictEvent>,
    /// Per-month event/fatality timeline, sorted by month ascending.
    pub monthly_timeline: Vec<MonthlyBucket>,
}

/// One country's internal-displacement estimate for one year, derived from
/// potentially many raw IOM observation rounds.
///
/// `total_idps` is the most recently *reported* observation among the
/// selected operation's records for the year — not a sum or average.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpYearlyRecord {
    /// Reporting year.
    pub year: i32,
    /// Latest reported IDP count within the selected operation.
    pub total_idps: u64,
    /// How many raw data points fed this record.
    pub data_point_count: u32,
    /// Smallest IDP count observed across the selected data points.
    pub min_idps: u64,
    /// Largest IDP count observed across the selected data points.
    pub max_idps: u64,
    /// Reporting date of the data point that supplied `total_idps`.
    pub latest_report_date: String,
    /// Name of the operation the selected data points belong to.
    pub operation_used: String,
}

/// Processed IDP data for one country across all reported years.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpCountryData {
    /// Country display name as reported by IOM.
    pub country_name: String,
    /// ISO3 country code.
    pub iso3: String,
    /// Yearly records sorted by year descending.
    pub yearly_data: Vec<IdpYearlyRecord>,
    /// When this data was fetched (ISO 8601).
    pub last_updated: String,
    /// Whether any yearly data survived aggregation.
    pub has_data: bool,
}

/// Canonical registry entry for a country or territory.
///
/// Includes special non-ISO sentinel codes (stateless, unknown, various).
/// Built once at startup and immutable at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryCoordinate {
    /// ISO3 code, or a sentinel like `UNK` for special buckets.
    pub iso3: String,
    /// Canonical display name.
    pub name: String,
    /// Capital city name, empty for sentinel entries.
    pub capital: String,
    /// Latitude of the representative point (usually the capital).
    pub lat: f64,
    /// Longitude of the representative point.
    pub lng: f64,
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn conflict_summary_serializes_camel_case_keys() {
        let summary = ConflictSummary {
            total_events: 0,
            total_fatalities: 0,
            event_type_counts: BTreeMap::new(),
            top_locations: Vec::new(),
            most_deadly_events: Vec::new(),
            monthly_timeline: Vec::new(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("mostDeadlyEvents").is_some());
        assert!(json.get("eventTypeCounts").is_some());
        assert!(json.get("totalFatalities").is_some());
    }
}
