#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Raw wire types for the four external APIs.
//!
//! These structs mirror each API's JSON response shape as closely as
//! possible, including its quirks (UNHCR encodes missing counts as `"-"`,
//! ACLED returns numbers as strings). The `displacement_globe_source`
//! normalizer converts these into the canonical
//! `displacement_globe_flow_models` records; a few item types are also
//! serialized verbatim into the pre-generated snapshot files.

use serde::{Deserialize, Serialize};

/// A numeric field that a source may encode as a number, a string, a
/// placeholder dash, or omit entirely.
///
/// UNHCR population counts arrive as `12345`, `"12345"`, `"-"`, or `""`;
/// ACLED fatality and coordinate fields arrive as strings. Conversion to a
/// real number happens in the normalizer and never produces `NaN` — any
/// unparseable value degrades to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    /// Integer as a JSON number.
    Int(i64),
    /// Float as a JSON number.
    Float(f64),
    /// Number (or placeholder) as a JSON string.
    Text(String),
    /// Explicit JSON null.
    Null,
}

impl Default for RawNumber {
    fn default() -> Self {
        Self::Null
    }
}

impl RawNumber {
    /// Interprets the value as a non-negative count.
    ///
    /// Placeholder strings (`"-"`, `""`), nulls, negative numbers, and
    /// garbage all yield `0`.
    #[must_use]
    pub fn as_count(&self) -> u64 {
        match self {
            Self::Int(n) => u64::try_from(*n).unwrap_or(0),
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Self::Float(f) if f.is_finite() && *f >= 0.0 => *f as u64,
            Self::Float(_) | Self::Null => 0,
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() || trimmed == "-" {
                    return 0;
                }
                trimmed.parse::<u64>().unwrap_or(0)
            }
        }
    }

    /// Interprets the value as a float coordinate. Unparseable values yield
    /// `0.0` (which downstream treats as "no coordinate"), never `NaN`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_coordinate(&self) -> f64 {
        match self {
            Self::Int(n) => *n as f64,
            Self::Float(f) if f.is_finite() => *f,
            Self::Float(_) | Self::Null => 0.0,
            Self::Text(s) => {
                let parsed = s.trim().parse::<f64>().unwrap_or(0.0);
                if parsed.is_finite() { parsed } else { 0.0 }
            }
        }
    }
}

/// Response envelope from the UNHCR population endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UnhcrApiResponse {
    /// Current page number.
    #[serde(default)]
    pub page: u64,
    /// Total number of pages available for this query.
    #[serde(rename = "maxPages", default)]
    pub max_pages: u64,
    /// Population records for this page.
    #[serde(default)]
    pub items: Vec<UnhcrPopulationItem>,
}

/// One UNHCR population record (origin country, asylum country, year).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnhcrPopulationItem {
    /// Reporting year.
    pub year: i32,
    /// Origin country name.
    #[serde(default)]
    pub coo_name: String,
    /// Origin country ISO3 code.
    #[serde(default)]
    pub coo_iso: String,
    /// Asylum country name.
    #[serde(default)]
    pub coa_name: String,
    /// Asylum country ISO3 code.
    #[serde(default)]
    pub coa_iso: String,
    /// Recognized refugees, possibly `"-"`.
    #[serde(default)]
    pub refugees: RawNumber,
    /// Pending asylum seekers, possibly `"-"`.
    #[serde(default)]
    pub asylum_seekers: RawNumber,
}

/// One UNRWA registered-refugee record. Same host as UNHCR, restricted to
/// Palestine as the origin; only the total count is populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnrwaItem {
    /// Reporting year.
    pub year: i32,
    /// Asylum (host) country name.
    #[serde(default)]
    pub coa_name: String,
    /// Asylum country ISO3 code.
    #[serde(default)]
    pub coa_iso: String,
    /// Origin ISO3 code, always `PSE` in practice.
    #[serde(default)]
    pub coo_iso: String,
    /// Registered refugees, possibly `"-"`.
    #[serde(default)]
    pub total: RawNumber,
}

/// Response envelope wrapping the UNRWA item list.
#[derive(Debug, Clone, Deserialize)]
pub struct UnrwaApiResponse {
    /// Registered-refugee records, absent when the API has no data.
    #[serde(default)]
    pub items: Vec<UnrwaItem>,
}

/// Generic response envelope used by every IOM DTM endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IomEnvelope<T> {
    /// Result payload, null on failure.
    #[serde(default = "Option::default")]
    pub result: Option<Vec<T>>,
    /// Whether the request succeeded.
    #[serde(default)]
    pub is_success: bool,
    /// Error messages when `is_success` is false.
    #[serde(default)]
    pub error_messages: Vec<String>,
    /// Total records matching the query.
    #[serde(default)]
    pub total_records_count: i64,
}

/// Country entry from the IOM `GetAllCountryList` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IomCountry {
    /// Country display name, used as the query key for data endpoints.
    pub admin0_name: String,
    /// ISO3 country code.
    #[serde(default)]
    pub admin0_pcode: String,
}

/// One raw IDP observation from the IOM `GetAdmin0Datav2` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IomDataPoint {
    /// Record identifier.
    #[serde(default)]
    pub id: i64,
    /// Data-collection operation this observation belongs to.
    #[serde(default)]
    pub operation: String,
    /// Country display name.
    #[serde(default)]
    pub admin0_name: String,
    /// ISO3 country code.
    #[serde(default)]
    pub admin0_pcode: String,
    /// Number of IDP individuals present at this observation.
    #[serde(default)]
    pub num_present_idp_ind: i64,
    /// Reporting date (ISO 8601 date string).
    #[serde(default)]
    pub reporting_date: String,
    /// Year component of the reporting date.
    #[serde(default)]
    pub year_reporting_date: i32,
    /// Month component of the reporting date.
    #[serde(default)]
    pub month_reporting_date: u32,
    /// Survey round number.
    #[serde(default)]
    pub round_number: i64,
    /// Assessment methodology label.
    #[serde(default)]
    pub assessment_type: String,
}

/// Response envelope from the ACLED read endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AcledApiResponse {
    /// Event rows for this page.
    #[serde(default)]
    pub data: Vec<AcledRow>,
}

/// One raw ACLED event row.
///
/// The ACLED API serves most numeric fields as strings, so every numeric
/// field here is a [`RawNumber`].
#[derive(Debug, Clone, Deserialize)]
pub struct AcledRow {
    /// Event identifier, unique within a country.
    #[serde(default)]
    pub event_id_cnty: String,
    /// Event date as `YYYY-MM-DD`.
    #[serde(default)]
    pub event_date: String,
    /// Event year.
    #[serde(default)]
    pub year: RawNumber,
    /// Top-level event type.
    #[serde(default)]
    pub event_type: String,
    /// Sub-event type.
    #[serde(default)]
    pub sub_event_type: String,
    /// Primary actor.
    #[serde(default)]
    pub actor1: String,
    /// Secondary actor.
    #[serde(default)]
    pub actor2: String,
    /// First administrative level.
    #[serde(default)]
    pub admin1: String,
    /// Second administrative level.
    #[serde(default)]
    pub admin2: String,
    /// Third administrative level.
    #[serde(default)]
    pub admin3: String,
    /// Named location.
    #[serde(default)]
    pub location: String,
    /// Latitude, served as a string.
    #[serde(default)]
    pub latitude: RawNumber,
    /// Longitude, served as a string.
    #[serde(default)]
    pub longitude: RawNumber,
    /// Reported fatalities.
    #[serde(default)]
    pub fatalities: RawNumber,
    /// Civilian targeting flag text.
    #[serde(default)]
    pub civilian_targeting: String,
}

/// OAuth2 token response from the ACLED token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AcledTokenResponse {
    /// Bearer token for read requests.
    pub access_token: String,
    /// Token used to obtain the next access token.
    #[serde(default)]
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_parses_to_zero() {
        assert_eq!(RawNumber::Text("-".to_owned()).as_count(), 0);
    }

    #[test]
    fn empty_string_parses_to_zero() {
        assert_eq!(RawNumber::Text(String::new()).as_count(), 0);
    }

    #[test]
    fn garbage_parses_to_zero() {
        assert_eq!(RawNumber::Text("n/a".to_owned()).as_count(), 0);
    }

    #[test]
    fn numeric_string_parses() {
        assert_eq!(RawNumber::Text("12345".to_owned()).as_count(), 12_345);
    }

    #[test]
    fn negative_count_clamps_to_zero() {
        assert_eq!(RawNumber::Int(-5).as_count(), 0);
    }

    #[test]
    fn coordinate_never_nan() {
        let parsed = RawNumber::Text("NaN".to_owned()).as_coordinate();
        assert!(parsed.is_finite());
        assert!((parsed - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deserializes_mixed_unhcr_item() {
        let json = r#"{
            "year": 2023,
            "coo_name": "Syrian Arab Rep.",
            "coo_iso": "SYR",
            "coa_name": "Turkiye",
            "coa_iso": "TUR",
            "refugees": "3200000",
            "asylum_seekers": "-"
        }"#;
        let item: UnhcrPopulationItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.refugees.as_count(), 3_200_000);
        assert_eq!(item.asylum_seekers.as_count(), 0);
    }

    #[test]
    fn deserializes_acled_row_with_string_numbers() {
        let json = r#"{
            "event_id_cnty": "NIG12345",
            "event_date": "2023-06-15",
            "year": "2023",
            "event_type": "Battles",
            "sub_event_type": "Armed clash",
            "actor1": "Military Forces",
            "actor2": "",
            "admin1": "Borno",
            "admin2": "",
            "admin3": "",
            "location": "Maiduguri",
            "latitude": "11.8311",
            "longitude": "13.1510",
            "fatalities": "12",
            "civilian_targeting": ""
        }"#;
        let row: AcledRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.fatalities.as_count(), 12);
        assert!((row.latitude.as_coordinate() - 11.8311).abs() < 1e-9);
    }
}
