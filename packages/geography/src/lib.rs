#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Country identity resolution.
//!
//! Each external API reports country identity differently: UNHCR uses ISO3
//! codes plus a few legacy and sentinel codes, ACLED keys on free-text
//! country names, and IOM uses display names with a pcode on the side. This
//! crate owns the single source of truth that reconciles them: one embedded
//! coordinate/name registry plus a small alias table for known irregular
//! codes.
//!
//! Resolution never fails. Codes that cannot be mapped degrade to the
//! [`UNKNOWN_ISO3`] sentinel so that one bad record flags itself downstream
//! instead of aborting a whole batch.

pub mod registry;

pub use registry::{all_coordinates, lookup_coordinate};

/// Sentinel ISO3 code for unrecognized or malformed country codes.
pub const UNKNOWN_ISO3: &str = "UNK";

/// Known irregular codes seen in source data mapped to their canonical ISO3.
///
/// `KOS` is a legacy Kosovo code, `SDS` an old South Sudan code, and `-99`
/// the placeholder some GeoJSON datasets use for disputed territories.
const ISO3_ALIASES: &[(&str, &str)] = &[
    ("KOS", "XKX"),
    ("XKX", "XKX"),
    ("SDS", "SSD"),
    ("-99", UNKNOWN_ISO3),
];

/// Source-specific country name phrasings mapped to the canonical display
/// name, keyed by the raw name exactly as the source reports it.
const NAME_ALIASES: &[(&str, &str)] = &[
    ("West Bank", "Palestine"),
    ("West Bank and Gaza", "Palestine"),
    ("Gaza Strip", "Palestine"),
];

/// Canonical display names keyed by ISO3, applied when no raw-name alias
/// matched.
const ISO3_NAME_OVERRIDES: &[(&str, &str)] = &[("PSE", "Palestine")];

/// Normalizes a raw country code from any source to a canonical ISO3 code.
///
/// Uppercases and trims, applies the alias table, and degrades anything
/// that is not exactly three ASCII letters to [`UNKNOWN_ISO3`]. Never
/// errors.
#[must_use]
pub fn resolve_iso3(raw: &str) -> String {
    let code = raw.trim().to_uppercase();

    if let Some((_, canonical)) = ISO3_ALIASES.iter().find(|(alias, _)| *alias == code) {
        return (*canonical).to_owned();
    }

    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        return code;
    }

    UNKNOWN_ISO3.to_owned()
}

/// Resolves a source-reported country name to the canonical display name.
///
/// Checks the raw-name alias table first, then the ISO3-keyed override
/// table, and otherwise returns the raw name unchanged.
#[must_use]
pub fn resolve_country_name(raw_name: &str, iso3: &str) -> String {
    if let Some((_, canonical)) = NAME_ALIASES.iter().find(|(alias, _)| *alias == raw_name) {
        return (*canonical).to_owned();
    }

    let code = iso3.trim().to_uppercase();
    if let Some((_, canonical)) = ISO3_NAME_OVERRIDES.iter().find(|(key, _)| *key == code) {
        return (*canonical).to_owned();
    }

    raw_name.to_owned()
}

/// Returns the country name ACLED expects as its `country` query parameter.
///
/// Derived from the same registry as [`lookup_coordinate`] so the ACLED
/// mapping can never drift from the display-name table.
#[must_use]
pub fn acled_country_name(iso3: &str) -> Option<&'static str> {
    registry::lookup_coordinate(&resolve_iso3(iso3)).map(|c| c.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_plain_iso3() {
        assert_eq!(resolve_iso3("syr"), "SYR");
        assert_eq!(resolve_iso3(" TUR "), "TUR");
    }

    #[test]
    fn resolves_kosovo_alias() {
        assert_eq!(resolve_iso3("KOS"), "XKX");
        assert_eq!(resolve_iso3("XKX"), "XKX");
    }

    #[test]
    fn resolves_legacy_south_sudan() {
        assert_eq!(resolve_iso3("SDS"), "SSD");
    }

    #[test]
    fn malformed_codes_degrade_to_unknown() {
        assert_eq!(resolve_iso3("-99"), UNKNOWN_ISO3);
        assert_eq!(resolve_iso3(""), UNKNOWN_ISO3);
        assert_eq!(resolve_iso3("US"), UNKNOWN_ISO3);
        assert_eq!(resolve_iso3("USAA"), UNKNOWN_ISO3);
        assert_eq!(resolve_iso3("X1Z"), UNKNOWN_ISO3);
    }

    #[test]
    fn west_bank_phrasings_resolve_to_palestine() {
        assert_eq!(resolve_country_name("West Bank", "PSE"), "Palestine");
        assert_eq!(
            resolve_country_name("West Bank and Gaza", "PSE"),
            "Palestine"
        );
    }

    #[test]
    fn iso_override_applies_without_name_alias() {
        assert_eq!(
            resolve_country_name("State of Palestine", "pse"),
            "Palestine"
        );
    }

    #[test]
    fn unknown_names_pass_through() {
        assert_eq!(resolve_country_name("Jordan", "JOR"), "Jordan");
    }

    #[test]
    fn acled_name_matches_registry() {
        assert_eq!(acled_country_name("COD"), Some("Democratic Republic of the Congo"));
        assert_eq!(acled_country_name("USA"), Some("United States of America"));
        // Legacy code goes through the alias table first.
        assert_eq!(acled_country_name("SDS"), Some("South Sudan"));
    }
}
