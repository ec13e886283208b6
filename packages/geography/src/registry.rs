//! The canonical country coordinate registry.
//!
//! Built once on first access from an embedded JSON asset (generated
//! offline from public geographic data) plus a static override table for
//! entries the upstream dataset gets wrong or lacks entirely: disputed
//! territories, politically sensitive names, and the non-ISO sentinel
//! buckets UNHCR uses for stateless/unknown populations.

use std::collections::HashMap;
use std::sync::OnceLock;

use displacement_globe_flow_models::CountryCoordinate;

/// Country table baked in at compile time, sorted by ISO3.
const COORDINATES_JSON: &str = include_str!("../assets/country-coordinates.json");

/// Entries that replace or extend the embedded asset.
///
/// Kept in code rather than the asset so a regenerated asset cannot
/// silently lose them.
fn override_entries() -> Vec<CountryCoordinate> {
    let entry = |iso3: &str, name: &str, capital: &str, lat: f64, lng: f64| CountryCoordinate {
        iso3: iso3.to_owned(),
        name: name.to_owned(),
        capital: capital.to_owned(),
        lat,
        lng,
    };

    vec![
        entry("PSE", "Palestine", "Ramallah", 31.9522, 35.2332),
        entry("XKX", "Kosovo", "Pristina", 42.6629, 21.1655),
        entry("TWN", "Taiwan", "Taipei", 25.0330, 121.5654),
        entry("TIB", "Tibet", "Lhasa", 29.6520, 91.1720),
        entry("SRB", "Serbia", "Belgrade", 44.7866, 20.4489),
        // Seat-of-government picks that differ from the constitutional capital.
        entry("BOL", "Bolivia", "La Paz", -16.4897, -68.1193),
        entry("ZAF", "South Africa", "Pretoria", -25.7479, 28.2293),
        // Sentinel buckets for populations UNHCR reports without a country.
        entry("UNK", "Unknown", "", 0.0, 0.0),
        entry("STA", "Stateless", "", 0.0, 0.0),
        entry("VAR", "Various", "", 0.0, 0.0),
    ]
}

struct Registry {
    countries: Vec<CountryCoordinate>,
    by_iso3: HashMap<String, usize>,
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut countries: Vec<CountryCoordinate> = match serde_json::from_str(COORDINATES_JSON) {
            Ok(list) => list,
            Err(e) => {
                log::error!("embedded country table failed to parse: {e}");
                Vec::new()
            }
        };

        for entry in override_entries() {
            if let Some(existing) = countries.iter_mut().find(|c| c.iso3 == entry.iso3) {
                *existing = entry;
            } else {
                countries.push(entry);
            }
        }

        countries.sort_by(|a, b| a.iso3.cmp(&b.iso3));

        let by_iso3 = countries
            .iter()
            .enumerate()
            .map(|(i, c)| (c.iso3.clone(), i))
            .collect();

        Registry { countries, by_iso3 }
    })
}

/// Looks up the coordinate entry for an ISO3 code. O(1).
///
/// The code is expected to already be canonical (see
/// [`crate::resolve_iso3`]); no alias resolution happens here.
#[must_use]
pub fn lookup_coordinate(iso3: &str) -> Option<&'static CountryCoordinate> {
    let reg = registry();
    reg.by_iso3.get(iso3).map(|&i| &reg.countries[i])
}

/// All registry entries, sorted by ISO3. Used by the snapshot generator.
#[must_use]
pub fn all_coordinates() -> &'static [CountryCoordinate] {
    &registry().countries
}
