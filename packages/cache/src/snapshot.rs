//! Static snapshot tier.
//!
//! Snapshots are generated offline by the fetch binary and read-only at
//! runtime. The read half never evicts or rewrites anything; a corrupt
//! snapshot file is logged and treated as absent so the tiered lookup
//! falls through to the next tier.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use displacement_globe_flow_models::{ConflictEvent, CountryCoordinate, IdpCountryData};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::CacheError;

/// Format version stamped into every generated snapshot file.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Per-country conflict-event snapshot, one file per country.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictCountryFile {
    /// ISO3 country code.
    pub iso3: String,
    /// Event sets keyed by year.
    pub yearly_data: BTreeMap<i32, Vec<ConflictEvent>>,
    /// When the data was fetched (ISO 8601).
    pub last_fetched: String,
    /// Snapshot format version.
    pub version: u32,
}

/// Index over the per-country conflict snapshot files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictMetadata {
    /// Snapshot format version.
    pub version: u32,
    /// When the snapshot set was generated (ISO 8601).
    pub last_fetched: String,
    /// Total events across all country files.
    pub total_events: u64,
    /// Number of country files.
    pub countries_count: u32,
    /// Years covered.
    pub years: Vec<i32>,
    /// ISO3 codes with a country file present.
    pub available_countries: Vec<String>,
    /// Size of the generated files relative to the raw API payloads.
    pub compression_ratio: f64,
}

/// IOM internal-displacement snapshot, one file for all countries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IomSnapshot {
    /// Processed per-country IDP data keyed by ISO3.
    pub idp_data: BTreeMap<String, IdpCountryData>,
    /// When the data was fetched (ISO 8601).
    pub last_fetched: String,
    /// Snapshot format version.
    pub version: u32,
}

/// Raw population items keyed by year, as fetched from UNHCR or UNRWA.
///
/// Raw items rather than normalized flows are stored so normalization
/// fixes apply to snapshot-served data without refetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItemSnapshot<T> {
    /// When the data was fetched (ISO 8601).
    pub last_fetched: String,
    /// Years covered.
    pub years: Vec<i32>,
    /// Raw items keyed by year.
    pub data: BTreeMap<i32, Vec<T>>,
}

/// Reader/writer over a snapshot directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Opens a store over `dir`. Nothing is read until a lookup.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Snapshot directory root.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads one country's conflict snapshot file, if present and valid.
    #[must_use]
    pub fn load_conflict_country(&self, iso3: &str) -> Option<ConflictCountryFile> {
        self.load(&self.conflict_country_path(iso3))
    }

    /// Conflict events for one country-year, if snapshotted.
    #[must_use]
    pub fn conflict_events(&self, iso3: &str, year: i32) -> Option<Vec<ConflictEvent>> {
        self.load_conflict_country(iso3)?.yearly_data.remove(&year)
    }

    /// Loads the conflict snapshot index, if present and valid.
    #[must_use]
    pub fn load_conflict_metadata(&self) -> Option<ConflictMetadata> {
        self.load(&self.dir.join("conflict").join("metadata.json"))
    }

    /// Loads the IOM snapshot, if present and valid.
    #[must_use]
    pub fn load_idp(&self) -> Option<IomSnapshot> {
        self.load(&self.dir.join("idp-data.json"))
    }

    /// Processed IDP data for one country, if snapshotted.
    #[must_use]
    pub fn idp_country(&self, iso3: &str) -> Option<IdpCountryData> {
        self.load_idp()?.idp_data.remove(iso3)
    }

    /// Loads the UNHCR raw-item snapshot, if present and valid.
    #[must_use]
    pub fn load_unhcr<T: DeserializeOwned>(&self) -> Option<RawItemSnapshot<T>> {
        self.load(&self.dir.join("unhcr-population.json"))
    }

    /// Loads the UNRWA raw-item snapshot, if present and valid.
    #[must_use]
    pub fn load_unrwa<T: DeserializeOwned>(&self) -> Option<RawItemSnapshot<T>> {
        self.load(&self.dir.join("unrwa-population.json"))
    }

    /// Writes one country's conflict snapshot file.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] on any write failure.
    pub fn write_conflict_country(&self, file: &ConflictCountryFile) -> Result<(), CacheError> {
        self.write(&self.conflict_country_path(&file.iso3), file)
    }

    /// Writes the conflict snapshot index.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] on any write failure.
    pub fn write_conflict_metadata(&self, metadata: &ConflictMetadata) -> Result<(), CacheError> {
        self.write(&self.dir.join("conflict").join("metadata.json"), metadata)
    }

    /// Writes the IOM snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] on any write failure.
    pub fn write_idp(&self, snapshot: &IomSnapshot) -> Result<(), CacheError> {
        self.write(&self.dir.join("idp-data.json"), snapshot)
    }

    /// Writes the UNHCR raw-item snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] on any write failure.
    pub fn write_unhcr<T: Serialize>(&self, snapshot: &RawItemSnapshot<T>) -> Result<(), CacheError> {
        self.write(&self.dir.join("unhcr-population.json"), snapshot)
    }

    /// Writes the UNRWA raw-item snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] on any write failure.
    pub fn write_unrwa<T: Serialize>(&self, snapshot: &RawItemSnapshot<T>) -> Result<(), CacheError> {
        self.write(&self.dir.join("unrwa-population.json"), snapshot)
    }

    /// Writes the country-coordinate table.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] on any write failure.
    pub fn write_coordinates(&self, coordinates: &[CountryCoordinate]) -> Result<(), CacheError> {
        self.write(&self.dir.join("country-coordinates.json"), &coordinates)
    }

    fn conflict_country_path(&self, iso3: &str) -> PathBuf {
        self.dir.join("conflict").join(format!("{iso3}.json"))
    }

    fn load<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("snapshot read failed for {}: {e}", path.display());
                }
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("ignoring corrupt snapshot {}: {e}", path.display());
                None
            }
        }
    }

    fn write<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string(value)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn temp_store() -> SnapshotStore {
        SnapshotStore::new(
            std::env::temp_dir().join(format!("dg-snapshot-test-{}", uuid::Uuid::new_v4())),
        )
    }

    fn event(id: &str) -> ConflictEvent {
        ConflictEvent {
            event_id: id.to_owned(),
            date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            year: 2023,
            event_type: "Battles".to_owned(),
            sub_event_type: String::new(),
            actor1: String::new(),
            actor2: String::new(),
            admin1: String::new(),
            admin2: String::new(),
            admin3: String::new(),
            location: String::new(),
            lat: 0.0,
            lng: 0.0,
            fatalities: 1,
            civilian_targeting: String::new(),
        }
    }

    #[test]
    fn conflict_country_round_trips() {
        let store = temp_store();
        let mut yearly_data = BTreeMap::new();
        yearly_data.insert(2023, vec![event("SYR1")]);

        store
            .write_conflict_country(&ConflictCountryFile {
                iso3: "SYR".to_owned(),
                yearly_data,
                last_fetched: "2025-01-01T00:00:00Z".to_owned(),
                version: SNAPSHOT_VERSION,
            })
            .unwrap();

        let events = store.conflict_events("SYR", 2023).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, "SYR1");
        assert!(store.conflict_events("SYR", 2020).is_none());
        assert!(store.conflict_events("AFG", 2023).is_none());
    }

    #[test]
    fn corrupt_snapshot_is_absent_not_an_error() {
        let store = temp_store();
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(store.dir().join("idp-data.json"), "[oops").unwrap();
        assert!(store.load_idp().is_none());
    }

    #[test]
    fn idp_snapshot_round_trips() {
        let store = temp_store();
        let mut idp_data = BTreeMap::new();
        idp_data.insert(
            "NGA".to_owned(),
            IdpCountryData {
                country_name: "Nigeria".to_owned(),
                iso3: "NGA".to_owned(),
                yearly_data: Vec::new(),
                last_updated: "2025-01-01T00:00:00Z".to_owned(),
                has_data: false,
            },
        );

        store
            .write_idp(&IomSnapshot {
                idp_data,
                last_fetched: "2025-01-01T00:00:00Z".to_owned(),
                version: SNAPSHOT_VERSION,
            })
            .unwrap();

        assert_eq!(store.idp_country("NGA").unwrap().country_name, "Nigeria");
        assert!(store.idp_country("TCD").is_none());
    }
}
