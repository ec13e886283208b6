#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Snapshot generation: pages through full source history and writes the
//! static snapshot files served to the globe at runtime.
//!
//! Each generator fetches one source's data for a year range and writes
//! the corresponding snapshot format. Generators are independent so a
//! failed conflict run never invalidates a flows snapshot, and per-country
//! failures inside a run are logged and skipped rather than aborting the
//! batch.

use std::collections::BTreeMap;

use displacement_globe_aggregate::aggregate_country;
use displacement_globe_cache::snapshot::{
    ConflictCountryFile, ConflictMetadata, IomSnapshot, RawItemSnapshot, SNAPSHOT_VERSION,
    SnapshotStore,
};
use displacement_globe_geography::all_coordinates;
use displacement_globe_source::acled::AcledClient;
use displacement_globe_source::iom::IomClient;
use displacement_globe_source::unhcr::UnhcrClient;
use displacement_globe_source::unrwa::UnrwaClient;
use displacement_globe_source_models::{UnhcrPopulationItem, UnrwaItem};

/// Errors from snapshot generation and upload.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Live source fetch failed.
    #[error(transparent)]
    Source(#[from] displacement_globe_source::SourceError),
    /// Snapshot file write failed.
    #[error(transparent)]
    Cache(#[from] displacement_globe_cache::CacheError),
    /// Object-storage upload failed.
    #[error(transparent)]
    Blob(#[from] displacement_globe_blob::BlobError),
    /// Size measurement failed while building conflict metadata.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Fetches raw UNHCR and UNRWA population items for every year in the
/// range and writes both snapshot files.
///
/// Raw items are stored instead of normalized flows so later
/// normalization fixes apply without a refetch. A year that fails for one
/// source is logged and omitted from that source's snapshot.
///
/// # Errors
///
/// Returns [`FetchError`] if a client cannot be built or a snapshot file
/// cannot be written.
pub async fn generate_flow_snapshots(
    store: &SnapshotStore,
    from: i32,
    to: i32,
) -> Result<(), FetchError> {
    let unhcr = UnhcrClient::new()?;
    let unrwa = UnrwaClient::new()?;
    let now = chrono::Utc::now().to_rfc3339();

    let mut unhcr_data: BTreeMap<i32, Vec<UnhcrPopulationItem>> = BTreeMap::new();
    let mut unrwa_data: BTreeMap<i32, Vec<UnrwaItem>> = BTreeMap::new();

    for year in from..=to {
        match unhcr.fetch_global_items(year).await {
            Ok(items) if !items.is_empty() => {
                unhcr_data.insert(year, items);
            }
            Ok(_) => log::warn!("UNHCR {year}: no items, omitting from snapshot"),
            Err(e) => log::warn!("UNHCR {year}: fetch failed, omitting: {e}"),
        }

        match unrwa.fetch_items(year).await {
            Ok(items) if !items.is_empty() => {
                unrwa_data.insert(year, items);
            }
            Ok(_) => {}
            Err(e) => log::warn!("UNRWA {year}: fetch failed, omitting: {e}"),
        }
    }

    store.write_unhcr(&RawItemSnapshot {
        last_fetched: now.clone(),
        years: unhcr_data.keys().copied().collect(),
        data: unhcr_data,
    })?;
    store.write_unrwa(&RawItemSnapshot {
        last_fetched: now,
        years: unrwa_data.keys().copied().collect(),
        data: unrwa_data,
    })?;

    log::info!("flow snapshots written to {}", store.dir().display());
    Ok(())
}

/// Fetches ACLED events for each country over the year range and writes
/// one conflict snapshot file per country plus the metadata index.
///
/// Countries whose every year fails or returns nothing get no file and
/// are absent from `availableCountries`.
///
/// # Errors
///
/// Returns [`FetchError`] if credentials are missing or a snapshot file
/// cannot be written. Per-country fetch failures are logged and skipped.
pub async fn generate_conflict_snapshots(
    store: &SnapshotStore,
    countries: &[String],
    from: i32,
    to: i32,
) -> Result<(), FetchError> {
    let acled = AcledClient::from_env()?;
    let now = chrono::Utc::now().to_rfc3339();

    let mut total_events: u64 = 0;
    let mut available: Vec<String> = Vec::new();
    let mut compact_bytes: u64 = 0;
    let mut pretty_bytes: u64 = 0;

    for iso3 in countries {
        let mut yearly_data = BTreeMap::new();
        for year in from..=to {
            match acled.fetch_country_events(iso3, year).await {
                Ok(events) if !events.is_empty() => {
                    total_events += events.len() as u64;
                    yearly_data.insert(year, events);
                }
                Ok(_) => {}
                Err(e) => log::warn!("ACLED {iso3} {year}: skipping: {e}"),
            }
        }

        if yearly_data.is_empty() {
            continue;
        }

        let file = ConflictCountryFile {
            iso3: iso3.clone(),
            yearly_data,
            last_fetched: now.clone(),
            version: SNAPSHOT_VERSION,
        };
        compact_bytes += serde_json::to_string(&file)?.len() as u64;
        pretty_bytes += serde_json::to_string_pretty(&file)?.len() as u64;
        store.write_conflict_country(&file)?;
        available.push(iso3.clone());
    }

    #[allow(clippy::cast_precision_loss)] // informational ratio only
    let compression_ratio = if pretty_bytes == 0 {
        1.0
    } else {
        compact_bytes as f64 / pretty_bytes as f64
    };

    store.write_conflict_metadata(&ConflictMetadata {
        version: SNAPSHOT_VERSION,
        last_fetched: now,
        total_events,
        countries_count: u32::try_from(available.len()).unwrap_or(u32::MAX),
        years: (from..=to).collect(),
        available_countries: available,
        compression_ratio,
    })?;

    log::info!(
        "conflict snapshots written to {} ({total_events} events)",
        store.dir().display()
    );
    Ok(())
}

/// Fetches IOM IDP data for every DTM country, aggregates it, and writes
/// the IDP snapshot.
///
/// # Errors
///
/// Returns [`FetchError`] if the country list cannot be fetched or the
/// snapshot cannot be written.
pub async fn generate_idp_snapshot(store: &SnapshotStore) -> Result<(), FetchError> {
    let iom = IomClient::new()?;
    let raw = iom.fetch_all().await?;
    let now = chrono::Utc::now().to_rfc3339();

    let mut idp_data = BTreeMap::new();
    for (iso3, points) in &raw {
        let country_name = points
            .first()
            .map_or_else(String::new, |p| p.admin0_name.clone());
        let data = aggregate_country(&country_name, iso3, points);
        if data.has_data {
            idp_data.insert(iso3.clone(), data);
        }
    }

    log::info!(
        "IDP snapshot: {} of {} countries have data",
        idp_data.len(),
        raw.len()
    );

    store.write_idp(&IomSnapshot {
        idp_data,
        last_fetched: now,
        version: SNAPSHOT_VERSION,
    })?;
    Ok(())
}

/// Writes the country-coordinate table snapshot.
///
/// # Errors
///
/// Returns [`FetchError`] if the file cannot be written.
pub fn generate_coordinates(store: &SnapshotStore) -> Result<(), FetchError> {
    let coordinates = all_coordinates();
    store.write_coordinates(coordinates)?;
    log::info!("coordinate table written ({} entries)", coordinates.len());
    Ok(())
}

/// Default country set for conflict snapshot generation: every registry
/// entry with a real ISO3 code (sentinel buckets carry no events).
#[must_use]
pub fn default_conflict_countries() -> Vec<String> {
    all_coordinates()
        .iter()
        .filter(|c| !matches!(c.iso3.as_str(), "UNK" | "STA" | "VAR"))
        .map(|c| c.iso3.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_countries_exclude_sentinels() {
        let countries = default_conflict_countries();
        assert!(countries.iter().all(|c| c != "UNK" && c != "STA" && c != "VAR"));
        assert!(countries.iter().any(|c| c == "SYR"));
    }
}
