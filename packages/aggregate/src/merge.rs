//! Flow merging and filtering.
//!
//! Merge semantics are additive, not upsert: merging the same secondary
//! set twice double-counts. Callers merge each source exactly once per
//! scope; the cache layer stores merged results so a scope is never
//! re-merged.

use std::collections::BTreeMap;

use displacement_globe_flow_models::MigrationFlow;
use serde::{Deserialize, Serialize};

/// Merges a secondary flow set into a primary one, keyed by
/// `(origin, asylum)`.
///
/// Keys present in both inputs have the secondary's refugee, asylum-seeker,
/// and total counts added onto the primary's record. Adding asylum seekers
/// is a deliberate generalization: the secondary source in practice tracks
/// only refugees (its asylum-seeker field is normalized to zero), and adding
/// all three fields keeps `total_displaced` equal to
/// `refugees + asylum_seekers` for any secondary input. Keys present only
/// in the secondary are carried over unchanged. Output is ordered by key,
/// so the result is independent of input order for non-overlapping keys.
#[must_use]
pub fn merge_flows(primary: &[MigrationFlow], secondary: &[MigrationFlow]) -> Vec<MigrationFlow> {
    let mut merged: BTreeMap<(String, String), MigrationFlow> = BTreeMap::new();

    for flow in primary {
        merged.insert(flow.key(), flow.clone());
    }

    for flow in secondary {
        match merged.entry(flow.key()) {
            std::collections::btree_map::Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.refugees += flow.refugees;
                existing.asylum_seekers += flow.asylum_seekers;
                existing.total_displaced += flow.total_displaced;
            }
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(flow.clone());
            }
        }
    }

    merged.into_values().collect()
}

/// Per-country totals across a flow set, covering both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryFlowTotals {
    /// ISO3 code of the country.
    pub iso3: String,
    /// Display name of the country.
    pub name: String,
    /// Total displaced persons leaving this country.
    pub outgoing: u64,
    /// Total displaced persons arriving in this country.
    pub incoming: u64,
}

/// Sums a flow set into per-country outgoing and incoming totals.
///
/// Every country appearing on either side of any flow gets an entry.
/// Output is ordered by ISO3.
#[must_use]
pub fn aggregate_by_country(flows: &[MigrationFlow]) -> Vec<CountryFlowTotals> {
    let mut totals: BTreeMap<String, CountryFlowTotals> = BTreeMap::new();

    for flow in flows {
        let origin = totals
            .entry(flow.origin_iso.clone())
            .or_insert_with(|| CountryFlowTotals {
                iso3: flow.origin_iso.clone(),
                name: flow.origin_name.clone(),
                outgoing: 0,
                incoming: 0,
            });
        origin.outgoing += flow.total_displaced;

        let asylum = totals
            .entry(flow.asylum_iso.clone())
            .or_insert_with(|| CountryFlowTotals {
                iso3: flow.asylum_iso.clone(),
                name: flow.asylum_name.clone(),
                outgoing: 0,
                incoming: 0,
            });
        asylum.incoming += flow.total_displaced;
    }

    totals.into_values().collect()
}

/// Returns the `n` largest flows by total displacement.
///
/// The sort is stable, so flows with equal totals keep their input order.
#[must_use]
pub fn top_flows(flows: &[MigrationFlow], n: usize) -> Vec<MigrationFlow> {
    let mut sorted = flows.to_vec();
    sorted.sort_by(|a, b| b.total_displaced.cmp(&a.total_displaced));
    sorted.truncate(n);
    sorted
}

/// Drops flows below a minimum total displacement.
#[must_use]
pub fn filter_by_volume(flows: &[MigrationFlow], min_total: u64) -> Vec<MigrationFlow> {
    flows
        .iter()
        .filter(|flow| flow.total_displaced >= min_total)
        .cloned()
        .collect()
}

/// Groups flows by reporting year.
#[must_use]
pub fn group_by_year(flows: &[MigrationFlow]) -> BTreeMap<i32, Vec<MigrationFlow>> {
    let mut by_year: BTreeMap<i32, Vec<MigrationFlow>> = BTreeMap::new();
    for flow in flows {
        by_year.entry(flow.year).or_default().push(flow.clone());
    }
    by_year
}
