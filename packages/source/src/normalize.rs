//! Pure raw-to-canonical transforms, one per source.
//!
//! Everything here is a total function over already-deserialized raw items:
//! no I/O, no errors. Bad records degrade — unparseable numbers become
//! zero, unmappable country codes become the unknown sentinel — so a single
//! malformed item can never fail a whole batch.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use displacement_globe_flow_models::{ConflictEvent, MigrationFlow};
use displacement_globe_geography::{resolve_country_name, resolve_iso3};
use displacement_globe_source_models::{AcledRow, UnhcrPopulationItem, UnrwaItem};

use crate::parsing::parse_event_date;

/// Converts raw UNHCR population items into migration flows.
///
/// Self-flows (identical origin and asylum code) and flows with zero total
/// displacement are dropped here, not later.
#[must_use]
pub fn flows_from_unhcr_items(items: &[UnhcrPopulationItem]) -> Vec<MigrationFlow> {
    items
        .iter()
        .filter_map(|item| {
            let origin_iso = resolve_iso3(&item.coo_iso);
            let asylum_iso = resolve_iso3(&item.coa_iso);
            if origin_iso == asylum_iso {
                return None;
            }

            let refugees = item.refugees.as_count();
            let asylum_seekers = item.asylum_seekers.as_count();
            let total_displaced = refugees + asylum_seekers;
            if total_displaced == 0 {
                return None;
            }

            Some(MigrationFlow {
                origin_name: resolve_country_name(&item.coo_name, &origin_iso),
                asylum_name: resolve_country_name(&item.coa_name, &asylum_iso),
                origin_iso,
                asylum_iso,
                refugees,
                asylum_seekers,
                total_displaced,
                year: item.year,
            })
        })
        .collect()
}

/// Converts raw UNRWA items into migration flows out of Palestine.
///
/// UNRWA reports multiple rows per host country; duplicates are summed
/// into one record per destination. UNRWA tracks no asylum-seeker figures,
/// so that field is always zero. Output is ordered by destination ISO3 so
/// repeated fetches produce identical results.
#[must_use]
pub fn flows_from_unrwa_items(items: &[UnrwaItem], year: i32) -> Vec<MigrationFlow> {
    let mut by_destination: BTreeMap<String, (String, u64)> = BTreeMap::new();

    for item in items {
        let iso = resolve_iso3(&item.coa_iso);
        let total = item.total.as_count();
        if iso == "PSE" || iso == displacement_globe_geography::UNKNOWN_ISO3 || total == 0 {
            continue;
        }

        let name = resolve_country_name(&item.coa_name, &iso);
        let entry = by_destination.entry(iso).or_insert((name, 0));
        entry.1 += total;
    }

    by_destination
        .into_iter()
        .map(|(asylum_iso, (asylum_name, refugees))| MigrationFlow {
            origin_iso: "PSE".to_owned(),
            origin_name: "Palestine".to_owned(),
            asylum_iso,
            asylum_name,
            refugees,
            asylum_seekers: 0,
            total_displaced: refugees,
            year,
        })
        .collect()
}

/// Converts raw ACLED rows into conflict events.
///
/// Rows with an unparseable event date are dropped (they cannot be placed
/// on the timeline); all numeric leniency comes from `RawNumber`.
#[must_use]
pub fn events_from_acled_rows(rows: &[AcledRow]) -> Vec<ConflictEvent> {
    rows.iter()
        .filter_map(|row| {
            let date = parse_event_date(&row.event_date)?;
            Some(ConflictEvent {
                event_id: row.event_id_cnty.clone(),
                date,
                year: event_year(&row.year, date),
                event_type: row.event_type.clone(),
                sub_event_type: row.sub_event_type.clone(),
                actor1: row.actor1.clone(),
                actor2: row.actor2.clone(),
                admin1: row.admin1.clone(),
                admin2: row.admin2.clone(),
                admin3: row.admin3.clone(),
                location: row.location.clone(),
                lat: row.latitude.as_coordinate(),
                lng: row.longitude.as_coordinate(),
                fatalities: row.fatalities.as_count(),
                civilian_targeting: row.civilian_targeting.clone(),
            })
        })
        .collect()
}

/// Year as reported by the source, falling back to the event date's year.
fn event_year(raw: &displacement_globe_source_models::RawNumber, date: NaiveDate) -> i32 {
    let year = raw.as_count();
    if year == 0 {
        use chrono::Datelike;
        date.year()
    } else {
        i32::try_from(year).unwrap_or_else(|_| {
            use chrono::Datelike;
            date.year()
        })
    }
}

#[cfg(test)]
mod tests {
    use displacement_globe_source_models::RawNumber;

    use super::*;

    fn unhcr_item(
        coo: &str,
        coa: &str,
        refugees: RawNumber,
        asylum_seekers: RawNumber,
    ) -> UnhcrPopulationItem {
        UnhcrPopulationItem {
            year: 2023,
            coo_name: coo.to_owned(),
            coo_iso: coo.to_owned(),
            coa_name: coa.to_owned(),
            coa_iso: coa.to_owned(),
            refugees,
            asylum_seekers,
        }
    }

    #[test]
    fn drops_self_flows() {
        let items = vec![
            unhcr_item("SYR", "SYR", RawNumber::Int(1000), RawNumber::Int(0)),
            unhcr_item("SYR", "TUR", RawNumber::Int(1000), RawNumber::Int(0)),
        ];
        let flows = flows_from_unhcr_items(&items);
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].asylum_iso, "TUR");
    }

    #[test]
    fn drops_zero_total_flows() {
        let items = vec![unhcr_item(
            "SYR",
            "TUR",
            RawNumber::Text("-".to_owned()),
            RawNumber::Text(String::new()),
        )];
        assert!(flows_from_unhcr_items(&items).is_empty());
    }

    #[test]
    fn dash_counts_parse_to_zero_not_nan() {
        let items = vec![unhcr_item(
            "SYR",
            "TUR",
            RawNumber::Text("-".to_owned()),
            RawNumber::Int(50),
        )];
        let flows = flows_from_unhcr_items(&items);
        assert_eq!(flows[0].refugees, 0);
        assert_eq!(flows[0].asylum_seekers, 50);
        assert_eq!(flows[0].total_displaced, 50);
    }

    #[test]
    fn total_is_refugees_plus_asylum_seekers() {
        let items = vec![unhcr_item(
            "SYR",
            "TUR",
            RawNumber::Int(100),
            RawNumber::Int(50),
        )];
        let flows = flows_from_unhcr_items(&items);
        assert_eq!(flows[0].total_displaced, 150);
    }

    #[test]
    fn legacy_codes_resolve_before_self_flow_check() {
        // SDS is a legacy alias of SSD, so SDS -> SSD is a self-flow.
        let items = vec![unhcr_item(
            "SDS",
            "SSD",
            RawNumber::Int(100),
            RawNumber::Int(0),
        )];
        assert!(flows_from_unhcr_items(&items).is_empty());
    }

    fn unrwa_item(coa: &str, total: u64) -> UnrwaItem {
        UnrwaItem {
            year: 2023,
            coa_name: coa.to_owned(),
            coa_iso: coa.to_owned(),
            coo_iso: "PSE".to_owned(),
            total: RawNumber::Int(i64::try_from(total).unwrap()),
        }
    }

    #[test]
    fn unrwa_sums_duplicate_destinations() {
        let items = vec![
            unrwa_item("JOR", 100_000),
            unrwa_item("JOR", 50_000),
            unrwa_item("LBN", 30_000),
        ];
        let flows = flows_from_unrwa_items(&items, 2023);
        assert_eq!(flows.len(), 2);
        let jor = flows.iter().find(|f| f.asylum_iso == "JOR").unwrap();
        assert_eq!(jor.refugees, 150_000);
        assert_eq!(jor.asylum_seekers, 0);
        assert_eq!(jor.total_displaced, 150_000);
    }

    #[test]
    fn unrwa_skips_palestine_and_zero_rows() {
        let items = vec![unrwa_item("PSE", 10_000), unrwa_item("EGY", 0)];
        assert!(flows_from_unrwa_items(&items, 2023).is_empty());
    }

    #[test]
    fn acled_rows_normalize_with_string_numbers() {
        let json = r#"[{
            "event_id_cnty": "SYR1",
            "event_date": "2023-03-01",
            "year": "2023",
            "event_type": "Battles",
            "sub_event_type": "Armed clash",
            "actor1": "A",
            "actor2": "B",
            "admin1": "Aleppo",
            "admin2": "",
            "admin3": "",
            "location": "Aleppo",
            "latitude": "36.2021",
            "longitude": "37.1343",
            "fatalities": "7",
            "civilian_targeting": ""
        }]"#;
        let rows: Vec<AcledRow> = serde_json::from_str(json).unwrap();
        let events = events_from_acled_rows(&rows);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].fatalities, 7);
        assert_eq!(events[0].year, 2023);
        assert!((events[0].lat - 36.2021).abs() < 1e-9);
    }

    #[test]
    fn acled_rows_without_dates_are_dropped() {
        let rows = vec![AcledRow {
            event_id_cnty: "X1".to_owned(),
            event_date: "not a date".to_owned(),
            year: RawNumber::Int(2023),
            event_type: String::new(),
            sub_event_type: String::new(),
            actor1: String::new(),
            actor2: String::new(),
            admin1: String::new(),
            admin2: String::new(),
            admin3: String::new(),
            location: String::new(),
            latitude: RawNumber::Null,
            longitude: RawNumber::Null,
            fatalities: RawNumber::Null,
            civilian_targeting: String::new(),
        }];
        assert!(events_from_acled_rows(&rows).is_empty());
    }
}
