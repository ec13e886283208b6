//! Conflict event summarization.
//!
//! All sorts here are stable so ties resolve to source fetch order, which
//! keeps a summary reproducible across runs against the same event set.

use std::collections::BTreeMap;

use displacement_globe_flow_models::{ConflictEvent, ConflictSummary, LocationCount, MonthlyBucket};

/// How many top locations and deadliest events a summary carries.
const TOP_N: usize = 5;

/// Derives per-country conflict statistics from an event set.
///
/// Locations are counted by admin1 region, falling back to the event's
/// point location name when admin1 is empty. Monthly buckets use the
/// event's own date, so an event set spanning years produces a timeline
/// spanning years.
#[must_use]
pub fn summarize(events: &[ConflictEvent]) -> ConflictSummary {
    let mut event_type_counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut months: BTreeMap<String, (u64, u64)> = BTreeMap::new();

    // Location counts keep first-appearance order so the top-5 cut breaks
    // count ties by fetch order.
    let mut location_order: Vec<String> = Vec::new();
    let mut location_counts: BTreeMap<String, u64> = BTreeMap::new();

    let mut total_fatalities: u64 = 0;

    for event in events {
        total_fatalities += event.fatalities;

        *event_type_counts.entry(event.event_type.clone()).or_insert(0) += 1;

        let location = if event.admin1.is_empty() {
            event.location.as_str()
        } else {
            event.admin1.as_str()
        };
        if let Some(count) = location_counts.get_mut(location) {
            *count += 1;
        } else {
            location_order.push(location.to_owned());
            location_counts.insert(location.to_owned(), 1);
        }

        let month = event.date.format("%Y-%m").to_string();
        let bucket = months.entry(month).or_insert((0, 0));
        bucket.0 += 1;
        bucket.1 += event.fatalities;
    }

    let mut top_locations: Vec<LocationCount> = location_order
        .into_iter()
        .map(|location| {
            let count = location_counts.get(&location).copied().unwrap_or(0);
            LocationCount { location, count }
        })
        .collect();
    top_locations.sort_by(|a, b| b.count.cmp(&a.count));
    top_locations.truncate(TOP_N);

    let mut most_deadly_events = events.to_vec();
    most_deadly_events.sort_by(|a, b| b.fatalities.cmp(&a.fatalities));
    most_deadly_events.truncate(TOP_N);

    ConflictSummary {
        total_events: events.len() as u64,
        total_fatalities,
        event_type_counts,
        top_locations,
        most_deadly_events,
        monthly_timeline: months
            .into_iter()
            .map(|(month, (events, fatalities))| MonthlyBucket {
                month,
                events,
                fatalities,
            })
            .collect(),
    }
}
