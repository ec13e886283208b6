//! IDP yearly selection.
//!
//! IOM reports many observation rounds per country-year, often under
//! several concurrent operations. The yearly figure is the most recently
//! reported value, never a sum or average: observation rounds report
//! stock (people currently displaced), so adding rounds would count the
//! same people repeatedly.

use chrono::NaiveDate;
use displacement_globe_flow_models::{IdpCountryData, IdpYearlyRecord};
use displacement_globe_source::parsing::parse_reporting_date;
use displacement_globe_source_models::IomDataPoint;

/// Operation whose data points take precedence within a year. When any
/// point in a year belongs to this operation, all other operations'
/// points for that year are discarded.
pub const PRIORITY_OPERATION: &str = "Countrywide monitoring";

/// Collapses raw IOM data points into one record per year.
///
/// Non-positive observations are dropped before any grouping, so a
/// zero-valued round can neither win the latest-date selection nor pull
/// the priority partition away from operations with real data. The
/// surviving points are grouped by reporting year, filtered to the
/// priority operation when present, and the latest-dated point in the
/// selected partition supplies the yearly figure. Min and max are tracked
/// across the same partition. Years with no positive points are omitted
/// entirely. Output is sorted by year descending.
#[must_use]
pub fn aggregate_by_year(points: &[IomDataPoint]) -> Vec<IdpYearlyRecord> {
    let valid: Vec<&IomDataPoint> = points
        .iter()
        .filter(|p| p.num_present_idp_ind > 0)
        .collect();

    let mut years: Vec<i32> = valid.iter().map(|p| p.year_reporting_date).collect();
    years.sort_unstable();
    years.dedup();

    let mut records: Vec<IdpYearlyRecord> = years
        .into_iter()
        .filter_map(|year| {
            let year_points: Vec<&IomDataPoint> = valid
                .iter()
                .filter(|p| p.year_reporting_date == year)
                .copied()
                .collect();
            summarize_year(year, &year_points)
        })
        .collect();

    records.sort_by_key(|record| std::cmp::Reverse(record.year));
    records
}

/// Builds the full per-country IDP record from raw points.
#[must_use]
pub fn aggregate_country(country_name: &str, iso3: &str, points: &[IomDataPoint]) -> IdpCountryData {
    let yearly_data = aggregate_by_year(points);
    let has_data = !yearly_data.is_empty();
    IdpCountryData {
        country_name: country_name.to_owned(),
        iso3: iso3.to_owned(),
        yearly_data,
        last_updated: chrono::Utc::now().to_rfc3339(),
        has_data,
    }
}

fn summarize_year(year: i32, year_points: &[&IomDataPoint]) -> Option<IdpYearlyRecord> {
    let priority: Vec<&IomDataPoint> = year_points
        .iter()
        .filter(|p| p.operation == PRIORITY_OPERATION)
        .copied()
        .collect();
    let selected: &[&IomDataPoint] = if priority.is_empty() {
        year_points
    } else {
        &priority
    };

    // Latest reporting date wins; ties keep the earliest-fetched point.
    let latest = selected.iter().copied().reduce(|best, candidate| {
        if reporting_date(candidate) > reporting_date(best) {
            candidate
        } else {
            best
        }
    })?;

    let counts: Vec<u64> = selected.iter().map(|p| idp_count(p)).collect();

    Some(IdpYearlyRecord {
        year,
        total_idps: idp_count(latest),
        data_point_count: u32::try_from(selected.len()).unwrap_or(u32::MAX),
        min_idps: counts.iter().copied().min().unwrap_or(0),
        max_idps: counts.iter().copied().max().unwrap_or(0),
        latest_report_date: latest.reporting_date.clone(),
        operation_used: latest.operation.clone(),
    })
}

/// Unparseable dates sort before every real date, so a point with a
/// malformed date can only win a year nothing else reports.
fn reporting_date(point: &IomDataPoint) -> NaiveDate {
    parse_reporting_date(&point.reporting_date).unwrap_or(NaiveDate::MIN)
}

fn idp_count(point: &IomDataPoint) -> u64 {
    u64::try_from(point.num_present_idp_ind).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(year: i32, operation: &str, date: &str, idps: i64) -> IomDataPoint {
        IomDataPoint {
            id: 0,
            operation: operation.to_owned(),
            admin0_name: "Nigeria".to_owned(),
            admin0_pcode: "NGA".to_owned(),
            num_present_idp_ind: idps,
            reporting_date: date.to_owned(),
            year_reporting_date: year,
            month_reporting_date: 1,
            round_number: 1,
            assessment_type: String::new(),
        }
    }

    #[test]
    fn priority_operation_excludes_other_operations() {
        let points = vec![
            point(2022, "Countrywide monitoring", "2022-01-01", 500_000),
            point(2022, "Countrywide monitoring", "2022-06-01", 600_000),
            point(2022, "Round 5", "2022-12-01", 900_000),
        ];

        let records = aggregate_by_year(&points);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_idps, 600_000);
        assert_eq!(records[0].operation_used, "Countrywide monitoring");
        assert_eq!(records[0].data_point_count, 2);
        assert_eq!(records[0].min_idps, 500_000);
        assert_eq!(records[0].max_idps, 600_000);
    }

    #[test]
    fn latest_date_wins_not_largest_value() {
        let points = vec![
            point(2023, "Mobility Tracking", "2023-03-01", 800_000),
            point(2023, "Mobility Tracking", "2023-09-01", 300_000),
        ];

        let records = aggregate_by_year(&points);
        assert_eq!(records[0].total_idps, 300_000);
        assert_eq!(records[0].latest_report_date, "2023-09-01");
    }

    #[test]
    fn all_operations_used_when_priority_absent() {
        let points = vec![
            point(2023, "Round 4", "2023-02-01", 100),
            point(2023, "Round 5", "2023-05-01", 200),
        ];

        let records = aggregate_by_year(&points);
        assert_eq!(records[0].total_idps, 200);
        assert_eq!(records[0].data_point_count, 2);
    }

    #[test]
    fn zero_years_are_omitted() {
        let points = vec![
            point(2021, "Round 1", "2021-06-01", 0),
            point(2022, "Round 2", "2022-06-01", 5000),
        ];

        let records = aggregate_by_year(&points);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].year, 2022);
    }

    #[test]
    fn zero_latest_point_does_not_suppress_year() {
        let points = vec![
            point(2022, "Countrywide monitoring", "2022-06-01", 500_000),
            point(2022, "Countrywide monitoring", "2022-12-01", 0),
        ];

        let records = aggregate_by_year(&points);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_idps, 500_000);
        assert_eq!(records[0].latest_report_date, "2022-06-01");
        assert_eq!(records[0].data_point_count, 1);
    }

    #[test]
    fn zero_priority_points_do_not_mask_other_operations() {
        let points = vec![
            point(2022, "Countrywide monitoring", "2022-12-01", 0),
            point(2022, "Round 5", "2022-06-01", 900_000),
        ];

        let records = aggregate_by_year(&points);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_idps, 900_000);
        assert_eq!(records[0].operation_used, "Round 5");
    }

    #[test]
    fn years_sort_descending() {
        let points = vec![
            point(2020, "Round 1", "2020-06-01", 100),
            point(2022, "Round 1", "2022-06-01", 300),
            point(2021, "Round 1", "2021-06-01", 200),
        ];

        let years: Vec<i32> = aggregate_by_year(&points).iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2022, 2021, 2020]);
    }

    #[test]
    fn negative_counts_clamp_to_zero_and_drop() {
        let points = vec![point(2023, "Round 1", "2023-06-01", -50)];
        assert!(aggregate_by_year(&points).is_empty());
    }

    #[test]
    fn country_record_flags_empty_data() {
        let data = aggregate_country("Nigeria", "NGA", &[]);
        assert!(!data.has_data);
        assert!(data.yearly_data.is_empty());
        assert_eq!(data.iso3, "NGA");
    }

    #[test]
    fn datetime_reporting_dates_compare_with_bare_dates() {
        let points = vec![
            point(2023, "Round 1", "2023-03-01T00:00:00", 100),
            point(2023, "Round 1", "2023-04-01", 200),
        ];
        let records = aggregate_by_year(&points);
        assert_eq!(records[0].total_idps, 200);
    }
}
