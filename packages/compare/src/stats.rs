//! Match statistics and the list of districts worth reporting.

use std::{collections::BTreeMap, sync::LazyLock};

use fhrs_osm_compare_models::{
    ComparisonRecord, District, DistrictStats, DistrictSummary, Establishment, StatusCounts,
};
use regex::Regex;

/// Administrative boilerplate in boundary dataset names.
static DISTRICT_NAME_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^County of |^City of |^The City of | City$|^City and County of the | District| \(B\)$| London Boro$",
    )
    .unwrap_or_else(|_| unreachable!())
});

/// Statistics over `records`, labelled with `district_id`.
#[must_use]
pub fn district_stats<'a>(
    district_id: Option<i32>,
    records: impl IntoIterator<Item = &'a ComparisonRecord>,
) -> DistrictStats {
    let counts: StatusCounts = records.into_iter().map(|r| r.status).collect();
    stats_from_counts(district_id, counts)
}

/// Derives totals and percentages from per-status counts.
///
/// Percentages are in `0..=100` and are `0` when their divisor is zero.
#[must_use]
pub fn stats_from_counts(district_id: Option<i32>, counts: StatusCounts) -> DistrictStats {
    let total_osm = counts.matched
        + counts.matched_postcode_error
        + counts.mismatch
        + counts.osm_with_postcode
        + counts.osm_no_postcode;
    let total_fhrs = counts.fhrs + counts.matched + counts.matched_postcode_error;
    let osm_matched_or_postcode = counts.matched + counts.osm_with_postcode;

    DistrictStats {
        district_id,
        counts,
        total_osm,
        total_fhrs,
        osm_matched_or_postcode,
        matched_pct: percentage(counts.matched, total_fhrs),
        postcode_pct: percentage(osm_matched_or_postcode, total_osm),
    }
}

#[allow(clippy::cast_precision_loss)]
fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Removes administrative prefixes and suffixes ("City of", "District",
/// "(B)", ...) from a boundary name.
#[must_use]
pub fn clean_district_name(name: &str) -> String {
    DISTRICT_NAME_NOISE.replace_all(name, "").into_owned()
}

/// Districts holding at least `threshold` establishments, ordered by
/// cleaned name and then id.
#[must_use]
pub fn inhabited_districts(
    districts: &[District],
    establishments: &[Establishment],
    threshold: u64,
) -> Vec<DistrictSummary> {
    let mut per_district: BTreeMap<i32, u64> = BTreeMap::new();
    for district_id in establishments.iter().filter_map(|e| e.district_id) {
        *per_district.entry(district_id).or_default() += 1;
    }

    let mut summaries: Vec<DistrictSummary> = districts
        .iter()
        .filter_map(|d| {
            let count = per_district.get(&d.id).copied().unwrap_or(0);
            (count >= threshold && count > 0).then(|| DistrictSummary {
                id: d.id,
                name: clean_district_name(&d.name),
                establishments: count,
            })
        })
        .collect();

    summaries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    summaries
}

#[cfg(test)]
mod tests {
    use fhrs_osm_compare_models::Status;

    use super::*;
    use crate::join::build_comparison;
    use crate::test_support::{RUGBY, entity, establishment, square_district};

    fn counts(pairs: &[(Status, u64)]) -> StatusCounts {
        pairs
            .iter()
            .flat_map(|(status, n)| std::iter::repeat_n(*status, usize::try_from(*n).unwrap()))
            .collect()
    }

    #[test]
    fn derived_totals_and_percentages() {
        let stats = stats_from_counts(
            Some(1),
            counts(&[
                (Status::Matched, 3),
                (Status::MatchedPostcodeError, 1),
                (Status::Mismatch, 1),
                (Status::OsmWithPostcode, 2),
                (Status::OsmNoPostcode, 3),
                (Status::Fhrs, 4),
            ]),
        );

        assert_eq!(stats.total_osm, 10);
        assert_eq!(stats.total_fhrs, 8);
        assert_eq!(stats.osm_matched_or_postcode, 5);
        assert!((stats.matched_pct - 37.5).abs() < 1e-9);
        assert!((stats.postcode_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn zero_establishments_give_zero_percent() {
        let stats = stats_from_counts(Some(1), counts(&[(Status::OsmNoPostcode, 2)]));
        assert_eq!(stats.total_fhrs, 0);
        assert!(stats.matched_pct.abs() < f64::EPSILON);
        assert!(!stats.matched_pct.is_nan());
        assert!(stats.postcode_pct.abs() < f64::EPSILON);

        let empty = stats_from_counts(None, StatusCounts::default());
        assert!(empty.matched_pct.abs() < f64::EPSILON);
        assert!(empty.postcode_pct.abs() < f64::EPSILON);
    }

    #[test]
    fn single_clean_match_is_one_hundred_percent() {
        let entities = [entity(1, Some("500"), Some("CV21 1AB"), RUGBY, Some(1))];
        let establishments = [establishment(
            500,
            "The Bell",
            Some("CV21 1AB"),
            Some(RUGBY),
            Some(1),
        )];
        let records = build_comparison(&entities, &establishments);

        let stats = district_stats(Some(1), &records);
        assert_eq!(stats.counts.matched, 1);
        assert_eq!(stats.total_fhrs, 1);
        assert!((stats.matched_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn cleans_boundary_names() {
        assert_eq!(clean_district_name("Rugby District (B)"), "Rugby");
        assert_eq!(clean_district_name("City of Bristol"), "Bristol");
        assert_eq!(clean_district_name("The City of Brighton and Hove"), "Brighton and Hove");
        assert_eq!(clean_district_name("Westminster London Boro"), "Westminster");
        assert_eq!(clean_district_name("Leeds District"), "Leeds");
        assert_eq!(clean_district_name("Herefordshire, County of"), "Herefordshire, County of");
        assert_eq!(clean_district_name("Cardiff"), "Cardiff");
    }

    #[test]
    fn inhabited_districts_apply_threshold_and_sort_by_clean_name() {
        let districts = [
            square_district(1, "Warwick District", 0.0, 0.0, 1.0, 1.0),
            square_district(2, "City of Coventry", 0.0, 0.0, 1.0, 1.0),
            square_district(3, "Stratford-on-Avon District", 0.0, 0.0, 1.0, 1.0),
        ];
        let mut establishments = Vec::new();
        for (district, n) in [(1, 3), (2, 2), (3, 1)] {
            for i in 0..n {
                establishments.push(establishment(
                    i64::from(district * 100 + i),
                    "X",
                    None,
                    Some(RUGBY),
                    Some(district),
                ));
            }
        }
        establishments.push(establishment(999, "Nowhere", None, None, None));

        let inhabited = inhabited_districts(&districts, &establishments, 2);
        let names: Vec<&str> = inhabited.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Coventry", "Warwick"]);
        assert_eq!(inhabited[1].establishments, 3);
    }
}
