//! Linked pairs whose two locations disagree.

use fhrs_osm_compare_models::{ComparisonRecord, DistantMatch};
use fhrs_osm_spatial::distance::haversine_m;

/// Linked records (`matched` or `matched_postcode_error`) whose entity and
/// establishment lie more than `threshold_m` metres apart.
///
/// Ordered by distance descending, so the worst discrepancies come first;
/// ties go to the lower FHRS id. Records whose establishment has no
/// location are skipped.
#[must_use]
pub fn find_distant_matches(records: &[&ComparisonRecord], threshold_m: f64) -> Vec<DistantMatch> {
    let mut matches: Vec<DistantMatch> = records
        .iter()
        .filter(|r| r.status.is_linked())
        .filter_map(|r| {
            let entity = r.entity.as_ref()?;
            let establishment = r.establishment.as_ref()?;
            let distance_m = haversine_m(entity.location, establishment.location?);
            (distance_m > threshold_m).then(|| DistantMatch {
                status: r.status,
                entity: entity.clone(),
                establishment: establishment.clone(),
                distance_m,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        b.distance_m
            .total_cmp(&a.distance_m)
            .then(a.establishment.fhrs_id.cmp(&b.establishment.fhrs_id))
            .then((a.entity.kind, a.entity.id).cmp(&(b.entity.kind, b.entity.id)))
    });

    matches
}
