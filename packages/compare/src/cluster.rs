//! Display clustering of comparison records.
//!
//! Density-based grouping with a minimum cluster size of one: two records
//! share a cluster when a chain of records, each within the radius of the
//! next, connects them. Isolated records become singleton clusters. With
//! a radius of a few metres this merges records sitting on the same spot
//! so a map shows them as one marker.

use fhrs_osm_compare_models::{ComparisonRecord, Location, StatusCounts};
use fhrs_osm_spatial::{
    centroid::mean_location,
    distance::{haversine_m, search_envelope},
};
use rstar::{AABB, RTree, primitives::GeomWithData};

/// A group of records displayed as one point.
#[derive(Debug, Clone)]
pub struct Cluster<'a> {
    /// Mean of the members' locations.
    pub location: Location,
    /// Per-status member counts.
    pub counts: StatusCounts,
    /// Members in input order.
    pub members: Vec<&'a ComparisonRecord>,
}

/// Groups the located records of `records` within `radius_m` metres.
///
/// Each record is placed at its map location, or at the establishment's
/// when there is no map side. Clusters are ordered by their first member.
#[must_use]
pub fn cluster_for_display<'a>(
    records: &[&'a ComparisonRecord],
    radius_m: f64,
) -> Vec<Cluster<'a>> {
    let located: Vec<(&'a ComparisonRecord, Location)> = records
        .iter()
        .filter_map(|r| r.preferred_location().map(|l| (*r, l)))
        .collect();

    if located.is_empty() {
        return Vec::new();
    }

    let tree: RTree<GeomWithData<[f64; 2], usize>> = RTree::bulk_load(
        located
            .iter()
            .enumerate()
            .map(|(i, (_, l))| GeomWithData::new([l.longitude, l.latitude], i))
            .collect(),
    );
    let radius_m = radius_m.max(0.0);

    let mut cluster_of: Vec<Option<usize>> = vec![None; located.len()];
    let mut clusters: Vec<Vec<usize>> = Vec::new();

    for seed in 0..located.len() {
        if cluster_of[seed].is_some() {
            continue;
        }
        let id = clusters.len();
        cluster_of[seed] = Some(id);
        let mut members = vec![seed];
        let mut frontier = vec![seed];

        while let Some(current) = frontier.pop() {
            let origin = located[current].1;
            let (min, max) = search_envelope(origin, radius_m);
            for neighbour in tree.locate_in_envelope(&AABB::from_corners(min, max)) {
                let n = neighbour.data;
                if cluster_of[n].is_none() && haversine_m(origin, located[n].1) <= radius_m {
                    cluster_of[n] = Some(id);
                    members.push(n);
                    frontier.push(n);
                }
            }
        }

        members.sort_unstable();
        clusters.push(members);
    }

    clusters
        .into_iter()
        .map(|members| {
            let member_locations: Vec<Location> = members.iter().map(|&i| located[i].1).collect();
            let records: Vec<&'a ComparisonRecord> =
                members.iter().map(|&i| located[i].0).collect();
            Cluster {
                location: mean_location(&member_locations),
                counts: records.iter().map(|r| r.status).collect(),
                members: records,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use fhrs_osm_spatial::distance::{EARTH_RADIUS_M, offset_north};

    use super::*;
    use crate::join::build_comparison;
    use crate::test_support::{RUGBY, entity, establishment};

    #[test]
    fn nearby_records_merge_and_isolated_ones_stay_single() {
        let entities = [
            entity(1, None, Some("CV21 1AB"), RUGBY, Some(1)),
            entity(2, None, None, offset_north(RUGBY, 2.0), Some(1)),
            entity(3, None, None, offset_north(RUGBY, 100.0), Some(1)),
        ];
        let establishments = [establishment(
            500,
            "The Bell",
            None,
            Some(offset_north(RUGBY, 4.0)),
            Some(1),
        )];
        let records = build_comparison(&entities, &establishments);
        let refs: Vec<&ComparisonRecord> = records.iter().collect();

        let clusters = cluster_for_display(&refs, 3.5);

        assert_eq!(clusters.len(), 2);
        // 0 m, 2 m and 4 m chain together.
        assert_eq!(clusters[0].members.len(), 3);
        assert_eq!(clusters[0].counts.osm_with_postcode, 1);
        assert_eq!(clusters[0].counts.osm_no_postcode, 1);
        assert_eq!(clusters[0].counts.fhrs, 1);
        assert_eq!(clusters[1].members.len(), 1);

        let expected = offset_north(RUGBY, 2.0);
        assert!((clusters[0].location.latitude - expected.latitude).abs() < 1e-9);
    }

    #[test]
    fn counts_are_conserved() {
        let entities: Vec<_> = (0..40)
            .map(|i| {
                let fhrs_id = (i % 3 == 0).then(|| (500 + i).to_string());
                let location = offset_north(RUGBY, f64::from(i as i32) * 1.5);
                entity(i, fhrs_id.as_deref(), None, location, Some(1))
            })
            .collect();
        let establishments: Vec<_> = (0..20)
            .map(|i| {
                let location = offset_north(RUGBY, 500.0 + f64::from(i as i32));
                establishment(500 + i, "X", Some("CV21 1AB"), Some(location), Some(1))
            })
            .collect();
        let records = build_comparison(&entities, &establishments);
        let refs: Vec<&ComparisonRecord> = records.iter().collect();

        let clusters = cluster_for_display(&refs, 3.5);
        let total: u64 = clusters.iter().map(|c| c.counts.total()).sum();
        let located = records.iter().filter(|r| r.preferred_location().is_some()).count();

        assert_eq!(total, located as u64);
        assert_eq!(clusters.iter().map(|c| c.members.len()).sum::<usize>(), located);
    }

    #[test]
    fn zero_radius_keeps_distinct_points_apart() {
        let entities = [
            entity(1, None, None, RUGBY, Some(1)),
            entity(2, None, None, RUGBY, Some(1)),
            entity(3, None, None, offset_north(RUGBY, 1.0), Some(1)),
        ];
        let records = build_comparison(&entities, &[]);
        let refs: Vec<&ComparisonRecord> = records.iter().collect();

        let clusters = cluster_for_display(&refs, 0.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members.len(), 2);
    }

    #[test]
    fn radius_is_measured_at_each_record_latitude() {
        let thurso = Location::new(-3.52, 58.6);
        let east = |metres: f64| {
            let degrees = (metres / (EARTH_RADIUS_M * thurso.latitude.to_radians().cos()))
                .to_degrees();
            Location::new(thurso.longitude + degrees, thurso.latitude)
        };
        let entities = [
            entity(1, None, None, thurso, Some(1)),
            entity(2, None, None, east(3.4), Some(1)),
            entity(3, None, None, east(10.0), Some(1)),
            entity(4, None, None, east(13.7), Some(1)),
            entity(5, None, None, Location::new(-3.73, 56.4), Some(1)),
            entity(6, None, None, Location::new(-3.73, 56.3), Some(1)),
        ];
        let records = build_comparison(&entities, &[]);
        let refs: Vec<&ComparisonRecord> = records.iter().collect();

        let clusters = cluster_for_display(&refs, 3.5);

        let sizes: Vec<usize> = clusters.iter().map(|c| c.members.len()).collect();
        assert_eq!(sizes, vec![2, 1, 1, 1, 1], "3.4 m apart merge, 3.7 m apart do not");
    }

    #[test]
    fn empty_input_has_no_clusters() {
        assert!(cluster_for_display(&[], 3.5).is_empty());
    }
}
