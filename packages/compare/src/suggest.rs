//! Candidate matches for entities that carry no `fhrs:id`.
//!
//! A pair qualifies when the two lie within the configured distance, their
//! names are similar (see [`crate::names`]), and the establishment is not
//! already claimed by another entity's `fhrs:id` in the same district.
//! Establishments are indexed in a longitude/latitude R-tree; each entity
//! examines only the establishments inside a search box sized at its own
//! latitude, then the great-circle distance decides.

use std::collections::HashSet;

use fhrs_osm_compare_models::{Establishment, Location, MapEntity, SuggestedMatch};
use fhrs_osm_spatial::distance::{haversine_m, search_envelope};
use rstar::{AABB, RTree, primitives::GeomWithData};

use crate::{config::EngineConfig, names::names_similar, present};

/// Suggests establishments for the unlinked entities of one district.
///
/// `entities` and `establishments` are the district's members. Ordered by
/// entity name, then FHRS id, then element type and id.
#[must_use]
pub fn suggest_matches(
    entities: &[&MapEntity],
    establishments: &[&Establishment],
    config: &EngineConfig,
) -> Vec<SuggestedMatch> {
    let claimed: HashSet<&str> = entities
        .iter()
        .filter_map(|e| present(e.fhrs_id.as_deref()))
        .collect();

    let candidates: Vec<(&Establishment, Location)> = establishments
        .iter()
        .filter(|e| !e.business_name.is_empty())
        .filter(|e| !claimed.contains(e.fhrs_id.to_string().as_str()))
        .filter_map(|e| e.location.map(|location| (*e, location)))
        .collect();

    if candidates.is_empty() {
        return Vec::new();
    }

    let tree: RTree<GeomWithData<[f64; 2], usize>> = RTree::bulk_load(
        candidates
            .iter()
            .enumerate()
            .map(|(i, (_, l))| GeomWithData::new([l.longitude, l.latitude], i))
            .collect(),
    );

    let mut suggestions = Vec::new();

    for entity in entities {
        if present(entity.fhrs_id.as_deref()).is_some() {
            continue;
        }
        let Some(name) = entity.name.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };

        let (min, max) = search_envelope(entity.location, config.suggest_distance_m);
        for neighbour in tree.locate_in_envelope(&AABB::from_corners(min, max)) {
            let (establishment, location) = candidates[neighbour.data];

            let distance_m = haversine_m(entity.location, location);
            if distance_m >= config.suggest_distance_m {
                continue;
            }
            if !names_similar(
                name,
                &establishment.business_name,
                config.suggest_edit_distance,
                config.normalize_names,
            ) {
                continue;
            }

            suggestions.push(SuggestedMatch {
                entity: (*entity).clone(),
                establishment: establishment.clone(),
                distance_m,
            });
        }
    }

    suggestions.sort_by(|a, b| {
        a.entity
            .name
            .cmp(&b.entity.name)
            .then(a.establishment.fhrs_id.cmp(&b.establishment.fhrs_id))
            .then((a.entity.kind, a.entity.id).cmp(&(b.entity.kind, b.entity.id)))
    });

    log::debug!("{} suggested matches", suggestions.len());

    suggestions
}

#[cfg(test)]
mod tests {
    use fhrs_osm_spatial::distance::{EARTH_RADIUS_M, offset_north};

    use super::*;
    use crate::test_support::{RUGBY, entity, establishment};

    fn named(mut e: MapEntity, name: &str) -> MapEntity {
        e.name = Some(name.to_string());
        e
    }

    fn run(entities: &[MapEntity], establishments: &[Establishment]) -> Vec<SuggestedMatch> {
        let entities: Vec<&MapEntity> = entities.iter().collect();
        let establishments: Vec<&Establishment> = establishments.iter().collect();
        suggest_matches(&entities, &establishments, &EngineConfig::default())
    }

    #[test]
    fn suggests_bistro_eighty_metres_away() {
        let entities = [named(
            entity(1, None, None, offset_north(RUGBY, 80.0), Some(1)),
            "The Bistro",
        )];
        let establishments = [establishment(500, "Bistro Ltd", None, Some(RUGBY), Some(1))];

        let suggestions = run(&entities, &establishments);

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].establishment.fhrs_id, 500);
        assert!((suggestions[0].distance_m - 80.0).abs() < 0.5);
    }

    #[test]
    fn too_far_or_dissimilar_pairs_are_not_suggested() {
        let entities = [
            named(entity(1, None, None, offset_north(RUGBY, 300.0), Some(1)), "The Bell"),
            named(entity(2, None, None, offset_north(RUGBY, 10.0), Some(1)), "Golden Dragon"),
        ];
        let establishments = [establishment(500, "The Bell", None, Some(RUGBY), Some(1))];

        assert!(run(&entities, &establishments).is_empty());
    }

    #[test]
    fn claimed_establishments_are_never_suggested() {
        let entities = [
            named(entity(1, None, None, RUGBY, Some(1)), "The Bell"),
            named(entity(2, Some("500"), None, RUGBY, Some(1)), "The Bell Inn"),
        ];
        let establishments = [
            establishment(500, "The Bell", None, Some(RUGBY), Some(1)),
            establishment(501, "The Bell", None, Some(RUGBY), Some(1)),
        ];

        let suggestions = run(&entities, &establishments);

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].entity.id, 1);
        assert_eq!(suggestions[0].establishment.fhrs_id, 501);
        assert!(suggestions.iter().all(|s| s.establishment.fhrs_id != 500));
    }

    #[test]
    fn unnamed_entities_are_skipped() {
        let mut unnamed = entity(1, None, None, RUGBY, Some(1));
        unnamed.name = None;
        let blank = named(entity(2, None, None, RUGBY, Some(1)), "");
        let establishments = [establishment(500, "The Bell", None, Some(RUGBY), Some(1))];

        assert!(run(&[unnamed, blank], &establishments).is_empty());
    }

    #[test]
    fn pairs_far_from_the_district_mean_latitude_are_still_found() {
        let thurso = Location::new(-3.52, 58.6);
        let pitlochry = Location::new(-3.73, 56.4);
        let east = (245.0 / (EARTH_RADIUS_M * thurso.latitude.to_radians().cos())).to_degrees();
        let entities = [named(
            entity(
                1,
                None,
                None,
                Location::new(thurso.longitude + east, thurso.latitude),
                Some(1),
            ),
            "The Bell",
        )];
        let establishments = [
            establishment(500, "The Bell", None, Some(thurso), Some(1)),
            establishment(501, "Atholl Arms", None, Some(pitlochry), Some(1)),
        ];

        let suggestions = run(&entities, &establishments);

        assert_eq!(suggestions.len(), 1, "pair 245 m apart should be suggested");
        assert_eq!(suggestions[0].establishment.fhrs_id, 500);
        assert!(suggestions[0].distance_m < 250.0);
        assert!((suggestions[0].distance_m - 245.0).abs() < 0.5);
    }

    #[test]
    fn ordered_by_entity_name_then_fhrs_id() {
        let entities = [
            named(entity(1, None, None, RUGBY, Some(1)), "Crown"),
            named(entity(2, None, None, RUGBY, Some(1)), "Bell"),
        ];
        let establishments = [
            establishment(502, "The Crown", None, Some(RUGBY), Some(1)),
            establishment(501, "The Bell", None, Some(RUGBY), Some(1)),
            establishment(500, "Bell", None, Some(RUGBY), Some(1)),
        ];

        let order: Vec<(i64, i64)> = run(&entities, &establishments)
            .iter()
            .map(|s| (s.entity.id, s.establishment.fhrs_id))
            .collect();
        assert_eq!(order, vec![(2, 500), (2, 501), (1, 502)]);
    }
}
