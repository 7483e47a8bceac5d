//! Full outer join of map entities and establishments.
//!
//! The key is the entity's `fhrs:id` tag compared as an exact string with
//! the decimal rendering of the establishment's id. Multi-valued tags
//! (`123;456`) are not split and so resolve to nothing.

use std::collections::{BTreeMap, HashSet};

use fhrs_osm_compare_models::{ComparisonRecord, Establishment, MapEntity};

use crate::classify::{JoinedPair, classify};

/// Builds and classifies every row of the join.
///
/// Entity rows come first in input order, followed by establishments no
/// entity links to. An establishment linked by several entities yields one
/// row per entity. Rows without a location on either side are dropped:
/// nothing downstream can place them.
#[must_use]
pub fn build_comparison(
    entities: &[MapEntity],
    establishments: &[Establishment],
) -> Vec<ComparisonRecord> {
    let by_id: BTreeMap<String, &Establishment> = establishments
        .iter()
        .map(|e| (e.fhrs_id.to_string(), e))
        .collect();

    let mut linked: HashSet<i64> = HashSet::new();
    let mut records = Vec::with_capacity(entities.len() + establishments.len());

    for entity in entities {
        let resolved = entity
            .fhrs_id
            .as_deref()
            .and_then(|id| by_id.get(id).copied());

        let pair = match resolved {
            Some(establishment) => {
                linked.insert(establishment.fhrs_id);
                JoinedPair::Linked(entity, establishment)
            }
            None => JoinedPair::EntityOnly(entity),
        };

        records.push(ComparisonRecord {
            status: classify(pair),
            entity: Some(entity.clone()),
            establishment: resolved.cloned(),
        });
    }

    let mut unlocated = 0u64;
    for establishment in establishments {
        if linked.contains(&establishment.fhrs_id) {
            continue;
        }
        if establishment.location.is_none() {
            unlocated += 1;
            continue;
        }
        records.push(ComparisonRecord {
            status: classify(JoinedPair::EstablishmentOnly(establishment)),
            entity: None,
            establishment: Some(establishment.clone()),
        });
    }

    log::info!(
        "Built {} comparison records ({} linked establishments, {unlocated} unlinked without location)",
        records.len(),
        linked.len()
    );

    records
}

#[cfg(test)]
mod tests {
    use fhrs_osm_compare_models::Status;

    use super::*;
    use crate::test_support::{RUGBY, entity, establishment};

    #[test]
    fn join_covers_both_sides() {
        let entities = vec![
            entity(1, Some("500"), Some("CV21 1AB"), RUGBY, Some(1)),
            entity(2, Some("999"), None, RUGBY, Some(1)),
            entity(3, None, Some("CV21 1AB"), RUGBY, Some(1)),
        ];
        let establishments = vec![
            establishment(500, "The Bell", Some("CV21 1AB"), Some(RUGBY), Some(1)),
            establishment(501, "The Crown", None, Some(RUGBY), Some(1)),
        ];

        let records = build_comparison(&entities, &establishments);
        let statuses: Vec<Status> = records.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                Status::Matched,
                Status::Mismatch,
                Status::OsmWithPostcode,
                Status::Fhrs
            ]
        );
        assert_eq!(records[0].establishment.as_ref().unwrap().fhrs_id, 500);
        assert!(records[1].establishment.is_none());
        assert!(records[3].entity.is_none());
    }

    #[test]
    fn shared_reference_yields_a_row_per_entity() {
        let entities = vec![
            entity(1, Some("500"), Some("CV21 1AB"), RUGBY, Some(1)),
            entity(2, Some("500"), None, RUGBY, Some(1)),
        ];
        let establishments = vec![establishment(500, "The Bell", Some("CV21 1AB"), None, Some(1))];

        let records = build_comparison(&entities, &establishments);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, Status::Matched);
        assert_eq!(records[1].status, Status::MatchedPostcodeError);
    }

    #[test]
    fn reference_must_match_exactly() {
        let entities = vec![
            entity(1, Some("0500"), None, RUGBY, None),
            entity(2, Some("500;501"), None, RUGBY, None),
        ];
        let establishments = vec![establishment(500, "The Bell", None, Some(RUGBY), None)];

        let records = build_comparison(&entities, &establishments);
        assert_eq!(records[0].status, Status::Mismatch);
        assert_eq!(records[1].status, Status::Mismatch);
        assert_eq!(records[2].status, Status::Fhrs);
    }

    #[test]
    fn unlinked_establishment_without_location_is_dropped() {
        let establishments = vec![establishment(500, "Mobile Van", None, None, None)];
        assert!(build_comparison(&[], &establishments).is_empty());
    }
}
