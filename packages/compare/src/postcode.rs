//! Postcode-driven reports for a district.

use std::collections::BTreeMap;

use fhrs_osm_compare_models::{ComparisonRecord, MapEntity, PostcodeCandidate, Status};

use crate::present;

/// Linked records whose map postcode is missing or wrong.
#[must_use]
pub fn postcode_errors<'a>(records: &[&'a ComparisonRecord]) -> Vec<&'a ComparisonRecord> {
    with_status(records, Status::MatchedPostcodeError)
}

/// Entities whose `fhrs:id` resolves to no establishment.
#[must_use]
pub fn mismatches<'a>(records: &[&'a ComparisonRecord]) -> Vec<&'a ComparisonRecord> {
    with_status(records, Status::Mismatch)
}

fn with_status<'a>(records: &[&'a ComparisonRecord], status: Status) -> Vec<&'a ComparisonRecord> {
    records.iter().copied().filter(|r| r.status == status).collect()
}

/// Unmatched establishments paired with the unlinked entities that share
/// their postcode.
///
/// Postcodes are compared after trimming. Establishments without any such
/// entity are omitted. Ordered by postcode, then FHRS id.
#[must_use]
pub fn postcode_candidates(records: &[&ComparisonRecord]) -> Vec<PostcodeCandidate> {
    let mut by_postcode: BTreeMap<&str, Vec<&MapEntity>> = BTreeMap::new();
    for record in records {
        if record.status != Status::OsmWithPostcode {
            continue;
        }
        if let Some(entity) = &record.entity
            && let Some(postcode) = present(entity.postcode.as_deref())
        {
            by_postcode.entry(postcode.trim()).or_default().push(entity);
        }
    }

    let mut candidates: Vec<PostcodeCandidate> = records
        .iter()
        .filter(|r| matches!(r.status, Status::Fhrs | Status::Mismatch))
        .filter_map(|r| {
            let establishment = r.establishment.as_ref()?;
            let postcode = present(establishment.postcode.as_deref())?.trim();
            let entities = by_postcode.get(postcode)?;
            Some(PostcodeCandidate {
                establishment: establishment.clone(),
                entities: entities.iter().map(|e| (*e).clone()).collect(),
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        let key = |c: &PostcodeCandidate| {
            (
                c.establishment.postcode.as_deref().map(str::trim).map(str::to_string),
                c.establishment.fhrs_id,
            )
        };
        key(a).cmp(&key(b))
    });

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::build_comparison;
    use crate::test_support::{RUGBY, entity, establishment};

    #[test]
    fn pairs_unmatched_establishments_with_same_postcode_entities() {
        let entities = [
            entity(1, None, Some("CV21 1AB "), RUGBY, Some(1)),
            entity(2, None, Some("CV21 1AB"), RUGBY, Some(1)),
            entity(3, None, Some("CV21 9ZZ"), RUGBY, Some(1)),
            entity(4, Some("600"), Some("CV21 2CD"), RUGBY, Some(1)),
        ];
        let establishments = [
            establishment(501, "The Crown", Some("CV21 1AB"), Some(RUGBY), Some(1)),
            establishment(500, "The Bell", Some("CV21 1AB"), Some(RUGBY), Some(1)),
            establishment(502, "The Swan", Some("CV21 2CD"), Some(RUGBY), Some(1)),
            establishment(503, "No Postcode", None, Some(RUGBY), Some(1)),
        ];
        let records = build_comparison(&entities, &establishments);
        let refs: Vec<&ComparisonRecord> = records.iter().collect();

        let candidates = postcode_candidates(&refs);

        let ids: Vec<i64> = candidates.iter().map(|c| c.establishment.fhrs_id).collect();
        assert_eq!(ids, vec![500, 501]);
        let entity_ids: Vec<i64> = candidates[0].entities.iter().map(|e| e.id).collect();
        assert_eq!(entity_ids, vec![1, 2]);
    }

    #[test]
    fn filters_by_status() {
        let entities = [
            entity(1, Some("500"), None, RUGBY, Some(1)),
            entity(2, Some("999"), None, RUGBY, Some(1)),
            entity(3, Some("501"), Some("CV21 1AB"), RUGBY, Some(1)),
        ];
        let establishments = [
            establishment(500, "The Bell", Some("CV21 1AB"), Some(RUGBY), Some(1)),
            establishment(501, "The Crown", Some("CV21 1AB"), Some(RUGBY), Some(1)),
        ];
        let records = build_comparison(&entities, &establishments);
        let refs: Vec<&ComparisonRecord> = records.iter().collect();

        let errors = postcode_errors(&refs);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].entity.as_ref().unwrap().id, 1);

        let mismatched = mismatches(&refs);
        assert_eq!(mismatched.len(), 1);
        assert_eq!(mismatched[0].entity.as_ref().unwrap().fhrs_id.as_deref(), Some("999"));
    }
}
