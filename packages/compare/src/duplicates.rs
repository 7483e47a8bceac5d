//! Entities sharing one `fhrs:id` within a district.

use std::collections::{BTreeMap, HashMap};

use fhrs_osm_compare_models::{DuplicateRecord, Establishment, MapEntity};

use crate::present;

/// Reports every member of each group of `entities` that share an
/// `fhrs:id`, ordered by that id and then by element type and id.
///
/// `entities` is expected to hold a single district's entities; the
/// establishments are only consulted for the business name the id
/// resolves to.
#[must_use]
pub fn find_duplicates(
    entities: &[&MapEntity],
    establishments: &[Establishment],
) -> Vec<DuplicateRecord> {
    let mut groups: BTreeMap<&str, Vec<&MapEntity>> = BTreeMap::new();
    for &entity in entities {
        if let Some(fhrs_id) = present(entity.fhrs_id.as_deref()) {
            groups.entry(fhrs_id).or_default().push(entity);
        }
    }

    let names: HashMap<String, &str> = establishments
        .iter()
        .map(|e| (e.fhrs_id.to_string(), e.business_name.as_str()))
        .collect();

    let mut duplicates = Vec::new();
    for (fhrs_id, mut members) in groups {
        if members.len() < 2 {
            continue;
        }
        members.sort_by_key(|e| (e.kind, e.id));
        log::debug!("fhrs:id {fhrs_id} shared by {} entities", members.len());

        let fhrs_name = names.get(fhrs_id).map(|name| (*name).to_string());
        duplicates.extend(members.into_iter().map(|entity| DuplicateRecord {
            entity: entity.clone(),
            fhrs_name: fhrs_name.clone(),
        }));
    }

    duplicates
}
