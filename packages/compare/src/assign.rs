//! District attribution for entities and establishments.
//!
//! Every record's district is recomputed from its location on each run, so
//! repeating the step over unchanged input reproduces the same ids.

use std::sync::Arc;

use fhrs_osm_compare_models::{Establishment, MapEntity};
use fhrs_osm_spatial::SpatialIndex;
use serde::Serialize;

use crate::progress::ProgressCallback;

/// Progress is reported every this many records.
const PROGRESS_BATCH: usize = 10_000;

/// Outcome counts of a district assignment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentSummary {
    /// Entities placed in a district.
    pub entities_assigned: u64,
    /// Entities outside every district.
    pub entities_unassigned: u64,
    /// Establishments placed in a district.
    pub establishments_assigned: u64,
    /// Located establishments outside every district.
    pub establishments_unassigned: u64,
    /// Establishments without a location.
    pub establishments_unlocated: u64,
}

/// Sets `district_id` on every entity and establishment.
///
/// Locations outside all districts, and establishments without a location,
/// get `None`; that is a data-quality finding, not an error.
pub fn assign_districts(
    index: &SpatialIndex,
    entities: &mut [MapEntity],
    establishments: &mut [Establishment],
    progress: Option<&Arc<dyn ProgressCallback>>,
) -> AssignmentSummary {
    let mut summary = AssignmentSummary::default();

    if let Some(p) = progress {
        p.set_message("Assigning districts".to_string());
        p.set_total((entities.len() + establishments.len()) as u64);
    }

    for (i, entity) in entities.iter_mut().enumerate() {
        entity.district_id = index.assign_district(entity.location);
        if entity.district_id.is_some() {
            summary.entities_assigned += 1;
        } else {
            summary.entities_unassigned += 1;
        }
        report(progress, i + 1);
    }
    report_remainder(progress, entities.len());

    for (i, establishment) in establishments.iter_mut().enumerate() {
        establishment.district_id = establishment
            .location
            .and_then(|location| index.assign_district(location));
        match (establishment.location, establishment.district_id) {
            (None, _) => summary.establishments_unlocated += 1,
            (Some(_), Some(_)) => summary.establishments_assigned += 1,
            (Some(_), None) => summary.establishments_unassigned += 1,
        }
        report(progress, i + 1);
    }
    report_remainder(progress, establishments.len());

    log::info!(
        "District assignment: {}/{} entities, {}/{} establishments ({} without location)",
        summary.entities_assigned,
        entities.len(),
        summary.establishments_assigned,
        establishments.len(),
        summary.establishments_unlocated,
    );

    if let Some(p) = progress {
        p.finish(format!(
            "Assigned {} records to districts",
            summary.entities_assigned + summary.establishments_assigned
        ));
    }

    summary
}

fn report(progress: Option<&Arc<dyn ProgressCallback>>, done: usize) {
    if let Some(p) = progress
        && done % PROGRESS_BATCH == 0
    {
        p.inc(PROGRESS_BATCH as u64);
    }
}

fn report_remainder(progress: Option<&Arc<dyn ProgressCallback>>, len: usize) {
    if let Some(p) = progress {
        p.inc((len % PROGRESS_BATCH) as u64);
    }
}
