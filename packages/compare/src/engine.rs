//! The prepared dataset and its per-district queries.
//!
//! [`Engine::new`] runs the global phase (district assignment, join and
//! classification) once. Afterwards every query is read-only, so the
//! engine is shared behind an [`Arc`] by concurrent district workers.

use std::{collections::BTreeMap, sync::Arc};

use fhrs_osm_compare_models::{
    ComparisonRecord, District, DistantMatch, DistrictStats, DistrictSummary, DuplicateRecord,
    Establishment, Location, MapEntity, PostcodeCandidate, SuggestedMatch,
};
use fhrs_osm_spatial::{
    SpatialIndex,
    bbox::{BoundingBox, corrected_bbox},
};
use serde::Serialize;

use crate::{
    CompareError,
    assign::{AssignmentSummary, assign_districts},
    cluster::Cluster,
    config::EngineConfig,
    join::build_comparison,
    progress::ProgressCallback,
};

/// Indices of one district's members in the engine's vectors.
#[derive(Debug, Default)]
struct DistrictScope {
    records: Vec<usize>,
    entities: Vec<usize>,
    establishments: Vec<usize>,
}

/// Everything the presentation layer needs for one district.
#[derive(Debug, Clone, Serialize)]
pub struct DistrictReport {
    /// District id.
    pub district_id: i32,
    /// Cleaned district name.
    pub name: String,
    /// Match statistics.
    pub stats: DistrictStats,
    /// Entities sharing an `fhrs:id`.
    pub duplicates: Vec<DuplicateRecord>,
    /// Candidate links for unlinked entities.
    pub suggestions: Vec<SuggestedMatch>,
    /// Linked pairs beyond the distance threshold.
    pub distant_matches: Vec<DistantMatch>,
    /// Linked records with a missing or wrong map postcode.
    pub postcode_errors: Vec<ComparisonRecord>,
    /// Entities whose `fhrs:id` resolves to nothing.
    pub mismatches: Vec<ComparisonRecord>,
    /// Unmatched establishments with same-postcode entities.
    pub postcode_candidates: Vec<PostcodeCandidate>,
}

/// The annotated dataset of one run.
pub struct Engine {
    config: EngineConfig,
    districts: Vec<District>,
    entities: Vec<MapEntity>,
    establishments: Vec<Establishment>,
    records: Vec<ComparisonRecord>,
    assignment: AssignmentSummary,
    scopes: BTreeMap<i32, DistrictScope>,
}

impl Engine {
    /// Assigns districts, joins and classifies.
    ///
    /// Any district ids already on the inputs are overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::MissingPrerequisite`] if there are no
    /// districts, or none with a usable boundary.
    pub fn new(
        config: EngineConfig,
        districts: Vec<District>,
        mut entities: Vec<MapEntity>,
        mut establishments: Vec<Establishment>,
        progress: Option<&Arc<dyn ProgressCallback>>,
    ) -> Result<Self, CompareError> {
        let missing_boundaries = || CompareError::MissingPrerequisite {
            dataset: "district boundaries".to_string(),
        };

        if districts.is_empty() {
            return Err(missing_boundaries());
        }

        let index = SpatialIndex::from_districts(&districts).map_err(|e| {
            log::error!("Cannot build district index: {e}");
            missing_boundaries()
        })?;

        let assignment = assign_districts(&index, &mut entities, &mut establishments, progress);
        let records = build_comparison(&entities, &establishments);

        let mut scopes: BTreeMap<i32, DistrictScope> = BTreeMap::new();
        for (i, record) in records.iter().enumerate() {
            if let Some(id) = record.district_id() {
                scopes.entry(id).or_default().records.push(i);
            }
        }
        for (i, entity) in entities.iter().enumerate() {
            if let Some(id) = entity.district_id {
                scopes.entry(id).or_default().entities.push(i);
            }
        }
        for (i, establishment) in establishments.iter().enumerate() {
            if let Some(id) = establishment.district_id {
                scopes.entry(id).or_default().establishments.push(i);
            }
        }

        log::info!(
            "Prepared {} comparison records across {} districts",
            records.len(),
            scopes.len()
        );

        Ok(Self {
            config,
            districts,
            entities,
            establishments,
            records,
            assignment,
            scopes,
        })
    }

    /// The configuration the engine was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Outcome of the district assignment pass.
    #[must_use]
    pub const fn assignment(&self) -> AssignmentSummary {
        self.assignment
    }

    /// Entities with their assigned districts.
    #[must_use]
    pub fn entities(&self) -> &[MapEntity] {
        &self.entities
    }

    /// Establishments with their assigned districts.
    #[must_use]
    pub fn establishments(&self) -> &[Establishment] {
        &self.establishments
    }

    /// Every comparison record, including those outside all districts.
    #[must_use]
    pub fn records(&self) -> &[ComparisonRecord] {
        &self.records
    }

    /// Looks up a district by id.
    #[must_use]
    pub fn district(&self, district_id: i32) -> Option<&District> {
        self.districts.iter().find(|d| d.id == district_id)
    }

    /// Comparison records attributed to `district_id`.
    #[must_use]
    pub fn records_in(&self, district_id: i32) -> Vec<&ComparisonRecord> {
        self.scope(district_id)
            .map_or(&[][..], |s| s.records.as_slice())
            .iter()
            .map(|&i| &self.records[i])
            .collect()
    }

    fn entities_in(&self, district_id: i32) -> Vec<&MapEntity> {
        self.scope(district_id)
            .map_or(&[][..], |s| s.entities.as_slice())
            .iter()
            .map(|&i| &self.entities[i])
            .collect()
    }

    fn establishments_in(&self, district_id: i32) -> Vec<&Establishment> {
        self.scope(district_id)
            .map_or(&[][..], |s| s.establishments.as_slice())
            .iter()
            .map(|&i| &self.establishments[i])
            .collect()
    }

    fn scope(&self, district_id: i32) -> Option<&DistrictScope> {
        self.scopes.get(&district_id)
    }

    /// Entities in the district sharing an `fhrs:id` with another.
    #[must_use]
    pub fn find_duplicates(&self, district_id: i32) -> Vec<DuplicateRecord> {
        crate::duplicates::find_duplicates(&self.entities_in(district_id), &self.establishments)
    }

    /// Suggested links for the district's unlinked entities.
    #[must_use]
    pub fn suggest_matches(&self, district_id: i32) -> Vec<SuggestedMatch> {
        crate::suggest::suggest_matches(
            &self.entities_in(district_id),
            &self.establishments_in(district_id),
            &self.config,
        )
    }

    /// Linked pairs in the district more than `threshold_m` apart.
    #[must_use]
    pub fn find_distant_matches(&self, district_id: i32, threshold_m: f64) -> Vec<DistantMatch> {
        crate::distant::find_distant_matches(&self.records_in(district_id), threshold_m)
    }

    /// Display clusters for the district's records.
    #[must_use]
    pub fn cluster_for_display(&self, district_id: i32, cluster_radius_m: f64) -> Vec<Cluster<'_>> {
        crate::cluster::cluster_for_display(&self.records_in(district_id), cluster_radius_m)
    }

    /// Match statistics for the district.
    #[must_use]
    pub fn district_stats(&self, district_id: i32) -> DistrictStats {
        crate::stats::district_stats(Some(district_id), self.records_in(district_id))
    }

    /// Match statistics over every record, including those outside all
    /// districts.
    #[must_use]
    pub fn country_stats(&self) -> DistrictStats {
        crate::stats::district_stats(None, &self.records)
    }

    /// Districts with at least `threshold` establishments.
    #[must_use]
    pub fn inhabited_districts(&self, threshold: u64) -> Vec<DistrictSummary> {
        crate::stats::inhabited_districts(&self.districts, &self.establishments, threshold)
    }

    /// Linked records in the district with a missing or wrong map
    /// postcode.
    #[must_use]
    pub fn postcode_errors(&self, district_id: i32) -> Vec<&ComparisonRecord> {
        crate::postcode::postcode_errors(&self.records_in(district_id))
    }

    /// Entities in the district whose `fhrs:id` resolves to nothing.
    #[must_use]
    pub fn mismatches(&self, district_id: i32) -> Vec<&ComparisonRecord> {
        crate::postcode::mismatches(&self.records_in(district_id))
    }

    /// Unmatched establishments in the district with same-postcode
    /// entities.
    #[must_use]
    pub fn postcode_candidates(&self, district_id: i32) -> Vec<PostcodeCandidate> {
        crate::postcode::postcode_candidates(&self.records_in(district_id))
    }

    /// Bounding box of all establishment locations, ignoring outliers.
    #[must_use]
    pub fn corrected_bbox(&self) -> Option<BoundingBox> {
        let locations: Vec<Location> = self
            .establishments
            .iter()
            .filter_map(|e| e.location)
            .collect();
        corrected_bbox(&locations, self.config.bbox_fence_multiplier)
    }

    /// Runs every per-district analysis for `district_id`.
    #[must_use]
    pub fn district_report(&self, district_id: i32) -> DistrictReport {
        let name = self
            .district(district_id)
            .map(|d| crate::stats::clean_district_name(&d.name))
            .unwrap_or_default();

        let report = DistrictReport {
            district_id,
            name,
            stats: self.district_stats(district_id),
            duplicates: self.find_duplicates(district_id),
            suggestions: self.suggest_matches(district_id),
            distant_matches: self.find_distant_matches(district_id, self.config.distant_match_m),
            postcode_errors: self
                .postcode_errors(district_id)
                .into_iter()
                .cloned()
                .collect(),
            mismatches: self.mismatches(district_id).into_iter().cloned().collect(),
            postcode_candidates: self.postcode_candidates(district_id),
        };

        log::debug!(
            "District {district_id} ({}): {} records, {} suggestions, {} distant, {} duplicates",
            report.name,
            report.stats.counts.total(),
            report.suggestions.len(),
            report.distant_matches.len(),
            report.duplicates.len(),
        );

        report
    }

    /// Builds reports for `district_ids` on blocking worker tasks, at most
    /// `concurrency` at a time. Reports come back ordered by district id.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::Join`] if a worker panics.
    pub async fn analyze_all(
        self: Arc<Self>,
        district_ids: &[i32],
        progress: Option<Arc<dyn ProgressCallback>>,
    ) -> Result<Vec<DistrictReport>, CompareError> {
        use futures::stream::{self, StreamExt as _, TryStreamExt as _};

        let concurrency = self.config.concurrency.max(1);
        log::info!(
            "Analysing {} districts (concurrency={concurrency})...",
            district_ids.len()
        );

        if let Some(p) = &progress {
            p.set_message("Analysing districts".to_string());
            p.set_total(district_ids.len() as u64);
        }

        let mut reports: Vec<DistrictReport> =
            stream::iter(district_ids.iter().copied().map(|district_id| {
                let engine = Arc::clone(&self);
                let progress = progress.clone();
                async move {
                    let report =
                        tokio::task::spawn_blocking(move || engine.district_report(district_id))
                            .await?;
                    if let Some(p) = &progress {
                        p.inc(1);
                    }
                    Ok::<_, CompareError>(report)
                }
            }))
            .buffer_unordered(concurrency)
            .try_collect()
            .await?;

        reports.sort_by_key(|r| r.district_id);

        if let Some(p) = &progress {
            p.finish(format!("Analysed {} districts", reports.len()));
        }

        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use fhrs_osm_compare_models::Status;
    use fhrs_osm_spatial::distance::offset_north;

    use super::*;
    use crate::progress::null_progress;
    use crate::test_support::{RUGBY, entity, establishment, rugby_district, square_district};

    fn rugby_engine(entities: Vec<MapEntity>, establishments: Vec<Establishment>) -> Engine {
        Engine::new(
            EngineConfig::default(),
            vec![rugby_district()],
            entities,
            establishments,
            None,
        )
        .unwrap()
    }

    #[test]
    fn rugby_distant_match_scenario() {
        let engine = rugby_engine(
            vec![entity(1, Some("500"), Some("CV21 1AB"), offset_north(RUGBY, 600.0), None)],
            vec![establishment(500, "The Bell", Some("CV21 1AB"), Some(RUGBY), None)],
        );

        let records = engine.records_in(1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, Status::Matched);

        let distant = engine.find_distant_matches(1, 500.0);
        assert_eq!(distant.len(), 1);
        assert!((distant[0].distance_m - 600.0).abs() < 1.0);

        let stats = engine.district_stats(1);
        assert_eq!(stats.counts.matched, 1);
        assert_eq!(stats.total_fhrs, 1);
        assert!((stats.matched_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn entity_without_postcode_is_a_postcode_error() {
        let engine = rugby_engine(
            vec![entity(1, Some("500"), None, RUGBY, None)],
            vec![establishment(500, "The Bell", Some("CV21 1AB"), Some(RUGBY), None)],
        );
        assert_eq!(engine.records()[0].status, Status::MatchedPostcodeError);
        assert_eq!(engine.postcode_errors(1).len(), 1);
    }

    #[test]
    fn bistro_is_suggested() {
        let mut bistro = entity(1, None, None, offset_north(RUGBY, 80.0), None);
        bistro.name = Some("The Bistro".to_string());
        let engine = rugby_engine(
            vec![bistro],
            vec![establishment(500, "Bistro Ltd", None, Some(RUGBY), None)],
        );

        let suggestions = engine.suggest_matches(1);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].establishment.business_name, "Bistro Ltd");
    }

    #[test]
    fn records_outside_districts_only_count_nationally() {
        let engine = rugby_engine(
            vec![
                entity(1, None, Some("CV21 1AB"), RUGBY, None),
                entity(2, None, None, Location::new(1.0, 1.0), None),
            ],
            vec![],
        );

        assert_eq!(engine.district_stats(1).counts.total(), 1);
        assert_eq!(engine.country_stats().counts.total(), 2);
        assert_eq!(engine.country_stats().district_id, None);
        assert!(engine.records_in(99).is_empty());
        assert_eq!(engine.assignment().entities_unassigned, 1);
    }

    #[test]
    fn clusters_conserve_located_records() {
        let engine = rugby_engine(
            vec![
                entity(1, None, None, RUGBY, None),
                entity(2, Some("500"), None, RUGBY, None),
            ],
            vec![
                establishment(500, "The Bell", None, Some(offset_north(RUGBY, 50.0)), None),
                establishment(501, "The Crown", None, Some(offset_north(RUGBY, 200.0)), None),
                establishment(502, "Mobile Van", None, None, None),
            ],
        );

        let clusters = engine.cluster_for_display(1, 3.5);
        let total: u64 = clusters.iter().map(|c| c.counts.total()).sum();
        let located = engine
            .records_in(1)
            .iter()
            .filter(|r| r.preferred_location().is_some())
            .count() as u64;
        assert_eq!(total, located);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn missing_boundaries_are_a_setup_failure() {
        let err = Engine::new(EngineConfig::default(), vec![], vec![], vec![], None)
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "missing prerequisite dataset: district boundaries");

        let broken = District {
            id: 1,
            name: "Broken".to_string(),
            boundary_geojson: "{}".to_string(),
        };
        let err = Engine::new(EngineConfig::default(), vec![broken], vec![], vec![], None)
            .err()
            .unwrap();
        assert!(matches!(err, CompareError::MissingPrerequisite { .. }));
    }

    #[test]
    fn district_report_uses_clean_name() {
        let engine = rugby_engine(vec![entity(1, Some("999"), None, RUGBY, None)], vec![]);
        let report = engine.district_report(1);
        assert_eq!(report.name, "Rugby");
        assert_eq!(report.mismatches.len(), 1);
        assert!(report.suggestions.is_empty());
    }

    #[tokio::test]
    async fn analyze_all_returns_reports_in_district_order() {
        let districts = vec![
            square_district(3, "Warwick District", -1.7, 52.2, -1.4, 52.3),
            rugby_district(),
            square_district(2, "City of Coventry", -1.6, 52.35, -1.4, 52.45),
        ];
        let engine = Arc::new(
            Engine::new(
                EngineConfig {
                    concurrency: 2,
                    ..EngineConfig::default()
                },
                districts,
                vec![entity(1, None, Some("CV21 1AB"), RUGBY, None)],
                vec![establishment(
                    500,
                    "Warwick Arms",
                    None,
                    Some(Location::new(-1.59, 52.28)),
                    None,
                )],
                None,
            )
            .unwrap(),
        );

        let reports = Arc::clone(&engine)
            .analyze_all(&[3, 1, 2], Some(null_progress()))
            .await
            .unwrap();

        let ids: Vec<i32> = reports.iter().map(|r| r.district_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(reports[0].stats.counts.osm_with_postcode, 1);
        assert_eq!(reports[2].stats.counts.fhrs, 1);
        assert_eq!(reports[1].stats.counts.total(), 0);
    }
}
