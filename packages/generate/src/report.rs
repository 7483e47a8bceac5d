//! JSON report bundles.

use chrono::{DateTime, Utc};
use fhrs_osm_compare::{
    config::LinkConfig,
    engine::{DistrictReport, Engine},
};
use serde_json::{Value, json};

use crate::links::{add_tags_string, josm_url};

/// The district report with editor links attached to each postcode error.
///
/// Each entry in `postcode_errors` gains `ident`, `add_tags` and
/// `josm_url`, so the presentation layer can offer a one-click fix.
#[must_use]
pub fn district_report_json(report: &DistrictReport, links: &LinkConfig) -> Value {
    let postcode_errors: Vec<Value> = report
        .postcode_errors
        .iter()
        .map(|record| {
            let mut value = json!({ "record": record });
            if let (Some(entity), Some(establishment)) = (&record.entity, &record.establishment) {
                let tags = add_tags_string(establishment);
                value["ident"] = json!(entity.ident());
                value["josm_url"] = json!(josm_url(entity, Some(&tags), links));
                value["add_tags"] = json!(tags);
            }
            value
        })
        .collect();

    let mismatches: Vec<Value> = report
        .mismatches
        .iter()
        .filter_map(|record| record.entity.as_ref())
        .map(|entity| {
            json!({
                "ident": entity.ident(),
                "name": entity.name,
                "fhrs_id": entity.fhrs_id,
            })
        })
        .collect();

    json!({
        "district_id": report.district_id,
        "name": report.name,
        "stats": report.stats,
        "duplicates": report.duplicates,
        "suggestions": report.suggestions,
        "distant_matches": report.distant_matches,
        "postcode_errors": postcode_errors,
        "mismatches": mismatches,
        "postcode_candidates": report.postcode_candidates,
    })
}

/// Run-wide summary: whole-country statistics, the outlier-corrected
/// bounding box of the establishments, and a one-line entry per district.
#[must_use]
pub fn summary_json(
    engine: &Engine,
    reports: &[DistrictReport],
    generated_at: DateTime<Utc>,
) -> Value {
    let districts: Vec<Value> = reports
        .iter()
        .map(|r| {
            json!({
                "id": r.district_id,
                "name": r.name,
                "matched_pct": r.stats.matched_pct,
                "postcode_pct": r.stats.postcode_pct,
                "total_osm": r.stats.total_osm,
                "total_fhrs": r.stats.total_fhrs,
            })
        })
        .collect();

    json!({
        "generated_at": generated_at.to_rfc3339(),
        "assignment": engine.assignment(),
        "country": engine.country_stats(),
        "bbox": engine.corrected_bbox(),
        "districts": districts,
    })
}
