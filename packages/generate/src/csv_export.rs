//! Spreadsheet exports.
//!
//! `stats.csv` has one row per district plus a final whole-country row with
//! an empty id. `mismatches.csv` lists entities whose `fhrs:id` resolves
//! to nothing, keyed by their `n123`/`w45`/`r6` identifier, for loading
//! into a field-survey tool.

use std::io::Write;

use fhrs_osm_compare::engine::DistrictReport;
use fhrs_osm_compare_models::{ComparisonRecord, DistrictStats};
use serde::Serialize;

use crate::OutputError;

/// Name written on the whole-country row.
pub const COUNTRY_ROW_NAME: &str = "All districts";

#[derive(Debug, Serialize)]
struct StatsRow<'a> {
    district_id: Option<i32>,
    district_name: &'a str,
    matched: u64,
    matched_postcode_error: u64,
    mismatch: u64,
    #[serde(rename = "OSM_with_postcode")]
    osm_with_postcode: u64,
    #[serde(rename = "OSM_no_postcode")]
    osm_no_postcode: u64,
    #[serde(rename = "FHRS")]
    fhrs: u64,
    total_osm: u64,
    total_fhrs: u64,
    osm_matched_or_postcode: u64,
    matched_pct: String,
    postcode_pct: String,
}

impl<'a> StatsRow<'a> {
    fn new(name: &'a str, stats: &DistrictStats) -> Self {
        Self {
            district_id: stats.district_id,
            district_name: name,
            matched: stats.counts.matched,
            matched_postcode_error: stats.counts.matched_postcode_error,
            mismatch: stats.counts.mismatch,
            osm_with_postcode: stats.counts.osm_with_postcode,
            osm_no_postcode: stats.counts.osm_no_postcode,
            fhrs: stats.counts.fhrs,
            total_osm: stats.total_osm,
            total_fhrs: stats.total_fhrs,
            osm_matched_or_postcode: stats.osm_matched_or_postcode,
            matched_pct: format!("{:.1}", stats.matched_pct),
            postcode_pct: format!("{:.1}", stats.postcode_pct),
        }
    }
}

/// Writes the per-district statistics table followed by the country row.
///
/// # Errors
///
/// Returns [`OutputError::Csv`] if a row cannot be written.
pub fn write_stats_csv<W: Write>(
    writer: W,
    reports: &[DistrictReport],
    country: &DistrictStats,
) -> Result<(), OutputError> {
    let mut csv = csv::Writer::from_writer(writer);
    for report in reports {
        csv.serialize(StatsRow::new(&report.name, &report.stats))?;
    }
    csv.serialize(StatsRow::new(COUNTRY_ROW_NAME, country))?;
    csv.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct MismatchRow<'a> {
    ident: String,
    osm_type: &'a str,
    osm_id: i64,
    name: Option<&'a str>,
    fhrs_id: Option<&'a str>,
    district_id: Option<i32>,
    latitude: f64,
    longitude: f64,
}

/// Writes one row per `mismatch` record that has a map entity.
///
/// # Errors
///
/// Returns [`OutputError::Csv`] if a row cannot be written.
pub fn write_mismatch_csv<W: Write>(
    writer: W,
    records: &[&ComparisonRecord],
) -> Result<(), OutputError> {
    let mut csv = csv::Writer::from_writer(writer);
    let mut rows = 0usize;
    for entity in records.iter().filter_map(|r| r.entity.as_ref()) {
        csv.serialize(MismatchRow {
            ident: entity.ident(),
            osm_type: entity.kind.as_ref(),
            osm_id: entity.id,
            name: entity.name.as_deref(),
            fhrs_id: entity.fhrs_id.as_deref(),
            district_id: entity.district_id,
            latitude: entity.location.latitude,
            longitude: entity.location.longitude,
        })?;
        rows += 1;
    }
    if rows == 0 {
        csv.write_record([
            "ident",
            "osm_type",
            "osm_id",
            "name",
            "fhrs_id",
            "district_id",
            "latitude",
            "longitude",
        ])?;
    }
    csv.flush()?;
    Ok(())
}
