#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Output projections of a reconciliation run.
//!
//! Turns the engine's per-district results into the files consumed by the
//! presentation layer:
//!
//! - `json/overview-<id>.json`: clustered points with an HTML description
//!   and per-status counts
//! - `json/suggest-matches-<id>.json`: candidate links as points
//! - `json/distant-matches-<id>.json`: lines joining the two locations of
//!   each distant match
//! - `json/boundary-<id>.json`: the district outline
//! - `gpx/<id>-<status>.gpx`: survey waypoints
//! - `reports/district-<id>.json`: the per-district report bundle
//! - `stats.csv`, `mismatches.csv` and `summary.json` across all districts
//!
//! Every file is written to a temporary sibling and renamed into place so
//! an aborted run never leaves a truncated output behind.

pub mod csv_export;
pub mod geojson;
pub mod gpx;
pub mod links;
pub mod report;

use std::{
    fs::File,
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
    sync::Arc,
};

use fhrs_osm_compare::{
    engine::{DistrictReport, Engine},
    progress::ProgressCallback,
};
use serde::Serialize;

/// Errors raised while writing output files.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// JSON serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// CSV serialization failure.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Counts of files written by [`write_outputs`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutputSummary {
    /// Districts processed.
    pub districts: usize,
    /// `GeoJSON` files written.
    pub geojson_files: usize,
    /// GPX files written.
    pub gpx_files: usize,
    /// JSON report files written.
    pub report_files: usize,
}

/// Writes every projection for `reports` under `dir`.
///
/// # Errors
///
/// Returns [`OutputError`] on the first file that cannot be written.
pub fn write_outputs(
    engine: &Engine,
    reports: &[DistrictReport],
    dir: &Path,
    progress: Option<&Arc<dyn ProgressCallback>>,
) -> Result<OutputSummary, OutputError> {
    let json_dir = dir.join("json");
    let gpx_dir = dir.join("gpx");
    let report_dir = dir.join("reports");
    for sub in [&json_dir, &gpx_dir, &report_dir] {
        std::fs::create_dir_all(sub)?;
    }

    if let Some(p) = progress {
        p.set_message("Writing outputs".to_string());
        p.set_total(reports.len() as u64);
    }

    let links = &engine.config().links;
    let mut summary = OutputSummary::default();

    for report in reports {
        let id = report.district_id;

        let clusters = engine.cluster_for_display(id, engine.config().cluster_radius_m);
        write_json(
            &json_dir.join(format!("overview-{id}.json")),
            &geojson::overview_geojson(&clusters, links),
        )?;
        write_json(
            &json_dir.join(format!("suggest-matches-{id}.json")),
            &geojson::suggest_matches_geojson(&report.suggestions, links),
        )?;
        write_json(
            &json_dir.join(format!("distant-matches-{id}.json")),
            &geojson::distant_matches_geojson(&report.distant_matches),
        )?;
        summary.geojson_files += 3;

        if let Some(boundary) = engine.district(id).and_then(geojson::boundary_geojson) {
            write_json(&json_dir.join(format!("boundary-{id}.json")), &boundary)?;
            summary.geojson_files += 1;
        } else {
            log::warn!("District {id} has no drawable boundary");
        }

        let records = engine.records_in(id);
        for layer in gpx::LAYERS {
            let waypoints = gpx::waypoints(&records, layer.side, Some(layer.status));
            let path = gpx_dir.join(format!("{id}-{}.gpx", layer.status));
            write_atomic(&path, |w| Ok(gpx::write_gpx(w, &waypoints)?))?;
            summary.gpx_files += 1;
        }

        write_json(
            &report_dir.join(format!("district-{id}.json")),
            &report::district_report_json(report, links),
        )?;
        summary.report_files += 1;
        summary.districts += 1;

        if let Some(p) = progress {
            p.inc(1);
        }
    }

    write_atomic(&dir.join("stats.csv"), |w| {
        csv_export::write_stats_csv(w, reports, &engine.country_stats())
    })?;

    let mismatched: Vec<_> = reports
        .iter()
        .flat_map(|r| r.mismatches.iter())
        .collect();
    write_atomic(&dir.join("mismatches.csv"), |w| {
        csv_export::write_mismatch_csv(w, &mismatched)
    })?;

    write_json(
        &dir.join("summary.json"),
        &report::summary_json(engine, reports, chrono::Utc::now()),
    )?;

    if let Some(p) = progress {
        p.finish(format!("Wrote outputs for {} districts", summary.districts));
    }

    log::info!(
        "Wrote {} GeoJSON, {} GPX and {} report files to {}",
        summary.geojson_files,
        summary.gpx_files,
        summary.report_files,
        dir.display()
    );

    Ok(summary)
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<(), OutputError> {
    write_atomic(path, |w| {
        serde_json::to_writer(w, value)?;
        Ok(())
    })
}

/// Streams `body` into `<path>.tmp`, then renames it over `path`.
///
/// # Errors
///
/// Returns [`OutputError`] if the file cannot be created, written or
/// renamed, or if `body` fails.
pub fn write_atomic<F>(path: &Path, body: F) -> Result<(), OutputError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), OutputError>,
{
    let tmp_path = tmp_path(path);
    let file = File::create(&tmp_path)?;
    let mut writer = BufWriter::new(file);
    let written = body(&mut writer).and_then(|()| Ok(writer.flush()?));
    drop(writer);
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    std::fs::rename(&tmp_path, path)?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
pub(crate) mod test_support {
    use fhrs_osm_compare_models::{Establishment, Location, MapEntity, OsmKind};

    pub const RUGBY: Location = Location::new(-1.263, 52.372);

    pub fn entity(
        id: i64,
        fhrs_id: Option<&str>,
        postcode: Option<&str>,
        location: Location,
    ) -> MapEntity {
        MapEntity {
            id,
            kind: OsmKind::Node,
            location,
            fhrs_id: fhrs_id.map(str::to_string),
            name: Some(format!("Entity {id}")),
            postcode: postcode.map(str::to_string),
            not_postcode: None,
            district_id: Some(1),
        }
    }

    pub fn establishment(
        fhrs_id: i64,
        name: &str,
        postcode: Option<&str>,
        location: Option<Location>,
    ) -> Establishment {
        Establishment {
            fhrs_id,
            business_name: name.to_string(),
            address_line_1: None,
            address_line_2: None,
            address_line_3: None,
            address_line_4: None,
            postcode: postcode.map(str::to_string),
            location,
            local_authority_code: None,
            district_id: Some(1),
        }
    }
}
