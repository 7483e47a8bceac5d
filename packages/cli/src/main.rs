#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line driver for the FHRS/OSM reconciliation toolchain.
//!
//! `import` materializes the boundary, map and FHRS input files into the
//! `DuckDB` store; `run` assigns districts, analyses every inhabited
//! district and writes the output projections; `stats` prints the
//! per-district match table.
//!
//! Logging goes through [`fhrs_osm_cli_utils::init_logger`], so log lines
//! and progress bars share the terminal cleanly.

mod pipeline;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fhrs_osm_compare::{CompareError, config::EngineConfig};

#[derive(Parser)]
#[command(name = "fhrs_osm", about = "Compare OpenStreetMap with FHRS food hygiene data")]
struct Cli {
    /// Path of the `DuckDB` store (defaults to `data/shared/fhrs_osm.duckdb`)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load input files into the store
    Import {
        /// District boundaries (`GeoJSON` `FeatureCollection`)
        #[arg(long)]
        districts: Option<PathBuf>,
        /// OSM entities (`GeoJSON` export)
        #[arg(long)]
        osm: Option<PathBuf>,
        /// FHRS establishments (CSV)
        #[arg(long)]
        fhrs: Option<PathBuf>,
    },
    /// Assign districts, analyse them and write every output file
    Run {
        #[command(flatten)]
        engine: EngineArgs,
        /// Output directory (defaults to `data/generated`)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print match statistics for every inhabited district
    Stats {
        #[command(flatten)]
        engine: EngineArgs,
    },
}

/// Engine configuration: an optional TOML file plus per-field overrides.
#[derive(Args)]
struct EngineArgs {
    /// TOML file with engine settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Records closer than this many metres share a map marker
    #[arg(long)]
    cluster_radius: Option<f64>,
    /// Maximum distance in metres for a suggested match
    #[arg(long)]
    suggest_distance: Option<f64>,
    /// Names closer than this edit distance count as similar
    #[arg(long)]
    edit_distance: Option<usize>,
    /// Linked pairs further apart than this many metres are reported
    #[arg(long)]
    distant_distance: Option<f64>,
    /// Minimum establishments for a district to be reported
    #[arg(long)]
    threshold: Option<u64>,
    /// Districts analysed in parallel
    #[arg(long)]
    concurrency: Option<usize>,
}

impl EngineArgs {
    fn load(&self) -> Result<EngineConfig, CompareError> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_toml_file(path)?,
            None => EngineConfig::default(),
        };

        if let Some(v) = self.cluster_radius {
            config.cluster_radius_m = v;
        }
        if let Some(v) = self.suggest_distance {
            config.suggest_distance_m = v;
        }
        if let Some(v) = self.edit_distance {
            config.suggest_edit_distance = v;
        }
        if let Some(v) = self.distant_distance {
            config.distant_match_m = v;
        }
        if let Some(v) = self.threshold {
            config.inhabited_threshold = v;
        }
        if let Some(v) = self.concurrency {
            config.concurrency = v;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = fhrs_osm_cli_utils::init_logger();
    let cli = Cli::parse();
    let db_path = cli.db.unwrap_or_else(fhrs_osm_database::paths::store_db_path);

    let result = match cli.command {
        Commands::Import {
            districts,
            osm,
            fhrs,
        } => pipeline::import(db_path, districts, osm, fhrs).await,
        Commands::Run { engine, output } => {
            let config = engine.load()?;
            let output = output.unwrap_or_else(fhrs_osm_database::paths::generated_dir);
            pipeline::run(&multi, db_path, config, output).await
        }
        Commands::Stats { engine } => {
            let config = engine.load()?;
            pipeline::print_stats(&multi, db_path, config).await
        }
    };

    if let Err(e) = &result
        && let Some(missing @ CompareError::MissingPrerequisite { .. }) =
            e.downcast_ref::<CompareError>()
    {
        eprintln!("error: {missing}");
        std::process::exit(1);
    }

    result
}
