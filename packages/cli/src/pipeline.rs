//! Subcommand implementations.
//!
//! The `DuckDB` connection and the engine's global phase are synchronous,
//! so they run on blocking tasks; per-district analysis fans out through
//! [`Engine::analyze_all`].

use std::{path::PathBuf, sync::Arc, time::Instant};

use fhrs_osm_cli_utils::{IndicatifProgress, MultiProgress};
use fhrs_osm_compare::{config::EngineConfig, engine::Engine};
use fhrs_osm_database::{DbError, import as readers, paths, store};
use fhrs_osm_generate::OutputError;

#[derive(Debug, Default)]
struct ImportCounts {
    districts: u64,
    entities: u64,
    establishments: u64,
}

/// Reads whichever input files are given, each replacing the matching table
/// in the store.
pub async fn import(
    db_path: PathBuf,
    districts: Option<PathBuf>,
    osm: Option<PathBuf>,
    fhrs: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if districts.is_none() && osm.is_none() && fhrs.is_none() {
        log::warn!("Nothing to import: pass --districts, --osm and/or --fhrs");
        return Ok(());
    }

    let start = Instant::now();

    let counts = tokio::task::spawn_blocking(move || -> Result<ImportCounts, DbError> {
        let conn = store::open(&db_path)?;
        let mut counts = ImportCounts::default();

        if let Some(path) = &districts {
            log::info!("Importing district boundaries from {}", path.display());
            counts.districts = store::insert_districts(&conn, &readers::read_districts(path)?)?;
        }
        if let Some(path) = &osm {
            log::info!("Importing OSM entities from {}", path.display());
            counts.entities = store::insert_entities(&conn, &readers::read_osm_entities(path)?)?;
        }
        if let Some(path) = &fhrs {
            log::info!("Importing FHRS establishments from {}", path.display());
            counts.establishments =
                store::insert_establishments(&conn, &readers::read_establishments(path)?)?;
        }

        Ok(counts)
    })
    .await??;

    log::info!(
        "Import complete: {} districts, {} entities, {} establishments in {:.1}s",
        counts.districts,
        counts.entities,
        counts.establishments,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Loads the store and runs the global phase (assignment, join,
/// classification).
async fn prepare(
    multi: &MultiProgress,
    db_path: PathBuf,
    config: EngineConfig,
) -> Result<Arc<Engine>, Box<dyn std::error::Error>> {
    let loading = IndicatifProgress::phase_bar(multi, "Loading store");
    let (districts, entities, establishments) = tokio::task::spawn_blocking(move || {
        let conn = store::open(&db_path)?;
        Ok::<_, DbError>((
            store::load_districts(&conn)?,
            store::load_entities(&conn)?,
            store::load_establishments(&conn)?,
        ))
    })
    .await??;
    loading.finish(format!(
        "Loaded {} districts, {} map entities, {} establishments",
        districts.len(),
        entities.len(),
        establishments.len()
    ));

    if establishments.is_empty() {
        log::warn!("The store holds no FHRS establishments; every entity will be unmatched");
    }

    let assigning = IndicatifProgress::phase_bar(multi, "Assigning districts");
    let engine = tokio::task::spawn_blocking(move || {
        Engine::new(config, districts, entities, establishments, Some(&assigning))
    })
    .await??;

    Ok(Arc::new(engine))
}

/// Writes the assigned district ids back to the store.
async fn save_districts(
    db_path: PathBuf,
    engine: Arc<Engine>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (entities, establishments) = tokio::task::spawn_blocking(move || {
        let conn = store::open(&db_path)?;
        Ok::<_, DbError>((
            store::save_entity_districts(&conn, engine.entities())?,
            store::save_establishment_districts(&conn, engine.establishments())?,
        ))
    })
    .await??;

    log::info!("Saved district ids for {entities} entities and {establishments} establishments");
    Ok(())
}

/// The full pipeline: assign, analyse every inhabited district, write
/// outputs.
pub async fn run(
    multi: &MultiProgress,
    db_path: PathBuf,
    config: EngineConfig,
    output: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();

    let engine = prepare(multi, db_path.clone(), config).await?;
    save_districts(db_path, Arc::clone(&engine)).await?;

    let inhabited = engine.inhabited_districts(engine.config().inhabited_threshold);
    if inhabited.is_empty() {
        log::warn!(
            "No district holds {} or more establishments; nothing to report",
            engine.config().inhabited_threshold
        );
    }
    let ids: Vec<i32> = inhabited.iter().map(|d| d.id).collect();

    let analysing = IndicatifProgress::districts_bar(multi, "Analysing", ids.len() as u64);
    let reports = Arc::clone(&engine).analyze_all(&ids, Some(analysing)).await?;

    let writing = IndicatifProgress::districts_bar(multi, "Writing", ids.len() as u64);
    let summary = tokio::task::spawn_blocking(move || -> Result<_, OutputError> {
        paths::ensure_dir(&output)?;
        fhrs_osm_generate::write_outputs(&engine, &reports, &output, Some(&writing))
    })
    .await??;

    log::info!(
        "Run complete: {} districts in {:.1}s",
        summary.districts,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Prints one line per inhabited district plus the whole-country rollup.
pub async fn print_stats(
    multi: &MultiProgress,
    db_path: PathBuf,
    config: EngineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = prepare(multi, db_path, config).await?;
    let inhabited = engine.inhabited_districts(engine.config().inhabited_threshold);

    println!(
        "{:<6} {:<32} {:>8} {:>8} {:>8} {:>8} {:>9} {:>9}",
        "ID", "NAME", "MATCHED", "OSM", "FHRS", "MISMATCH", "MATCHED%", "POSTCODE%"
    );
    println!("{}", "-".repeat(100));

    let rows = inhabited
        .iter()
        .map(|d| (d.id.to_string(), d.name.clone(), engine.district_stats(d.id)))
        .chain(std::iter::once((
            String::new(),
            "All districts".to_string(),
            engine.country_stats(),
        )));

    for (id, name, stats) in rows {
        println!(
            "{id:<6} {name:<32} {:>8} {:>8} {:>8} {:>8} {:>8.1}% {:>8.1}%",
            stats.counts.matched,
            stats.total_osm,
            stats.total_fhrs,
            stats.counts.mismatch,
            stats.matched_pct,
            stats.postcode_pct,
        );
    }

    Ok(())
}
