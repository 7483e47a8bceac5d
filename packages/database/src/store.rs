//! Districts, map entities and establishments in `DuckDB`.
//!
//! Geometry is stored as plain columns (longitude/latitude doubles, boundary
//! `GeoJSON` text); spatial work happens in memory in `fhrs_osm_spatial`.

use std::path::Path;

use duckdb::Connection;
use fhrs_osm_compare_models::{District, Establishment, Location, MapEntity, OsmKind};

use crate::DbError;

/// Opens (or creates) the comparison `DuckDB` and ensures the schema exists.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        crate::paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(path)?;

    conn.execute_batch("SET threads = 4; SET memory_limit = '1GB';")?;

    create_schema(&conn)?;

    Ok(conn)
}

/// Opens a throwaway in-memory store with the schema in place.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS districts (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            boundary_geojson TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS osm_entities (
            id BIGINT NOT NULL,
            osm_type TEXT NOT NULL,
            longitude DOUBLE NOT NULL,
            latitude DOUBLE NOT NULL,
            fhrs_id TEXT,
            name TEXT,
            postcode TEXT,
            not_postcode TEXT,
            district_id INTEGER,
            PRIMARY KEY (id, osm_type)
        );

        CREATE TABLE IF NOT EXISTS fhrs_establishments (
            fhrs_id BIGINT PRIMARY KEY,
            business_name TEXT NOT NULL,
            address_line_1 TEXT,
            address_line_2 TEXT,
            address_line_3 TEXT,
            address_line_4 TEXT,
            postcode TEXT,
            longitude DOUBLE,
            latitude DOUBLE,
            local_authority_code TEXT,
            district_id INTEGER
        );",
    )?;

    Ok(())
}

/// Runs `f` inside a transaction, rolling back if it fails.
fn in_transaction<T>(
    conn: &Connection,
    f: impl FnOnce(&Connection) -> Result<T, DbError>,
) -> Result<T, DbError> {
    conn.execute_batch("BEGIN TRANSACTION")?;
    match f(conn) {
        Ok(value) => {
            conn.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                log::warn!("Rollback failed: {rollback}");
            }
            Err(e)
        }
    }
}

/// Replaces every stored district boundary with `districts`.
/// Returns the number written.
///
/// Rows absent from the new batch are removed, so a re-import never
/// leaves records from an older export behind.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails; the batch is rolled back.
pub fn insert_districts(conn: &Connection, districts: &[District]) -> Result<u64, DbError> {
    in_transaction(conn, |conn| {
        conn.execute("DELETE FROM districts", [])?;
        let mut stmt = conn.prepare(
            "INSERT OR REPLACE INTO districts (id, name, boundary_geojson) VALUES (?, ?, ?)",
        )?;
        let mut written = 0u64;
        for d in districts {
            written += stmt.execute(duckdb::params![d.id, d.name, d.boundary_geojson])? as u64;
        }
        Ok(written)
    })
}

/// Replaces every stored map entity with `entities`.
/// Returns the number written.
///
/// Rows absent from the new batch are removed, so a re-import never
/// leaves records from an older export behind.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails; the batch is rolled back.
pub fn insert_entities(conn: &Connection, entities: &[MapEntity]) -> Result<u64, DbError> {
    in_transaction(conn, |conn| {
        conn.execute("DELETE FROM osm_entities", [])?;
        let mut stmt = conn.prepare(
            "INSERT OR REPLACE INTO osm_entities (
                id, osm_type, longitude, latitude, fhrs_id, name,
                postcode, not_postcode, district_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )?;
        let mut written = 0u64;
        for e in entities {
            written += stmt.execute(duckdb::params![
                e.id,
                e.kind.as_ref(),
                e.location.longitude,
                e.location.latitude,
                e.fhrs_id.as_deref(),
                e.name.as_deref(),
                e.postcode.as_deref(),
                e.not_postcode.as_deref(),
                e.district_id,
            ])? as u64;
        }
        Ok(written)
    })
}

/// Replaces every stored FHRS establishment with `establishments`.
/// Returns the number written.
///
/// Rows absent from the new batch are removed, so a re-import never
/// leaves records from an older export behind.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails; the batch is rolled back.
pub fn insert_establishments(
    conn: &Connection,
    establishments: &[Establishment],
) -> Result<u64, DbError> {
    in_transaction(conn, |conn| {
        conn.execute("DELETE FROM fhrs_establishments", [])?;
        let mut stmt = conn.prepare(
            "INSERT OR REPLACE INTO fhrs_establishments (
                fhrs_id, business_name, address_line_1, address_line_2,
                address_line_3, address_line_4, postcode, longitude, latitude,
                local_authority_code, district_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )?;
        let mut written = 0u64;
        for e in establishments {
            written += stmt.execute(duckdb::params![
                e.fhrs_id,
                e.business_name,
                e.address_line_1.as_deref(),
                e.address_line_2.as_deref(),
                e.address_line_3.as_deref(),
                e.address_line_4.as_deref(),
                e.postcode.as_deref(),
                e.location.map(|l| l.longitude),
                e.location.map(|l| l.latitude),
                e.local_authority_code.as_deref(),
                e.district_id,
            ])? as u64;
        }
        Ok(written)
    })
}

/// Loads every district, ordered by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn load_districts(conn: &Connection) -> Result<Vec<District>, DbError> {
    let mut stmt = conn.prepare("SELECT id, name, boundary_geojson FROM districts ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(District {
            id: row.get(0)?,
            name: row.get(1)?,
            boundary_geojson: row.get(2)?,
        })
    })?;

    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Loads every map entity, ordered by type then id.
///
/// Rows with an unknown `osm_type` are skipped with a warning.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn load_entities(conn: &Connection) -> Result<Vec<MapEntity>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, osm_type, longitude, latitude, fhrs_id, name,
                postcode, not_postcode, district_id
         FROM osm_entities
         ORDER BY osm_type, id",
    )?;
    let mut rows = stmt.query([])?;
    let mut entities = Vec::new();

    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        let osm_type: String = row.get(1)?;
        let Ok(kind) = osm_type.parse::<OsmKind>() else {
            log::warn!("Skipping OSM entity {id} with unknown type '{osm_type}'");
            continue;
        };

        entities.push(MapEntity {
            id,
            kind,
            location: Location::new(row.get(2)?, row.get(3)?),
            fhrs_id: row.get(4)?,
            name: row.get(5)?,
            postcode: row.get(6)?,
            not_postcode: row.get(7)?,
            district_id: row.get(8)?,
        });
    }

    Ok(entities)
}

/// Loads every establishment, ordered by FHRS id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn load_establishments(conn: &Connection) -> Result<Vec<Establishment>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT fhrs_id, business_name, address_line_1, address_line_2,
                address_line_3, address_line_4, postcode, longitude, latitude,
                local_authority_code, district_id
         FROM fhrs_establishments
         ORDER BY fhrs_id",
    )?;
    let rows = stmt.query_map([], |row| {
        let longitude: Option<f64> = row.get(7)?;
        let latitude: Option<f64> = row.get(8)?;
        Ok(Establishment {
            fhrs_id: row.get(0)?,
            business_name: row.get(1)?,
            address_line_1: row.get(2)?,
            address_line_2: row.get(3)?,
            address_line_3: row.get(4)?,
            address_line_4: row.get(5)?,
            postcode: row.get(6)?,
            location: longitude.zip(latitude).map(|(lon, lat)| Location::new(lon, lat)),
            local_authority_code: row.get(9)?,
            district_id: row.get(10)?,
        })
    })?;

    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Writes the assigned district id of every given entity back to the store.
///
/// # Errors
///
/// Returns [`DbError`] if any update fails; the batch is rolled back.
pub fn save_entity_districts(conn: &Connection, entities: &[MapEntity]) -> Result<u64, DbError> {
    in_transaction(conn, |conn| {
        let mut stmt = conn
            .prepare("UPDATE osm_entities SET district_id = ? WHERE id = ? AND osm_type = ?")?;
        let mut updated = 0u64;
        for e in entities {
            updated += stmt.execute(duckdb::params![e.district_id, e.id, e.kind.as_ref()])? as u64;
        }
        Ok(updated)
    })
}

/// Writes the assigned district id of every given establishment back to
/// the store.
///
/// # Errors
///
/// Returns [`DbError`] if any update fails; the batch is rolled back.
pub fn save_establishment_districts(
    conn: &Connection,
    establishments: &[Establishment],
) -> Result<u64, DbError> {
    in_transaction(conn, |conn| {
        let mut stmt =
            conn.prepare("UPDATE fhrs_establishments SET district_id = ? WHERE fhrs_id = ?")?;
        let mut updated = 0u64;
        for e in establishments {
            updated += stmt.execute(duckdb::params![e.district_id, e.fhrs_id])? as u64;
        }
        Ok(updated)
    })
}

/// Returns the number of rows in `table`.
///
/// # Errors
///
/// Returns [`DbError::Conversion`] for an unknown table, or [`DbError`] if
/// the query fails.
pub fn row_count(conn: &Connection, table: &str) -> Result<u64, DbError> {
    let sql = match table {
        "districts" => "SELECT COUNT(*) FROM districts",
        "osm_entities" => "SELECT COUNT(*) FROM osm_entities",
        "fhrs_establishments" => "SELECT COUNT(*) FROM fhrs_establishments",
        _ => {
            return Err(DbError::Conversion {
                message: format!("unknown table '{table}'"),
            });
        }
    };
    let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    u64::try_from(count).map_err(|e| DbError::Conversion {
        message: format!("negative row count for {table}: {e}"),
    })
}
