//! Input file parsing.
//!
//! Turns the three source files into typed records:
//!
//! - district boundaries: a `GeoJSON` `FeatureCollection` whose features
//!   carry `id` (or `gid`) and `name` properties,
//! - map entities: a `GeoJSON` `FeatureCollection` as produced by common
//!   OSM exporters, with the element type and id in the feature id
//!   (`node/123`) or in `osm_type`/`osm_id` properties, and tags either at
//!   the top level of `properties` or under a nested `tags` object,
//! - FHRS establishments: the register's CSV export.
//!
//! Malformed items are logged and skipped; only unreadable files fail.

use std::{io::Read, path::Path};

use fhrs_osm_compare_models::{District, Establishment, Location, MapEntity, OsmKind};
use fhrs_osm_spatial::centroid::{relation_centroid, way_centroid};
use geojson::{GeoJson, JsonObject, feature::Id};
use serde::Deserialize;

use crate::DbError;

/// Parses district boundaries from a `GeoJSON` feature collection.
///
/// # Errors
///
/// Returns [`DbError`] if the document is not valid `GeoJSON` or is not a
/// feature collection.
pub fn parse_districts(geojson_str: &str) -> Result<Vec<District>, DbError> {
    let collection = feature_collection(geojson_str)?;
    let mut districts = Vec::with_capacity(collection.features.len());

    for (index, feature) in collection.features.into_iter().enumerate() {
        let props = feature.properties.unwrap_or_default();
        let Some(id) = ["id", "gid"]
            .iter()
            .find_map(|key| props.get(*key).and_then(json_i64))
            .and_then(|id| i32::try_from(id).ok())
        else {
            log::warn!("Skipping boundary feature {index}: no integer id");
            continue;
        };
        let Some(geometry) = feature.geometry else {
            log::warn!("Skipping boundary {id}: no geometry");
            continue;
        };
        let name = props
            .get("name")
            .and_then(json_string)
            .unwrap_or_else(|| format!("District {id}"));

        districts.push(District {
            id,
            name,
            boundary_geojson: serde_json::to_string(&geometry)?,
        });
    }

    log::info!("Parsed {} district boundaries", districts.len());
    Ok(districts)
}

/// Parses map entities from a `GeoJSON` feature collection.
///
/// Nodes take their point; ways are reduced with
/// [`way_centroid`]; relations use [`relation_centroid`] over every
/// coordinate in their geometry.
///
/// # Errors
///
/// Returns [`DbError`] if the document is not valid `GeoJSON` or is not a
/// feature collection.
pub fn parse_osm_entities(geojson_str: &str) -> Result<Vec<MapEntity>, DbError> {
    let collection = feature_collection(geojson_str)?;
    let total = collection.features.len();
    let mut entities = Vec::with_capacity(total);

    for feature in collection.features {
        let props = feature.properties.unwrap_or_default();

        let Some((kind, id)) = element_ref(feature.id.as_ref(), &props) else {
            log::warn!("Skipping map feature without a usable element id");
            continue;
        };
        let Some(geometry) = feature.geometry else {
            log::warn!("Skipping {kind}/{id}: no geometry");
            continue;
        };
        let Some(location) = representative_location(kind, &geometry.value) else {
            log::warn!("Skipping {kind}/{id}: empty geometry");
            continue;
        };

        let tags = match props.get("tags") {
            Some(serde_json::Value::Object(tags)) => tags,
            _ => &props,
        };
        let tag = |key: &str| tags.get(key).and_then(json_string);

        entities.push(MapEntity {
            id,
            kind,
            location,
            fhrs_id: tag("fhrs:id"),
            name: tag("name"),
            postcode: tag("addr:postcode"),
            not_postcode: tag("not:addr:postcode"),
            district_id: None,
        });
    }

    log::info!("Parsed {} of {total} map features", entities.len());
    Ok(entities)
}

/// One row of the FHRS CSV export.
#[derive(Debug, Deserialize)]
struct EstablishmentRow {
    #[serde(rename = "FHRSID")]
    fhrs_id: i64,
    #[serde(rename = "BusinessName")]
    business_name: String,
    #[serde(rename = "AddressLine1", default)]
    address_line_1: Option<String>,
    #[serde(rename = "AddressLine2", default)]
    address_line_2: Option<String>,
    #[serde(rename = "AddressLine3", default)]
    address_line_3: Option<String>,
    #[serde(rename = "AddressLine4", default)]
    address_line_4: Option<String>,
    #[serde(rename = "PostCode", default)]
    postcode: Option<String>,
    #[serde(rename = "Longitude", default, deserialize_with = "csv::invalid_option")]
    longitude: Option<f64>,
    #[serde(rename = "Latitude", default, deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(rename = "LocalAuthorityCode", default)]
    local_authority_code: Option<String>,
}

impl From<EstablishmentRow> for Establishment {
    fn from(row: EstablishmentRow) -> Self {
        Self {
            fhrs_id: row.fhrs_id,
            business_name: row.business_name,
            address_line_1: non_empty(row.address_line_1),
            address_line_2: non_empty(row.address_line_2),
            address_line_3: non_empty(row.address_line_3),
            address_line_4: non_empty(row.address_line_4),
            postcode: non_empty(row.postcode),
            location: row
                .longitude
                .zip(row.latitude)
                .filter(|(lon, lat)| lon.is_finite() && lat.is_finite())
                .map(|(lon, lat)| Location::new(lon, lat)),
            local_authority_code: non_empty(row.local_authority_code),
            district_id: None,
        }
    }
}

/// Parses FHRS establishments from CSV.
///
/// Rows that fail to deserialize (missing `FHRSID`, non-numeric id) are
/// skipped with a warning. Unparseable coordinates leave the establishment
/// without a location.
///
/// # Errors
///
/// Returns [`DbError`] if the header row cannot be read.
pub fn parse_establishments(reader: impl Read) -> Result<Vec<Establishment>, DbError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    reader.headers()?;

    let mut establishments = Vec::new();
    let mut skipped = 0u64;

    for result in reader.deserialize::<EstablishmentRow>() {
        match result {
            Ok(row) => establishments.push(Establishment::from(row)),
            Err(e) => {
                skipped += 1;
                log::warn!("Skipping FHRS row: {e}");
            }
        }
    }

    log::info!(
        "Parsed {} FHRS establishments ({skipped} skipped)",
        establishments.len()
    );
    Ok(establishments)
}

/// Reads and parses a district boundary file.
///
/// # Errors
///
/// Returns [`DbError`] if the file cannot be read or parsed.
pub fn read_districts(path: &Path) -> Result<Vec<District>, DbError> {
    parse_districts(&std::fs::read_to_string(path)?)
}

/// Reads and parses a map entity file.
///
/// # Errors
///
/// Returns [`DbError`] if the file cannot be read or parsed.
pub fn read_osm_entities(path: &Path) -> Result<Vec<MapEntity>, DbError> {
    parse_osm_entities(&std::fs::read_to_string(path)?)
}

/// Reads and parses an FHRS CSV export.
///
/// # Errors
///
/// Returns [`DbError`] if the file cannot be opened or its header read.
pub fn read_establishments(path: &Path) -> Result<Vec<Establishment>, DbError> {
    parse_establishments(std::fs::File::open(path)?)
}

fn feature_collection(geojson_str: &str) -> Result<geojson::FeatureCollection, DbError> {
    match geojson_str.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        other => Err(DbError::Conversion {
            message: format!(
                "expected a FeatureCollection, found {}",
                match other {
                    GeoJson::Geometry(_) => "a Geometry",
                    GeoJson::Feature(_) => "a Feature",
                    GeoJson::FeatureCollection(_) => "a FeatureCollection",
                }
            ),
        }),
    }
}

/// Resolves the element type and id from `"node/123"`-style feature ids,
/// an `@id` property, or separate `osm_type`/`osm_id` properties.
fn element_ref(feature_id: Option<&Id>, props: &JsonObject) -> Option<(OsmKind, i64)> {
    let from_path = |s: &str| {
        let (kind, id) = s.split_once('/')?;
        Some((kind.parse().ok()?, id.parse().ok()?))
    };

    if let Some(Id::String(s)) = feature_id
        && let Some(found) = from_path(s)
    {
        return Some(found);
    }

    if let Some(found) = props
        .get("@id")
        .and_then(serde_json::Value::as_str)
        .and_then(from_path)
    {
        return Some(found);
    }

    let kind = props
        .get("osm_type")
        .and_then(serde_json::Value::as_str)?
        .parse()
        .ok()?;
    let id = props.get("osm_id").and_then(json_i64)?;
    Some((kind, id))
}

fn representative_location(kind: OsmKind, value: &geojson::Value) -> Option<Location> {
    match (kind, value) {
        (_, geojson::Value::Point(p)) => position(p),
        (OsmKind::Way, geojson::Value::LineString(line)) => way_centroid(&positions(line)),
        (OsmKind::Way, geojson::Value::Polygon(rings)) => {
            let mut vertices = positions(rings.first()?);
            // Closed rings repeat the first vertex.
            if vertices.len() > 1 && vertices.first() == vertices.last() {
                vertices.pop();
            }
            way_centroid(&vertices)
        }
        _ => {
            let mut coords = Vec::new();
            collect_positions(value, &mut coords);
            if coords.is_empty() {
                return None;
            }
            Some(relation_centroid(&coords))
        }
    }
}

fn collect_positions(value: &geojson::Value, out: &mut Vec<Location>) {
    match value {
        geojson::Value::Point(p) => out.extend(position(p)),
        geojson::Value::MultiPoint(points) | geojson::Value::LineString(points) => {
            out.extend(positions(points));
        }
        geojson::Value::MultiLineString(lines) | geojson::Value::Polygon(lines) => {
            for line in lines {
                out.extend(positions(line));
            }
        }
        geojson::Value::MultiPolygon(polygons) => {
            for line in polygons.iter().flatten() {
                out.extend(positions(line));
            }
        }
        geojson::Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                collect_positions(&geometry.value, out);
            }
        }
    }
}

fn position(p: &[f64]) -> Option<Location> {
    match p {
        [lon, lat, ..] => Some(Location::new(*lon, *lat)),
        _ => None,
    }
}

fn positions(ps: &[Vec<f64>]) -> Vec<Location> {
    ps.iter().filter_map(|p| position(p)).collect()
}

fn json_i64(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Tag values are normally strings; some exporters emit numbers.
fn json_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
