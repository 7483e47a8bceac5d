//! Fixture builders shared by the engine's unit tests.

use fhrs_osm_compare_models::{District, Establishment, Location, MapEntity, OsmKind};

/// Rugby town centre.
pub const RUGBY: Location = Location::new(-1.263, 52.372);

/// A square district spanning `[west, east] x [south, north]`.
pub fn square_district(
    id: i32,
    name: &str,
    west: f64,
    south: f64,
    east: f64,
    north: f64,
) -> District {
    District {
        id,
        name: name.to_string(),
        boundary_geojson: format!(
            r#"{{"type":"Polygon","coordinates":[[[{west},{south}],[{east},{south}],[{east},{north}],[{west},{north}],[{west},{south}]]]}}"#
        ),
    }
}

/// A district comfortably containing [`RUGBY`].
pub fn rugby_district() -> District {
    square_district(1, "Rugby District (B)", -1.4, 52.3, -1.1, 52.45)
}

/// A node with the given tags.
pub fn entity(
    id: i64,
    fhrs_id: Option<&str>,
    postcode: Option<&str>,
    location: Location,
    district_id: Option<i32>,
) -> MapEntity {
    MapEntity {
        id,
        kind: OsmKind::Node,
        location,
        fhrs_id: fhrs_id.map(str::to_string),
        name: Some(format!("Entity {id}")),
        postcode: postcode.map(str::to_string),
        not_postcode: None,
        district_id,
    }
}

/// An establishment with the given name, postcode and location.
pub fn establishment(
    fhrs_id: i64,
    name: &str,
    postcode: Option<&str>,
    location: Option<Location>,
    district_id: Option<i32>,
) -> Establishment {
    Establishment {
        fhrs_id,
        business_name: name.to_string(),
        address_line_1: Some("1 High Street".to_string()),
        address_line_2: None,
        address_line_3: Some("Rugby".to_string()),
        address_line_4: None,
        postcode: postcode.map(str::to_string),
        location,
        local_authority_code: Some("873".to_string()),
        district_id,
    }
}
