//! `GeoJSON` feature collections for the map views.

use fhrs_osm_compare::{cluster::Cluster, config::LinkConfig};
use fhrs_osm_compare_models::{DistantMatch, District, Location, SuggestedMatch};
use fhrs_osm_spatial::boundary_rings;
use serde_json::{Value, json};

use crate::links::{add_tags_string, escape_html, fhrs_url, josm_url, osm_url, record_description};

fn position(location: Location) -> Value {
    json!([location.longitude, location.latitude])
}

fn feature_collection(features: Vec<Value>) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

/// One point per display cluster.
///
/// `list` holds the members' popup lines joined with `<br />`; the six
/// status counters let the map colour each marker.
#[must_use]
pub fn overview_geojson(clusters: &[Cluster<'_>], links: &LinkConfig) -> Value {
    let features = clusters
        .iter()
        .map(|cluster| {
            let list = cluster
                .members
                .iter()
                .map(|record| record_description(record, links))
                .collect::<Vec<_>>()
                .join("<br />");

            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": position(cluster.location),
                },
                "properties": {
                    "list": list,
                    "matched": cluster.counts.matched,
                    "matched_postcode_error": cluster.counts.matched_postcode_error,
                    "mismatch": cluster.counts.mismatch,
                    "fhrs": cluster.counts.fhrs,
                    "osm_with_postcode": cluster.counts.osm_with_postcode,
                    "osm_no_postcode": cluster.counts.osm_no_postcode,
                },
            })
        })
        .collect();

    feature_collection(features)
}

/// One point per suggestion, placed on the map entity.
///
/// `text` links both records and offers an editor link that sets
/// `fhrs:id` along with the address tags.
#[must_use]
pub fn suggest_matches_geojson(suggestions: &[SuggestedMatch], links: &LinkConfig) -> Value {
    let features = suggestions
        .iter()
        .map(|s| {
            let tags = format!(
                "fhrs:id={}{}",
                s.establishment.fhrs_id,
                add_tags_string(&s.establishment)
            );
            let text = format!(
                "OSM: <a href=\"{}\" target=\"_blank\">{}</a><br />\
                 FHRS: <a href=\"{}\" target=\"_blank\">{}</a><br />\
                 <a href=\"{}\" target=\"_blank\">Add tags in JOSM</a>",
                osm_url(&s.entity, links),
                escape_html(s.entity.name.as_deref().unwrap_or_default()),
                fhrs_url(s.establishment.fhrs_id, links),
                escape_html(&s.establishment.business_name),
                escape_html(&josm_url(&s.entity, Some(&tags), links)),
            );

            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": position(s.entity.location),
                },
                "properties": {
                    "text": text,
                    "osm_postcode": s.entity.postcode,
                    "distance_m": s.distance_m,
                },
            })
        })
        .collect();

    feature_collection(features)
}

/// One line per distant match, from the map location to the FHRS location.
#[must_use]
pub fn distant_matches_geojson(matches: &[DistantMatch]) -> Value {
    let features = matches
        .iter()
        .filter_map(|m| {
            let fhrs_location = m.establishment.location?;
            Some(json!({
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": [position(m.entity.location), position(fhrs_location)],
                },
                "properties": {
                    "osm_type": m.entity.kind,
                    "osm_id": m.entity.id,
                    "osm_name": m.entity.name,
                    "fhrs_id": m.establishment.fhrs_id,
                    "fhrs_name": m.establishment.business_name,
                    "status": m.status,
                    "distance_m": m.distance_m,
                },
            }))
        })
        .collect();

    feature_collection(features)
}

/// The outline of a district as a single line feature.
///
/// Returns `None` when the stored boundary cannot be parsed.
#[must_use]
pub fn boundary_geojson(district: &District) -> Option<Value> {
    let rings = boundary_rings(&district.boundary_geojson)?;
    let lines: Vec<Vec<Value>> = rings
        .iter()
        .map(|ring| ring.iter().copied().map(position).collect())
        .collect();

    let geometry = match lines.as_slice() {
        [single] => json!({ "type": "LineString", "coordinates": single }),
        _ => json!({ "type": "MultiLineString", "coordinates": lines }),
    };

    Some(feature_collection(vec![json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": {
            "id": district.id,
            "name": district.name,
        },
    })]))
}
