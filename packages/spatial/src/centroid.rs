//! Representative points for map areas.
//!
//! Ways are reduced to a single location before comparison: a polygon
//! centroid when there are at least three vertices, the midpoint of a
//! two-vertex way, and the vertex itself for the (malformed but possible)
//! single-node way. Relations use the centre of the bounding box of all
//! coordinates reachable from their members.

use fhrs_osm_compare_models::Location;
use geo::{BoundingRect, Centroid, Coord, LineString, MultiPoint, Polygon};

/// Representative location of a way from its ordered vertex list.
///
/// Returns `None` for a way with no vertices.
#[must_use]
pub fn way_centroid(vertices: &[Location]) -> Option<Location> {
    match vertices {
        [] => None,
        [only] => Some(*only),
        [a, b] => Some(Location::new(
            (a.longitude + b.longitude) / 2.0,
            (a.latitude + b.latitude) / 2.0,
        )),
        _ => {
            let ring: LineString<f64> = vertices
                .iter()
                .map(|v| Coord {
                    x: v.longitude,
                    y: v.latitude,
                })
                .collect();
            let polygon = Polygon::new(ring, vec![]);

            polygon
                .centroid()
                .map(|p| Location::new(p.x(), p.y()))
                .or_else(|| Some(mean_location(vertices)))
        }
    }
}

/// Representative location of a relation from all member coordinates.
///
/// Uses the centre of the bounding box. A relation whose members could
/// not be resolved yields `(0, 0)`, which lies outside every district and
/// so ends up unassigned.
#[must_use]
pub fn relation_centroid(member_coords: &[Location]) -> Location {
    let points: MultiPoint<f64> = member_coords
        .iter()
        .map(|c| geo::Point::new(c.longitude, c.latitude))
        .collect();

    points.bounding_rect().map_or_else(
        || Location::new(0.0, 0.0),
        |rect| {
            let center = rect.center();
            Location::new(center.x, center.y)
        },
    )
}

/// Arithmetic mean of a set of locations.
///
/// Callers must pass a non-empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_location(locations: &[Location]) -> Location {
    let n = locations.len().max(1) as f64;
    let (lon, lat) = locations
        .iter()
        .fold((0.0, 0.0), |(lon, lat), l| (lon + l.longitude, lat + l.latitude));
    Location::new(lon / n, lat / n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Location, b: Location) -> bool {
        (a.longitude - b.longitude).abs() < 1e-9 && (a.latitude - b.latitude).abs() < 1e-9
    }

    #[test]
    fn empty_way_has_no_centroid() {
        assert_eq!(way_centroid(&[]), None);
    }

    #[test]
    fn single_vertex_way_uses_vertex() {
        let v = Location::new(-1.2, 52.3);
        assert_eq!(way_centroid(&[v]), Some(v));
    }

    #[test]
    fn two_vertex_way_uses_midpoint() {
        let c = way_centroid(&[Location::new(0.0, 0.0), Location::new(2.0, 4.0)]).unwrap();
        assert!(close(c, Location::new(1.0, 2.0)));
    }

    #[test]
    fn closed_square_way_uses_polygon_centroid() {
        let square = [
            Location::new(0.0, 0.0),
            Location::new(2.0, 0.0),
            Location::new(2.0, 2.0),
            Location::new(0.0, 2.0),
            Location::new(0.0, 0.0),
        ];
        let c = way_centroid(&square).unwrap();
        assert!(close(c, Location::new(1.0, 1.0)), "{c:?}");
    }

    #[test]
    fn area_weighted_centroid_differs_from_vertex_mean() {
        // L-shaped outline: vertex mean is pulled towards the dense corner.
        let shape = [
            Location::new(0.0, 0.0),
            Location::new(4.0, 0.0),
            Location::new(4.0, 1.0),
            Location::new(1.0, 1.0),
            Location::new(1.0, 4.0),
            Location::new(0.0, 4.0),
        ];
        let c = way_centroid(&shape).unwrap();
        let mean = mean_location(&shape);
        assert!(!close(c, mean));
    }

    #[test]
    fn relation_uses_bounding_box_center() {
        let coords = [
            Location::new(-1.0, 52.0),
            Location::new(-1.0, 52.0),
            Location::new(-1.0, 52.0),
            Location::new(1.0, 54.0),
        ];
        let c = relation_centroid(&coords);
        assert!(close(c, Location::new(0.0, 53.0)));
    }

    #[test]
    fn unresolved_relation_falls_back_to_origin() {
        assert_eq!(relation_centroid(&[]), Location::new(0.0, 0.0));
    }
}
