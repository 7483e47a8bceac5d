#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index for district attribution.
//!
//! Parses district boundary polygons once, builds an R-tree over their
//! bounding boxes, and answers point-in-polygon lookups with an envelope
//! pre-filter followed by an exact containment test. Also hosts the small
//! geodesic helpers the reconciliation engine needs (great-circle
//! distance, representative points for areas, outlier-trimmed bounding
//! boxes).

pub mod bbox;
pub mod centroid;
pub mod distance;

use fhrs_osm_compare_models::{District, Location};
use geo::{Contains, MultiPolygon};
use geojson::GeoJson;
use rstar::{AABB, RTree, RTreeObject};

/// Errors raised while building the spatial index.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// No district carried a usable polygon.
    #[error("No usable district boundaries ({rejected} rejected)")]
    NoBoundaries {
        /// Number of districts whose geometry could not be parsed.
        rejected: usize,
    },
}

/// A district polygon stored in the R-tree with its id.
struct BoundaryEntry {
    district_id: i32,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built R-tree over district boundaries.
///
/// Constructed once per run and shared read-only by every consumer.
pub struct SpatialIndex {
    districts: RTree<BoundaryEntry>,
}

impl SpatialIndex {
    /// Parses each district's boundary and bulk-loads the R-tree.
    ///
    /// Districts whose geometry fails to parse are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::NoBoundaries`] if no district had a usable
    /// polygon, since nothing downstream can be attributed without them.
    pub fn from_districts(districts: &[District]) -> Result<Self, SpatialError> {
        let mut entries = Vec::with_capacity(districts.len());
        let mut rejected = 0usize;

        for district in districts {
            let Some(polygon) = parse_geojson_to_multipolygon(&district.boundary_geojson) else {
                log::warn!(
                    "Failed to parse boundary for district {} ({})",
                    district.id,
                    district.name
                );
                rejected += 1;
                continue;
            };

            entries.push(BoundaryEntry {
                district_id: district.id,
                envelope: compute_envelope(&polygon),
                polygon,
            });
        }

        if entries.is_empty() {
            return Err(SpatialError::NoBoundaries { rejected });
        }

        log::info!("Loaded {} district boundaries into spatial index", entries.len());

        Ok(Self {
            districts: RTree::bulk_load(entries),
        })
    }

    /// Number of indexed districts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.districts.size()
    }

    /// Whether the index holds no districts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.districts.size() == 0
    }

    /// Looks up the district whose polygon contains `location`.
    ///
    /// Boundaries are expected not to overlap; if they do, the lowest
    /// district id wins so repeated lookups are stable. Points outside
    /// every polygon (or exactly on a boundary edge) yield `None`.
    #[must_use]
    pub fn assign_district(&self, location: Location) -> Option<i32> {
        let point = geo::Point::new(location.longitude, location.latitude);
        let query_env = AABB::from_point([location.longitude, location.latitude]);

        self.districts
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&point))
            .map(|entry| entry.district_id)
            .min()
    }
}

/// Parse a `GeoJSON` string into a [`MultiPolygon`].
///
/// Accepts a bare geometry or a single feature, holding either a
/// `Polygon` or a `MultiPolygon`.
#[must_use]
pub fn parse_geojson_to_multipolygon(geojson_str: &str) -> Option<MultiPolygon<f64>> {
    let geojson: GeoJson = geojson_str.parse().ok()?;
    let geom = match geojson {
        GeoJson::Geometry(geom) => geom,
        GeoJson::Feature(feature) => feature.geometry?,
        GeoJson::FeatureCollection(_) => return None,
    };
    let geo_geom: geo::Geometry<f64> = geom.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Returns every ring (exterior and interior) of a boundary as a list of
/// locations, for rendering the boundary as lines.
#[must_use]
pub fn boundary_rings(geojson_str: &str) -> Option<Vec<Vec<Location>>> {
    let mp = parse_geojson_to_multipolygon(geojson_str)?;

    let rings = mp
        .0
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
        .map(|ring| {
            ring.coords()
                .map(|c| Location::new(c.x, c.y))
                .collect::<Vec<_>>()
        })
        .collect();

    Some(rings)
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    use geo::BoundingRect;

    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use fhrs_osm_compare_models::District;

    /// A square district spanning `[west, east] x [south, north]`.
    pub fn square_district(id: i32, west: f64, south: f64, east: f64, north: f64) -> District {
        District {
            id,
            name: format!("District {id}"),
            boundary_geojson: format!(
                r#"{{"type":"Polygon","coordinates":[[[{west},{south}],[{east},{south}],[{east},{north}],[{west},{north}],[{west},{south}]]]}}"#
            ),
        }
    }
}
