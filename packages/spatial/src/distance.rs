//! Great-circle distances and search boxes for degree-based R-trees.

use fhrs_osm_compare_models::Location;

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two locations in metres.
#[must_use]
pub fn haversine_m(a: Location, b: Location) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Longitude/latitude box, in degrees, holding every point within
/// `radius_m` of `centre`.
///
/// The box bounds the spherical cap around `centre`, so its longitude
/// span widens with latitude and covers every meridian once the cap
/// reaches a pole. Returned as `(min, max)` corners in `[lon, lat]`
/// order. Longitudes are not wrapped at the antimeridian.
#[must_use]
pub fn search_envelope(centre: Location, radius_m: f64) -> ([f64; 2], [f64; 2]) {
    let angular = radius_m.max(0.0) / EARTH_RADIUS_M;
    let dlat = angular.to_degrees();

    let sin_ratio = angular.sin() / centre.latitude.to_radians().cos();
    let dlon = if centre.latitude.abs() + dlat < 90.0 && sin_ratio < 1.0 {
        sin_ratio.asin().to_degrees()
    } else {
        180.0
    };

    (
        [centre.longitude - dlon, (centre.latitude - dlat).max(-90.0)],
        [centre.longitude + dlon, (centre.latitude + dlat).min(90.0)],
    )
}

/// Moves a location `metres` due north. Handy for building fixtures at a
/// known separation.
#[must_use]
pub fn offset_north(location: Location, metres: f64) -> Location {
    Location::new(
        location.longitude,
        location.latitude + (metres / EARTH_RADIUS_M).to_degrees(),
    )
}
