//! Outlier-trimmed bounding boxes.
//!
//! A handful of badly geocoded establishments (swapped coordinates, points
//! in the sea) can stretch a naive bounding box across half the country.
//! [`corrected_bbox`] discards values beyond interquartile fences on each
//! axis before taking the extent.

use fhrs_osm_compare_models::Location;
use serde::Serialize;

/// A south/west/north/east bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    /// Minimum latitude.
    pub south: f64,
    /// Minimum longitude.
    pub west: f64,
    /// Maximum latitude.
    pub north: f64,
    /// Maximum longitude.
    pub east: f64,
}

/// Interquartile summary of one coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisStats {
    /// Smallest value.
    pub min: f64,
    /// Largest of the lowest quarter of values.
    pub q1: f64,
    /// Largest of the lowest half of values.
    pub median: f64,
    /// Smallest of the highest quarter of values.
    pub q3: f64,
    /// Largest value.
    pub max: f64,
    /// Lower fence: `q1 - iqr * multiplier`.
    pub fence_low: f64,
    /// Upper fence: `q3 + iqr * multiplier`.
    pub fence_high: f64,
}

/// Computes quartiles and fences for `values`.
///
/// Uses rank `n / 4` (integer division) for the quartiles. With fewer than
/// four values no quarter exists, so the fences collapse to the extremes.
/// Returns `None` for an empty input.
#[must_use]
pub fn axis_stats(values: &[f64], fence_multiplier: f64) -> Option<AxisStats> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let min = sorted[0];
    let max = sorted[n - 1];
    let quarter = n / 4;
    let half = n / 2;

    if quarter == 0 {
        return Some(AxisStats {
            min,
            q1: min,
            median: sorted[half.saturating_sub(1)],
            q3: max,
            max,
            fence_low: min,
            fence_high: max,
        });
    }

    let q1 = sorted[quarter - 1];
    let median = sorted[half - 1];
    let q3 = sorted[n - quarter];
    let iqr = q3 - q1;

    Some(AxisStats {
        min,
        q1,
        median,
        q3,
        max,
        fence_low: q1 - iqr * fence_multiplier,
        fence_high: q3 + iqr * fence_multiplier,
    })
}

/// Bounding box of `locations` ignoring per-axis outliers.
///
/// Returns `None` if no location survives the fences.
#[must_use]
pub fn corrected_bbox(locations: &[Location], fence_multiplier: f64) -> Option<BoundingBox> {
    let lons: Vec<f64> = locations.iter().map(|l| l.longitude).collect();
    let lats: Vec<f64> = locations.iter().map(|l| l.latitude).collect();

    let lon = axis_stats(&lons, fence_multiplier)?;
    let lat = axis_stats(&lats, fence_multiplier)?;

    let within = |v: f64, s: &AxisStats| v >= s.fence_low && v <= s.fence_high;

    let kept_lons = lons.iter().copied().filter(|v| within(*v, &lon));
    let kept_lats = lats.iter().copied().filter(|v| within(*v, &lat));

    let (west, east) = extent(kept_lons)?;
    let (south, north) = extent(kept_lats)?;

    Some(BoundingBox {
        south,
        west,
        north,
        east,
    })
}

fn extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
