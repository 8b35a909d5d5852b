//! Spherical ↔ euclidean frame conversion.
//!
//! The euclidean frame is spherical (web) Mercator in meters.  Mercator is
//! conformal, so bearings and perpendicular offsets computed there transfer
//! directly back to the geographic frame; lengths do not, which is why every
//! meter measurement in the compiler goes through the haversine functions
//! instead.

use std::f64::consts::{FRAC_PI_4, PI};

use geo_types::{Coord, LineString};

/// WGS-84 equatorial radius used by the Mercator projection, meters.
const MERCATOR_RADIUS_M: f64 = 6_378_137.0;

/// Project a `(lon, lat)` point into the euclidean frame.
pub fn point_to_euclidean(p: Coord<f64>) -> Coord<f64> {
    let x = MERCATOR_RADIUS_M * p.x.to_radians();
    let y = MERCATOR_RADIUS_M * (FRAC_PI_4 + p.y.to_radians() * 0.5).tan().ln();
    Coord { x, y }
}

/// Inverse of [`point_to_euclidean`].
pub fn point_to_spherical(p: Coord<f64>) -> Coord<f64> {
    let lon = (p.x / MERCATOR_RADIUS_M).to_degrees();
    let lat = (2.0 * (p.y / MERCATOR_RADIUS_M).exp().atan() - PI * 0.5).to_degrees();
    Coord { x: lon, y: lat }
}

/// Project a whole polyline into the euclidean frame.
pub fn line_to_euclidean(line: &LineString<f64>) -> LineString<f64> {
    LineString::new(line.0.iter().map(|&c| point_to_euclidean(c)).collect())
}

/// Reproject a euclidean polyline back to `(lon, lat)`.
pub fn line_to_spherical(line: &LineString<f64>) -> LineString<f64> {
    LineString::new(line.0.iter().map(|&c| point_to_spherical(c)).collect())
}
