//! Bearings and signed angles between polylines.
//!
//! All of this runs on euclidean-frame geometry.  A bearing is the
//! counterclockwise angle from the +x axis (east), so north is `π/2`.

use std::f64::consts::PI;

use geo_types::LineString;

/// Bearing of the polyline's first segment, radians in `(-π, π]`.
///
/// Returns `0.0` for degenerate polylines (fewer than two points).
pub fn first_bearing(line: &LineString<f64>) -> f64 {
    let pts = &line.0;
    if pts.len() < 2 {
        return 0.0;
    }
    (pts[1].y - pts[0].y).atan2(pts[1].x - pts[0].x)
}

/// Signed angle from the first direction of `a` to the first direction of
/// `b`, normalized to `(-π, π]`.
///
/// Positive means `b` turns left (counterclockwise) relative to `a`; a
/// straight continuation measures ≈ 0, a doubling-back ≈ ±π.
pub fn angle_between(a: &LineString<f64>, b: &LineString<f64>) -> f64 {
    normalize_angle(first_bearing(b) - first_bearing(a))
}

/// Wrap an angle into `(-π, π]`.
pub fn normalize_angle(mut angle: f64) -> f64 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle <= -PI {
        angle += 2.0 * PI;
    }
    angle
}
