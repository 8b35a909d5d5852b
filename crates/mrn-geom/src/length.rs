//! Great-circle lengths and arclength queries on spherical polylines.
//!
//! Coordinates are `(lon, lat)` degrees; results are meters.  Interpolation
//! within a segment is linear in lon/lat, which is accurate to well under the
//! planar tolerance at the segment lengths road geometry produces.

use geo_types::{Coord, LineString};

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine great-circle distance between two `(lon, lat)` points, meters.
pub fn haversine_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let d_lat = (b.y - a.y).to_radians();
    let d_lon = (b.x - a.x).to_radians();

    let lat1 = a.y.to_radians();
    let lat2 = b.y.to_radians();

    let h = (d_lat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Total haversine length of a polyline, meters.
pub fn length_haversine(line: &LineString<f64>) -> f64 {
    line.0
        .windows(2)
        .map(|w| haversine_distance(w[0], w[1]))
        .sum()
}

fn lerp(a: Coord<f64>, b: Coord<f64>, t: f64) -> Coord<f64> {
    Coord {
        x: a.x + (b.x - a.x) * t,
        y: a.y + (b.y - a.y) * t,
    }
}

/// Point at the given arclength along the polyline.
///
/// Distances are clamped to `[0, length]`: a negative distance returns the
/// first vertex, an overshooting one the last.
pub fn point_at_distance(line: &LineString<f64>, distance: f64) -> Coord<f64> {
    let pts = &line.0;
    if pts.is_empty() {
        return Coord { x: 0.0, y: 0.0 };
    }
    if distance <= 0.0 || pts.len() == 1 {
        return pts[0];
    }

    let mut remaining = distance;
    for w in pts.windows(2) {
        let seg = haversine_distance(w[0], w[1]);
        if seg > 0.0 && remaining <= seg {
            return lerp(w[0], w[1], remaining / seg);
        }
        remaining -= seg;
    }
    *pts.last().unwrap()
}

/// Polyline slice between two arclengths (meters, measured with haversine).
///
/// Expects `0 <= start < end <= length`; out-of-range inputs are clamped.
/// Vertices strictly inside `(start, end)` are kept; the cut endpoints are
/// interpolated on the segments that straddle them.  The result always has at
/// least two points (degenerate inputs duplicate the boundary point).
pub fn substring_haversine(line: &LineString<f64>, start: f64, end: f64) -> LineString<f64> {
    let total = length_haversine(line);
    let start = start.clamp(0.0, total);
    let end = end.clamp(start, total);

    let pts = &line.0;
    let mut out: Vec<Coord<f64>> = Vec::new();
    let mut end_placed = false;
    let mut walked = 0.0;
    for w in pts.windows(2) {
        let seg = haversine_distance(w[0], w[1]);
        if seg <= 0.0 {
            continue;
        }
        let lo = walked;
        let hi = walked + seg;
        walked = hi;
        if hi < start {
            continue;
        }
        if out.is_empty() {
            out.push(lerp(w[0], w[1], ((start - lo) / seg).clamp(0.0, 1.0)));
        }
        if end <= hi {
            out.push(lerp(w[0], w[1], ((end - lo) / seg).clamp(0.0, 1.0)));
            end_placed = true;
            break;
        }
        out.push(w[1]);
    }

    // Floating accumulation can leave the end unplaced when `end == total`.
    if !end_placed {
        let tail = *pts.last().unwrap_or(&Coord { x: 0.0, y: 0.0 });
        if out.last() != Some(&tail) {
            out.push(tail);
        }
    }
    if out.len() < 2 {
        let only = *out.first().unwrap_or(&Coord { x: 0.0, y: 0.0 });
        out.clear();
        out.push(only);
        out.push(only);
    }
    LineString::new(out)
}
