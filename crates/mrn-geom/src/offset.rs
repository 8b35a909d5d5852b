//! Parallel polyline offsetting in the euclidean frame.

use geo_types::{Coord, LineString};

/// Build a polyline parallel to `line` at the given perpendicular distance.
///
/// Positive distance shifts to the left of the direction of travel, negative
/// to the right.  Interior vertices are mitered by intersecting consecutive
/// shifted segments; when two segments are collinear the shared shifted point
/// is used directly.  The result has exactly as many vertices as the input.
pub fn offset_curve(line: &LineString<f64>, distance: f64) -> LineString<f64> {
    let pts = &line.0;
    if pts.len() < 2 || distance == 0.0 {
        return line.clone();
    }

    let shifted: Vec<(Coord<f64>, Coord<f64>)> = pts
        .windows(2)
        .map(|w| shift_segment(w[0], w[1], distance))
        .collect();

    let mut out: Vec<Coord<f64>> = Vec::with_capacity(pts.len());
    out.push(shifted[0].0);
    for pair in shifted.windows(2) {
        let miter = line_intersection(pair[0], pair[1]).unwrap_or(pair[0].1);
        out.push(miter);
    }
    out.push(shifted[shifted.len() - 1].1);
    LineString::new(out)
}

/// Translate one segment perpendicular to itself; positive = left.
fn shift_segment(a: Coord<f64>, b: Coord<f64>, distance: f64) -> (Coord<f64>, Coord<f64>) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < f64::EPSILON {
        return (a, b);
    }
    let nx = -dy / len * distance;
    let ny = dx / len * distance;
    (
        Coord { x: a.x + nx, y: a.y + ny },
        Coord { x: b.x + nx, y: b.y + ny },
    )
}

/// Intersection of two infinite lines given by segments; `None` when parallel.
fn line_intersection(
    l1: (Coord<f64>, Coord<f64>),
    l2: (Coord<f64>, Coord<f64>),
) -> Option<Coord<f64>> {
    let (p1, p2) = l1;
    let (p3, p4) = l2;
    let d1 = (p2.x - p1.x, p2.y - p1.y);
    let d2 = (p4.x - p3.x, p4.y - p3.y);
    let denom = d1.0 * d2.1 - d1.1 * d2.0;
    if denom.abs() < 1e-12 {
        return None;
    }
    let t = ((p3.x - p1.x) * d2.1 - (p3.y - p1.y) * d2.0) / denom;
    Some(Coord {
        x: p1.x + t * d1.0,
        y: p1.y + t * d1.1,
    })
}
