//! Unit tests for the geometry kernel.
//!
//! Geographic fixtures sit on the equator so that one degree of longitude is
//! ~111.32 km and the Mercator scale factor is ~1, which keeps expected
//! values easy to reason about.

/// Degrees per meter at the equator (haversine Earth radius).
#[cfg(test)]
pub const DEG_PER_M: f64 = 1.0 / 111_194.92664;

#[cfg(test)]
mod length {
    use geo_types::{Coord, LineString};

    use super::DEG_PER_M;
    use crate::{haversine_distance, length_haversine, point_at_distance, substring_haversine};

    fn straight_100m() -> LineString<f64> {
        LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 100.0 * DEG_PER_M, y: 0.0 },
        ])
    }

    #[test]
    fn one_degree_latitude() {
        let a = Coord { x: 0.0, y: 0.0 };
        let b = Coord { x: 0.0, y: 1.0 };
        let d = haversine_distance(a, b);
        assert!((d - 111_195.0).abs() < 500.0, "got {d}");
    }

    #[test]
    fn zero_distance() {
        let p = Coord { x: 37.6, y: 55.7 };
        assert!(haversine_distance(p, p) < 1e-9);
    }

    #[test]
    fn polyline_length_sums_segments() {
        let line = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 50.0 * DEG_PER_M, y: 0.0 },
            Coord { x: 100.0 * DEG_PER_M, y: 0.0 },
        ]);
        let len = length_haversine(&line);
        assert!((len - 100.0).abs() < 0.01, "got {len}");
    }

    #[test]
    fn point_at_distance_endpoints() {
        let line = straight_100m();
        let first = point_at_distance(&line, -5.0);
        assert_eq!(first, line.0[0]);
        let last = point_at_distance(&line, 1e9);
        assert_eq!(last, line.0[1]);
    }

    #[test]
    fn point_at_distance_midpoint() {
        let line = straight_100m();
        let mid = point_at_distance(&line, 50.0);
        let d = haversine_distance(line.0[0], mid);
        assert!((d - 50.0).abs() < 0.01, "got {d}");
    }

    #[test]
    fn substring_length_matches_range() {
        let line = straight_100m();
        let cut = substring_haversine(&line, 12.0, 88.0);
        let len = length_haversine(&cut);
        assert!((len - 76.0).abs() < 0.01, "got {len}");
        assert!(cut.0.len() >= 2);
    }

    #[test]
    fn substring_keeps_interior_vertices() {
        let line = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 50.0 * DEG_PER_M, y: 0.0 },
            Coord { x: 100.0 * DEG_PER_M, y: 0.0 },
        ]);
        let cut = substring_haversine(&line, 10.0, 90.0);
        // start, the 50 m vertex, end
        assert_eq!(cut.0.len(), 3);
    }

    #[test]
    fn substring_full_range_is_whole_line() {
        let line = straight_100m();
        let total = length_haversine(&line);
        let cut = substring_haversine(&line, 0.0, total);
        let len = length_haversine(&cut);
        assert!((len - total).abs() < 1e-6);
    }
}

#[cfg(test)]
mod offset {
    use geo_types::{Coord, LineString};

    use crate::offset_curve;

    #[test]
    fn straight_segment_shifts_left() {
        let line = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 100.0, y: 0.0 },
        ]);
        let shifted = offset_curve(&line, 10.0);
        assert_eq!(shifted.0.len(), 2);
        // Heading east, left is +y.
        assert!((shifted.0[0].y - 10.0).abs() < 1e-9);
        assert!((shifted.0[1].y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn negative_distance_shifts_right() {
        let line = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 100.0, y: 0.0 },
        ]);
        let shifted = offset_curve(&line, -10.5);
        assert!((shifted.0[0].y + 10.5).abs() < 1e-9);
    }

    #[test]
    fn vertex_count_preserved() {
        let line = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 100.0, y: 0.0 },
            Coord { x: 100.0, y: 100.0 },
            Coord { x: 200.0, y: 100.0 },
        ]);
        let shifted = offset_curve(&line, 5.0);
        assert_eq!(shifted.0.len(), line.0.len());
    }

    #[test]
    fn right_angle_miter() {
        // East then north; offset to the left (west of the north leg).
        let line = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 100.0, y: 0.0 },
            Coord { x: 100.0, y: 100.0 },
        ]);
        let shifted = offset_curve(&line, 10.0);
        // The miter vertex is the intersection of y = 10 and x = 90.
        assert!((shifted.0[1].x - 90.0).abs() < 1e-9);
        assert!((shifted.0[1].y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn collinear_segments_fall_back() {
        let line = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 50.0, y: 0.0 },
            Coord { x: 100.0, y: 0.0 },
        ]);
        let shifted = offset_curve(&line, 7.0);
        assert_eq!(shifted.0.len(), 3);
        for c in &shifted.0 {
            assert!((c.y - 7.0).abs() < 1e-9);
        }
    }
}

#[cfg(test)]
mod angle {
    use std::f64::consts::{FRAC_PI_2, PI};

    use geo_types::{Coord, LineString};

    use crate::{angle_between, first_bearing, angle::normalize_angle};

    fn line(from: (f64, f64), to: (f64, f64)) -> LineString<f64> {
        LineString::new(vec![
            Coord { x: from.0, y: from.1 },
            Coord { x: to.0, y: to.1 },
        ])
    }

    #[test]
    fn bearings() {
        assert!((first_bearing(&line((0.0, 0.0), (1.0, 0.0)))).abs() < 1e-12); // east
        assert!((first_bearing(&line((0.0, 0.0), (0.0, 1.0))) - FRAC_PI_2).abs() < 1e-12);
        // north
    }

    #[test]
    fn straight_continuation_is_zero() {
        let a = line((0.0, 0.0), (1.0, 0.0));
        let b = line((1.0, 0.0), (2.0, 0.0));
        assert!(angle_between(&a, &b).abs() < 1e-12);
    }

    #[test]
    fn left_turn_positive_right_turn_negative() {
        let east = line((0.0, 0.0), (1.0, 0.0));
        let north = line((1.0, 0.0), (1.0, 1.0));
        let south = line((1.0, 0.0), (1.0, -1.0));
        assert!((angle_between(&east, &north) - FRAC_PI_2).abs() < 1e-12);
        assert!((angle_between(&east, &south) + FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn reversal_is_pi() {
        let east = line((0.0, 0.0), (1.0, 0.0));
        let west = line((1.0, 0.0), (0.0, 0.0));
        assert!((angle_between(&east, &west).abs() - PI).abs() < 1e-12);
    }

    #[test]
    fn normalization_range() {
        assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-12);
        assert!((normalize_angle(-3.0 * PI) - PI).abs() < 1e-12);
        assert_eq!(normalize_angle(0.0), 0.0);
    }
}

#[cfg(test)]
mod project {
    use geo_types::{Coord, LineString};

    use crate::{line_to_euclidean, line_to_spherical, point_to_euclidean, point_to_spherical};

    #[test]
    fn roundtrip() {
        let p = Coord { x: 37.6176, y: 55.7558 };
        let back = point_to_spherical(point_to_euclidean(p));
        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn equator_scale_is_metric() {
        // At the equator, Mercator x is simply arc length.
        let a = point_to_euclidean(Coord { x: 0.0, y: 0.0 });
        let b = point_to_euclidean(Coord { x: 0.001, y: 0.0 });
        let dx = b.x - a.x;
        assert!((dx - 111.32).abs() < 0.1, "got {dx}");
    }

    #[test]
    fn line_roundtrip() {
        let line = LineString::new(vec![
            Coord { x: -0.1, y: 51.5 },
            Coord { x: -0.2, y: 51.6 },
        ]);
        let back = line_to_spherical(&line_to_euclidean(&line));
        for (orig, got) in line.0.iter().zip(back.0.iter()) {
            assert!((orig.x - got.x).abs() < 1e-9);
            assert!((orig.y - got.y).abs() < 1e-9);
        }
    }
}

#[cfg(test)]
mod hash {
    use geo_types::{Coord, LineString};

    use crate::geometry_hash;

    #[test]
    fn equal_geometries_equal_hashes() {
        let a = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 2.0 },
        ]);
        let b = a.clone();
        assert_eq!(geometry_hash(&a), geometry_hash(&b));
    }

    #[test]
    fn hash_is_direction_sensitive() {
        let fwd = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 2.0 },
        ]);
        let rev = LineString::new(vec![
            Coord { x: 1.0, y: 2.0 },
            Coord { x: 0.0, y: 0.0 },
        ]);
        assert_ne!(geometry_hash(&fwd), geometry_hash(&rev));
    }

    #[test]
    fn reversed_twin_detection() {
        let fwd = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 2.0 },
            Coord { x: 3.0, y: 3.0 },
        ]);
        let twin = LineString::new(vec![
            Coord { x: 3.0, y: 3.0 },
            Coord { x: 1.0, y: 2.0 },
            Coord { x: 0.0, y: 0.0 },
        ]);
        let mut rev = fwd.clone();
        rev.0.reverse();
        assert_eq!(geometry_hash(&rev), geometry_hash(&twin));
    }

    #[test]
    fn hash_is_128_bit_hex() {
        let line = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 1.0 },
        ]);
        let h = geometry_hash(&line);
        assert_eq!(h.len(), 32);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
