//! Lane-count bookkeeping along a macroscopic link.

/// Piecewise-constant lane layout of a macroscopic link.
///
/// The link is divided into `K` segments.  `lanes_list[k]` is the lane count
/// in segment `k`, `lanes_change[k] = [left_add, right_add]` the number of
/// lanes gained (or, negative, lost) on each side relative to the link's base
/// `lanes_num`, and `lanes_change_points` the `K + 1` meter offsets along the
/// link at which the count changes.  Invariants: `lanes_change_points[0] = 0`,
/// `lanes_change_points[K] = link length`, strictly increasing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LanesInfo {
    pub lanes_list: Vec<i32>,
    pub lanes_change: Vec<[i32; 2]>,
    pub lanes_change_points: Vec<f64>,
}

impl LanesInfo {
    /// Layout for a link whose lane count never changes.
    pub fn uniform(lanes: i32, length_meters: f64) -> Self {
        Self {
            lanes_list: vec![lanes],
            lanes_change: vec![[0, 0]],
            lanes_change_points: vec![0.0, length_meters],
        }
    }

    /// Number of lane-constant segments.
    pub fn segments(&self) -> usize {
        self.lanes_list.len()
    }

    /// Check the structural invariants against the link's length.
    ///
    /// The cut solver indexes `lanes_change_points[1]` and its mirror
    /// unconditionally, so this must pass before any mesoscopic generation.
    pub fn validate(&self, length_meters: f64) -> Result<(), String> {
        let k = self.lanes_list.len();
        if k == 0 {
            return Err("empty lanes list".to_string());
        }
        if self.lanes_change.len() != k {
            return Err(format!(
                "lanes_change has {} entries, expected {}",
                self.lanes_change.len(),
                k
            ));
        }
        if self.lanes_change_points.len() != k + 1 {
            return Err(format!(
                "lanes_change_points has {} entries, expected {}",
                self.lanes_change_points.len(),
                k + 1
            ));
        }
        let pts = &self.lanes_change_points;
        let tolerance = 1e-6_f64.max(length_meters * 1e-6);
        if pts[0].abs() > tolerance {
            return Err(format!("first change point is {}, expected 0", pts[0]));
        }
        if (pts[k] - length_meters).abs() > tolerance {
            return Err(format!(
                "last change point is {}, expected link length {}",
                pts[k], length_meters
            ));
        }
        for pair in pts.windows(2) {
            if pair[1] <= pair[0] {
                return Err(format!(
                    "change points not strictly increasing: {} then {}",
                    pair[0], pair[1]
                ));
            }
        }
        Ok(())
    }
}

/// Lane numbers of a segment with the given base lane count and side changes.
///
/// Base lanes are numbered `1..=lanes_num` left to right; lanes added on the
/// left take `-left_add..=-1`; lane `0` never exists.  Lanes added on the
/// right extend the positive range.  The list length equals the segment's
/// lane count, and positions in it are the *sequence* indices movements refer
/// to.
pub fn lane_indices(lanes_num: i32, left_add: i32, right_add: i32) -> Vec<i32> {
    let capacity = (lanes_num + left_add + right_add).max(0) as usize;
    let mut out = Vec::with_capacity(capacity);
    for lane in -left_add..0 {
        out.push(lane);
    }
    for lane in 1..=(lanes_num + right_add) {
        out.push(lane);
    }
    out
}
