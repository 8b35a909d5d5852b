//! Stable geometry hashing for duplicate detection.

use std::fmt::Write as _;

use geo_types::LineString;
use sha2::{Digest, Sha256};

/// Stable 128-bit hash of a polyline's coordinate sequence, hex-encoded.
///
/// Coordinates are formatted to six decimal places before hashing, so two
/// polylines collide exactly when their formatted coordinate lists match.
/// Used as a fast reverse-duplicate key: hashing `reverse(line)` and
/// comparing against other links' hashes finds opposite-direction twins
/// without pairwise coordinate comparison.
pub fn geometry_hash(line: &LineString<f64>) -> String {
    let mut hasher = Sha256::new();
    let mut buf = String::with_capacity(32);
    for c in &line.0 {
        buf.clear();
        let _ = write!(buf, "{:.6},{:.6};", c.x, c.y);
        hasher.update(buf.as_bytes());
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for byte in &digest[..16] {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
