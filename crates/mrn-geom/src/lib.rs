//! `mrn-geom` — the geometry kernel of the multiresolution network compiler.
//!
//! Every function here is pure.  Polylines live in one of two frames:
//!
//! - **spherical** — WGS-84 `(lon, lat)` degrees; all *lengths* are measured
//!   here, in meters, along great circles;
//! - **euclidean** — a spherical-Mercator projection of the same coordinates,
//!   in meters; all *angles and offsets* are computed here, since Mercator is
//!   conformal.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`length`]  | haversine distance/length, point-at-distance, substring   |
//! | [`offset`]  | `offset_curve` — parallel polyline at a signed distance   |
//! | [`angle`]   | first-segment bearings, signed angle between polylines    |
//! | [`project`] | spherical ↔ euclidean (Mercator) conversion               |
//! | [`hash`]    | stable 128-bit geometry hash for duplicate detection      |

pub mod angle;
pub mod hash;
pub mod length;
pub mod offset;
pub mod project;

#[cfg(test)]
mod tests;

pub use angle::{angle_between, first_bearing};
pub use hash::geometry_hash;
pub use length::{haversine_distance, length_haversine, point_at_distance, substring_haversine};
pub use offset::offset_curve;
pub use project::{
    line_to_euclidean, line_to_spherical, point_to_euclidean, point_to_spherical,
};

/// Planar coordinates closer than this (meters in the euclidean frame) are
/// treated as identical; offsets below it are skipped as no-ops.
pub const PLANAR_TOLERANCE: f64 = 1e-2;
