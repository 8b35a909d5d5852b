//! `mrn-core` — foundational types for the `mrn` multiresolution road-network
//! compiler.
//!
//! This crate is a dependency of every other `mrn-*` crate.  It intentionally
//! has no `mrn-*` dependencies and no external ones.
//!
//! # What lives here
//!
//! | Module    | Contents                                                      |
//! |-----------|---------------------------------------------------------------|
//! | [`ids`]   | `NodeId`, `LinkId`, `MovementId` (with a `-1` sentinel)       |
//! | [`types`] | Classification enums: control, boundary, cell, link, agent and movement types |

pub mod ids;
pub mod types;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use ids::{LinkId, MovementId, NodeId};
pub use types::{
    AgentType, BoundaryType, CellType, ControlType, DirectionType, LinkType,
    MovementCompositeType, MovementType,
};
