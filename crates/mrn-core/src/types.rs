//! Classification enums shared by the macro/meso/micro layers.
//!
//! Display strings follow the GMNS conventions used by the GeoJSON surface
//! (`"signal"`, `"income_only"`, `"lane_change"`, `"NBT"`, …), so a feature
//! property is always `value.to_string()`.

use std::fmt;

// ── Control / boundary ────────────────────────────────────────────────────────

/// Traffic control at a node: signalized or not.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ControlType {
    #[default]
    NotSignal,
    Signal,
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ControlType::NotSignal => "common",
            ControlType::Signal => "signal",
        })
    }
}

/// Whether a node sits on the network boundary, and in which direction
/// traffic crosses it there.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BoundaryType {
    #[default]
    None,
    IncomeOnly,
    OutcomeOnly,
    IncomeOutcome,
}

impl fmt::Display for BoundaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BoundaryType::None => "none",
            BoundaryType::IncomeOnly => "income_only",
            BoundaryType::OutcomeOnly => "outcome_only",
            BoundaryType::IncomeOutcome => "income_outcome",
        })
    }
}

// ── Micro cells ───────────────────────────────────────────────────────────────

/// Kind of a microscopic link (cell edge).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CellType {
    /// Travel to the next cell within the same lane.
    #[default]
    Forward,
    /// Diagonal move into an adjacent lane.
    LaneChange,
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CellType::Forward => "forward",
            CellType::LaneChange => "lane_change",
        })
    }
}

// ── Agents ────────────────────────────────────────────────────────────────────

/// Agent class permitted on a link.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AgentType {
    Auto,
    Bike,
    Walk,
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AgentType::Auto => "auto",
            AgentType::Bike => "bike",
            AgentType::Walk => "walk",
        })
    }
}

// ── Link types ────────────────────────────────────────────────────────────────

/// Functional class of a road link.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LinkType {
    #[default]
    Undefined,
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Residential,
    LivingStreet,
    Service,
    Cycleway,
    Footway,
    Track,
    Unclassified,
    Connector,
}

impl LinkType {
    /// Default number of lanes for this functional class, `-1` when the class
    /// carries no convention.
    pub fn default_lanes(self) -> i32 {
        match self {
            LinkType::Motorway => 4,
            LinkType::Trunk | LinkType::Primary => 3,
            LinkType::Secondary | LinkType::Tertiary | LinkType::Connector => 2,
            LinkType::Residential
            | LinkType::Service
            | LinkType::Cycleway
            | LinkType::Footway
            | LinkType::Track
            | LinkType::Unclassified => 1,
            _ => -1,
        }
    }

    /// Default free-flow speed in km/h, `-1.0` when unknown.
    pub fn default_speed(self) -> f64 {
        match self {
            LinkType::Motorway | LinkType::Connector => 120.0,
            LinkType::Trunk => 100.0,
            LinkType::Primary => 80.0,
            LinkType::Secondary => 60.0,
            LinkType::Tertiary => 40.0,
            LinkType::Residential
            | LinkType::Service
            | LinkType::Track
            | LinkType::Unclassified => 30.0,
            LinkType::Cycleway | LinkType::Footway => 5.0,
            _ => -1.0,
        }
    }

    /// Default capacity in vehicles/hour/lane, `-1` when unknown.
    pub fn default_capacity(self) -> i32 {
        match self {
            LinkType::Motorway => 2300,
            LinkType::Trunk => 2200,
            LinkType::Primary => 1800,
            LinkType::Secondary => 1600,
            LinkType::Tertiary => 1200,
            LinkType::Residential => 1000,
            LinkType::Service
            | LinkType::Cycleway
            | LinkType::Footway
            | LinkType::Track
            | LinkType::Unclassified => 800,
            LinkType::Connector => 9999,
            _ => -1,
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LinkType::Undefined => "undefined",
            LinkType::Motorway => "motorway",
            LinkType::Trunk => "trunk",
            LinkType::Primary => "primary",
            LinkType::Secondary => "secondary",
            LinkType::Tertiary => "tertiary",
            LinkType::Residential => "residential",
            LinkType::LivingStreet => "living_street",
            LinkType::Service => "service",
            LinkType::Cycleway => "cycleway",
            LinkType::Footway => "footway",
            LinkType::Track => "track",
            LinkType::Unclassified => "unclassified",
            LinkType::Connector => "connector",
        })
    }
}

// ── Movements ─────────────────────────────────────────────────────────────────

/// Primary maneuver class of a movement, derived from the signed angle
/// between the incoming and outgoing link directions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MovementType {
    Thru,
    Right,
    Left,
    UTurn,
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MovementType::Thru => "thru",
            MovementType::Right => "right",
            MovementType::Left => "left",
            MovementType::UTurn => "uturn",
        })
    }
}

/// Cardinal direction of a movement's approach heading.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DirectionType {
    SB,
    EB,
    NB,
    WB,
}

impl fmt::Display for DirectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DirectionType::SB => "SB",
            DirectionType::EB => "EB",
            DirectionType::NB => "NB",
            DirectionType::WB => "WB",
        })
    }
}

/// Composite movement tag: cardinal direction × maneuver (`NBT` =
/// northbound-through).  `Undefined` is the resting value for cells that do
/// not belong to any movement.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum MovementCompositeType {
    #[default]
    Undefined,
    SBT,
    SBR,
    SBL,
    SBU,
    EBT,
    EBR,
    EBL,
    EBU,
    NBT,
    NBR,
    NBL,
    NBU,
    WBT,
    WBR,
    WBL,
    WBU,
}

impl MovementCompositeType {
    /// Compose the tag from its direction and maneuver parts.
    pub fn from_parts(direction: DirectionType, mvmt: MovementType) -> Self {
        use DirectionType::*;
        use MovementType::*;
        match (direction, mvmt) {
            (SB, Thru) => Self::SBT,
            (SB, Right) => Self::SBR,
            (SB, Left) => Self::SBL,
            (SB, UTurn) => Self::SBU,
            (EB, Thru) => Self::EBT,
            (EB, Right) => Self::EBR,
            (EB, Left) => Self::EBL,
            (EB, UTurn) => Self::EBU,
            (NB, Thru) => Self::NBT,
            (NB, Right) => Self::NBR,
            (NB, Left) => Self::NBL,
            (NB, UTurn) => Self::NBU,
            (WB, Thru) => Self::WBT,
            (WB, Right) => Self::WBR,
            (WB, Left) => Self::WBL,
            (WB, UTurn) => Self::WBU,
        }
    }
}

impl fmt::Display for MovementCompositeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MovementCompositeType::Undefined => "undefined",
            MovementCompositeType::SBT => "SBT",
            MovementCompositeType::SBR => "SBR",
            MovementCompositeType::SBL => "SBL",
            MovementCompositeType::SBU => "SBU",
            MovementCompositeType::EBT => "EBT",
            MovementCompositeType::EBR => "EBR",
            MovementCompositeType::EBL => "EBL",
            MovementCompositeType::EBU => "EBU",
            MovementCompositeType::NBT => "NBT",
            MovementCompositeType::NBR => "NBR",
            MovementCompositeType::NBL => "NBL",
            MovementCompositeType::NBU => "NBU",
            MovementCompositeType::WBT => "WBT",
            MovementCompositeType::WBR => "WBR",
            MovementCompositeType::WBL => "WBL",
            MovementCompositeType::WBU => "WBU",
        })
    }
}
