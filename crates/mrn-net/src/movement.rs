//! Movements — permitted maneuvers at macroscopic nodes.

use std::collections::BTreeMap;

use geo_types::LineString;
use mrn_core::{
    AgentType, ControlType, LinkId, MovementCompositeType, MovementId, MovementType, NodeId,
};

/// Keyed movement store; `BTreeMap` so aggregation and iteration follow
/// ascending movement IDs.
pub type Movements = BTreeMap<MovementId, Movement>;

/// A maneuver from one incoming macroscopic link to one outgoing one,
/// claiming a contiguous lane range on each side.
///
/// Lane *numbers* (`income_lane_start..=income_lane_end`) follow the
/// [`crate::lanes::lane_indices`] numbering of the relevant segment; lane
/// *sequence* indices are 0-based positions in that segment's lane vector.
#[derive(Clone, Debug, PartialEq)]
pub struct Movement {
    pub id: MovementId,
    pub macro_node_id: NodeId,

    pub income_macro_link_id: LinkId,
    pub income_lane_start: i32,
    pub income_lane_end: i32,
    pub income_lane_start_seq: i32,
    pub income_lane_end_seq: i32,

    pub outcome_macro_link_id: LinkId,
    pub outcome_lane_start: i32,
    pub outcome_lane_end: i32,
    pub outcome_lane_start_seq: i32,
    pub outcome_lane_end_seq: i32,

    pub lanes_num: i32,
    pub movement_type: MovementType,
    pub composite_type: MovementCompositeType,
    pub control_type: ControlType,
    pub allowed_agent_types: Vec<AgentType>,

    /// Two-point line from the incoming link's last vertex to the outgoing
    /// link's first vertex, spherical frame.
    pub geom: LineString<f64>,
    pub geom_euclidean: LineString<f64>,
}

impl Movement {
    pub fn new(
        id: MovementId,
        macro_node_id: NodeId,
        income_macro_link_id: LinkId,
        outcome_macro_link_id: LinkId,
        movement_type: MovementType,
        composite_type: MovementCompositeType,
    ) -> Self {
        Self {
            id,
            macro_node_id,
            income_macro_link_id,
            income_lane_start: -1,
            income_lane_end: -1,
            income_lane_start_seq: -1,
            income_lane_end_seq: -1,
            outcome_macro_link_id,
            outcome_lane_start: -1,
            outcome_lane_end: -1,
            outcome_lane_start_seq: -1,
            outcome_lane_end_seq: -1,
            lanes_num: -1,
            movement_type,
            composite_type,
            control_type: ControlType::default(),
            allowed_agent_types: Vec::new(),
            geom: LineString::new(Vec::new()),
            geom_euclidean: LineString::new(Vec::new()),
        }
    }
}
