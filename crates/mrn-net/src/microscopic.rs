//! Microscopic network — per-lane cell strips over the mesoscopic links.

use std::collections::BTreeMap;

use geo_types::{LineString, Point};
use mrn_core::{
    AgentType, BoundaryType, CellType, ControlType, LinkId, LinkType, MovementCompositeType,
    NodeId,
};

/// One cell vertex: a vehicle-length slot boundary on a specific lane of a
/// mesoscopic link.
#[derive(Clone, Debug, PartialEq)]
pub struct MicroNode {
    pub id: NodeId,
    pub geom: Point<f64>,
    pub geom_euclidean: Point<f64>,
    pub meso_link_id: LinkId,
    /// `1..` for vehicle lanes, `-1` for the bike strip, `-2` for the walk
    /// strip.
    pub lane_id: i32,
    /// Position along the lane, `0..=cells_num`.
    pub cell_index: i32,
    /// First cell of a lane on the first segment of a macroscopic link.
    pub is_upstream_end: bool,
    /// Last cell of a lane on the last segment of a macroscopic link.
    pub is_downstream_end: bool,
    /// Zone inherited from the macroscopic end node, endpoint cells only.
    pub zone_id: NodeId,
    pub boundary_type: BoundaryType,
    pub incoming_links: Vec<LinkId>,
    pub outcoming_links: Vec<LinkId>,
}

impl MicroNode {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            geom: Point::new(0.0, 0.0),
            geom_euclidean: Point::new(0.0, 0.0),
            meso_link_id: LinkId::INVALID,
            lane_id: 0,
            cell_index: -1,
            is_upstream_end: false,
            is_downstream_end: false,
            zone_id: NodeId::INVALID,
            boundary_type: BoundaryType::default(),
            incoming_links: Vec::new(),
            outcoming_links: Vec::new(),
        }
    }

    pub fn add_incoming_link(&mut self, link: LinkId) {
        if !self.incoming_links.contains(&link) {
            self.incoming_links.push(link);
        }
    }

    pub fn add_outcoming_link(&mut self, link: LinkId) {
        if !self.outcoming_links.contains(&link) {
            self.outcoming_links.push(link);
        }
    }
}

/// One cell edge: forward travel within a lane or a diagonal lane change.
#[derive(Clone, Debug, PartialEq)]
pub struct MicroLink {
    pub id: LinkId,
    pub geom: LineString<f64>,
    pub geom_euclidean: LineString<f64>,
    pub length_meters: f64,
    pub source_node: NodeId,
    pub target_node: NodeId,

    // Parent references.
    pub meso_link_id: LinkId,
    pub macro_link_id: LinkId,
    pub macro_node_id: NodeId,

    pub cell_type: CellType,
    pub lane_id: i32,

    /// First edge of a movement connector chain.
    pub is_first_movement_cell: bool,
    pub movement_composite_type: MovementCompositeType,

    // Inherited from the parent mesoscopic link.
    pub meso_link_type: LinkType,
    pub control_type: ControlType,
    pub free_speed: f64,
    pub capacity: i32,
    pub allowed_agent_types: Vec<AgentType>,
}

impl MicroLink {
    pub fn new(id: LinkId, source_node: NodeId, target_node: NodeId) -> Self {
        Self {
            id,
            geom: LineString::new(Vec::new()),
            geom_euclidean: LineString::new(Vec::new()),
            length_meters: -1.0,
            source_node,
            target_node,
            meso_link_id: LinkId::INVALID,
            macro_link_id: LinkId::INVALID,
            macro_node_id: NodeId::INVALID,
            cell_type: CellType::default(),
            lane_id: 0,
            is_first_movement_cell: false,
            movement_composite_type: MovementCompositeType::default(),
            meso_link_type: LinkType::default(),
            control_type: ControlType::default(),
            free_speed: 0.0,
            capacity: 0,
            allowed_agent_types: Vec::new(),
        }
    }
}

/// The microscopic road network, with monotonic ID allocation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MicroNet {
    pub nodes: BTreeMap<NodeId, MicroNode>,
    pub links: BTreeMap<LinkId, MicroLink>,

    max_node_id: i64,
    max_link_id: i64,
}

impl MicroNet {
    pub fn new() -> Self {
        Self::default()
    }

    /// ID the next added node should use.
    pub fn next_node_id(&self) -> NodeId {
        NodeId(self.max_node_id)
    }

    /// ID the next added link should use.
    pub fn next_link_id(&self) -> LinkId {
        LinkId(self.max_link_id)
    }

    /// Insert a node, advancing the allocator past its ID.
    pub fn add_node(&mut self, node: MicroNode) {
        if node.id.0 >= self.max_node_id {
            self.max_node_id = node.id.0 + 1;
        }
        self.nodes.insert(node.id, node);
    }

    /// Insert a link, advancing the allocator past its ID.
    pub fn add_link(&mut self, link: MicroLink) {
        if link.id.0 >= self.max_link_id {
            self.max_link_id = link.id.0 + 1;
        }
        self.links.insert(link.id, link);
    }

    /// Remove a node; IDs are never reused.
    pub fn delete_node(&mut self, node_id: NodeId) {
        self.nodes.remove(&node_id);
    }

    /// Remove a link; IDs are never reused.
    pub fn delete_link(&mut self, link_id: LinkId) {
        self.links.remove(&link_id);
    }
}
