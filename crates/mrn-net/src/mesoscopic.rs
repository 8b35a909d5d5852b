//! Mesoscopic network — lane-constant slices of offset macroscopic links,
//! joined by movement connectors at intersections.

use std::collections::BTreeMap;

use geo_types::{LineString, Point};
use mrn_core::{
    AgentType, BoundaryType, ControlType, LinkId, LinkType, MovementCompositeType, MovementId,
    NodeId,
};

/// Vertex of the mesoscopic graph.
///
/// Exactly one of `macro_node_id` / `macro_link_id` is valid: segment-end
/// nodes descend from a macroscopic node, interior split nodes from the link
/// they subdivide.
#[derive(Clone, Debug, PartialEq)]
pub struct MesoNode {
    pub id: NodeId,
    pub geom: Point<f64>,
    pub geom_euclidean: Point<f64>,
    pub macro_node_id: NodeId,
    pub macro_link_id: LinkId,
    /// Zone of the parent macroscopic node, `INVALID` for interior nodes.
    pub macro_zone_id: NodeId,
    pub activity_link_type: LinkType,
    pub boundary_type: BoundaryType,
    /// Incident link IDs in insertion order (connector property inheritance
    /// reads the *first* incoming link).
    pub incoming_links: Vec<LinkId>,
    pub outcoming_links: Vec<LinkId>,
}

impl MesoNode {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            geom: Point::new(0.0, 0.0),
            geom_euclidean: Point::new(0.0, 0.0),
            macro_node_id: NodeId::INVALID,
            macro_link_id: LinkId::INVALID,
            macro_zone_id: NodeId::INVALID,
            activity_link_type: LinkType::default(),
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

/// Edge of the mesoscopic graph: either one lane-constant segment of a
/// macroscopic link, or a movement connector materializing one maneuver.
#[derive(Clone, Debug, PartialEq)]
pub struct MesoLink {
    pub id: LinkId,
    pub geom: LineString<f64>,
    pub geom_euclidean: LineString<f64>,
    pub lanes_num: i32,
    /// `[left_add, right_add]` of this segment relative to the parent link's
    /// base lane count.
    pub lanes_change: [i32; 2],
    pub length_meters: f64,
    pub source_node: NodeId,
    pub target_node: NodeId,
    /// Parent macroscopic node — valid only for connectors.
    pub macro_node_id: NodeId,
    /// Parent macroscopic link — valid only for segments.
    pub macro_link_id: LinkId,
    /// Position of this segment within the parent macroscopic link.
    pub segment_idx: usize,
    pub is_connection: bool,

    // Movement payload, set only on connectors.
    pub movement_id: MovementId,
    pub movement_composite_type: MovementCompositeType,
    pub movement_income_link: LinkId,
    pub movement_outcome_link: LinkId,
    pub movement_income_lane_start_seq: i32,
    pub movement_outcome_lane_start_seq: i32,

    // Inherited attributes: from the parent macroscopic link for segments,
    // from the upstream mesoscopic link for connectors.
    pub control_type: ControlType,
    pub link_type: LinkType,
    pub free_speed: f64,
    pub capacity: i32,
    pub allowed_agent_types: Vec<AgentType>,
}

impl MesoLink {
    pub fn new(id: LinkId, source_node: NodeId, target_node: NodeId) -> Self {
        Self {
            id,
            geom: LineString::new(Vec::new()),
            geom_euclidean: LineString::new(Vec::new()),
            lanes_num: -1,
            lanes_change: [0, 0],
            length_meters: -1.0,
            source_node,
            target_node,
            macro_node_id: NodeId::INVALID,
            macro_link_id: LinkId::INVALID,
            segment_idx: 0,
            is_connection: false,
            movement_id: MovementId::INVALID,
            movement_composite_type: MovementCompositeType::default(),
            movement_income_link: LinkId::INVALID,
            movement_outcome_link: LinkId::INVALID,
            movement_income_lane_start_seq: -1,
            movement_outcome_lane_start_seq: -1,
            control_type: ControlType::default(),
            link_type: LinkType::default(),
            free_speed: 0.0,
            capacity: 0,
            allowed_agent_types: Vec::new(),
        }
    }
}

/// The mesoscopic road network.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MesoNet {
    pub nodes: BTreeMap<NodeId, MesoNode>,
    pub links: BTreeMap<LinkId, MesoLink>,
}

impl MesoNet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute every node's incoming/outcoming link lists from the links.
    ///
    /// The pass-through collapse redirects link endpoints without touching
    /// the adjacency lists of the surviving nodes; a single rebuild after all
    /// merges leaves the indices consistent.  Links are visited in ascending
    /// ID order, so segment links (allocated first) precede connectors in
    /// each list.
    pub fn rebuild_adjacency(&mut self) {
        for node in self.nodes.values_mut() {
            node.incoming_links.clear();
            node.outcoming_links.clear();
        }
        let endpoints: Vec<(LinkId, NodeId, NodeId)> = self
            .links
            .values()
            .map(|link| (link.id, link.source_node, link.target_node))
            .collect();
        for (link_id, source, target) in endpoints {
            if let Some(node) = self.nodes.get_mut(&source) {
                node.add_outcoming_link(link_id);
            }
            if let Some(node) = self.nodes.get_mut(&target) {
                node.add_incoming_link(link_id);
            }
        }
    }
}
