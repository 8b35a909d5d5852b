//! Macroscopic network — the compiler's input layer.

use std::collections::BTreeMap;

use geo_types::{LineString, Point};
use mrn_core::{AgentType, BoundaryType, ControlType, LinkId, LinkType, NodeId};

use crate::error::{NetError, NetResult};
use crate::lanes::{lane_indices, LanesInfo};

/// Width of one vehicle lane in meters; drives both the opposite-direction
/// offset and the per-lane offsets of the micro layer.
pub const LANE_WIDTH: f64 = 3.5;

/// Vertex of the macroscopic graph.
#[derive(Clone, Debug, PartialEq)]
pub struct MacroNode {
    pub id: NodeId,
    /// Position, spherical frame `(lon, lat)`.
    pub geom: Point<f64>,
    /// Position, euclidean (Mercator) frame.
    pub geom_euclidean: Point<f64>,
    pub control_type: ControlType,
    pub boundary_type: BoundaryType,
    /// Functional class of the dominant incident link.
    pub activity_link_type: LinkType,
    pub zone_id: NodeId,
    pub is_centroid: bool,
    /// Incident link IDs in insertion order; downstream passes rely on
    /// "first incoming link" semantics, so these stay ordered vectors.
    pub incoming_links: Vec<LinkId>,
    pub outcoming_links: Vec<LinkId>,
}

impl MacroNode {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            geom: Point::new(0.0, 0.0),
            geom_euclidean: Point::new(0.0, 0.0),
            control_type: ControlType::default(),
            boundary_type: BoundaryType::default(),
            activity_link_type: LinkType::default(),
            zone_id: NodeId::INVALID,
            is_centroid: false,
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

/// Directed edge of the macroscopic graph: one polyline per travel direction.
#[derive(Clone, Debug, PartialEq)]
pub struct MacroLink {
    pub id: LinkId,
    /// Polyline, spherical frame `(lon, lat)`.
    pub geom: LineString<f64>,
    /// Polyline, euclidean (Mercator) frame.
    pub geom_euclidean: LineString<f64>,
    pub source_node: NodeId,
    pub target_node: NodeId,
    /// Great-circle length of `geom`, meters.
    pub length_meters: f64,
    /// Base lane count; per-segment counts live in `lanes_info`.
    pub lanes_num: i32,
    pub lanes_info: LanesInfo,
    pub free_speed: f64,
    pub capacity: i32,
    pub link_type: LinkType,
    pub allowed_agent_types: Vec<AgentType>,
}

impl MacroLink {
    pub fn new(id: LinkId, source_node: NodeId, target_node: NodeId) -> Self {
        Self {
            id,
            geom: LineString::new(Vec::new()),
            geom_euclidean: LineString::new(Vec::new()),
            source_node,
            target_node,
            length_meters: -1.0,
            lanes_num: -1,
            lanes_info: LanesInfo::default(),
            free_speed: -1.0,
            capacity: -1,
            link_type: LinkType::default(),
            allowed_agent_types: Vec::new(),
        }
    }

    /// Largest per-segment lane count, `-1` when no lane data is present.
    pub fn max_lanes(&self) -> i32 {
        self.lanes_info.lanes_list.iter().copied().max().unwrap_or(-1)
    }

    /// Lane count at the upstream end (first segment), `0` when absent.
    pub fn incoming_lanes(&self) -> i32 {
        self.lanes_info.lanes_list.first().copied().unwrap_or(0)
    }

    /// Lane count at the downstream end (last segment), `-1` when absent.
    pub fn outcoming_lanes(&self) -> i32 {
        self.lanes_info.lanes_list.last().copied().unwrap_or(-1)
    }

    /// Lane numbers of the downstream segment, indexed by sequence position.
    pub fn outcoming_lane_indices(&self) -> Vec<i32> {
        match self.lanes_info.lanes_change.last() {
            Some(change) => lane_indices(self.lanes_num, change[0], change[1]),
            None => Vec::new(),
        }
    }
}

/// The macroscopic road network: owning stores for nodes and links.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MacroNet {
    pub nodes: BTreeMap<NodeId, MacroNode>,
    pub links: BTreeMap<LinkId, MacroLink>,
}

impl MacroNet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: MacroNode) {
        self.nodes.insert(node.id, node);
    }

    /// Insert a link and register it on its endpoint nodes (when present).
    pub fn add_link(&mut self, link: MacroLink) {
        if let Some(node) = self.nodes.get_mut(&link.source_node) {
            node.add_outcoming_link(link.id);
        }
        if let Some(node) = self.nodes.get_mut(&link.target_node) {
            node.add_incoming_link(link.id);
        }
        self.links.insert(link.id, link);
    }

    /// Validate every link's lane layout against its length.
    ///
    /// The mesoscopic builder calls this before touching any geometry; a
    /// malformed `lanes_change_points` would otherwise surface as an index
    /// panic deep inside the cut solver.
    pub fn validate(&self) -> NetResult<()> {
        for link in self.links.values() {
            link.lanes_info
                .validate(link.length_meters)
                .map_err(|reason| NetError::InvalidLanesInfo { link: link.id, reason })?;
        }
        Ok(())
    }
}
