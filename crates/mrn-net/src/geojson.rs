//! GeoJSON visualization surface.
//!
//! Read-only projection of the network stores: every node becomes a Point
//! feature, every link a LineString feature, with GMNS-style property keys.
//! Sentinel IDs are emitted verbatim as `-1`.  Features are appended in
//! ascending-ID order, nodes before links, so serialized output is stable
//! across runs.

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use mrn_core::AgentType;

use crate::macroscopic::{MacroLink, MacroNet, MacroNode};
use crate::mesoscopic::{MesoLink, MesoNet, MesoNode};
use crate::microscopic::{MicroLink, MicroNet, MicroNode};
use crate::movement::{Movement, Movements};

fn feature(id: i64, geometry: Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geometry)),
        id: Some(Id::Number(id.into())),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn agents_property(agents: &[AgentType]) -> JsonValue {
    let joined = agents
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    JsonValue::from(joined)
}

// ── Macroscopic ───────────────────────────────────────────────────────────────

impl MacroNode {
    /// GeoJSON Point feature for this node.
    pub fn geo_feature(&self) -> Feature {
        let mut props = JsonObject::new();
        props.insert("id".into(), JsonValue::from(self.id.0));
        props.insert("control_type".into(), JsonValue::from(self.control_type.to_string()));
        props.insert("boundary_type".into(), JsonValue::from(self.boundary_type.to_string()));
        props.insert(
            "activity_link_type".into(),
            JsonValue::from(self.activity_link_type.to_string()),
        );
        props.insert("zone_id".into(), JsonValue::from(self.zone_id.0));
        props.insert("is_centroid".into(), JsonValue::from(self.is_centroid));
        feature(self.id.0, Value::from(&self.geom), props)
    }
}

impl MacroLink {
    /// GeoJSON LineString feature for this link.
    pub fn geo_feature(&self) -> Feature {
        let mut props = JsonObject::new();
        props.insert("id".into(), JsonValue::from(self.id.0));
        props.insert("source_node".into(), JsonValue::from(self.source_node.0));
        props.insert("target_node".into(), JsonValue::from(self.target_node.0));
        props.insert("link_type".into(), JsonValue::from(self.link_type.to_string()));
        props.insert("lanes".into(), JsonValue::from(self.lanes_num));
        props.insert("free_speed".into(), JsonValue::from(self.free_speed));
        props.insert("capacity".into(), JsonValue::from(self.capacity));
        props.insert("length_meters".into(), JsonValue::from(self.length_meters));
        props.insert(
            "allowed_agent_types".into(),
            agents_property(&self.allowed_agent_types),
        );
        feature(self.id.0, Value::from(&self.geom), props)
    }
}

impl MacroNet {
    /// FeatureCollection with every node and link of the macroscopic layer.
    pub fn geo_feature_collection(&self) -> FeatureCollection {
        let mut features = Vec::with_capacity(self.nodes.len() + self.links.len());
        features.extend(self.nodes.values().map(MacroNode::geo_feature));
        features.extend(self.links.values().map(MacroLink::geo_feature));
        collection(features)
    }
}

// ── Mesoscopic ────────────────────────────────────────────────────────────────

impl MesoNode {
    pub fn geo_feature(&self) -> Feature {
        let mut props = JsonObject::new();
        props.insert("id".into(), JsonValue::from(self.id.0));
        props.insert("macro_node_id".into(), JsonValue::from(self.macro_node_id.0));
        props.insert("macro_link_id".into(), JsonValue::from(self.macro_link_id.0));
        props.insert("zone_id".into(), JsonValue::from(self.macro_zone_id.0));
        props.insert(
            "activity_link_type".into(),
            JsonValue::from(self.activity_link_type.to_string()),
        );
        props.insert("boundary_type".into(), JsonValue::from(self.boundary_type.to_string()));
        feature(self.id.0, Value::from(&self.geom), props)
    }
}

impl MesoLink {
    pub fn geo_feature(&self) -> Feature {
        let mut props = JsonObject::new();
        props.insert("id".into(), JsonValue::from(self.id.0));
        props.insert("source_node".into(), JsonValue::from(self.source_node.0));
        props.insert("target_node".into(), JsonValue::from(self.target_node.0));
        props.insert("macro_link_id".into(), JsonValue::from(self.macro_link_id.0));
        props.insert("macro_node_id".into(), JsonValue::from(self.macro_node_id.0));
        props.insert("segment_idx".into(), JsonValue::from(self.segment_idx as i64));
        props.insert("is_connection".into(), JsonValue::from(self.is_connection));
        props.insert("movement_id".into(), JsonValue::from(self.movement_id.0));
        props.insert(
            "movement_composite_type".into(),
            JsonValue::from(self.movement_composite_type.to_string()),
        );
        props.insert("lanes".into(), JsonValue::from(self.lanes_num));
        props.insert("control_type".into(), JsonValue::from(self.control_type.to_string()));
        props.insert("link_type".into(), JsonValue::from(self.link_type.to_string()));
        props.insert("free_speed".into(), JsonValue::from(self.free_speed));
        props.insert("capacity".into(), JsonValue::from(self.capacity));
        props.insert("length_meters".into(), JsonValue::from(self.length_meters));
        props.insert(
            "allowed_agent_types".into(),
            agents_property(&self.allowed_agent_types),
        );
        feature(self.id.0, Value::from(&self.geom), props)
    }
}

impl MesoNet {
    pub fn geo_feature_collection(&self) -> FeatureCollection {
        let mut features = Vec::with_capacity(self.nodes.len() + self.links.len());
        features.extend(self.nodes.values().map(MesoNode::geo_feature));
        features.extend(self.links.values().map(MesoLink::geo_feature));
        collection(features)
    }
}

// ── Microscopic ───────────────────────────────────────────────────────────────

impl MicroNode {
    pub fn geo_feature(&self) -> Feature {
        let mut props = JsonObject::new();
        props.insert("id".into(), JsonValue::from(self.id.0));
        props.insert("meso_link_id".into(), JsonValue::from(self.meso_link_id.0));
        props.insert("lane_id".into(), JsonValue::from(self.lane_id));
        props.insert("cell_index".into(), JsonValue::from(self.cell_index));
        props.insert("is_upstream_end".into(), JsonValue::from(self.is_upstream_end));
        props.insert("is_downstream_end".into(), JsonValue::from(self.is_downstream_end));
        props.insert("zone_id".into(), JsonValue::from(self.zone_id.0));
        props.insert("boundary_type".into(), JsonValue::from(self.boundary_type.to_string()));
        feature(self.id.0, Value::from(&self.geom), props)
    }
}

impl MicroLink {
    pub fn geo_feature(&self) -> Feature {
        let mut props = JsonObject::new();
        props.insert("id".into(), JsonValue::from(self.id.0));
        props.insert("source_node".into(), JsonValue::from(self.source_node.0));
        props.insert("target_node".into(), JsonValue::from(self.target_node.0));
        props.insert("meso_link_id".into(), JsonValue::from(self.meso_link_id.0));
        props.insert("macro_link_id".into(), JsonValue::from(self.macro_link_id.0));
        props.insert("macro_node_id".into(), JsonValue::from(self.macro_node_id.0));
        props.insert("cell_type".into(), JsonValue::from(self.cell_type.to_string()));
        props.insert("lane_id".into(), JsonValue::from(self.lane_id));
        props.insert(
            "is_first_movement_cell".into(),
            JsonValue::from(self.is_first_movement_cell),
        );
        props.insert(
            "movement_composite_type".into(),
            JsonValue::from(self.movement_composite_type.to_string()),
        );
        props.insert("meso_link_type".into(), JsonValue::from(self.meso_link_type.to_string()));
        props.insert("control_type".into(), JsonValue::from(self.control_type.to_string()));
        props.insert("free_speed".into(), JsonValue::from(self.free_speed));
        props.insert("capacity".into(), JsonValue::from(self.capacity));
        props.insert("length_meters".into(), JsonValue::from(self.length_meters));
        props.insert(
            "allowed_agent_types".into(),
            agents_property(&self.allowed_agent_types),
        );
        feature(self.id.0, Value::from(&self.geom), props)
    }
}

impl MicroNet {
    pub fn geo_feature_collection(&self) -> FeatureCollection {
        let mut features = Vec::with_capacity(self.nodes.len() + self.links.len());
        features.extend(self.nodes.values().map(MicroNode::geo_feature));
        features.extend(self.links.values().map(MicroLink::geo_feature));
        collection(features)
    }
}

// ── Movements ─────────────────────────────────────────────────────────────────

impl Movement {
    pub fn geo_feature(&self) -> Feature {
        let mut props = JsonObject::new();
        props.insert("id".into(), JsonValue::from(self.id.0));
        props.insert("macro_node_id".into(), JsonValue::from(self.macro_node_id.0));
        props.insert(
            "income_macro_link_id".into(),
            JsonValue::from(self.income_macro_link_id.0),
        );
        props.insert(
            "outcome_macro_link_id".into(),
            JsonValue::from(self.outcome_macro_link_id.0),
        );
        props.insert("movement_type".into(), JsonValue::from(self.movement_type.to_string()));
        props.insert(
            "movement_composite_type".into(),
            JsonValue::from(self.composite_type.to_string()),
        );
        props.insert("lanes".into(), JsonValue::from(self.lanes_num));
        props.insert("income_lane_start".into(), JsonValue::from(self.income_lane_start));
        props.insert("income_lane_end".into(), JsonValue::from(self.income_lane_end));
        props.insert("outcome_lane_start".into(), JsonValue::from(self.outcome_lane_start));
        props.insert("outcome_lane_end".into(), JsonValue::from(self.outcome_lane_end));
        props.insert("control_type".into(), JsonValue::from(self.control_type.to_string()));
        feature(self.id.0, Value::from(&self.geom), props)
    }
}

/// FeatureCollection with one LineString feature per movement.
pub fn movements_feature_collection(movements: &Movements) -> FeatureCollection {
    collection(movements.values().map(Movement::geo_feature).collect())
}
