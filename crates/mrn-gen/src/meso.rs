//! Mesoscopic builder: offset opposite directions apart, cut every link into
//! lane-constant segments, connect segments through movement connectors, and
//! collapse pass-through nodes.

use std::collections::BTreeMap;
use std::time::Instant;

use geo_types::{LineString, Point};
use log::{debug, info};
use rayon::prelude::*;

use mrn_core::{BoundaryType, ControlType, LinkId, MovementId, NodeId};
use mrn_geom::{
    geometry_hash, length_haversine, line_to_euclidean, line_to_spherical, offset_curve,
    substring_haversine,
};
use mrn_net::{LanesInfo, MacroNet, MesoLink, MesoNet, MesoNode, Movements, LANE_WIDTH};

use crate::error::{GenError, GenResult};
use crate::flags::{compute_movement_flags, MovementFlags};

/// Cut applied at a link end that merges straight into its neighbor.
const SHORTCUT_LENGTH: f64 = 0.1;
/// Shortest gridable middle portion a cut may leave behind.
const MIN_CUT_LENGTH: f64 = 2.0;
const TOTAL_CUT_LENGTH: f64 = 2.0 * SHORTCUT_LENGTH * MIN_CUT_LENGTH;

/// End-cap length reserved for movement connectors, by lane count.
fn cut_length(lanes: i32) -> f64 {
    match lanes {
        0 => 2.0,
        1 => 8.0,
        2 => 12.0,
        3 => 14.0,
        4 => 16.0,
        5 => 18.0,
        6 => 20.0,
        7 => 22.0,
        8 => 24.0,
        _ => 25.0,
    }
}

/// Working state of one macroscopic link while it is offset and cut.
struct LinkShape {
    id: LinkId,
    source_node: NodeId,
    target_node: NodeId,

    offset_geom: LineString<f64>,
    /// Length of the offset geometry, rounded to centimeters.
    length_offset: f64,
    /// Lane layout with change points rescaled to the offset length.
    lanes_info: LanesInfo,

    upstream_shortcut: bool,
    downstream_shortcut: bool,
    upstream_is_target: bool,
    downstream_is_target: bool,

    upstream_cut: f64,
    downstream_cut: f64,

    /// Per-segment geometry after the cut, both frames.
    geom_cut: Vec<LineString<f64>>,
    geom_euclidean_cut: Vec<LineString<f64>>,
}

/// Compile the mesoscopic network from a macroscopic net and its movements.
pub fn generate_mesoscopic(macro_net: &MacroNet, movements: &Movements) -> GenResult<MesoNet> {
    info!(target: "gen_meso", "preparing mesoscopic network");
    macro_net.validate()?;

    let mut started = Instant::now();
    let mut shapes = prepare_offset_shapes(macro_net);
    debug!(
        target: "gen_meso",
        "geometry offsets done in {:.3}s",
        started.elapsed().as_secs_f64()
    );

    started = Instant::now();
    let movements_by_node = aggregate_movements(macro_net, movements)?;
    let flags = compute_movement_flags(macro_net, movements)?;
    for shape in shapes.values_mut() {
        shape.upstream_shortcut = flags.has_upstream_shortcut(shape.id);
        shape.downstream_shortcut = flags.has_downstream_shortcut(shape.id);
        shape.upstream_is_target = flags.is_upstream_target(shape.id);
        shape.downstream_is_target = flags.is_downstream_target(shape.id);
    }
    debug!(
        target: "gen_meso",
        "movement flags done in {:.3}s",
        started.elapsed().as_secs_f64()
    );

    started = Instant::now();
    for shape in shapes.values_mut() {
        update_cut_length(shape);
        perform_cut(shape);
    }
    debug!(
        target: "gen_meso",
        "cuts done in {:.3}s",
        started.elapsed().as_secs_f64()
    );

    started = Instant::now();
    let mut meso_net = generate_base_nodes_links(macro_net, &shapes)?;
    connect_meso_links(
        &mut meso_net,
        macro_net,
        &shapes,
        &movements_by_node,
        movements,
        &flags,
    )?;
    // Connector creation and pass-through merges leave node adjacency stale;
    // one rebuild settles it before anything reads the lists.
    meso_net.rebuild_adjacency();
    update_boundary_types(&mut meso_net, macro_net)?;
    update_link_properties(&mut meso_net, macro_net, movements)?;
    info!(
        target: "gen_meso",
        "mesoscopic network ready: {} nodes, {} links ({:.3}s)",
        meso_net.nodes.len(),
        meso_net.links.len(),
        started.elapsed().as_secs_f64()
    );

    Ok(meso_net)
}

/// Detect reverse twins and offset them apart; rescale lane-change points to
/// the offset lengths.
fn prepare_offset_shapes(macro_net: &MacroNet) -> BTreeMap<LinkId, LinkShape> {
    let links: Vec<&mrn_net::MacroLink> = macro_net.links.values().collect();
    let hashes: Vec<String> = links
        .iter()
        .map(|link| geometry_hash(&link.geom_euclidean))
        .collect();

    // Parallel reverse-twin scan.  Each worker only reads the shared link
    // slice and reports twin index pairs; membership is merged afterwards on
    // one thread, so the outcome cannot depend on scheduling.  A twin is an
    // opposite-direction link whose planar polyline is the exact reverse.
    let twins: Vec<(usize, usize)> = (0..links.len())
        .into_par_iter()
        .filter_map(|i| {
            let mut reversed = links[i].geom_euclidean.clone();
            reversed.0.reverse();
            let reversed_hash = geometry_hash(&reversed);
            // Compare only against subsequent links; the pair is recorded once.
            for j in (i + 1)..links.len() {
                if links[j].geom_euclidean.0.len() != reversed.0.len() {
                    continue;
                }
                if hashes[j] == reversed_hash {
                    return Some((i, j));
                }
            }
            None
        })
        .collect();

    let mut needs_offset = vec![false; links.len()];
    for (i, j) in twins {
        needs_offset[i] = true;
        needs_offset[j] = true;
    }

    let mut shapes = BTreeMap::new();
    for (idx, link) in links.iter().enumerate() {
        let offset_geom = if needs_offset[idx] {
            let distance = 2.0 * (link.max_lanes() as f64 / 2.0 + 0.5) * LANE_WIDTH;
            line_to_spherical(&offset_curve(&link.geom_euclidean, -distance))
        } else {
            link.geom.clone()
        };

        let length_offset = (length_haversine(&offset_geom) * 100.0).round() / 100.0;
        let mut lanes_info = link.lanes_info.clone();
        for point in lanes_info.lanes_change_points.iter_mut() {
            *point = (*point / link.length_meters) * length_offset;
        }

        shapes.insert(
            link.id,
            LinkShape {
                id: link.id,
                source_node: link.source_node,
                target_node: link.target_node,
                offset_geom,
                length_offset,
                lanes_info,
                upstream_shortcut: false,
                downstream_shortcut: false,
                upstream_is_target: false,
                downstream_is_target: false,
                upstream_cut: 0.0,
                downstream_cut: 0.0,
                geom_cut: Vec::new(),
                geom_euclidean_cut: Vec::new(),
            },
        );
    }
    shapes
}

/// Group movement IDs under their macroscopic node, ascending.
fn aggregate_movements(
    macro_net: &MacroNet,
    movements: &Movements,
) -> GenResult<BTreeMap<NodeId, Vec<MovementId>>> {
    let mut by_node: BTreeMap<NodeId, Vec<MovementId>> = BTreeMap::new();
    for mvmt in movements.values() {
        if !macro_net.nodes.contains_key(&mvmt.macro_node_id) {
            return Err(GenError::node_not_found(
                mvmt.macro_node_id,
                format!("aggregating movements, movement {}", mvmt.id),
            ));
        }
        by_node.entry(mvmt.macro_node_id).or_default().push(mvmt.id);
    }
    Ok(by_node)
}

/// Solve the upstream/downstream cut lengths for one link.
fn update_cut_length(shape: &mut LinkShape) {
    let points = &shape.lanes_info.lanes_change_points;
    // Keep the caps clear of the first and last lane-change boundaries.
    let upstream_max = SHORTCUT_LENGTH.max(points[1] - points[0] - 3.0);
    let downstream_max =
        SHORTCUT_LENGTH.max(points[points.len() - 1] - points[points.len() - 2] - 3.0);
    let last_lane = shape.lanes_info.lanes_list.last().copied().unwrap_or(0);
    let length = shape.length_offset;

    if shape.upstream_shortcut && shape.downstream_shortcut {
        if length > TOTAL_CUT_LENGTH {
            shape.upstream_cut = SHORTCUT_LENGTH;
            shape.downstream_cut = SHORTCUT_LENGTH;
        } else {
            shape.upstream_cut = length / TOTAL_CUT_LENGTH * SHORTCUT_LENGTH;
            shape.downstream_cut = shape.upstream_cut;
        }
    } else if shape.upstream_shortcut {
        let found = (0..=last_lane)
            .rev()
            .find(|&i| length > downstream_max.min(cut_length(i)) + SHORTCUT_LENGTH + MIN_CUT_LENGTH);
        match found {
            Some(i) => {
                shape.upstream_cut = SHORTCUT_LENGTH;
                shape.downstream_cut = downstream_max.min(cut_length(i));
            }
            None => {
                let downstream = downstream_max.min(cut_length(0));
                let total = downstream + SHORTCUT_LENGTH + MIN_CUT_LENGTH;
                shape.upstream_cut = length / total * SHORTCUT_LENGTH;
                shape.downstream_cut = length / total * downstream;
            }
        }
    } else if shape.downstream_shortcut {
        let found = (0..=last_lane)
            .rev()
            .find(|&i| length > upstream_max.min(cut_length(i)) + SHORTCUT_LENGTH + MIN_CUT_LENGTH);
        match found {
            Some(i) => {
                shape.upstream_cut = upstream_max.min(cut_length(i));
                shape.downstream_cut = SHORTCUT_LENGTH;
            }
            None => {
                let upstream = upstream_max.min(cut_length(0));
                let total = upstream + SHORTCUT_LENGTH + MIN_CUT_LENGTH;
                shape.upstream_cut = length / total * upstream;
                shape.downstream_cut = length / total * SHORTCUT_LENGTH;
            }
        }
    } else {
        let found = (0..=last_lane).rev().find(|&i| {
            length
                > upstream_max.min(cut_length(i))
                    + downstream_max.min(cut_length(i))
                    + MIN_CUT_LENGTH
        });
        match found {
            Some(i) => {
                shape.upstream_cut = upstream_max.min(cut_length(i));
                shape.downstream_cut = downstream_max.min(cut_length(i));
            }
            None => {
                let upstream = upstream_max.min(cut_length(0));
                let downstream = downstream_max.min(cut_length(0));
                let total = upstream + downstream + MIN_CUT_LENGTH;
                shape.upstream_cut = length / total * upstream;
                shape.downstream_cut = length / total * downstream;
            }
        }
    }
}

/// Slice the offset geometry into per-segment polylines.
fn perform_cut(shape: &mut LinkShape) {
    // Interior change points are kept verbatim even when they fall inside a
    // cap; only the terminal points move inward.
    let mut points = shape.lanes_info.lanes_change_points.clone();
    let last = points.len() - 1;
    points[0] = shape.upstream_cut;
    points[last] = shape.length_offset - shape.downstream_cut;

    for i in 0..shape.lanes_info.lanes_list.len() {
        let cut = substring_haversine(&shape.offset_geom, points[i], points[i + 1]);
        shape.geom_euclidean_cut.push(line_to_euclidean(&cut));
        shape.geom_cut.push(cut);
    }
}

/// ID for the next mesoscopic node descending from `macro_node`.
fn allocate_meso_node_id(expanded: &mut BTreeMap<NodeId, i64>, macro_node: NodeId) -> NodeId {
    let counter = expanded.entry(macro_node).or_insert(0);
    let ordinal = *counter;
    *counter += 1;
    debug_assert!(
        ordinal < 100,
        "macro node {macro_node} expanded past 100 mesoscopic nodes"
    );
    NodeId(macro_node.0 * 100 + ordinal)
}

/// Emit the segment nodes and links for every cut macroscopic link.
fn generate_base_nodes_links(
    macro_net: &MacroNet,
    shapes: &BTreeMap<LinkId, LinkShape>,
) -> GenResult<MesoNet> {
    let mut net = MesoNet::new();
    let mut expanded: BTreeMap<NodeId, i64> = BTreeMap::new();
    let mut next_link_id: i64 = 0;

    for shape in shapes.values() {
        let source_macro = macro_net.nodes.get(&shape.source_node).ok_or_else(|| {
            GenError::node_not_found(
                shape.source_node,
                format!("source of macroscopic link {}", shape.id),
            )
        })?;
        let target_macro = macro_net.nodes.get(&shape.target_node).ok_or_else(|| {
            GenError::node_not_found(
                shape.target_node,
                format!("target of macroscopic link {}", shape.id),
            )
        })?;
        if source_macro.is_centroid {
            return Err(GenError::NotImplemented(
                "mesoscopic expansion of centroid nodes",
            ));
        }

        let upstream_node_id = allocate_meso_node_id(&mut expanded, shape.source_node);
        let mut upstream = MesoNode::new(upstream_node_id);
        upstream.geom = Point::from(shape.geom_cut[0].0[0]);
        upstream.geom_euclidean = Point::from(shape.geom_euclidean_cut[0].0[0]);
        upstream.macro_node_id = shape.source_node;
        upstream.macro_zone_id = source_macro.zone_id;
        upstream.activity_link_type = source_macro.activity_link_type;
        net.nodes.insert(upstream_node_id, upstream);

        let segments = shape.lanes_info.lanes_list.len();
        let mut upstream_id = upstream_node_id;
        for segment_idx in 0..segments {
            if target_macro.is_centroid && segment_idx == segments - 1 {
                return Err(GenError::NotImplemented(
                    "mesoscopic expansion of centroid nodes",
                ));
            }

            let geom = &shape.geom_cut[segment_idx];
            let geom_euclidean = &shape.geom_euclidean_cut[segment_idx];

            let downstream_id = allocate_meso_node_id(&mut expanded, shape.target_node);
            let mut downstream = MesoNode::new(downstream_id);
            downstream.geom = Point::from(*geom.0.last().unwrap_or(&geom.0[0]));
            downstream.geom_euclidean =
                Point::from(*geom_euclidean.0.last().unwrap_or(&geom_euclidean.0[0]));
            if segment_idx == segments - 1 {
                downstream.macro_node_id = shape.target_node;
                downstream.macro_zone_id = target_macro.zone_id;
                downstream.activity_link_type = target_macro.activity_link_type;
            } else {
                downstream.macro_link_id = shape.id;
            }
            net.nodes.insert(downstream_id, downstream);

            let link_id = LinkId(next_link_id);
            next_link_id += 1;
            let mut link = MesoLink::new(link_id, upstream_id, downstream_id);
            link.lanes_num = shape.lanes_info.lanes_list[segment_idx];
            link.lanes_change = shape.lanes_info.lanes_change[segment_idx];
            link.geom = geom.clone();
            link.geom_euclidean = geom_euclidean.clone();
            link.macro_link_id = shape.id;
            link.segment_idx = segment_idx;
            link.length_meters = length_haversine(geom);
            if let Some(node) = net.nodes.get_mut(&upstream_id) {
                node.add_outcoming_link(link_id);
            }
            if let Some(node) = net.nodes.get_mut(&downstream_id) {
                node.add_incoming_link(link_id);
            }
            net.links.insert(link_id, link);

            // The current downstream node opens the next segment.
            upstream_id = downstream_id;
        }
    }

    Ok(net)
}

/// Materialize movements as connector links, or merge segments straight
/// through pass-through nodes.
fn connect_meso_links(
    net: &mut MesoNet,
    macro_net: &MacroNet,
    shapes: &BTreeMap<LinkId, LinkShape>,
    movements_by_node: &BTreeMap<NodeId, Vec<MovementId>>,
    movements: &Movements,
    flags: &MovementFlags,
) -> GenResult<()> {
    let mut next_link_id = net.links.keys().next_back().map_or(0, |id| id.0 + 1);

    // Mesoscopic segment chains under their parent macroscopic link.
    let mut by_macro_link: BTreeMap<LinkId, Vec<LinkId>> = BTreeMap::new();
    for link in net.links.values() {
        if link.macro_link_id.is_valid() {
            by_macro_link
                .entry(link.macro_link_id)
                .or_default()
                .push(link.id);
        }
    }
    for chain in by_macro_link.values_mut() {
        chain.sort_by_key(|id| net.links[id].segment_idx);
    }

    for (&macro_node_id, node_movements) in movements_by_node {
        for &movement_id in node_movements {
            let mvmt = movements.get(&movement_id).ok_or_else(|| {
                GenError::movement_not_found(movement_id, "connecting mesoscopic links")
            })?;
            let income_macro = mvmt.income_macro_link_id;
            let outcome_macro = mvmt.outcome_macro_link_id;
            if !macro_net.links.contains_key(&income_macro) {
                return Err(GenError::link_not_found(
                    income_macro,
                    format!("movement {movement_id} incoming macroscopic link"),
                ));
            }
            if !macro_net.links.contains_key(&outcome_macro) {
                return Err(GenError::link_not_found(
                    outcome_macro,
                    format!("movement {movement_id} outgoing macroscopic link"),
                ));
            }
            let income_shape = shapes.get(&income_macro).ok_or_else(|| {
                GenError::link_not_found(
                    income_macro,
                    format!("movement {movement_id} incoming link shape"),
                )
            })?;
            let outcome_shape = shapes.get(&outcome_macro).ok_or_else(|| {
                GenError::link_not_found(
                    outcome_macro,
                    format!("movement {movement_id} outgoing link shape"),
                )
            })?;

            let incoming_chain = by_macro_link
                .get(&income_macro)
                .filter(|chain| !chain.is_empty())
                .ok_or_else(|| {
                    GenError::link_not_found(
                        income_macro,
                        "no mesoscopic links generated for incoming macroscopic link",
                    )
                })?;
            let outcoming_chain = by_macro_link
                .get(&outcome_macro)
                .filter(|chain| !chain.is_empty())
                .ok_or_else(|| {
                    GenError::link_not_found(
                        outcome_macro,
                        "no mesoscopic links generated for outgoing macroscopic link",
                    )
                })?;

            let incoming_meso_id = *incoming_chain.last().unwrap();
            let outcoming_meso_id = outcoming_chain[0];

            let (incoming_target, incoming_geom, incoming_geom_euclidean) = {
                let link = &net.links[&incoming_meso_id];
                (link.target_node, link.geom.clone(), link.geom_euclidean.clone())
            };
            let (outcoming_source, outcoming_geom, outcoming_geom_euclidean) = {
                let link = &net.links[&outcoming_meso_id];
                (link.source_node, link.geom.clone(), link.geom_euclidean.clone())
            };

            if flags.needs_movement(macro_node_id) {
                let geom = LineString::new(vec![
                    *incoming_geom.0.last().unwrap(),
                    outcoming_geom.0[0],
                ]);
                let geom_euclidean = LineString::new(vec![
                    *incoming_geom_euclidean.0.last().unwrap(),
                    outcoming_geom_euclidean.0[0],
                ]);

                let link_id = LinkId(next_link_id);
                next_link_id += 1;
                let mut connector = MesoLink::new(link_id, incoming_target, outcoming_source);
                connector.lanes_num = mvmt.lanes_num;
                connector.length_meters = length_haversine(&geom);
                connector.geom = geom;
                connector.geom_euclidean = geom_euclidean;
                connector.is_connection = true;
                connector.macro_node_id = macro_node_id;
                connector.movement_id = movement_id;
                connector.movement_composite_type = mvmt.composite_type;
                connector.movement_income_link = incoming_meso_id;
                connector.movement_outcome_link = outcoming_meso_id;
                connector.movement_income_lane_start_seq = mvmt.income_lane_start_seq;
                connector.movement_outcome_lane_start_seq = mvmt.outcome_lane_start_seq;
                net.links.insert(link_id, connector);
            } else if income_shape.downstream_is_target && !outcome_shape.upstream_is_target {
                // Pull the outgoing segment's head onto the incoming tail node.
                let mut geom = vec![*incoming_geom.0.last().unwrap()];
                geom.extend_from_slice(&outcoming_geom.0[1..]);
                let mut geom_euclidean = vec![*incoming_geom_euclidean.0.last().unwrap()];
                geom_euclidean.extend_from_slice(&outcoming_geom_euclidean.0[1..]);

                if let Some(outgoing) = net.links.get_mut(&outcoming_meso_id) {
                    outgoing.source_node = incoming_target;
                    outgoing.geom = LineString::new(geom);
                    outgoing.geom_euclidean = LineString::new(geom_euclidean);
                }
                net.nodes.remove(&outcoming_source);
            } else if !income_shape.downstream_is_target && outcome_shape.upstream_is_target {
                // Push the incoming segment's tail onto the outgoing head node.
                let mut geom = incoming_geom.0[..incoming_geom.0.len() - 1].to_vec();
                geom.push(outcoming_geom.0[0]);
                let mut geom_euclidean =
                    incoming_geom_euclidean.0[..incoming_geom_euclidean.0.len() - 1].to_vec();
                geom_euclidean.push(outcoming_geom_euclidean.0[0]);

                if let Some(incoming) = net.links.get_mut(&incoming_meso_id) {
                    incoming.target_node = outcoming_source;
                    incoming.geom = LineString::new(geom);
                    incoming.geom_euclidean = LineString::new(geom_euclidean);
                }
                net.nodes.remove(&incoming_target);
            }
        }
    }

    Ok(())
}

/// Resolve every mesoscopic node's boundary type from its parent.
fn update_boundary_types(net: &mut MesoNet, macro_net: &MacroNet) -> GenResult<()> {
    for node in net.nodes.values_mut() {
        if !node.macro_node_id.is_valid() && !node.macro_link_id.is_valid() {
            return Err(GenError::BadParentInfo(format!(
                "neither macroscopic link nor node for mesoscopic node {}",
                node.id
            )));
        }
        if !node.macro_node_id.is_valid() {
            node.boundary_type = BoundaryType::None;
            continue;
        }
        let macro_node = macro_net.nodes.get(&node.macro_node_id).ok_or_else(|| {
            GenError::node_not_found(
                node.macro_node_id,
                format!("resolving boundary type of mesoscopic node {}", node.id),
            )
        })?;
        node.boundary_type = match macro_node.boundary_type {
            // A bidirectional boundary resolves per expanded node: whichever
            // side the traffic actually crosses here.
            BoundaryType::IncomeOutcome => {
                if node.incoming_links.is_empty() {
                    BoundaryType::OutcomeOnly
                } else {
                    BoundaryType::IncomeOnly
                }
            }
            other => other,
        };
    }
    Ok(())
}

/// Propagate inherited attributes onto every mesoscopic link.
fn update_link_properties(
    net: &mut MesoNet,
    macro_net: &MacroNet,
    movements: &Movements,
) -> GenResult<()> {
    let mut connector_ids: Vec<LinkId> = Vec::new();

    for link in net.links.values_mut() {
        if !link.macro_node_id.is_valid() && !link.macro_link_id.is_valid() {
            return Err(GenError::BadParentInfo(format!(
                "neither macroscopic link nor node for mesoscopic link {}",
                link.id
            )));
        }

        if !link.macro_node_id.is_valid() {
            // Segment: inherit from the parent macroscopic link.
            let macro_link = macro_net.links.get(&link.macro_link_id).ok_or_else(|| {
                GenError::link_not_found(
                    link.macro_link_id,
                    format!("inheriting attributes of mesoscopic link {}", link.id),
                )
            })?;
            link.link_type = macro_link.link_type;
            link.free_speed = macro_link.free_speed;
            link.capacity = macro_link.capacity;
            link.allowed_agent_types = macro_link.allowed_agent_types.clone();
            link.control_type = ControlType::NotSignal;
            continue;
        }

        // Connector: control comes from the intersection node, the composite
        // tag from the movement; road attributes follow in a second pass.
        connector_ids.push(link.id);
        let macro_node = macro_net.nodes.get(&link.macro_node_id).ok_or_else(|| {
            GenError::node_not_found(
                link.macro_node_id,
                format!("inheriting control type of mesoscopic link {}", link.id),
            )
        })?;
        link.control_type = macro_node.control_type;

        if !link.movement_id.is_valid() {
            return Err(GenError::BadParentInfo(format!(
                "connector mesoscopic link {} has no movement",
                link.id
            )));
        }
        let mvmt = movements.get(&link.movement_id).ok_or_else(|| {
            GenError::movement_not_found(
                link.movement_id,
                format!("inheriting movement tag of mesoscopic link {}", link.id),
            )
        })?;
        link.movement_composite_type = mvmt.composite_type;
    }

    // Connectors inherit road attributes from the upstream segment: the first
    // incoming link of their source node.
    for connector_id in connector_ids {
        let source_node_id = net.links[&connector_id].source_node;
        let Some(source_node) = net.nodes.get(&source_node_id) else {
            continue;
        };
        let Some(&upstream_id) = source_node.incoming_links.first() else {
            continue;
        };
        let (link_type, free_speed, capacity, agents) = {
            let upstream = net.links.get(&upstream_id).ok_or_else(|| {
                GenError::link_not_found(
                    upstream_id,
                    format!("upstream of connector mesoscopic link {connector_id}"),
                )
            })?;
            (
                upstream.link_type,
                upstream.free_speed,
                upstream.capacity,
                upstream.allowed_agent_types.clone(),
            )
        };
        if let Some(connector) = net.links.get_mut(&connector_id) {
            connector.link_type = link_type;
            connector.free_speed = free_speed;
            connector.capacity = capacity;
            connector.allowed_agent_types = agents;
        }
    }

    Ok(())
}
