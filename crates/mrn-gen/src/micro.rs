//! Microscopic builder: grid every mesoscopic link into per-lane cell
//! strips, stitch adjacent segments and lanes together, expand movement
//! connectors into cell chains, and close the duplicate-cell gaps left at
//! pass-through nodes.

use std::collections::BTreeMap;
use std::time::Instant;

use geo_types::{LineString, Point};
use log::info;

use mrn_core::{AgentType, CellType, LinkId, NodeId};
use mrn_geom::{
    length_haversine, line_to_spherical, offset_curve, point_at_distance, point_to_euclidean,
    PLANAR_TOLERANCE,
};
use mrn_net::{MacroLink, MacroNet, MesoLink, MesoNet, MicroLink, MicroNet, MicroNode, Movements};

use crate::error::{GenError, GenResult};
use crate::flags::{compute_movement_flags, MovementFlags};

/// Reserved lane ID of the separated bike strip.
const BIKE_LANE_ID: i32 = -1;
/// Reserved lane ID of the separated walk strip.
const WALK_LANE_ID: i32 = -2;

/// Configuration of the cell grid.
#[derive(Copy, Clone, Debug)]
pub struct MicroGenOptions {
    /// Target cell spacing in meters (≈ one vehicle slot).
    pub cell_length: f64,
    /// Lateral spacing between adjacent vehicle lanes, meters.
    pub lane_width: f64,
    pub bike_lane_width: f64,
    pub walk_lane_width: f64,
    /// Grid bike/walk traffic on their own strips beside the vehicle lanes.
    pub separate_bike_walk: bool,
}

impl Default for MicroGenOptions {
    fn default() -> Self {
        Self {
            cell_length: 4.5,
            lane_width: 3.5,
            bike_lane_width: 0.5,
            walk_lane_width: 0.5,
            separate_bike_walk: false,
        }
    }
}

/// Micro node IDs of one mesoscopic link, per lane, ordered by cell index.
type LaneNodes = BTreeMap<i32, Vec<NodeId>>;
type MesoMicroMapping = BTreeMap<LinkId, LaneNodes>;

/// Compile the microscopic network from the meso net and the movement set.
pub fn generate_microscopic(
    macro_net: &MacroNet,
    meso_net: &MesoNet,
    movements: &Movements,
    options: MicroGenOptions,
) -> GenResult<MicroNet> {
    info!(target: "gen_micro", "generating microscopic network");
    let started = Instant::now();

    let mut net = MicroNet::new();
    let by_macro_link = build_macro_to_meso_mapping(meso_net);

    for macro_link in macro_net.links.values() {
        let Some(meso_ids) = by_macro_link.get(&macro_link.id) else {
            continue;
        };
        process_macro_link(macro_net, meso_net, &mut net, macro_link, meso_ids, options)?;
    }

    connect_micro_links(meso_net, &mut net, options)?;

    let flags = compute_movement_flags(macro_net, movements)?;
    fix_gaps(macro_net, meso_net, &mut net, &by_macro_link, &flags, movements)?;

    info!(
        target: "gen_micro",
        "microscopic network ready: {} nodes, {} links ({:.3}s)",
        net.nodes.len(),
        net.links.len(),
        started.elapsed().as_secs_f64()
    );
    Ok(net)
}

/// Mesoscopic segment chains under their parent macroscopic link, in segment
/// order (segment links get ascending IDs at creation).  Connectors are
/// excluded.
fn build_macro_to_meso_mapping(meso_net: &MesoNet) -> BTreeMap<LinkId, Vec<LinkId>> {
    let mut result: BTreeMap<LinkId, Vec<LinkId>> = BTreeMap::new();
    for link in meso_net.links.values() {
        if !link.macro_link_id.is_valid() {
            continue;
        }
        result.entry(link.macro_link_id).or_default().push(link.id);
    }
    result
}

/// Rebuild the meso-link → lane → cells index from the net's current nodes.
fn build_meso_micro_mapping(net: &MicroNet) -> MesoMicroMapping {
    let mut staging: BTreeMap<LinkId, BTreeMap<i32, Vec<(i32, NodeId)>>> = BTreeMap::new();
    for node in net.nodes.values() {
        if !node.meso_link_id.is_valid() {
            continue;
        }
        staging
            .entry(node.meso_link_id)
            .or_default()
            .entry(node.lane_id)
            .or_default()
            .push((node.cell_index, node.id));
    }

    let mut result = MesoMicroMapping::new();
    for (meso_link_id, lanes) in staging {
        let entry = result.entry(meso_link_id).or_default();
        for (lane_id, mut cells) in lanes {
            cells.sort_by_key(|&(cell_index, node_id)| (cell_index, node_id));
            entry.insert(lane_id, cells.into_iter().map(|(_, id)| id).collect());
        }
    }
    result
}

/// Grid one macroscopic link: cells for every segment, end tagging, boundary
/// merge, then edges.
fn process_macro_link(
    macro_net: &MacroNet,
    meso_net: &MesoNet,
    net: &mut MicroNet,
    macro_link: &MacroLink,
    meso_ids: &[LinkId],
    options: MicroGenOptions,
) -> GenResult<()> {
    if meso_ids.is_empty() {
        return Ok(());
    }

    let (main_agents, has_bike, has_walk) =
        prepare_bike_walk_agents(&macro_link.allowed_agent_types, options.separate_bike_walk);
    let original_lanes = macro_link.lanes_num as f64;

    let mut mapping = MesoMicroMapping::new();
    for &meso_id in meso_ids {
        let meso_link = meso_net.links.get(&meso_id).ok_or_else(|| {
            GenError::link_not_found(
                meso_id,
                format!("gridding cells of macroscopic link {}", macro_link.id),
            )
        })?;
        create_micro_nodes(net, meso_link, original_lanes, has_bike, has_walk, options, &mut mapping);
    }

    mark_end_nodes(macro_net, net, macro_link, meso_ids, has_bike, has_walk, &mapping)?;
    merge_adjacent_segments(meso_net, net, meso_ids, has_bike, has_walk, &mut mapping)?;

    for &meso_id in meso_ids {
        let Some(meso_link) = meso_net.links.get(&meso_id) else {
            continue;
        };
        create_micro_links(net, meso_link, &main_agents, has_bike, has_walk, &mapping)?;
    }

    Ok(())
}

/// Lane geometry at a signed lateral offset; offsets below the planar
/// tolerance reuse the centerline.
fn offset_lane_geometry(meso_link: &MesoLink, offset: f64) -> LineString<f64> {
    if offset.abs() > PLANAR_TOLERANCE {
        line_to_spherical(&offset_curve(&meso_link.geom_euclidean, -offset))
    } else {
        meso_link.geom.clone()
    }
}

/// Emit `cells_num + 1` nodes per lane of one mesoscopic link, plus optional
/// bike/walk strips beyond the outermost lane.
fn create_micro_nodes(
    net: &mut MicroNet,
    meso_link: &MesoLink,
    original_lanes: f64,
    has_bike: bool,
    has_walk: bool,
    options: MicroGenOptions,
    mapping: &mut MesoMicroMapping,
) {
    let left_change = meso_link.lanes_change[0] as f64;
    let base_offset = -(original_lanes / 2.0 - 0.5 + left_change);
    let cells_num = (meso_link.length_meters / options.cell_length).round().max(1.0) as i32;

    let mut lane_geometries: Vec<LineString<f64>> =
        Vec::with_capacity(meso_link.lanes_num.max(0) as usize);
    let mut last_offset = 0.0;
    for lane_idx in 0..meso_link.lanes_num {
        let lane_offset = (base_offset + lane_idx as f64) * options.lane_width;
        last_offset = lane_offset;
        lane_geometries.push(offset_lane_geometry(meso_link, lane_offset));
    }

    let bike_geometry = has_bike
        .then(|| offset_lane_geometry(meso_link, last_offset + options.bike_lane_width));
    let walk_geometry = has_walk.then(|| {
        let mut walk_offset = last_offset + options.walk_lane_width;
        if has_bike {
            walk_offset += options.bike_lane_width;
        }
        offset_lane_geometry(meso_link, walk_offset)
    });

    let lanes_entry = mapping.entry(meso_link.id).or_default();
    let mut grid_lane = |lane_id: i32, geometry: &LineString<f64>, net: &mut MicroNet| {
        let mut lane_nodes = Vec::with_capacity(cells_num as usize + 1);
        for cell_index in 0..=cells_num {
            let fraction = cell_index as f64 / cells_num as f64;
            let point = point_at_distance(geometry, meso_link.length_meters * fraction);

            let node_id = net.next_node_id();
            let mut node = MicroNode::new(node_id);
            node.geom = Point::from(point);
            node.geom_euclidean = Point::from(point_to_euclidean(point));
            node.meso_link_id = meso_link.id;
            node.lane_id = lane_id;
            node.cell_index = cell_index;
            net.add_node(node);
            lane_nodes.push(node_id);
        }
        lanes_entry.insert(lane_id, lane_nodes);
    };

    for (lane_idx, geometry) in lane_geometries.iter().enumerate() {
        grid_lane(lane_idx as i32 + 1, geometry, net);
    }
    if let Some(geometry) = bike_geometry {
        grid_lane(BIKE_LANE_ID, &geometry, net);
    }
    if let Some(geometry) = walk_geometry {
        grid_lane(WALK_LANE_ID, &geometry, net);
    }
}

/// Tag the first/last cells of the first/last segment with the endpoint
/// flags and the end node's zone.
fn mark_end_nodes(
    macro_net: &MacroNet,
    net: &mut MicroNet,
    macro_link: &MacroLink,
    meso_ids: &[LinkId],
    has_bike: bool,
    has_walk: bool,
    mapping: &MesoMicroMapping,
) -> GenResult<()> {
    let tagged_lane =
        |lane_id: i32| lane_id > 0 || (has_bike && lane_id == BIKE_LANE_ID) || (has_walk && lane_id == WALK_LANE_ID);

    let source = macro_net.nodes.get(&macro_link.source_node).ok_or_else(|| {
        GenError::node_not_found(
            macro_link.source_node,
            format!("marking upstream ends of macroscopic link {}", macro_link.id),
        )
    })?;
    if let Some(lanes) = mapping.get(&meso_ids[0]) {
        for (&lane_id, lane_nodes) in lanes {
            if !tagged_lane(lane_id) {
                continue;
            }
            if let Some(node) = lane_nodes.first().and_then(|id| net.nodes.get_mut(id)) {
                node.is_upstream_end = true;
                node.zone_id = source.zone_id;
            }
        }
    }

    let target = macro_net.nodes.get(&macro_link.target_node).ok_or_else(|| {
        GenError::node_not_found(
            macro_link.target_node,
            format!("marking downstream ends of macroscopic link {}", macro_link.id),
        )
    })?;
    if let Some(lanes) = mapping.get(&meso_ids[meso_ids.len() - 1]) {
        for (&lane_id, lane_nodes) in lanes {
            if !tagged_lane(lane_id) {
                continue;
            }
            if let Some(node) = lane_nodes.last().and_then(|id| net.nodes.get_mut(id)) {
                node.is_downstream_end = true;
                node.zone_id = target.zone_id;
            }
        }
    }

    Ok(())
}

/// Replace the upstream lane's last node with the downstream lane's first
/// node, deleting the duplicate.
fn replace_boundary_node(
    net: &mut MicroNet,
    mapping: &mut MesoMicroMapping,
    up_id: LinkId,
    up_lane: i32,
    down_id: LinkId,
    down_lane: i32,
) {
    let new_first = match mapping
        .get(&down_id)
        .and_then(|lanes| lanes.get(&down_lane))
        .and_then(|nodes| nodes.first().copied())
    {
        Some(id) => id,
        None => return,
    };
    let Some(up_nodes) = mapping.get_mut(&up_id).and_then(|lanes| lanes.get_mut(&up_lane)) else {
        return;
    };
    let Some(old_last) = up_nodes.last_mut() else {
        return;
    };
    let removed = *old_last;
    *old_last = new_first;
    net.delete_node(removed);
}

/// Share exactly one node per continuing lane across each segment boundary
/// of a macroscopic link.
fn merge_adjacent_segments(
    meso_net: &MesoNet,
    net: &mut MicroNet,
    meso_ids: &[LinkId],
    has_bike: bool,
    has_walk: bool,
    mapping: &mut MesoMicroMapping,
) -> GenResult<()> {
    for window in meso_ids.windows(2) {
        let (up_id, down_id) = (window[0], window[1]);
        let up_link = meso_net.links.get(&up_id).ok_or_else(|| {
            GenError::link_not_found(up_id, "merging adjacent segment boundaries")
        })?;
        let down_link = meso_net.links.get(&down_id).ok_or_else(|| {
            GenError::link_not_found(down_id, "merging adjacent segment boundaries")
        })?;

        // Lane correspondence shifts by the difference in left-side changes.
        let min_left = up_link.lanes_change[0].min(down_link.lanes_change[0]);
        let up_start = up_link.lanes_change[0] - min_left;
        let down_start = down_link.lanes_change[0] - min_left;
        let connections =
            (up_link.lanes_num - up_start).min(down_link.lanes_num - down_start);

        for j in 0..connections.max(0) {
            replace_boundary_node(
                net,
                mapping,
                up_id,
                up_start + j + 1,
                down_id,
                down_start + j + 1,
            );
        }
        if has_bike {
            replace_boundary_node(net, mapping, up_id, BIKE_LANE_ID, down_id, BIKE_LANE_ID);
        }
        if has_walk {
            replace_boundary_node(net, mapping, up_id, WALK_LANE_ID, down_id, WALK_LANE_ID);
        }
    }
    Ok(())
}

/// Create one micro link between two existing cells.
#[allow(clippy::too_many_arguments)]
fn add_micro_link(
    net: &mut MicroNet,
    meso_link: &MesoLink,
    from: NodeId,
    to: NodeId,
    lane_id: i32,
    cell_type: CellType,
    agents: &[AgentType],
    is_first_movement_cell: bool,
) -> GenResult<()> {
    let from_points = net
        .nodes
        .get(&from)
        .map(|node| (node.geom.0, node.geom_euclidean.0))
        .ok_or_else(|| {
            GenError::node_not_found(
                from,
                format!("cell link source on mesoscopic link {}", meso_link.id),
            )
        })?;
    let to_points = net
        .nodes
        .get(&to)
        .map(|node| (node.geom.0, node.geom_euclidean.0))
        .ok_or_else(|| {
            GenError::node_not_found(
                to,
                format!("cell link target on mesoscopic link {}", meso_link.id),
            )
        })?;

    let geom = LineString::new(vec![from_points.0, to_points.0]);
    let geom_euclidean = LineString::new(vec![from_points.1, to_points.1]);

    let link_id = net.next_link_id();
    let mut link = MicroLink::new(link_id, from, to);
    link.length_meters = length_haversine(&geom);
    link.geom = geom;
    link.geom_euclidean = geom_euclidean;
    link.meso_link_id = meso_link.id;
    link.macro_link_id = meso_link.macro_link_id;
    link.macro_node_id = meso_link.macro_node_id;
    link.cell_type = cell_type;
    link.lane_id = lane_id;
    link.is_first_movement_cell = is_first_movement_cell;
    // Segments carry the Undefined tag, connectors their movement's tag.
    link.movement_composite_type = meso_link.movement_composite_type;
    link.meso_link_type = meso_link.link_type;
    link.control_type = meso_link.control_type;
    link.free_speed = meso_link.free_speed;
    link.capacity = meso_link.capacity;
    link.allowed_agent_types = agents.to_vec();
    net.add_link(link);

    if let Some(node) = net.nodes.get_mut(&from) {
        node.add_outcoming_link(link_id);
    }
    if let Some(node) = net.nodes.get_mut(&to) {
        node.add_incoming_link(link_id);
    }
    Ok(())
}

/// Emit forward and lane-change edges for every lane strip of one segment.
fn create_micro_links(
    net: &mut MicroNet,
    meso_link: &MesoLink,
    main_agents: &[AgentType],
    has_bike: bool,
    has_walk: bool,
    mapping: &MesoMicroMapping,
) -> GenResult<()> {
    let Some(lanes) = mapping.get(&meso_link.id) else {
        return Ok(());
    };

    let regular_lanes: Vec<i32> = lanes.keys().copied().filter(|&lane| lane > 0).collect();
    for &lane_id in &regular_lanes {
        let lane_nodes = &lanes[&lane_id];

        for cell in 0..lane_nodes.len().saturating_sub(1) {
            add_micro_link(
                net,
                meso_link,
                lane_nodes[cell],
                lane_nodes[cell + 1],
                lane_id,
                CellType::Forward,
                main_agents,
                false,
            )?;
        }

        // Lane change toward the higher-numbered neighbor.
        if let Some(next_nodes) = lanes.get(&(lane_id + 1)) {
            let reachable = lane_nodes
                .len()
                .saturating_sub(1)
                .min(next_nodes.len().saturating_sub(1));
            for cell in 0..reachable {
                add_micro_link(
                    net,
                    meso_link,
                    lane_nodes[cell],
                    next_nodes[cell + 1],
                    lane_id,
                    CellType::LaneChange,
                    main_agents,
                    false,
                )?;
            }
        }

        // Lane change toward the lower-numbered neighbor (vehicle lanes only,
        // never into the bike/walk strips).
        if lane_id - 1 > 0 {
            if let Some(prev_nodes) = lanes.get(&(lane_id - 1)) {
                let reachable = lane_nodes
                    .len()
                    .saturating_sub(1)
                    .min(prev_nodes.len().saturating_sub(1));
                for cell in 0..reachable {
                    add_micro_link(
                        net,
                        meso_link,
                        lane_nodes[cell],
                        prev_nodes[cell + 1],
                        lane_id,
                        CellType::LaneChange,
                        main_agents,
                        false,
                    )?;
                }
            }
        }
    }

    if has_bike {
        if let Some(bike_nodes) = lanes.get(&BIKE_LANE_ID) {
            for cell in 0..bike_nodes.len().saturating_sub(1) {
                add_micro_link(
                    net,
                    meso_link,
                    bike_nodes[cell],
                    bike_nodes[cell + 1],
                    BIKE_LANE_ID,
                    CellType::Forward,
                    &[AgentType::Bike],
                    false,
                )?;
            }
        }
    }
    if has_walk {
        if let Some(walk_nodes) = lanes.get(&WALK_LANE_ID) {
            for cell in 0..walk_nodes.len().saturating_sub(1) {
                add_micro_link(
                    net,
                    meso_link,
                    walk_nodes[cell],
                    walk_nodes[cell + 1],
                    WALK_LANE_ID,
                    CellType::Forward,
                    &[AgentType::Walk],
                    false,
                )?;
            }
        }
    }

    Ok(())
}

/// Fill every movement connector with a chain of intermediate cells joining
/// the incoming lane's last cell to the outgoing lane's first cell.
fn connect_micro_links(
    meso_net: &MesoNet,
    net: &mut MicroNet,
    options: MicroGenOptions,
) -> GenResult<()> {
    let mapping = build_meso_micro_mapping(net);

    for meso_link in meso_net.links.values() {
        if !meso_link.movement_id.is_valid() {
            continue;
        }
        let income_meso_id = meso_link.movement_income_link;
        let outcome_meso_id = meso_link.movement_outcome_link;
        if !income_meso_id.is_valid() || !outcome_meso_id.is_valid() {
            continue;
        }
        let income_seq = meso_link.movement_income_lane_start_seq;
        let outcome_seq = meso_link.movement_outcome_lane_start_seq;
        if income_seq < 0 || outcome_seq < 0 {
            continue;
        }
        let (Some(income_lanes), Some(outcome_lanes)) =
            (mapping.get(&income_meso_id), mapping.get(&outcome_meso_id))
        else {
            continue;
        };

        for lane_offset in 0..meso_link.lanes_num.max(0) {
            let income_lane = income_seq + lane_offset + 1;
            let outcome_lane = outcome_seq + lane_offset + 1;

            let Some(income_nodes) = income_lanes.get(&income_lane).filter(|n| !n.is_empty())
            else {
                continue;
            };
            let Some(outcome_nodes) = outcome_lanes.get(&outcome_lane).filter(|n| !n.is_empty())
            else {
                continue;
            };

            let start_id = *income_nodes.last().unwrap();
            let end_id = outcome_nodes[0];
            let Some(start_geom) = net.nodes.get(&start_id).map(|node| node.geom) else {
                continue;
            };
            let Some(end_geom) = net.nodes.get(&end_id).map(|node| node.geom) else {
                continue;
            };

            let chain_geom = LineString::new(vec![start_geom.0, end_geom.0]);
            let chain_length = length_haversine(&chain_geom);
            let cells_num = (chain_length / options.cell_length).round().max(1.0) as i32;

            let mut last_id = start_id;
            let mut is_first = true;
            for cell_index in 1..cells_num {
                let fraction = cell_index as f64 / cells_num as f64;
                let point = point_at_distance(&chain_geom, chain_length * fraction);

                let node_id = net.next_node_id();
                let mut node = MicroNode::new(node_id);
                node.geom = Point::from(point);
                node.geom_euclidean = Point::from(point_to_euclidean(point));
                node.meso_link_id = meso_link.id;
                node.lane_id = lane_offset + 1;
                node.cell_index = cell_index;
                net.add_node(node);

                add_micro_link(
                    net,
                    meso_link,
                    last_id,
                    node_id,
                    lane_offset + 1,
                    CellType::Forward,
                    &meso_link.allowed_agent_types,
                    is_first,
                )?;
                is_first = false;
                last_id = node_id;
            }
            add_micro_link(
                net,
                meso_link,
                last_id,
                end_id,
                lane_offset + 1,
                CellType::Forward,
                &meso_link.allowed_agent_types,
                is_first,
            )?;
        }
    }

    Ok(())
}

/// Remove the duplicate boundary cells at pass-through nodes.
///
/// The mesoscopic collapse merged link geometry while the gridder worked per
/// meso link, so the last cell of the incoming lane and the first cell of
/// the outgoing lane coincide.  One of the pair is deleted and its edges
/// re-anchored on the survivor, chosen by the target flags.
fn fix_gaps(
    macro_net: &MacroNet,
    meso_net: &MesoNet,
    net: &mut MicroNet,
    by_macro_link: &BTreeMap<LinkId, Vec<LinkId>>,
    flags: &MovementFlags,
    movements: &Movements,
) -> GenResult<()> {
    let mapping = build_meso_micro_mapping(net);

    let mut movements_by_node: BTreeMap<NodeId, Vec<&mrn_net::Movement>> = BTreeMap::new();
    for mvmt in movements.values() {
        movements_by_node
            .entry(mvmt.macro_node_id)
            .or_default()
            .push(mvmt);
    }

    for macro_node in macro_net.nodes.values() {
        if flags.needs_movement(macro_node.id) {
            continue;
        }
        let Some(node_movements) = movements_by_node.get(&macro_node.id) else {
            continue;
        };

        for mvmt in node_movements {
            if !macro_net.links.contains_key(&mvmt.income_macro_link_id)
                || !macro_net.links.contains_key(&mvmt.outcome_macro_link_id)
            {
                continue;
            }

            let income_lane_numbers: Vec<i32> =
                (mvmt.income_lane_start..=mvmt.income_lane_end).collect();
            let outcome_lane_numbers: Vec<i32> =
                (mvmt.outcome_lane_start..=mvmt.outcome_lane_end).collect();
            if income_lane_numbers.len() != outcome_lane_numbers.len()
                || income_lane_numbers.is_empty()
            {
                continue;
            }
            // Lane 0 never exists in the numbering.
            if income_lane_numbers.contains(&0) || outcome_lane_numbers.contains(&0) {
                continue;
            }

            let Some(income_meso_id) = by_macro_link
                .get(&mvmt.income_macro_link_id)
                .and_then(|chain| chain.last().copied())
            else {
                continue;
            };
            let Some(outcome_meso_id) = by_macro_link
                .get(&mvmt.outcome_macro_link_id)
                .and_then(|chain| chain.first().copied())
            else {
                continue;
            };
            let Some(income_meso) = meso_net.links.get(&income_meso_id) else {
                continue;
            };
            let Some(outcome_meso) = meso_net.links.get(&outcome_meso_id) else {
                continue;
            };
            let (Some(income_micro_lanes), Some(outcome_micro_lanes)) =
                (mapping.get(&income_meso_id), mapping.get(&outcome_meso_id))
            else {
                continue;
            };

            let mut income_start_idx = income_meso.lanes_change[0] + income_lane_numbers[0];
            if income_lane_numbers[0] >= 0 {
                income_start_idx -= 1;
            }
            let mut outcome_start_idx = outcome_meso.lanes_change[0] + outcome_lane_numbers[0];
            if outcome_lane_numbers[0] >= 0 {
                outcome_start_idx -= 1;
            }
            if income_start_idx < 0 || outcome_start_idx < 0 {
                continue;
            }
            let lanes_num = income_lane_numbers.len() as i32;
            if income_start_idx + lanes_num - 1 > income_meso.lanes_num - 1
                || outcome_start_idx + lanes_num - 1 > outcome_meso.lanes_num - 1
            {
                continue;
            }

            let downstream_target = flags.is_downstream_target(mvmt.income_macro_link_id);
            let upstream_target = flags.is_upstream_target(mvmt.outcome_macro_link_id);

            for i in 0..lanes_num {
                let income_lane = income_start_idx + i + 1;
                let outcome_lane = outcome_start_idx + i + 1;
                let Some(income_nodes) =
                    income_micro_lanes.get(&income_lane).filter(|n| !n.is_empty())
                else {
                    continue;
                };
                let Some(outcome_nodes) =
                    outcome_micro_lanes.get(&outcome_lane).filter(|n| !n.is_empty())
                else {
                    continue;
                };
                let income_last = *income_nodes.last().unwrap();
                let outcome_first = outcome_nodes[0];

                if downstream_target && !upstream_target {
                    // Keep the incoming cell, re-anchor the outgoing edges.
                    let outgoing_edges: Vec<LinkId> = net
                        .nodes
                        .get(&outcome_first)
                        .map(|node| node.outcoming_links.clone())
                        .unwrap_or_default();
                    for link_id in outgoing_edges {
                        if let Some(link) = net.links.get_mut(&link_id) {
                            link.source_node = income_last;
                        }
                        if let Some(node) = net.nodes.get_mut(&income_last) {
                            node.add_outcoming_link(link_id);
                        }
                    }
                    net.delete_node(outcome_first);
                } else if !downstream_target && upstream_target {
                    // Keep the outgoing cell, re-anchor the incoming edges.
                    let incoming_edges: Vec<LinkId> = net
                        .nodes
                        .get(&income_last)
                        .map(|node| node.incoming_links.clone())
                        .unwrap_or_default();
                    for link_id in incoming_edges {
                        if let Some(link) = net.links.get_mut(&link_id) {
                            link.target_node = outcome_first;
                        }
                        if let Some(node) = net.nodes.get_mut(&outcome_first) {
                            node.add_incoming_link(link_id);
                        }
                    }
                    net.delete_node(income_last);
                }
            }
        }
    }

    Ok(())
}

/// Split the allowed agent set into the main gridded traffic and optional
/// bike/walk strips.
fn prepare_bike_walk_agents(
    agent_types: &[AgentType],
    separate: bool,
) -> (Vec<AgentType>, bool, bool) {
    if agent_types.is_empty() || !separate {
        return (agent_types.to_vec(), false, false);
    }

    let has_auto = agent_types.contains(&AgentType::Auto);
    let has_bike = agent_types.contains(&AgentType::Bike);
    let has_walk = agent_types.contains(&AgentType::Walk);

    match (has_auto, has_bike, has_walk) {
        (true, true, true) => (vec![AgentType::Auto], true, true),
        (true, true, false) => (vec![AgentType::Auto], true, false),
        (true, false, true) => (vec![AgentType::Auto], false, true),
        (false, true, true) => (vec![AgentType::Bike], false, true),
        _ => (agent_types.to_vec(), false, false),
    }
}
