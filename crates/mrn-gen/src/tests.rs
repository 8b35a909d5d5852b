//! Unit and scenario tests for the compiler passes.
//!
//! All scenario networks are hand-crafted on a local meter grid at the
//! equator, where one degree ≈ 111.195 km both ways, so geometric
//! expectations can be reasoned about in meters.

#[cfg(test)]
mod helpers {
    use geo_types::{Coord, LineString, Point};
    use mrn_core::{AgentType, ControlType, LinkId, LinkType, NodeId};
    use mrn_geom::{length_haversine, line_to_euclidean, point_to_euclidean};
    use mrn_net::{LanesInfo, MacroLink, MacroNet, MacroNode};

    /// Degrees per meter at the equator (haversine Earth radius).
    pub const DEG_PER_M: f64 = 1.0 / 111_194.92664;

    /// Node placed on the local meter grid.
    pub fn add_node(net: &mut MacroNet, id: i64, x_m: f64, y_m: f64) {
        let lon = x_m * DEG_PER_M;
        let lat = y_m * DEG_PER_M;
        let mut node = MacroNode::new(NodeId(id));
        node.geom = Point::new(lon, lat);
        node.geom_euclidean = Point::from(point_to_euclidean(Coord { x: lon, y: lat }));
        net.add_node(node);
    }

    pub fn add_link_with_geom(
        net: &mut MacroNet,
        id: i64,
        from: i64,
        to: i64,
        lanes: i32,
        geom: LineString<f64>,
    ) {
        let mut link = MacroLink::new(LinkId(id), NodeId(from), NodeId(to));
        link.geom_euclidean = line_to_euclidean(&geom);
        link.length_meters = length_haversine(&geom);
        link.geom = geom;
        link.lanes_num = lanes;
        link.lanes_info = LanesInfo::uniform(lanes, link.length_meters);
        link.link_type = LinkType::Residential;
        link.free_speed = 30.0;
        link.capacity = 1000;
        link.allowed_agent_types = vec![AgentType::Auto];
        net.add_link(link);
    }

    /// Straight link between two existing nodes.
    pub fn add_link(net: &mut MacroNet, id: i64, from: i64, to: i64, lanes: i32) {
        let a = net.nodes[&NodeId(from)].geom.0;
        let b = net.nodes[&NodeId(to)].geom.0;
        add_link_with_geom(net, id, from, to, lanes, LineString::new(vec![a, b]));
    }

    /// Two-way road: the backward link's polyline is the exact coordinate
    /// reversal of the forward one, so the twin scan pairs them.
    pub fn add_two_way(net: &mut MacroNet, id_fwd: i64, id_back: i64, a: i64, b: i64, lanes: i32) {
        add_link(net, id_fwd, a, b, lanes);
        let mut points = net.links[&LinkId(id_fwd)].geom.0.clone();
        points.reverse();
        add_link_with_geom(net, id_back, b, a, lanes, LineString::new(points));
    }

    pub fn set_signal(net: &mut MacroNet, node: i64) {
        net.nodes.get_mut(&NodeId(node)).unwrap().control_type = ControlType::Signal;
    }

    // ── Scenario networks ─────────────────────────────────────────────────

    /// Single 100 m two-way road, 2 lanes per direction.
    pub fn straight_two_way() -> MacroNet {
        let mut net = MacroNet::new();
        add_node(&mut net, 1, 0.0, 0.0);
        add_node(&mut net, 2, 100.0, 0.0);
        add_two_way(&mut net, 1, 2, 1, 2, 2);
        net
    }

    /// Signalized T-intersection: 4-lane east-west road, 2-lane north branch.
    pub fn t_intersection_signal() -> MacroNet {
        let mut net = MacroNet::new();
        add_node(&mut net, 1, -100.0, 0.0);
        add_node(&mut net, 2, 100.0, 0.0);
        add_node(&mut net, 3, 0.0, 100.0);
        add_node(&mut net, 10, 0.0, 0.0);
        add_two_way(&mut net, 1, 2, 1, 10, 4);
        add_two_way(&mut net, 3, 4, 2, 10, 4);
        add_two_way(&mut net, 5, 6, 3, 10, 2);
        set_signal(&mut net, 10);
        net
    }

    /// One-way chain A→B→C of straight 100 m single-lane links; B is a
    /// pass-through node.
    pub fn one_way_chain() -> MacroNet {
        let mut net = MacroNet::new();
        add_node(&mut net, 1, 0.0, 0.0);
        add_node(&mut net, 2, 100.0, 0.0);
        add_node(&mut net, 3, 200.0, 0.0);
        add_link(&mut net, 1, 1, 2, 1);
        add_link(&mut net, 2, 2, 3, 1);
        net
    }

    /// One-way chain A→B→C→D whose middle link is 3 m long; both middle
    /// nodes collapse, so the short link is shortcut at both ends.
    pub fn short_middle_chain() -> MacroNet {
        let mut net = MacroNet::new();
        add_node(&mut net, 1, 0.0, 0.0);
        add_node(&mut net, 2, 100.0, 0.0);
        add_node(&mut net, 3, 103.0, 0.0);
        add_node(&mut net, 4, 203.0, 0.0);
        add_link(&mut net, 1, 1, 2, 1);
        add_link(&mut net, 2, 2, 3, 1);
        add_link(&mut net, 3, 3, 4, 1);
        net
    }

    /// Unsignalized four-way intersection of 2-lane two-way roads.
    pub fn four_way_no_signal() -> MacroNet {
        let mut net = MacroNet::new();
        add_node(&mut net, 1, -100.0, 0.0);
        add_node(&mut net, 2, 100.0, 0.0);
        add_node(&mut net, 3, 0.0, 100.0);
        add_node(&mut net, 4, 0.0, -100.0);
        add_node(&mut net, 10, 0.0, 0.0);
        add_two_way(&mut net, 1, 2, 1, 10, 2);
        add_two_way(&mut net, 3, 4, 2, 10, 2);
        add_two_way(&mut net, 5, 6, 3, 10, 2);
        add_two_way(&mut net, 7, 8, 4, 10, 2);
        net
    }

    /// One-way 100 m link dropping from 3 lanes to 2 at the 50 m mark.
    pub fn lane_drop() -> MacroNet {
        let mut net = MacroNet::new();
        add_node(&mut net, 1, 0.0, 0.0);
        add_node(&mut net, 2, 100.0, 0.0);
        add_link(&mut net, 1, 1, 2, 3);
        let link = net.links.get_mut(&LinkId(1)).unwrap();
        link.lanes_info = LanesInfo {
            lanes_list: vec![3, 2],
            lanes_change: vec![[0, 0], [0, -1]],
            lanes_change_points: vec![0.0, 50.0, link.length_meters],
        };
        net
    }

    /// Two one-way roads merging into one: A→C and B→C feed C→D; C is a
    /// fan-out-1 pass-through node.
    pub fn pass_through_merge() -> MacroNet {
        let mut net = MacroNet::new();
        add_node(&mut net, 1, -100.0, 5.0);
        add_node(&mut net, 2, -100.0, -5.0);
        add_node(&mut net, 3, 0.0, 0.0);
        add_node(&mut net, 4, 100.0, 0.0);
        add_link(&mut net, 1, 1, 3, 1);
        add_link(&mut net, 2, 2, 3, 1);
        add_link(&mut net, 3, 3, 4, 1);
        net
    }
}

// ── Movement inference ────────────────────────────────────────────────────────

#[cfg(test)]
mod movements {
    use mrn_core::{LinkId, MovementCompositeType, MovementType, NodeId};
    use mrn_net::MacroNet;

    use super::helpers::*;
    use crate::generate_movements;

    #[test]
    fn two_way_road_has_no_movements() {
        // The only link pairs at each end are reverse twins.
        let net = straight_two_way();
        let movements = generate_movements(&net).unwrap();
        assert!(movements.is_empty());
    }

    #[test]
    fn t_intersection_has_six_movements() {
        let net = t_intersection_signal();
        let movements = generate_movements(&net).unwrap();
        assert_eq!(movements.len(), 6);
        // Two movements per approach, never into the approach's own reverse.
        for mvmt in movements.values() {
            assert_ne!(mvmt.income_macro_link_id, mvmt.outcome_macro_link_id);
            assert_eq!(mvmt.macro_node_id, NodeId(10));
            assert_eq!(
                mvmt.income_lane_end_seq - mvmt.income_lane_start_seq + 1,
                mvmt.lanes_num
            );
            assert_eq!(
                mvmt.outcome_lane_end_seq - mvmt.outcome_lane_start_seq + 1,
                mvmt.lanes_num
            );
        }
    }

    #[test]
    fn four_way_has_twelve_movements() {
        let net = four_way_no_signal();
        let movements = generate_movements(&net).unwrap();
        assert_eq!(movements.len(), 12);
    }

    #[test]
    fn classification_thru_and_left() {
        let net = t_intersection_signal();
        let movements = generate_movements(&net).unwrap();
        // Eastbound approach (link 1): through to the east leg, left to the
        // north branch.
        let east_thru = movements
            .values()
            .find(|m| m.income_macro_link_id == LinkId(1) && m.outcome_macro_link_id == LinkId(4))
            .unwrap();
        assert_eq!(east_thru.movement_type, MovementType::Thru);
        assert_eq!(east_thru.composite_type, MovementCompositeType::EBT);

        let east_left = movements
            .values()
            .find(|m| m.income_macro_link_id == LinkId(1) && m.outcome_macro_link_id == LinkId(6))
            .unwrap();
        assert_eq!(east_left.movement_type, MovementType::Left);
        assert_eq!(east_left.composite_type, MovementCompositeType::EBL);
    }

    #[test]
    fn classification_southbound_turns() {
        let net = t_intersection_signal();
        let movements = generate_movements(&net).unwrap();
        // Southbound approach (link 5, north branch): left to the east leg,
        // right to the west leg.
        let south_left = movements
            .values()
            .find(|m| m.income_macro_link_id == LinkId(5) && m.outcome_macro_link_id == LinkId(4))
            .unwrap();
        assert_eq!(south_left.composite_type, MovementCompositeType::SBL);
        let south_right = movements
            .values()
            .find(|m| m.income_macro_link_id == LinkId(5) && m.outcome_macro_link_id == LinkId(2))
            .unwrap();
        assert_eq!(south_right.composite_type, MovementCompositeType::SBR);
    }

    #[test]
    fn merge_lane_distribution() {
        // Two 2-lane approaches feeding one 3-lane road: the left approach
        // claims the leftmost outgoing lanes, the other lands rightmost.
        let mut net = MacroNet::new();
        add_node(&mut net, 1, -100.0, 100.0);
        add_node(&mut net, 2, -100.0, -100.0);
        add_node(&mut net, 3, 100.0, 0.0);
        add_node(&mut net, 4, 0.0, 0.0);
        add_link(&mut net, 1, 1, 4, 2);
        add_link(&mut net, 2, 2, 4, 2);
        add_link(&mut net, 3, 4, 3, 3);

        let movements = generate_movements(&net).unwrap();
        assert_eq!(movements.len(), 2);
        let from_left = movements
            .values()
            .find(|m| m.income_macro_link_id == LinkId(1))
            .unwrap();
        assert_eq!(
            (from_left.outcome_lane_start, from_left.outcome_lane_end),
            (1, 2)
        );
        let from_right = movements
            .values()
            .find(|m| m.income_macro_link_id == LinkId(2))
            .unwrap();
        assert_eq!(
            (from_right.outcome_lane_start, from_right.outcome_lane_end),
            (2, 3)
        );
    }

    #[test]
    fn diverge_two_branches() {
        // A 3-lane road splitting into two 2-lane branches: the rightmost
        // lane feeds the right branch, the rest go left.
        let mut net = MacroNet::new();
        add_node(&mut net, 1, -100.0, 0.0);
        add_node(&mut net, 2, 0.0, 0.0);
        add_node(&mut net, 3, 0.0, 100.0);
        add_node(&mut net, 4, 0.0, -100.0);
        add_link(&mut net, 1, 1, 2, 3);
        add_link(&mut net, 2, 2, 3, 2);
        add_link(&mut net, 3, 2, 4, 2);

        let movements = generate_movements(&net).unwrap();
        assert_eq!(movements.len(), 2);
        let to_left = movements
            .values()
            .find(|m| m.outcome_macro_link_id == LinkId(2))
            .unwrap();
        assert_eq!((to_left.income_lane_start, to_left.income_lane_end), (1, 2));
        assert_eq!(to_left.lanes_num, 2);
        let to_right = movements
            .values()
            .find(|m| m.outcome_macro_link_id == LinkId(3))
            .unwrap();
        assert_eq!(
            (to_right.income_lane_start, to_right.income_lane_end),
            (3, 3)
        );
        assert_eq!(
            (to_right.outcome_lane_start, to_right.outcome_lane_end),
            (2, 2)
        );
    }

    #[test]
    fn centroid_nodes_emit_nothing() {
        let mut net = t_intersection_signal();
        net.nodes.get_mut(&NodeId(10)).unwrap().is_centroid = true;
        let movements = generate_movements(&net).unwrap();
        assert!(movements.is_empty());
    }
}

// ── Pass-through analysis ─────────────────────────────────────────────────────

#[cfg(test)]
mod flags {
    use mrn_core::{LinkId, MovementCompositeType, MovementId, MovementType, NodeId};
    use mrn_net::{Movement, Movements};

    use super::helpers::*;
    use crate::{compute_movement_flags, generate_movements};

    #[test]
    fn straight_chain_node_is_demoted() {
        let net = one_way_chain();
        let movements = generate_movements(&net).unwrap();
        let flags = compute_movement_flags(&net, &movements).unwrap();
        assert!(!flags.needs_movement(NodeId(2)));
        assert!(flags.is_downstream_target(LinkId(1)));
        assert!(flags.has_downstream_shortcut(LinkId(1)));
        assert!(flags.has_upstream_shortcut(LinkId(2)));
        assert!(!flags.is_upstream_target(LinkId(2)));
        // Terminal nodes keep their default.
        assert!(flags.needs_movement(NodeId(1)));
        assert!(flags.needs_movement(NodeId(3)));
    }

    #[test]
    fn signalized_node_is_never_demoted() {
        let net = t_intersection_signal();
        let movements = generate_movements(&net).unwrap();
        let flags = compute_movement_flags(&net, &movements).unwrap();
        assert!(flags.needs_movement(NodeId(10)));
    }

    #[test]
    fn two_way_end_nodes_double_back() {
        // The reverse twin hangs off each end node at ±180°, which keeps the
        // node an intersection.
        let net = straight_two_way();
        let movements = generate_movements(&net).unwrap();
        let flags = compute_movement_flags(&net, &movements).unwrap();
        assert!(flags.needs_movement(NodeId(1)));
        assert!(flags.needs_movement(NodeId(2)));
    }

    #[test]
    fn fan_out_merge_node_is_demoted() {
        let net = pass_through_merge();
        let movements = generate_movements(&net).unwrap();
        let flags = compute_movement_flags(&net, &movements).unwrap();
        assert!(!flags.needs_movement(NodeId(3)));
        assert!(flags.is_upstream_target(LinkId(3)));
        assert!(flags.has_upstream_shortcut(LinkId(3)));
        assert!(flags.has_downstream_shortcut(LinkId(1)));
        assert!(flags.has_downstream_shortcut(LinkId(2)));
    }

    #[test]
    fn forked_movements_keep_the_intersection() {
        // Two movements into the same outgoing link mean the node forks and
        // must stay an intersection, whatever the geometry says.
        let net = one_way_chain();
        let mut movements = Movements::new();
        for id in 0..2 {
            let mvmt = Movement::new(
                MovementId(id),
                NodeId(2),
                LinkId(1),
                LinkId(2),
                MovementType::Thru,
                MovementCompositeType::EBT,
            );
            movements.insert(mvmt.id, mvmt);
        }
        let flags = compute_movement_flags(&net, &movements).unwrap();
        assert!(flags.needs_movement(NodeId(2)));
    }
}

// ── Mesoscopic generation ─────────────────────────────────────────────────────

#[cfg(test)]
mod meso {
    use mrn_core::{ControlType, LinkId, LinkType, NodeId};

    use super::helpers::*;
    use crate::{generate_mesoscopic, generate_movements};

    #[test]
    fn two_way_offset_and_cuts() {
        let net = straight_two_way();
        let movements = generate_movements(&net).unwrap();
        let meso = generate_mesoscopic(&net, &movements).unwrap();

        assert_eq!(meso.links.len(), 2);
        assert_eq!(meso.nodes.len(), 4);
        for link in meso.links.values() {
            assert!(!link.is_connection);
            assert_eq!(link.lanes_num, 2);
            // 100 m minus the two 12 m caps of a 2-lane link.
            assert!((link.length_meters - 76.0).abs() < 0.5, "{}", link.length_meters);
            assert_eq!(link.link_type, LinkType::Residential);
        }

        // Each direction is offset 10.5 m to its right: the eastbound link
        // ends up south of the centerline.
        let east = &meso.links[&LinkId(0)];
        let lat_m = east.geom.0[0].y / DEG_PER_M;
        assert!((lat_m + 10.5).abs() < 0.1, "offset was {lat_m} m");
    }

    #[test]
    fn t_intersection_segments_and_connectors() {
        let net = t_intersection_signal();
        let movements = generate_movements(&net).unwrap();
        let meso = generate_mesoscopic(&net, &movements).unwrap();

        let connectors: Vec<_> = meso.links.values().filter(|l| l.is_connection).collect();
        let segments: Vec<_> = meso.links.values().filter(|l| !l.is_connection).collect();
        assert_eq!(segments.len(), 6);
        assert_eq!(connectors.len(), 6);

        for connector in connectors {
            assert_eq!(connector.macro_node_id, NodeId(10));
            assert!(!connector.macro_link_id.is_valid());
            assert!(connector.movement_id.is_valid());
            assert!(connector.movement_income_link.is_valid());
            assert!(connector.movement_outcome_link.is_valid());
            // Control is inherited from the signalized node, road attributes
            // from the upstream segment.
            assert_eq!(connector.control_type, ControlType::Signal);
            assert_eq!(connector.link_type, LinkType::Residential);
            assert_eq!(connector.free_speed, 30.0);
            // The connector spans the two end caps.
            assert_eq!(connector.geom.0.len(), 2);
        }
    }

    #[test]
    fn meso_node_ids_encode_provenance() {
        let net = t_intersection_signal();
        let movements = generate_movements(&net).unwrap();
        let meso = generate_mesoscopic(&net, &movements).unwrap();
        for node in meso.nodes.values() {
            assert!(node.macro_node_id.is_valid() != node.macro_link_id.is_valid());
            if node.macro_node_id.is_valid() {
                assert_eq!(node.id.0 / 100, node.macro_node_id.0);
            }
        }
    }

    #[test]
    fn pass_through_chain_merges_without_connector() {
        let net = one_way_chain();
        let movements = generate_movements(&net).unwrap();
        assert_eq!(movements.len(), 1);
        let meso = generate_mesoscopic(&net, &movements).unwrap();

        assert_eq!(meso.links.len(), 2);
        assert!(meso.links.values().all(|l| !l.is_connection));
        // The collapsed boundary leaves three nodes: A-end, shared B, C-end.
        assert_eq!(meso.nodes.len(), 3);
        let first = &meso.links[&LinkId(0)];
        let second = &meso.links[&LinkId(1)];
        assert_eq!(first.target_node, second.source_node);
        // Adjacency is rebuilt after the merge.
        let shared = &meso.nodes[&first.target_node];
        assert_eq!(shared.incoming_links, vec![LinkId(0)]);
        assert_eq!(shared.outcoming_links, vec![LinkId(1)]);
    }

    #[test]
    fn pass_through_merge_collapses_fan_in() {
        let net = pass_through_merge();
        let movements = generate_movements(&net).unwrap();
        let meso = generate_mesoscopic(&net, &movements).unwrap();
        assert_eq!(meso.links.len(), 3);
        assert_eq!(meso.nodes.len(), 4);
        // Both feeders end at the outgoing link's head node.
        let out_source = meso.links[&LinkId(2)].source_node;
        assert_eq!(meso.links[&LinkId(0)].target_node, out_source);
        assert_eq!(meso.links[&LinkId(1)].target_node, out_source);
    }

    #[test]
    fn short_link_both_ends_shortcut() {
        let net = short_middle_chain();
        let movements = generate_movements(&net).unwrap();
        let meso = generate_mesoscopic(&net, &movements).unwrap();
        // The 3 m middle link is longer than the minimal total cut, so both
        // ends get the 0.1 m shortcut and the middle keeps 2.8 m.
        let middle = meso
            .links
            .values()
            .find(|l| l.macro_link_id == LinkId(2))
            .unwrap();
        assert!((middle.length_meters - 2.8).abs() < 0.05, "{}", middle.length_meters);
    }

    #[test]
    fn lane_drop_produces_two_segments() {
        let net = lane_drop();
        let movements = generate_movements(&net).unwrap();
        let meso = generate_mesoscopic(&net, &movements).unwrap();

        assert_eq!(meso.links.len(), 2);
        let first = &meso.links[&LinkId(0)];
        let second = &meso.links[&LinkId(1)];
        assert_eq!((first.segment_idx, second.segment_idx), (0, 1));
        assert_eq!(first.lanes_num, 3);
        assert_eq!(second.lanes_num, 2);
        assert_eq!(second.lanes_change, [0, -1]);
        // One shared node between the segments, owned by the parent link.
        assert_eq!(first.target_node, second.source_node);
        let shared = &meso.nodes[&first.target_node];
        assert!(!shared.macro_node_id.is_valid());
        assert_eq!(shared.macro_link_id, LinkId(1));
        // Segment geometries abut exactly.
        assert_eq!(first.geom.0.last(), second.geom.0.first());
        // Caps are 12 m each side, the change point stays at 50 m.
        assert!((first.length_meters - 38.0).abs() < 0.5);
        assert!((second.length_meters - 38.0).abs() < 0.5);
    }

    #[test]
    fn centroid_endpoint_is_rejected() {
        use crate::GenError;
        let mut net = one_way_chain();
        net.nodes.get_mut(&NodeId(1)).unwrap().is_centroid = true;
        let movements = generate_movements(&net).unwrap();
        let err = generate_mesoscopic(&net, &movements).unwrap_err();
        assert!(matches!(err, GenError::NotImplemented(_)));
    }

    #[test]
    fn meso_generation_is_idempotent() {
        let net = t_intersection_signal();
        let movements = generate_movements(&net).unwrap();
        let first = generate_mesoscopic(&net, &movements).unwrap();
        let second = generate_mesoscopic(&net, &movements).unwrap();
        assert_eq!(first, second);
    }
}

// ── Microscopic generation ────────────────────────────────────────────────────

#[cfg(test)]
mod micro {
    use std::collections::BTreeSet;

    use mrn_core::{CellType, LinkId, NodeId};
    use mrn_net::{MicroNet, MesoNet};

    use super::helpers::*;
    use crate::{
        generate_mesoscopic, generate_microscopic, generate_movements, MicroGenOptions,
    };

    fn compile(net: &mrn_net::MacroNet) -> (mrn_net::Movements, MesoNet, MicroNet) {
        let movements = generate_movements(net).unwrap();
        let meso = generate_mesoscopic(net, &movements).unwrap();
        let micro =
            generate_microscopic(net, &meso, &movements, MicroGenOptions::default()).unwrap();
        (movements, meso, micro)
    }

    /// No two cells may share a (meso link, lane, cell) slot.
    fn assert_unique_cells(micro: &MicroNet) {
        let mut seen = BTreeSet::new();
        for node in micro.nodes.values() {
            assert!(
                seen.insert((node.meso_link_id, node.lane_id, node.cell_index)),
                "duplicate cell {:?}",
                (node.meso_link_id, node.lane_id, node.cell_index)
            );
        }
    }

    #[test]
    fn straight_two_way_grid() {
        let net = straight_two_way();
        let (_, meso, micro) = compile(&net);

        // 76 m segments → 17 cells, 18 nodes per lane, 2 lanes per direction.
        assert_eq!(micro.nodes.len(), 2 * 2 * 18);
        let forward = micro
            .links
            .values()
            .filter(|l| l.cell_type == CellType::Forward)
            .count();
        let lane_change = micro
            .links
            .values()
            .filter(|l| l.cell_type == CellType::LaneChange)
            .count();
        assert_eq!(forward, 2 * 2 * 17);
        assert_eq!(lane_change, 2 * 2 * 17);

        // Endpoint tagging: one upstream and one downstream cell per lane.
        for meso_link in meso.links.keys() {
            let ups = micro
                .nodes
                .values()
                .filter(|n| n.meso_link_id == *meso_link && n.is_upstream_end)
                .count();
            let downs = micro
                .nodes
                .values()
                .filter(|n| n.meso_link_id == *meso_link && n.is_downstream_end)
                .count();
            assert_eq!(ups, 2);
            assert_eq!(downs, 2);
        }
        assert_unique_cells(&micro);
    }

    #[test]
    fn connector_chains_match_movements() {
        let net = t_intersection_signal();
        let (_, meso, micro) = compile(&net);

        for (meso_id, meso_link) in &meso.links {
            if !meso_link.is_connection {
                continue;
            }
            let chain_links: Vec<_> = micro
                .links
                .values()
                .filter(|l| l.meso_link_id == *meso_id)
                .collect();
            let lanes: BTreeSet<i32> = chain_links.iter().map(|l| l.lane_id).collect();
            assert_eq!(lanes.len() as i32, meso_link.lanes_num);

            for lane in lanes {
                let chain: Vec<_> = chain_links
                    .iter()
                    .filter(|l| l.lane_id == lane)
                    .collect();
                // Chain endpoints: the links whose source/target is not
                // shared within the chain.
                let targets: BTreeSet<NodeId> = chain.iter().map(|l| l.target_node).collect();
                let sources: BTreeSet<NodeId> = chain.iter().map(|l| l.source_node).collect();
                let start = chain
                    .iter()
                    .find(|l| !targets.contains(&l.source_node))
                    .unwrap();
                let end = chain
                    .iter()
                    .find(|l| !sources.contains(&l.target_node))
                    .unwrap();
                let from = micro.nodes[&start.source_node].geom.0;
                let to = micro.nodes[&end.target_node].geom.0;
                let length = mrn_geom::haversine_distance(from, to);
                let expected = ((length / 4.5).round()).max(1.0) as usize;
                assert_eq!(chain.len(), expected);
                // Exactly one entry cell per chain.
                assert_eq!(
                    chain.iter().filter(|l| l.is_first_movement_cell).count(),
                    1
                );
                // Every cell carries the movement tag.
                assert!(chain
                    .iter()
                    .all(|l| l.movement_composite_type == meso_link.movement_composite_type));
            }
        }
        assert_unique_cells(&micro);
    }

    #[test]
    fn four_way_connectors_are_single_lane() {
        let net = four_way_no_signal();
        let (_, meso, micro) = compile(&net);
        let connectors: Vec<_> = meso.links.values().filter(|l| l.is_connection).collect();
        assert_eq!(connectors.len(), 12);
        for connector in connectors {
            assert_eq!(connector.lanes_num, 1);
            let chain_count = micro
                .links
                .values()
                .filter(|l| l.meso_link_id == connector.id)
                .count();
            assert!(chain_count >= 1);
        }
        assert_unique_cells(&micro);
    }

    #[test]
    fn pass_through_gap_is_closed() {
        let net = one_way_chain();
        let (_, meso, micro) = compile(&net);

        // 91.9 m segments → 20 cells each; the duplicate boundary cell is
        // deleted, leaving one continuous 40-edge lane.
        assert_eq!(micro.nodes.len(), 21 + 21 - 1);
        assert_eq!(micro.links.len(), 40);
        assert_unique_cells(&micro);

        let first_meso = *meso.links.keys().next().unwrap();
        let start = micro
            .nodes
            .values()
            .find(|n| n.meso_link_id == first_meso && n.is_upstream_end)
            .unwrap();
        let mut current = start.id;
        let mut steps = 0;
        loop {
            let node = &micro.nodes[&current];
            let next = node
                .outcoming_links
                .iter()
                .filter_map(|id| micro.links.get(id))
                .find(|l| l.cell_type == CellType::Forward);
            match next {
                Some(link) => {
                    current = link.target_node;
                    steps += 1;
                }
                None => break,
            }
        }
        assert_eq!(steps, 40);
        assert!(micro.nodes[&current].is_downstream_end);
    }

    #[test]
    fn pass_through_merge_gap_closure() {
        let net = pass_through_merge();
        let (_, _meso, micro) = compile(&net);
        // Feeders: 2 × 21 cells; outgoing: 21; two duplicates removed.
        assert_eq!(micro.nodes.len(), 3 * 21 - 2);
        assert_eq!(micro.links.len(), 3 * 20);
        assert_unique_cells(&micro);

        // Both feeder lanes converge on the outgoing link's first cell.
        let junction = micro
            .nodes
            .values()
            .find(|n| n.incoming_links.len() == 2)
            .expect("merge cell should have two incoming edges");
        assert_eq!(junction.cell_index, 0);
    }

    #[test]
    fn short_link_grids_one_cell() {
        let net = short_middle_chain();
        let (_, meso, micro) = compile(&net);
        let middle_meso = meso
            .links
            .values()
            .find(|l| l.macro_link_id == LinkId(2))
            .unwrap();
        // 2.8 m of link → a single cell.
        let middle_cells = micro
            .links
            .values()
            .filter(|l| l.meso_link_id == middle_meso.id)
            .count();
        assert_eq!(middle_cells, 1);
        assert_unique_cells(&micro);
    }

    #[test]
    fn lane_drop_ends_the_inner_lane() {
        let net = lane_drop();
        let (_, meso, micro) = compile(&net);
        let first = &meso.links[&LinkId(0)];
        let second = &meso.links[&LinkId(1)];

        // 38 m segments → 8 cells; lanes 1–2 share a boundary node, lane 3
        // stops dead.
        assert_eq!(
            micro.nodes.len(),
            (3 * 9) + (2 * 9) - 2,
        );
        assert!(micro
            .nodes
            .values()
            .all(|n| !(n.meso_link_id == second.id && n.lane_id == 3)));

        // The dropped lane's last cell has no forward continuation.
        let lane3_last = micro
            .nodes
            .values()
            .filter(|n| n.meso_link_id == first.id && n.lane_id == 3)
            .max_by_key(|n| n.cell_index)
            .unwrap();
        let has_forward = lane3_last
            .outcoming_links
            .iter()
            .filter_map(|id| micro.links.get(id))
            .any(|l| l.cell_type == CellType::Forward);
        assert!(!has_forward);
        assert_unique_cells(&micro);
    }

    #[test]
    fn bike_walk_strips_when_separated() {
        use mrn_core::AgentType;
        let mut net = straight_two_way();
        for link in net.links.values_mut() {
            link.allowed_agent_types = vec![AgentType::Auto, AgentType::Bike, AgentType::Walk];
        }
        let movements = generate_movements(&net).unwrap();
        let meso = generate_mesoscopic(&net, &movements).unwrap();
        let options = MicroGenOptions {
            separate_bike_walk: true,
            ..MicroGenOptions::default()
        };
        let micro = generate_microscopic(&net, &meso, &movements, options).unwrap();

        let bike_nodes = micro.nodes.values().filter(|n| n.lane_id == -1).count();
        let walk_nodes = micro.nodes.values().filter(|n| n.lane_id == -2).count();
        // One strip per direction, 18 cells each.
        assert_eq!(bike_nodes, 2 * 18);
        assert_eq!(walk_nodes, 2 * 18);

        // Strips only ever carry their own agent type, forward only.
        for link in micro.links.values() {
            if link.lane_id == -1 {
                assert_eq!(link.allowed_agent_types, vec![AgentType::Bike]);
                assert_eq!(link.cell_type, CellType::Forward);
            }
            if link.lane_id == -2 {
                assert_eq!(link.allowed_agent_types, vec![AgentType::Walk]);
                assert_eq!(link.cell_type, CellType::Forward);
            }
        }
        // Vehicle cells kept only the main traffic.
        let vehicle = micro.links.values().find(|l| l.lane_id == 1).unwrap();
        assert_eq!(vehicle.allowed_agent_types, vec![AgentType::Auto]);
    }
}

// ── Whole-pipeline properties ─────────────────────────────────────────────────

#[cfg(test)]
mod pipeline {
    use super::helpers::*;
    use crate::{
        generate_mesoscopic, generate_microscopic, generate_movements, GenError, MicroGenOptions,
    };

    #[test]
    fn meso_links_have_exactly_one_parent() {
        let net = t_intersection_signal();
        let movements = generate_movements(&net).unwrap();
        let meso = generate_mesoscopic(&net, &movements).unwrap();
        for link in meso.links.values() {
            assert!(link.macro_link_id.is_valid() != link.macro_node_id.is_valid());
            if link.is_connection {
                assert!(link.movement_id.is_valid());
            } else {
                assert!(link.macro_link_id.is_valid());
            }
        }
    }

    #[test]
    fn compiling_twice_yields_identical_networks() {
        let build = || {
            let net = t_intersection_signal();
            let movements = generate_movements(&net).unwrap();
            let meso = generate_mesoscopic(&net, &movements).unwrap();
            let micro =
                generate_microscopic(&net, &meso, &movements, MicroGenOptions::default())
                    .unwrap();
            (movements, meso, micro)
        };
        let (movements_a, meso_a, micro_a) = build();
        let (movements_b, meso_b, micro_b) = build();
        assert_eq!(movements_a, movements_b);
        assert_eq!(meso_a, meso_b);
        assert_eq!(micro_a, micro_b);
    }

    #[test]
    fn invalid_lanes_info_fails_the_compile() {
        let mut net = one_way_chain();
        net.links
            .get_mut(&mrn_core::LinkId(1))
            .unwrap()
            .lanes_info
            .lanes_change_points
            .pop();
        let movements = generate_movements(&net).unwrap();
        let err = generate_mesoscopic(&net, &movements).unwrap_err();
        assert!(matches!(err, GenError::Net(_)));
    }

    #[test]
    fn dangling_movement_node_fails_the_compile() {
        use mrn_core::{LinkId, MovementCompositeType, MovementId, MovementType, NodeId};
        use mrn_net::{Movement, Movements};

        let net = one_way_chain();
        let mut movements = Movements::new();
        let mvmt = Movement::new(
            MovementId(0),
            NodeId(999),
            LinkId(1),
            LinkId(2),
            MovementType::Thru,
            MovementCompositeType::EBT,
        );
        movements.insert(mvmt.id, mvmt);
        let err = generate_mesoscopic(&net, &movements).unwrap_err();
        assert!(matches!(err, GenError::NodeNotFound { .. }));
    }

    #[test]
    fn geojson_surface_covers_all_layers() {
        let net = t_intersection_signal();
        let movements = generate_movements(&net).unwrap();
        let meso = generate_mesoscopic(&net, &movements).unwrap();
        let micro =
            generate_microscopic(&net, &meso, &movements, MicroGenOptions::default()).unwrap();

        let meso_fc = meso.geo_feature_collection();
        assert_eq!(meso_fc.features.len(), meso.nodes.len() + meso.links.len());
        let micro_fc = micro.geo_feature_collection();
        assert_eq!(
            micro_fc.features.len(),
            micro.nodes.len() + micro.links.len()
        );
        let movements_fc = mrn_net::geojson::movements_feature_collection(&movements);
        assert_eq!(movements_fc.features.len(), movements.len());
    }
}
