//! Pass-through analysis: which macroscopic nodes are real intersections and
//! which merely interrupt a continuing road.
//!
//! Every node starts as an intersection.  A node is demoted to pass-through
//! when it is unsignalized, has fan-in 1 or fan-out 1, none of its
//! opposite-side links doubles back (|angle| > 135° would mean a reverse
//! branch hangs off the node), and no two of its movements share a partner
//! link.  The resulting flags drive both the mesoscopic cut policy and the
//! microscopic gap closure.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;

use mrn_core::{ControlType, LinkId, NodeId};
use mrn_geom::angle_between;
use mrn_net::{MacroNet, Movements};

use crate::error::{GenError, GenResult};

/// Precomputed per-node and per-link flags shared by the meso and micro
/// builders.
#[derive(Clone, Debug, Default)]
pub struct MovementFlags {
    /// `false` marks a pass-through node; everything else is an intersection.
    pub nodes_need_movement: BTreeMap<NodeId, bool>,
    /// The solitary incoming link of a fan-in-1 pass-through node: its
    /// downstream end is the merge target.
    pub downstream_is_target: BTreeMap<LinkId, bool>,
    /// The solitary outgoing link of a fan-out-1 pass-through node.
    pub upstream_is_target: BTreeMap<LinkId, bool>,
    /// Link ends that get only the minimal shortcut cut instead of a full
    /// movement end-cap.
    pub downstream_shortcut: BTreeMap<LinkId, bool>,
    pub upstream_shortcut: BTreeMap<LinkId, bool>,
}

impl MovementFlags {
    pub fn needs_movement(&self, node: NodeId) -> bool {
        self.nodes_need_movement.get(&node).copied().unwrap_or(true)
    }

    fn flag(map: &BTreeMap<LinkId, bool>, link: LinkId) -> bool {
        map.get(&link).copied().unwrap_or(false)
    }

    pub fn is_downstream_target(&self, link: LinkId) -> bool {
        Self::flag(&self.downstream_is_target, link)
    }

    pub fn is_upstream_target(&self, link: LinkId) -> bool {
        Self::flag(&self.upstream_is_target, link)
    }

    pub fn has_downstream_shortcut(&self, link: LinkId) -> bool {
        Self::flag(&self.downstream_shortcut, link)
    }

    pub fn has_upstream_shortcut(&self, link: LinkId) -> bool {
        Self::flag(&self.upstream_shortcut, link)
    }
}

/// Classify every node and link end of the macroscopic network.
pub fn compute_movement_flags(
    macro_net: &MacroNet,
    movements: &Movements,
) -> GenResult<MovementFlags> {
    let mut flags = MovementFlags::default();
    for node in macro_net.nodes.values() {
        flags.nodes_need_movement.insert(node.id, true);
    }
    for link in macro_net.links.values() {
        flags.downstream_is_target.insert(link.id, false);
        flags.upstream_is_target.insert(link.id, false);
        flags.downstream_shortcut.insert(link.id, false);
        flags.upstream_shortcut.insert(link.id, false);
    }

    // Movements grouped by node, ascending movement IDs.
    let mut movements_by_node: BTreeMap<NodeId, Vec<&mrn_net::Movement>> = BTreeMap::new();
    for mvmt in movements.values() {
        movements_by_node
            .entry(mvmt.macro_node_id)
            .or_default()
            .push(mvmt);
    }

    for node in macro_net.nodes.values() {
        if node.control_type == ControlType::Signal {
            continue;
        }
        let incoming = &node.incoming_links;
        let outcoming = &node.outcoming_links;

        if incoming.len() == 1 && !outcoming.is_empty() {
            // Fan-in 1: the incoming link continues through this node.
            let incoming_id = incoming[0];
            let incoming_link = macro_net.links.get(&incoming_id).ok_or_else(|| {
                GenError::link_not_found(
                    incoming_id,
                    format!("pass-through check, incoming link at node {}", node.id),
                )
            })?;

            let mut doubles_back = false;
            for &outcoming_id in outcoming {
                let outcoming_link = macro_net.links.get(&outcoming_id).ok_or_else(|| {
                    GenError::link_not_found(
                        outcoming_id,
                        format!("pass-through check, outgoing link at node {}", node.id),
                    )
                })?;
                let angle = angle_between(
                    &incoming_link.geom_euclidean,
                    &outcoming_link.geom_euclidean,
                );
                if angle > 0.75 * PI || angle < -0.75 * PI {
                    doubles_back = true;
                    break;
                }
            }
            if doubles_back {
                continue;
            }

            // Forking: two movements into the same outgoing link require a
            // real intersection.
            let mut seen: BTreeSet<LinkId> = BTreeSet::new();
            let mut forked = false;
            if let Some(node_movements) = movements_by_node.get(&node.id) {
                for mvmt in node_movements {
                    if !seen.insert(mvmt.outcome_macro_link_id) {
                        forked = true;
                        break;
                    }
                }
            }
            if forked {
                continue;
            }

            flags.nodes_need_movement.insert(node.id, false);
            flags.downstream_shortcut.insert(incoming_id, true);
            flags.downstream_is_target.insert(incoming_id, true);
            for &outcoming_id in outcoming {
                flags.upstream_shortcut.insert(outcoming_id, true);
            }
        } else if !incoming.is_empty() && outcoming.len() == 1 {
            // Fan-out 1: the outgoing link absorbs all incoming traffic.
            let outcoming_id = outcoming[0];
            let outcoming_link = macro_net.links.get(&outcoming_id).ok_or_else(|| {
                GenError::link_not_found(
                    outcoming_id,
                    format!("pass-through check, outgoing link at node {}", node.id),
                )
            })?;

            let mut doubles_back = false;
            for &incoming_id in incoming {
                let incoming_link = macro_net.links.get(&incoming_id).ok_or_else(|| {
                    GenError::link_not_found(
                        incoming_id,
                        format!("pass-through check, incoming link at node {}", node.id),
                    )
                })?;
                let angle = angle_between(
                    &incoming_link.geom_euclidean,
                    &outcoming_link.geom_euclidean,
                );
                if angle > 0.75 * PI || angle < -0.75 * PI {
                    doubles_back = true;
                    break;
                }
            }
            if doubles_back {
                continue;
            }

            let mut seen: BTreeSet<LinkId> = BTreeSet::new();
            let mut forked = false;
            if let Some(node_movements) = movements_by_node.get(&node.id) {
                for mvmt in node_movements {
                    if !seen.insert(mvmt.income_macro_link_id) {
                        forked = true;
                        break;
                    }
                }
            }
            if forked {
                continue;
            }

            flags.nodes_need_movement.insert(node.id, false);
            flags.upstream_shortcut.insert(outcoming_id, true);
            flags.upstream_is_target.insert(outcoming_id, true);
            for &incoming_id in incoming {
                flags.downstream_shortcut.insert(incoming_id, true);
            }
        }
    }

    Ok(flags)
}
