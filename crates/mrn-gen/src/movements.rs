//! Movement inference: one movement per permitted (incoming link, outgoing
//! link, lane range) triple at every macroscopic node.
//!
//! Two regimes, split by fan-out:
//!
//! - **merge** — a single outgoing link fed by several incoming ones; each
//!   incoming link claims a lane range on the common outgoing link;
//! - **diverge / intersection** — each incoming link distributes its
//!   outgoing lanes over the outgoing links, sorted leftmost→rightmost by
//!   turn angle.
//!
//! Reverse twins (the opposite direction of the same road) never pair, and
//! centroid nodes emit nothing.

use std::f64::consts::PI;
use std::time::Instant;

use geo_types::LineString;
use log::debug;
use mrn_core::{
    DirectionType, MovementCompositeType, MovementId, MovementType,
};
use mrn_geom::{angle_between, first_bearing};
use mrn_net::{MacroLink, MacroNet, MacroNode, Movement, Movements};

use crate::error::{GenError, GenResult};

/// Lanes reserved for the leftmost turn at a diverge of three or more.
const LEFT_MOST_LANES_DEFAULT: i32 = 1;
/// Lanes reserved for the rightmost turn at a diverge.
const RIGHT_MOST_LANES_DEFAULT: i32 = 1;

/// Inclusive *sequence-index* ranges claimed by one link pairing: positions
/// in the incoming link's outgoing lane vector and in the outgoing link's
/// lane vector.
#[derive(Copy, Clone, Debug)]
struct LaneConnection {
    income: (i32, i32),
    outcome: (i32, i32),
}

/// Synthesize movements for every node of the macroscopic network.
///
/// Nodes are visited in ascending ID order and movement IDs allocated
/// monotonically, so the result is identical across runs.
pub fn generate_movements(macro_net: &MacroNet) -> GenResult<Movements> {
    let started = Instant::now();
    let mut movements = Movements::new();
    let mut next_id: i64 = 0;
    for node in macro_net.nodes.values() {
        if node.is_centroid {
            continue;
        }
        find_movements(node, macro_net, &mut next_id, &mut movements)?;
    }
    debug!(
        target: "gen_movement",
        "generated {} movements in {:.3}s",
        movements.len(),
        started.elapsed().as_secs_f64()
    );
    Ok(movements)
}

/// Movements for a single node.
fn find_movements(
    node: &MacroNode,
    macro_net: &MacroNet,
    next_id: &mut i64,
    out: &mut Movements,
) -> GenResult<()> {
    if node.incoming_links.is_empty() || node.outcoming_links.is_empty() {
        return Ok(());
    }

    if node.outcoming_links.len() == 1 {
        // Merge: many incoming, one outgoing.
        let outcoming_id = node.outcoming_links[0];
        let outcoming = macro_net.links.get(&outcoming_id).ok_or_else(|| {
            GenError::link_not_found(
                outcoming_id,
                format!("merge outgoing link at node {}", node.id),
            )
        })?;

        let mut incoming_list: Vec<&MacroLink> = Vec::new();
        for &incoming_id in &node.incoming_links {
            let incoming = macro_net.links.get(&incoming_id).ok_or_else(|| {
                GenError::link_not_found(
                    incoming_id,
                    format!("merge incoming link at node {}", node.id),
                )
            })?;
            // Ignore the reverse twin.
            if incoming.source_node != outcoming.target_node {
                incoming_list.push(incoming);
            }
        }
        if incoming_list.is_empty() {
            return Ok(());
        }

        let connections = spans_connections(outcoming, &incoming_list);
        let outcome_lane_numbers = outcoming.outcoming_lane_indices();
        for (i, &incoming) in incoming_list.iter().enumerate() {
            let Some(conn) = connections[i] else { continue };
            let income_lane_numbers = incoming.outcoming_lane_indices();
            push_movement(
                out,
                next_id,
                node,
                incoming,
                outcoming,
                conn,
                &income_lane_numbers,
                &outcome_lane_numbers,
            );
        }
    } else {
        // Diverge / intersection: distribute each incoming link's lanes.
        for &incoming_id in &node.incoming_links {
            let incoming = macro_net.links.get(&incoming_id).ok_or_else(|| {
                GenError::link_not_found(
                    incoming_id,
                    format!("intersection incoming link at node {}", node.id),
                )
            })?;

            let mut outcoming_list: Vec<&MacroLink> = Vec::new();
            for &outcoming_id in &node.outcoming_links {
                let outcoming = macro_net.links.get(&outcoming_id).ok_or_else(|| {
                    GenError::link_not_found(
                        outcoming_id,
                        format!("intersection outgoing link at node {}", node.id),
                    )
                })?;
                if incoming.source_node != outcoming.target_node {
                    outcoming_list.push(outcoming);
                }
            }
            if outcoming_list.is_empty() {
                continue;
            }

            let connections = intersections_connections(incoming, &outcoming_list);
            let income_lane_numbers = incoming.outcoming_lane_indices();
            for (i, &outcoming) in outcoming_list.iter().enumerate() {
                let Some(conn) = connections[i] else { continue };
                let outcome_lane_numbers = outcoming.outcoming_lane_indices();
                push_movement(
                    out,
                    next_id,
                    node,
                    incoming,
                    outcoming,
                    conn,
                    &income_lane_numbers,
                    &outcome_lane_numbers,
                );
            }
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn push_movement(
    out: &mut Movements,
    next_id: &mut i64,
    node: &MacroNode,
    income: &MacroLink,
    outcome: &MacroLink,
    conn: LaneConnection,
    income_lane_numbers: &[i32],
    outcome_lane_numbers: &[i32],
) {
    let (composite, movement_type) =
        classify_movement(&income.geom_euclidean, &outcome.geom_euclidean);

    let id = MovementId(*next_id);
    *next_id += 1;

    let mut mvmt = Movement::new(id, node.id, income.id, outcome.id, movement_type, composite);
    mvmt.lanes_num = conn.income.1 - conn.income.0 + 1;
    mvmt.income_lane_start = income_lane_numbers[conn.income.0 as usize];
    mvmt.income_lane_end = income_lane_numbers[conn.income.1 as usize];
    mvmt.income_lane_start_seq = conn.income.0;
    mvmt.income_lane_end_seq = conn.income.1;
    mvmt.outcome_lane_start = outcome_lane_numbers[conn.outcome.0 as usize];
    mvmt.outcome_lane_end = outcome_lane_numbers[conn.outcome.1 as usize];
    mvmt.outcome_lane_start_seq = conn.outcome.0;
    mvmt.outcome_lane_end_seq = conn.outcome.1;
    mvmt.control_type = node.control_type;
    mvmt.allowed_agent_types = income.allowed_agent_types.clone();
    mvmt.geom = movement_geom(&income.geom, &outcome.geom);
    mvmt.geom_euclidean = movement_geom(&income.geom_euclidean, &outcome.geom_euclidean);
    out.insert(id, mvmt);
}

/// Two-point maneuver geometry: last vertex of the approach, first vertex of
/// the exit.
fn movement_geom(income: &LineString<f64>, outcome: &LineString<f64>) -> LineString<f64> {
    match (income.0.last(), outcome.0.first()) {
        (Some(&from), Some(&to)) => LineString::new(vec![from, to]),
        _ => LineString::new(Vec::new()),
    }
}

/// Classify a maneuver by turn angle and approach heading.
///
/// The maneuver type comes from the signed angle between the link
/// directions: within ±22.5° is through, up to ±135° a left/right turn,
/// beyond that a U-turn.  The cardinal direction quantizes the approach
/// bearing into 90° sectors.
fn classify_movement(
    income: &LineString<f64>,
    outcome: &LineString<f64>,
) -> (MovementCompositeType, MovementType) {
    let angle = angle_between(income, outcome);
    let movement_type = if angle.abs() <= PI / 8.0 {
        MovementType::Thru
    } else if angle > PI / 8.0 && angle <= 0.75 * PI {
        MovementType::Left
    } else if angle < -PI / 8.0 && angle > -0.75 * PI {
        MovementType::Right
    } else {
        MovementType::UTurn
    };

    let bearing = first_bearing(income);
    let direction = if bearing > -PI / 4.0 && bearing <= PI / 4.0 {
        DirectionType::EB
    } else if bearing > PI / 4.0 && bearing <= 3.0 * PI / 4.0 {
        DirectionType::NB
    } else if bearing > -3.0 * PI / 4.0 && bearing <= -PI / 4.0 {
        DirectionType::SB
    } else {
        DirectionType::WB
    };

    (
        MovementCompositeType::from_parts(direction, movement_type),
        movement_type,
    )
}

/// Sort helper: indices of `angles` in descending order (leftmost turn
/// first).
fn descending_by_angle(angles: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..angles.len()).collect();
    order.sort_by(|&a, &b| {
        angles[b]
            .partial_cmp(&angles[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}

/// Lane distribution at a merge: every incoming link against the single
/// outgoing link.
///
/// The leftmost incoming link (largest angle) claims the rightmost of its
/// own lanes onto the leftmost outgoing lanes; every other incoming link
/// maps its leftmost lanes onto the rightmost outgoing lanes.
fn spans_connections(
    outcoming: &MacroLink,
    incoming: &[&MacroLink],
) -> Vec<Option<LaneConnection>> {
    let angles: Vec<f64> = incoming
        .iter()
        .map(|link| angle_between(&link.geom_euclidean, &outcoming.geom_euclidean))
        .collect();
    let order = descending_by_angle(&angles);

    let mut connections: Vec<Option<LaneConnection>> = vec![None; incoming.len()];
    let outcoming_lanes = outcoming.incoming_lanes();

    let left_idx = order[0];
    let left_out_lanes = incoming[left_idx].outcoming_lanes();
    let min_conn = outcoming_lanes.min(left_out_lanes);
    connections[left_idx] = Some(LaneConnection {
        income: (left_out_lanes - min_conn, left_out_lanes - 1),
        outcome: (0, min_conn - 1),
    });

    for &idx in &order[1..] {
        let Some(&in_out_lanes) = incoming[idx].lanes_info.lanes_list.last() else {
            continue;
        };
        let min_conn = outcoming_lanes.min(in_out_lanes);
        connections[idx] = Some(LaneConnection {
            income: (0, min_conn - 1),
            outcome: (outcoming_lanes - min_conn, outcoming_lanes - 1),
        });
    }
    connections
}

/// Lane distribution at a diverge: one incoming link against all its
/// outgoing links, sorted leftmost→rightmost.
fn intersections_connections(
    incoming: &MacroLink,
    outcoming: &[&MacroLink],
) -> Vec<Option<LaneConnection>> {
    let angles: Vec<f64> = outcoming
        .iter()
        .map(|link| angle_between(&incoming.geom_euclidean, &link.geom_euclidean))
        .collect();
    let order = descending_by_angle(&angles);

    let mut connections: Vec<Option<LaneConnection>> = vec![None; outcoming.len()];
    let out_lanes = incoming.outcoming_lanes();

    if out_lanes == 1 {
        // One feeding lane: every branch departs from it, each landing on its
        // own rightmost lane.
        connections[order[0]] = Some(LaneConnection { income: (0, 0), outcome: (0, 0) });
        for &idx in &order[1..] {
            let in_lanes = outcoming[idx].incoming_lanes();
            connections[idx] = Some(LaneConnection {
                income: (0, 0),
                outcome: (in_lanes - 1, in_lanes - 1),
            });
        }
        return connections;
    }

    if order.len() == 1 {
        // Full connection straight through.
        let idx = order[0];
        let min_conn = out_lanes.min(outcoming[idx].incoming_lanes());
        connections[idx] = Some(LaneConnection {
            income: (0, min_conn - 1),
            outcome: (0, min_conn - 1),
        });
    } else if order.len() == 2 {
        // Rightmost lane reserved for the right branch, the rest go left.
        let left_idx = order[0];
        let min_conn =
            (out_lanes - LEFT_MOST_LANES_DEFAULT).min(outcoming[left_idx].incoming_lanes());
        connections[left_idx] = Some(LaneConnection {
            income: (0, min_conn - 1),
            outcome: (0, min_conn - 1),
        });
        let right_idx = order[1];
        let right_in = outcoming[right_idx].incoming_lanes();
        connections[right_idx] = Some(LaneConnection {
            income: (out_lanes - RIGHT_MOST_LANES_DEFAULT, out_lanes - 1),
            outcome: (right_in - RIGHT_MOST_LANES_DEFAULT, right_in - 1),
        });
    } else {
        // Three or more branches: defaults on the extremes, middles share
        // whatever remains.
        let left_idx = order[0];
        connections[left_idx] = Some(LaneConnection {
            income: (0, LEFT_MOST_LANES_DEFAULT - 1),
            outcome: (0, LEFT_MOST_LANES_DEFAULT - 1),
        });

        let middle_order = &order[1..order.len() - 1];
        let middle_count = middle_order.len();
        let spare_lanes = out_lanes - LEFT_MOST_LANES_DEFAULT - RIGHT_MOST_LANES_DEFAULT;

        if spare_lanes >= middle_count as i32 {
            // Enough lanes to go around: hand them out one at a time in a
            // cycle until the spare pool or every branch's capacity runs dry.
            let mut capacity: Vec<i32> = middle_order
                .iter()
                .map(|&idx| outcoming[idx].incoming_lanes())
                .collect();
            let mut assigned: Vec<i32> = vec![0; middle_count];
            let mut spare = spare_lanes;
            while spare > 0 && capacity.iter().sum::<i32>() > 0 {
                for m in 0..middle_count {
                    if capacity[m] == 0 || spare == 0 {
                        continue;
                    }
                    capacity[m] -= 1;
                    assigned[m] += 1;
                    spare -= 1;
                }
            }
            let mut start = LEFT_MOST_LANES_DEFAULT;
            for (m, &idx) in middle_order.iter().enumerate() {
                let in_lanes = outcoming[idx].incoming_lanes();
                connections[idx] = Some(LaneConnection {
                    income: (start, start + assigned[m] - 1),
                    outcome: (in_lanes - assigned[m], in_lanes - 1),
                });
                start += assigned[m];
            }
        } else if out_lanes < middle_count as i32 {
            // More branches than lanes: one lane per branch until lanes run
            // out, the remaining branches all leave from the last lane.
            let mut lane: i32 = -1;
            let mut link_idx: i32 = -1;
            for _ in 0..(out_lanes - 1) {
                lane += 1;
                link_idx = lane;
                let idx = middle_order[link_idx as usize];
                let in_lanes = outcoming[idx].incoming_lanes();
                connections[idx] = Some(LaneConnection {
                    income: (lane, lane),
                    outcome: (in_lanes - 1, in_lanes - 1),
                });
            }
            lane += 1;
            let start_link = link_idx + 1;
            for _ in (start_link.max(0) as usize)..middle_count {
                link_idx += 1;
                let idx = middle_order[link_idx as usize];
                let in_lanes = outcoming[idx].incoming_lanes();
                connections[idx] = Some(LaneConnection {
                    income: (lane, lane),
                    outcome: (in_lanes - 1, in_lanes - 1),
                });
            }
        } else {
            // One lane per middle branch, packed against the left reserve
            // when the counts line up exactly.
            let mut start = if out_lanes - LEFT_MOST_LANES_DEFAULT == middle_count as i32 {
                LEFT_MOST_LANES_DEFAULT
            } else {
                0
            };
            for &idx in middle_order {
                let in_lanes = outcoming[idx].incoming_lanes();
                connections[idx] = Some(LaneConnection {
                    income: (start, start),
                    outcome: (in_lanes - 1, in_lanes - 1),
                });
                start += 1;
            }
        }

        let right_idx = order[order.len() - 1];
        let right_in = outcoming[right_idx].incoming_lanes();
        connections[right_idx] = Some(LaneConnection {
            income: (out_lanes - RIGHT_MOST_LANES_DEFAULT, out_lanes - 1),
            outcome: (right_in - RIGHT_MOST_LANES_DEFAULT, right_in - 1),
        });
    }

    connections
}
