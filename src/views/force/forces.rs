use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;
use super::simulation::{NodeState, SimLink};

/// Smallest separation used when two vertices coincide.
const JIGGLE: f32 = 1e-3;

#[derive(Clone, Copy)]
pub(super) struct ChargeParams {
    pub(super) strength: f32,
    pub(super) theta_sq: f32,
    pub(super) distance_min_sq: f32,
    pub(super) alpha: f32,
}

/// Deterministic stand-in direction for a pair of coincident vertices.
fn separation_direction(first: usize, second: usize) -> Vec2 {
    let angle = ((first as f32) * 0.618_034 + (second as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

fn nonzero(delta: Vec2, first: usize, second: usize) -> Vec2 {
    if delta.length_sq() > f32::EPSILON {
        delta
    } else {
        separation_direction(first, second) * JIGGLE
    }
}

fn charge_between(delta: Vec2, weight: f32, params: ChargeParams) -> Vec2 {
    let mut distance_sq = delta.length_sq();
    if distance_sq < params.distance_min_sq {
        distance_sq = (params.distance_min_sq * distance_sq).sqrt();
    }
    delta * (params.strength * weight * params.alpha / distance_sq)
}

/// Barnes–Hut walk; `delta` points from the vertex towards the attracting
/// mass, so a negative strength pushes the vertex away.
pub(super) fn accumulate_charge_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
    velocity: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other in &node.indices {
            if other == index {
                continue;
            }
            let delta = nonzero(positions[other] - point, index, other);
            *velocity += charge_between(delta, 1.0, params);
        }
        return;
    }

    let delta = node.center_of_mass - point;
    let side = node.bounds.side_length();
    if side * side / params.theta_sq < delta.length_sq() {
        *velocity += charge_between(delta, node.mass, params);
        return;
    }

    for child in node.children() {
        accumulate_charge_for_node(child, index, positions, params, velocity);
    }
}

/// Collects index pairs `(i, j)` with `i < j` whose predicted centres lie
/// closer than `range`, walking both trees cell against cell.
pub(super) fn collect_collision_pairs(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    positions: &[Vec2],
    range: f32,
    pairs: &mut Vec<(usize, usize)>,
) {
    if node_a.bounds.distance_sq_to(node_b.bounds) > range * range {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        let mut push_if_close = |from: usize, to: usize| {
            if (positions[from] - positions[to]).length_sq() < range * range {
                pairs.push((from.min(to), from.max(to)));
            }
        };

        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[offset + 1..] {
                    push_if_close(from, to);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    push_if_close(from, to);
                }
            }
        }
        return;
    }

    if same_node {
        let children = node_a.children().collect::<Vec<_>>();
        for (first, child_a) in children.iter().enumerate() {
            collect_collision_pairs(child_a, child_a, true, positions, range, pairs);
            for child_b in &children[first + 1..] {
                collect_collision_pairs(child_a, child_b, false, positions, range, pairs);
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.size >= node_b.bounds.size
    };

    if split_a {
        for child in node_a.children() {
            collect_collision_pairs(child, node_b, false, positions, range, pairs);
        }
    } else {
        for child in node_b.children() {
            collect_collision_pairs(node_a, child, false, positions, range, pairs);
        }
    }
}

/// Resolves overlaps between equal circles of `radius` on predicted
/// positions. Pairs are visited in index order and each correction is seen
/// by the pairs that follow.
pub(super) fn apply_collision(nodes: &mut [NodeState], radius: f32, strength: f32) {
    let range = radius * 2.0;
    if nodes.len() < 2 || range <= 0.0 {
        return;
    }

    let predicted = nodes
        .iter()
        .map(|node| node.position + node.velocity)
        .collect::<Vec<_>>();
    let Some(tree) = QuadNode::build(&predicted) else {
        return;
    };

    let mut pairs = Vec::new();
    collect_collision_pairs(&tree, &tree, true, &predicted, range, &mut pairs);
    pairs.sort_unstable();

    for (first, second) in pairs {
        let origin = nodes[first].position + nodes[first].velocity;
        let other = nodes[second].position + nodes[second].velocity;
        let delta = nonzero(origin - other, first, second);
        let distance = delta.length();
        if distance >= range {
            continue;
        }

        // Equal radii split the correction evenly.
        let push = delta * ((range - distance) / distance * strength * 0.5);
        nodes[first].velocity += push;
        nodes[second].velocity -= push;
    }
}

pub(super) fn apply_links(nodes: &mut [NodeState], links: &[SimLink], distance: f32, alpha: f32) {
    for link in links {
        let (source, target) = (link.source, link.target);
        let delta = nonzero(
            nodes[target].position + nodes[target].velocity
                - nodes[source].position
                - nodes[source].velocity,
            source,
            target,
        );
        let length = delta.length();
        let correction = delta * ((length - distance) / length * alpha * link.strength);

        nodes[target].velocity -= correction * link.bias;
        nodes[source].velocity += correction * (1.0 - link.bias);
    }
}

pub(super) fn apply_charge(nodes: &mut [NodeState], params: ChargeParams) {
    if nodes.len() < 2 || params.strength == 0.0 {
        return;
    }

    let positions = nodes.iter().map(|node| node.position).collect::<Vec<_>>();
    let Some(tree) = QuadNode::build(&positions) else {
        return;
    };

    for (index, node) in nodes.iter_mut().enumerate() {
        accumulate_charge_for_node(&tree, index, &positions, params, &mut node.velocity);
    }
}

pub(super) fn apply_centering(nodes: &mut [NodeState], center: Vec2) {
    if nodes.is_empty() {
        return;
    }

    let centroid = nodes.iter().fold(Vec2::ZERO, |sum, node| sum + node.position) / nodes.len() as f32;
    let shift = centroid - center;
    for node in nodes {
        node.position -= shift;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32, y: f32) -> NodeState {
        NodeState {
            position: vec2(x, y),
            velocity: Vec2::ZERO,
        }
    }

    #[test]
    fn overlapping_vertices_are_pushed_apart_symmetrically() {
        let mut nodes = vec![at(0.0, 0.0), at(10.0, 0.0)];
        apply_collision(&mut nodes, 9.0, 1.0);

        assert!(nodes[0].velocity.x < 0.0);
        assert!(nodes[1].velocity.x > 0.0);
        assert!((nodes[0].velocity + nodes[1].velocity).length() < 1e-5);
        let predicted = (nodes[1].position + nodes[1].velocity) - (nodes[0].position + nodes[0].velocity);
        assert!((predicted.length() - 18.0).abs() < 1e-3);
    }

    #[test]
    fn separated_vertices_do_not_collide() {
        let mut nodes = vec![at(0.0, 0.0), at(40.0, 0.0)];
        apply_collision(&mut nodes, 9.0, 1.0);
        assert!(nodes.iter().all(|node| node.velocity == Vec2::ZERO));
    }

    #[test]
    fn coincident_vertices_separate() {
        let mut nodes = vec![at(3.0, 3.0), at(3.0, 3.0)];
        apply_collision(&mut nodes, 9.0, 1.0);
        assert!(nodes[0].velocity.length() > 1.0);
        assert!((nodes[0].velocity + nodes[1].velocity).length() < 1e-4);
    }

    #[test]
    fn link_pulls_towards_rest_length() {
        let mut nodes = vec![at(0.0, 0.0), at(100.0, 0.0)];
        let links = [SimLink {
            source: 0,
            target: 1,
            strength: 1.0,
            bias: 0.5,
        }];
        apply_links(&mut nodes, &links, 30.0, 1.0);

        assert!((nodes[0].velocity.x - 35.0).abs() < 1e-4);
        assert!((nodes[1].velocity.x + 35.0).abs() < 1e-4);
    }

    #[test]
    fn negative_charge_repels_and_positive_attracts() {
        let params = ChargeParams {
            strength: -80.0,
            theta_sq: 0.81,
            distance_min_sq: 1.0,
            alpha: 1.0,
        };
        let mut nodes = vec![at(0.0, 0.0), at(20.0, 0.0)];
        apply_charge(&mut nodes, params);
        assert!((nodes[0].velocity.x + 4.0).abs() < 1e-4);
        assert!((nodes[1].velocity.x - 4.0).abs() < 1e-4);

        let mut nodes = vec![at(0.0, 0.0), at(20.0, 0.0)];
        apply_charge(&mut nodes, ChargeParams { strength: 80.0, ..params });
        assert!(nodes[0].velocity.x > 0.0);
    }

    #[test]
    fn far_clusters_are_approximated_by_their_mass() {
        let mut nodes = (0..30)
            .map(|index| at(1000.0 + (index % 5) as f32, (index / 5) as f32))
            .collect::<Vec<_>>();
        nodes.push(at(0.0, 0.0));
        let params = ChargeParams {
            strength: -80.0,
            theta_sq: 0.81,
            distance_min_sq: 1.0,
            alpha: 1.0,
        };
        apply_charge(&mut nodes, params);

        let lone = nodes[30].velocity;
        let exact = -80.0 * 30.0 / 1002.0;
        assert!(lone.x < 0.0);
        assert!((lone.x - exact).abs() / exact.abs() < 0.05);
    }

    #[test]
    fn centering_moves_centroid_onto_target() {
        let mut nodes = vec![at(0.0, 0.0), at(10.0, 20.0)];
        apply_centering(&mut nodes, vec2(100.0, 100.0));
        let centroid = (nodes[0].position + nodes[1].position) / 2.0;
        assert!((centroid - vec2(100.0, 100.0)).length() < 1e-4);
    }
}
