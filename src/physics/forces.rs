use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;

const BARNES_HUT_THETA: f32 = 0.72;
const MIN_DISTANCE: f32 = 0.0001;

#[derive(Clone, Copy)]
pub(super) struct Repulsion {
    pub(super) strength: f32,
    pub(super) softening: f32,
}

/// Unit vector from `b` to `a`, or a deterministic direction when they coincide.
fn separation(a: Vec2, b: Vec2, a_index: usize, b_index: usize) -> (Vec2, f32) {
    let delta = a - b;
    let distance = delta.length();
    if distance > MIN_DISTANCE {
        (delta / distance, distance)
    } else {
        let angle = ((a_index as f32) * 0.618_034 + (b_index as f32) * 0.414_214) * TAU;
        (vec2(angle.cos(), angle.sin()), 0.0)
    }
}

pub(super) fn accumulate_repulsion(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    repulsion: Repulsion,
    force: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other in &node.bodies {
            if other == index {
                continue;
            }
            let (direction, distance) = separation(point, positions[other], index, other);
            let magnitude = repulsion.strength / (distance * distance + repulsion.softening);
            *force += direction * magnitude;
        }
        return;
    }

    let delta = point - node.center_of_mass;
    let distance_sq = delta.length_sq().max(MIN_DISTANCE);
    let far_enough = !node.bounds.contains(point)
        && node.bounds.side() / distance_sq.sqrt() < BARNES_HUT_THETA
        && node.mass > 1.0;

    if far_enough {
        let direction = delta / distance_sq.sqrt();
        let magnitude = repulsion.strength * node.mass / (distance_sq + repulsion.softening);
        *force += direction * magnitude;
        return;
    }

    for child in node.children() {
        accumulate_repulsion(child, index, positions, repulsion, force);
    }
}

#[derive(Clone, Copy)]
pub(super) struct Collision {
    pub(super) strength: f32,
    /// Squared upper bound on any pair's contact distance, for cell pruning.
    pub(super) reach_sq: f32,
}

fn resolve_overlap(
    from: usize,
    to: usize,
    positions: &[Vec2],
    radii: &[f32],
    strength: f32,
    forces: &mut [Vec2],
) {
    let (direction, distance) = separation(positions[from], positions[to], from, to);
    let contact = radii[from] + radii[to];
    if distance < contact {
        let push = direction * ((contact - distance) * strength);
        forces[from] += push;
        forces[to] -= push;
    }
}

/// Dual-tree traversal visiting each unordered pair of bodies at most once.
pub(super) fn accumulate_collisions(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    positions: &[Vec2],
    radii: &[f32],
    collision: Collision,
    forces: &mut [Vec2],
) {
    if node_a.bounds.gap_sq(node_b.bounds) > collision.reach_sq {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.bodies.iter().enumerate() {
                for &to in &node_a.bodies[offset + 1..] {
                    resolve_overlap(from, to, positions, radii, collision.strength, forces);
                }
            }
        } else {
            for &from in &node_a.bodies {
                for &to in &node_b.bodies {
                    resolve_overlap(from, to, positions, radii, collision.strength, forces);
                }
            }
        }
        return;
    }

    if same_node {
        let children = node_a.children().collect::<Vec<_>>();
        for (offset, child_a) in children.iter().enumerate() {
            accumulate_collisions(child_a, child_a, true, positions, radii, collision, forces);
            for child_b in &children[offset + 1..] {
                accumulate_collisions(child_a, child_b, false, positions, radii, collision, forces);
            }
        }
        return;
    }

    let split_a = !node_a.is_leaf()
        && (node_b.is_leaf() || node_a.bounds.half_extent >= node_b.bounds.half_extent);
    if split_a {
        for child in node_a.children() {
            accumulate_collisions(child, node_b, false, positions, radii, collision, forces);
        }
    } else {
        for child in node_b.children() {
            accumulate_collisions(node_a, child, false, positions, radii, collision, forces);
        }
    }
}
