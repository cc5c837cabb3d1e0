use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadCell;

/// Deterministic stand-in direction for coincident points, keyed off the
/// pair of indices so repeated ticks do not oscillate.
fn jiggle_direction(a: usize, b: usize) -> Vec2 {
    let angle = ((a as f32) * 0.618_034 + (b as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

#[derive(Clone, Copy)]
pub(super) struct ChargeParams {
    pub(super) strength: f32,
    pub(super) distance_min_sq: f32,
    pub(super) distance_max_sq: f32,
    pub(super) theta_sq: f32,
    pub(super) alpha: f32,
}

/// Barnes-Hut many-body force for a single node. A negative strength
/// repels. Matches the classic accumulation: distant cells contribute
/// their aggregate mass at the center of mass, near cells recurse down
/// to individual points, and the squared distance is clamped to the
/// configured band.
pub(super) fn accumulate_charge(
    cell: &QuadCell,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
    velocity: &mut Vec2,
) {
    if cell.mass <= 0.0 {
        return;
    }

    let point = positions[index];
    let delta = cell.center_of_mass - point;
    let distance_sq = delta.length_sq();

    let far_enough = !cell.bounds.contains(point)
        && (cell.bounds.side_length() * cell.bounds.side_length()) < params.theta_sq * distance_sq;
    if far_enough {
        if distance_sq < params.distance_max_sq {
            let clamped = clamp_distance_sq(distance_sq, params.distance_min_sq);
            *velocity += delta * (params.strength * cell.mass * params.alpha / clamped);
        }
        return;
    }

    if cell.is_leaf() {
        for &other in &cell.indices {
            if other == index {
                continue;
            }
            let mut delta = positions[other] - point;
            let mut distance_sq = delta.length_sq();
            if distance_sq <= 0.0 {
                delta = jiggle_direction(index, other) * 1e-3;
                distance_sq = delta.length_sq();
            }
            if distance_sq >= params.distance_max_sq {
                continue;
            }
            let clamped = clamp_distance_sq(distance_sq, params.distance_min_sq);
            *velocity += delta * (params.strength * params.alpha / clamped);
        }
        return;
    }

    for child in cell.children.iter().flatten() {
        accumulate_charge(child, index, positions, params, velocity);
    }
}

fn clamp_distance_sq(distance_sq: f32, distance_min_sq: f32) -> f32 {
    if distance_sq < distance_min_sq {
        (distance_min_sq * distance_sq).sqrt().max(f32::EPSILON)
    } else {
        distance_sq
    }
}

#[derive(Clone, Copy)]
pub(super) struct CollideParams {
    pub(super) separation: f32,
    pub(super) strength: f32,
}

/// Pairwise overlap resolution over the quadtree, applied to the
/// predicted positions. Each overlapping pair is pushed apart through
/// equal and opposite velocity corrections. One call resolves each pair
/// at most once; the caller bounds the iteration count.
pub(super) fn resolve_collision_pairs(
    cell_a: &QuadCell,
    cell_b: &QuadCell,
    same_cell: bool,
    predicted: &[Vec2],
    params: CollideParams,
    velocities: &mut [Vec2],
) {
    let reach_sq = params.separation * params.separation;
    if cell_a.bounds.distance_sq_to(cell_b.bounds) > reach_sq {
        return;
    }

    if cell_a.is_leaf() && cell_b.is_leaf() {
        if same_cell {
            for i in 0..cell_a.indices.len() {
                for j in (i + 1)..cell_a.indices.len() {
                    separate_pair(
                        cell_a.indices[i],
                        cell_a.indices[j],
                        predicted,
                        params,
                        velocities,
                    );
                }
            }
        } else {
            for &from in &cell_a.indices {
                for &to in &cell_b.indices {
                    separate_pair(from, to, predicted, params, velocities);
                }
            }
        }
        return;
    }

    if same_cell {
        for first in 0..4 {
            let Some(child_a) = cell_a.children[first].as_ref() else {
                continue;
            };
            resolve_collision_pairs(child_a, child_a, true, predicted, params, velocities);
            for second in (first + 1)..4 {
                let Some(child_b) = cell_a.children[second].as_ref() else {
                    continue;
                };
                resolve_collision_pairs(child_a, child_b, false, predicted, params, velocities);
            }
        }
        return;
    }

    let split_a = if cell_a.is_leaf() {
        false
    } else if cell_b.is_leaf() {
        true
    } else {
        cell_a.bounds.half_extent >= cell_b.bounds.half_extent
    };

    if split_a {
        for child in cell_a.children.iter().flatten() {
            resolve_collision_pairs(child, cell_b, false, predicted, params, velocities);
        }
    } else {
        for child in cell_b.children.iter().flatten() {
            resolve_collision_pairs(cell_a, child, false, predicted, params, velocities);
        }
    }
}

fn separate_pair(
    from: usize,
    to: usize,
    predicted: &[Vec2],
    params: CollideParams,
    velocities: &mut [Vec2],
) {
    let mut delta = predicted[from] - predicted[to];
    let mut distance = delta.length();
    if distance <= 1e-4 {
        delta = jiggle_direction(from, to) * 1e-3;
        distance = delta.length();
    }
    if distance >= params.separation {
        return;
    }

    let push = delta * ((params.separation - distance) / distance * params.strength * 0.5);
    velocities[from] += push;
    velocities[to] -= push;
}
