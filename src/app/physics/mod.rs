mod forces;
mod quadtree;

use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};
use thiserror::Error;

use crate::api::{Category, Polarity};

use forces::{ChargeParams, CollideParams, accumulate_charge, resolve_collision_pairs};
use quadtree::QuadCell;

// 1 - 0.001^(1/300): the conventional decay toward rest over ~300 ticks.
const ALPHA_DECAY: f32 = 0.022_823_6;
const VELOCITY_DECAY: f32 = 0.4;
const THETA_SQ: f32 = 0.81;

/// A simulated entity node. `pin` holds the drag-pin position; setting
/// and clearing it moves both coordinates together.
#[derive(Clone, Debug)]
pub struct SimNode {
    pub id: String,
    pub label: String,
    pub category: Category,
    pub degree: u32,
    pub query_pinned: bool,
    pub weight: f64,
    pub radius: f32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub pin: Option<Vec2>,
}

impl SimNode {
    pub fn is_pinned(&self) -> bool {
        self.pin.is_some()
    }
}

/// A link with endpoints resolved to node indices. Resolution happens
/// once in [`Simulation::set_graph`], never per tick.
#[derive(Clone, Debug)]
pub struct SimLink {
    pub source: usize,
    pub target: usize,
    pub source_id: String,
    pub target_id: String,
    pub freq: u32,
    pub polarity: Polarity,
    pub same_category: bool,
}

/// An unresolved link as produced by reconciliation, still naming its
/// endpoints by id.
#[derive(Clone, Debug)]
pub struct LinkSpec {
    pub source_id: String,
    pub target_id: String,
    pub freq: u32,
    pub polarity: Polarity,
    pub same_category: bool,
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("link {source_id} -> {target_id} references unknown node {node_id}")]
    DanglingLink {
        source_id: String,
        target_id: String,
        node_id: String,
    },
}

#[derive(Clone, Copy, Debug)]
pub struct CenterForce {
    pub enabled: bool,
    pub strength: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct ChargeForce {
    pub enabled: bool,
    pub strength: f32,
    pub distance_min: f32,
    pub distance_max: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct CollideForce {
    pub enabled: bool,
    pub strength: f32,
    pub radius: f32,
    pub iterations: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct SeparationForce {
    pub enabled: bool,
    pub strength: f32,
    pub centers: [Vec2; 4],
}

#[derive(Clone, Copy, Debug)]
pub struct LinkForce {
    pub enabled: bool,
    pub strength: f32,
    pub iterations: usize,
    pub distance_factor: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct RadialForce {
    pub enabled: bool,
    pub strength: f32,
    pub category_radius: [f32; 4],
}

/// Named force parameters. Visual-only settings (opacities, label
/// styling) live elsewhere; everything here feeds the integrator.
#[derive(Clone, Copy, Debug)]
pub struct ForceConfig {
    pub center: CenterForce,
    pub charge: ChargeForce,
    pub collide: CollideForce,
    pub separation: SeparationForce,
    pub link: LinkForce,
    pub radial: RadialForce,
}

impl ForceConfig {
    pub fn for_viewport(viewport: Vec2) -> Self {
        Self {
            center: CenterForce {
                enabled: false,
                strength: 0.1,
            },
            charge: ChargeForce {
                enabled: true,
                strength: -500.0,
                distance_min: 1.0,
                distance_max: 1000.0,
            },
            collide: CollideForce {
                enabled: true,
                strength: 0.4,
                radius: 29.0,
                iterations: 1,
            },
            separation: SeparationForce {
                enabled: true,
                strength: 0.1,
                centers: category_centers_circle(viewport.x * 0.25, viewport),
            },
            link: LinkForce {
                enabled: true,
                strength: 0.9,
                iterations: 1,
                distance_factor: 5.0,
            },
            radial: RadialForce {
                enabled: false,
                strength: 1.0,
                category_radius: [400.0, 300.0, 200.0, 1.0],
            },
        }
    }
}

/// Inverse mapping from link frequency onto a target distance band:
/// the most frequent relationship lands at `min_dist`, the rarest at
/// `max_dist`.
pub fn normalize_distance(x: f32, x_min: f32, x_max: f32, min_dist: f32, max_dist: f32) -> f32 {
    if x_max <= x_min {
        return min_dist;
    }
    let dist = x_max + 1.0 - x.min(x_max);
    (dist - x_min) / (x_max - x_min) * (max_dist - min_dist) + min_dist
}

/// Category attractor centers evenly spaced on a circle around the
/// viewport center.
pub fn category_centers_circle(radius: f32, viewport: Vec2) -> [Vec2; 4] {
    std::array::from_fn(|i| {
        let angle = std::f32::consts::TAU * (i as f32) / 4.0;
        vec2(
            viewport.x / 2.0 + (radius * angle.cos()).round(),
            viewport.y / 2.0 + (radius * angle.sin()).round(),
        )
    })
}

/// Category attractor centers on an ellipse with semi-axes `a`/`b`,
/// leaving the middle of the viewport free for the relation diagram.
pub fn category_centers_ellipse(a: f32, b: f32, viewport: Vec2) -> [Vec2; 4] {
    use std::f32::consts::PI;
    std::array::from_fn(|i| {
        let theta = (i as f32) * PI * 2.0 / 4.0;
        let tan = theta.tan();
        let x_sign = if theta < PI / 2.0 || theta > PI * 1.5 {
            1.0
        } else {
            -1.0
        };
        let y_sign = if theta < PI { 1.0 } else { -1.0 };
        let x = viewport.x / 2.0 + x_sign * a * b / (b * b + a * a * tan * tan).sqrt();
        let y = viewport.y / 2.0 + y_sign * a * b / (a * a + b * b / (tan * tan)).sqrt();
        vec2(x, y)
    })
}

#[derive(Default)]
struct SimScratch {
    positions: Vec<Vec2>,
    predicted: Vec<Vec2>,
}

/// The force simulation. Owns the working node/link arrays — the single
/// mutable source of truth for layout. Positions are written only here
/// (tick integration, pins) and by reconciliation via `set_graph`.
pub struct Simulation {
    nodes: Vec<SimNode>,
    links: Vec<SimLink>,
    index_by_id: HashMap<String, usize>,
    degrees: Vec<u32>,
    config: ForceConfig,
    viewport: Vec2,
    alpha: f32,
    alpha_target: f32,
    running: bool,
    max_observed_freq: u32,
    scratch: SimScratch,
}

impl Simulation {
    pub fn new(viewport: Vec2) -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            index_by_id: HashMap::new(),
            degrees: Vec::new(),
            config: ForceConfig::for_viewport(viewport),
            viewport,
            alpha: 1.0,
            alpha_target: 0.0,
            running: false,
            max_observed_freq: 1,
            scratch: SimScratch::default(),
        }
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Vec2) {
        self.viewport = viewport;
    }

    /// Update force parameters in place. Node velocities accumulated so
    /// far are untouched.
    pub fn configure(&mut self, config: ForceConfig) {
        self.config = config;
    }

    /// Replace the working arrays. Links are resolved to node indices
    /// here; a link naming a node absent from `nodes` is a hard error.
    pub fn set_graph(&mut self, nodes: Vec<SimNode>, links: Vec<LinkSpec>) -> Result<(), GraphError> {
        let mut index_by_id = HashMap::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            index_by_id.insert(node.id.clone(), index);
        }

        let mut resolved = Vec::with_capacity(links.len());
        for spec in links {
            let source = *index_by_id.get(&spec.source_id).ok_or_else(|| {
                GraphError::DanglingLink {
                    source_id: spec.source_id.clone(),
                    target_id: spec.target_id.clone(),
                    node_id: spec.source_id.clone(),
                }
            })?;
            let target = *index_by_id.get(&spec.target_id).ok_or_else(|| {
                GraphError::DanglingLink {
                    source_id: spec.source_id.clone(),
                    target_id: spec.target_id.clone(),
                    node_id: spec.target_id.clone(),
                }
            })?;
            resolved.push(SimLink {
                source,
                target,
                source_id: spec.source_id,
                target_id: spec.target_id,
                freq: spec.freq,
                polarity: spec.polarity,
                same_category: spec.same_category,
            });
        }

        let mut degrees = vec![0u32; nodes.len()];
        let mut max_freq = 1u32;
        for link in &resolved {
            degrees[link.source] += 1;
            degrees[link.target] += 1;
            max_freq = max_freq.max(link.freq);
        }

        self.nodes = nodes;
        self.links = resolved;
        self.index_by_id = index_by_id;
        self.degrees = degrees;
        self.max_observed_freq = max_freq;
        Ok(())
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    /// Mutable access for visual attributes (radius, labels). Positions
    /// must only be written through pins, ticking, or `set_graph`.
    pub fn nodes_mut(&mut self) -> &mut [SimNode] {
        &mut self.nodes
    }

    pub fn links(&self) -> &[SimLink] {
        &self.links
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    /// Target spring length for a link of the given frequency: frequent
    /// relationships pull closer together.
    pub fn link_distance(&self, freq: u32) -> f32 {
        normalize_distance(
            freq as f32,
            1.0,
            self.max_observed_freq as f32,
            1.0,
            50.0,
        ) * self.config.link.distance_factor
    }

    /// Reheat to the given energy and resume stepping. There is no
    /// auto-stop floor: a low-energy simulation keeps drifting gently
    /// until `stop` is called.
    pub fn restart(&mut self, energy: f32) {
        self.alpha = energy.max(0.0);
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn set_alpha_target(&mut self, target: f32) {
        self.alpha_target = target.max(0.0);
    }

    pub fn pin_node(&mut self, index: usize, pos: Vec2) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.pin = Some(pos);
        }
    }

    pub fn release_node(&mut self, index: usize) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.pin = None;
        }
    }

    /// Advance one integration step. Invoked by the host once per frame
    /// while running; a stopped simulation leaves every position frozen.
    pub fn step(&mut self) {
        if !self.running || self.nodes.is_empty() {
            return;
        }

        self.alpha += (self.alpha_target - self.alpha) * ALPHA_DECAY;

        self.apply_charge();
        self.apply_link_springs();
        self.apply_separation();
        self.apply_radial();
        self.apply_collisions();
        self.apply_centering();

        let fallback = self.viewport * 0.5;
        for node in &mut self.nodes {
            if let Some(pin) = node.pin {
                node.pos = pin;
                node.vel = Vec2::ZERO;
            } else {
                node.vel *= 1.0 - VELOCITY_DECAY;
                node.pos += node.vel;
            }

            // A diverged integration never reaches the renderer.
            if !node.pos.x.is_finite() || !node.pos.y.is_finite() {
                node.pos = fallback;
                node.vel = Vec2::ZERO;
            }
        }
    }

    fn apply_charge(&mut self) {
        let charge = self.config.charge;
        if !charge.enabled || self.nodes.len() < 2 {
            return;
        }

        self.scratch.positions.clear();
        self.scratch
            .positions
            .extend(self.nodes.iter().map(|node| node.pos));

        let Some(tree) = QuadCell::build(&self.scratch.positions) else {
            return;
        };

        let params = ChargeParams {
            strength: charge.strength,
            distance_min_sq: charge.distance_min * charge.distance_min,
            distance_max_sq: charge.distance_max * charge.distance_max,
            theta_sq: THETA_SQ,
            alpha: self.alpha,
        };
        for (index, node) in self.nodes.iter_mut().enumerate() {
            accumulate_charge(&tree, index, &self.scratch.positions, params, &mut node.vel);
        }
    }

    fn apply_link_springs(&mut self) {
        let link = self.config.link;
        if !link.enabled || self.links.is_empty() {
            return;
        }

        for _ in 0..link.iterations.max(1) {
            for sim_link in &self.links {
                let source = sim_link.source;
                let target = sim_link.target;
                if source == target {
                    continue;
                }

                let delta = (self.nodes[target].pos + self.nodes[target].vel)
                    - (self.nodes[source].pos + self.nodes[source].vel);
                let mut length = delta.length();
                let direction = if length > 1e-4 {
                    delta / length
                } else {
                    length = 1e-4;
                    vec2(1.0, 0.0)
                };

                let preferred = self.link_distance(sim_link.freq);
                let degree_source = self.degrees[source].max(1) as f32;
                let degree_target = self.degrees[target].max(1) as f32;
                // Hub endpoints absorb less of the correction.
                let strength = link.strength / degree_source.min(degree_target);
                let correction =
                    direction * ((length - preferred) * strength * self.alpha);
                let bias = degree_source / (degree_source + degree_target);

                self.nodes[target].vel -= correction * bias;
                self.nodes[source].vel += correction * (1.0 - bias);
            }
        }
    }

    fn apply_separation(&mut self) {
        let separation = self.config.separation;
        if !separation.enabled {
            return;
        }

        let pull = separation.strength * self.alpha;
        for node in &mut self.nodes {
            let center = separation.centers[node.category.index()];
            node.vel += (center - node.pos) * pull;
        }
    }

    fn apply_radial(&mut self) {
        let radial = self.config.radial;
        if !radial.enabled {
            return;
        }

        let center = self.viewport * 0.5;
        for node in &mut self.nodes {
            let offset = node.pos - center;
            let distance = offset.length();
            if distance <= 1e-4 {
                continue;
            }
            let target = radial.category_radius[node.category.index()];
            let k = (target - distance) / distance * radial.strength * self.alpha;
            node.vel += offset * k;
        }
    }

    fn apply_collisions(&mut self) {
        let collide = self.config.collide;
        if !collide.enabled || self.nodes.len() < 2 {
            return;
        }

        let params = CollideParams {
            separation: collide.radius,
            strength: collide.strength,
        };
        for _ in 0..collide.iterations.max(1) {
            self.scratch.predicted.clear();
            self.scratch
                .predicted
                .extend(self.nodes.iter().map(|node| node.pos + node.vel));

            let Some(tree) = QuadCell::build(&self.scratch.predicted) else {
                return;
            };

            let mut corrections = vec![Vec2::ZERO; self.nodes.len()];
            resolve_collision_pairs(
                &tree,
                &tree,
                true,
                &self.scratch.predicted,
                params,
                &mut corrections,
            );
            for (node, correction) in self.nodes.iter_mut().zip(corrections) {
                node.vel += correction;
            }
        }
    }

    fn apply_centering(&mut self) {
        let center_force = self.config.center;
        if !center_force.enabled || self.nodes.is_empty() {
            return;
        }

        let mut centroid = Vec2::ZERO;
        for node in &self.nodes {
            centroid += node.pos;
        }
        centroid /= self.nodes.len() as f32;

        let shift = (centroid - self.viewport * 0.5) * center_force.strength;
        for node in &mut self.nodes {
            if node.pin.is_none() {
                node.pos -= shift;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_node(id: &str, category: Category, pos: Vec2) -> SimNode {
        SimNode {
            id: id.to_string(),
            label: id.to_string(),
            category,
            degree: 0,
            query_pinned: false,
            weight: 1.0,
            radius: 10.0,
            pos,
            vel: Vec2::ZERO,
            pin: None,
        }
    }

    fn test_link(source: &str, target: &str, freq: u32) -> LinkSpec {
        LinkSpec {
            source_id: source.to_string(),
            target_id: target.to_string(),
            freq,
            polarity: Polarity::Neutral,
            same_category: false,
        }
    }

    #[test]
    fn dangling_link_is_rejected() {
        let mut sim = Simulation::new(vec2(900.0, 900.0));
        let nodes = vec![test_node("uniprot:P05231", Category::Protein, Vec2::ZERO)];
        let links = vec![test_link("uniprot:P05231", "mesh:D003920", 3)];

        let error = sim.set_graph(nodes, links).unwrap_err();
        match error {
            GraphError::DanglingLink { node_id, .. } => {
                assert_eq!(node_id, "mesh:D003920");
            }
        }
    }

    #[test]
    fn single_node_tick_stays_finite() {
        let mut sim = Simulation::new(vec2(900.0, 900.0));
        sim.set_graph(
            vec![test_node(
                "uniprot:P05231",
                Category::Protein,
                vec2(450.0, 450.0),
            )],
            Vec::new(),
        )
        .unwrap();

        sim.restart(1.0);
        sim.step();

        let node = &sim.nodes()[0];
        assert!(node.pos.x.is_finite() && node.pos.y.is_finite());
    }

    #[test]
    fn link_distance_is_inverse_monotonic() {
        let mut sim = Simulation::new(vec2(900.0, 900.0));
        let nodes = vec![
            test_node("a:1", Category::Protein, Vec2::ZERO),
            test_node("b:1", Category::Disease, vec2(100.0, 0.0)),
        ];
        sim.set_graph(nodes, vec![test_link("a:1", "b:1", 40)]).unwrap();
        assert_eq!(sim.max_observed_freq, 40);

        let mut previous = f32::INFINITY;
        for freq in [1, 5, 10, 20, 40] {
            let distance = sim.link_distance(freq);
            assert!(
                distance <= previous,
                "distance({freq}) = {distance} > {previous}"
            );
            previous = distance;
        }
    }

    #[test]
    fn stop_freezes_positions() {
        let mut sim = Simulation::new(vec2(900.0, 900.0));
        sim.set_graph(
            vec![
                test_node("a:1", Category::Protein, vec2(440.0, 450.0)),
                test_node("b:1", Category::Protein, vec2(460.0, 450.0)),
            ],
            Vec::new(),
        )
        .unwrap();

        sim.restart(1.0);
        sim.step();
        sim.stop();

        let before = sim.nodes().iter().map(|n| n.pos).collect::<Vec<_>>();
        sim.step();
        let after = sim.nodes().iter().map(|n| n.pos).collect::<Vec<_>>();
        assert_eq!(before, after);
    }

    #[test]
    fn pinned_node_ignores_forces() {
        let mut sim = Simulation::new(vec2(900.0, 900.0));
        sim.set_graph(
            vec![
                test_node("a:1", Category::Protein, vec2(440.0, 450.0)),
                test_node("b:1", Category::Protein, vec2(445.0, 450.0)),
            ],
            Vec::new(),
        )
        .unwrap();

        let pinned_at = vec2(100.0, 100.0);
        sim.pin_node(0, pinned_at);
        sim.restart(1.0);
        for _ in 0..5 {
            sim.step();
        }
        assert_eq!(sim.nodes()[0].pos, pinned_at);

        sim.release_node(0);
        assert!(!sim.nodes()[0].is_pinned());
    }

    #[test]
    fn normalize_distance_maps_extremes() {
        let near = normalize_distance(100.0, 1.0, 100.0, 1.0, 50.0);
        let far = normalize_distance(1.0, 1.0, 100.0, 1.0, 50.0);
        assert!((near - 1.0).abs() < 1e-4, "near {near}");
        assert!((far - 50.0).abs() < 1e-4, "far {far}");

        // A degenerate frequency range collapses to the near distance.
        assert_eq!(normalize_distance(3.0, 1.0, 1.0, 1.0, 50.0), 1.0);
    }

    #[test]
    fn circle_centers_are_evenly_spaced() {
        let viewport = vec2(900.0, 900.0);
        let centers = category_centers_circle(225.0, viewport);
        let middle = viewport * 0.5;
        for center in centers {
            let radius = (center - middle).length();
            assert!((radius - 225.0).abs() < 1.0, "radius {radius}");
        }
        assert!((centers[0] - vec2(675.0, 450.0)).length() < 1.0);
        assert!((centers[2] - vec2(225.0, 450.0)).length() < 1.0);
    }

    #[test]
    fn ellipse_centers_sit_on_the_ellipse() {
        let viewport = vec2(900.0, 600.0);
        let (a, b) = (400.0, 150.0);
        let centers = category_centers_ellipse(a, b, viewport);
        for center in centers {
            let dx = (center.x - 450.0) / a;
            let dy = (center.y - 300.0) / b;
            let on_ellipse = dx * dx + dy * dy;
            assert!((on_ellipse - 1.0).abs() < 0.05, "ellipse value {on_ellipse}");
        }
    }

    #[test]
    fn attraction_pulls_linked_nodes_together() {
        let mut sim = Simulation::new(vec2(900.0, 900.0));
        let mut config = ForceConfig::for_viewport(vec2(900.0, 900.0));
        // Isolate the link spring.
        config.charge.enabled = false;
        config.collide.enabled = false;
        config.separation.enabled = false;

        sim.set_graph(
            vec![
                test_node("a:1", Category::Protein, vec2(100.0, 450.0)),
                test_node("b:1", Category::Disease, vec2(800.0, 450.0)),
            ],
            vec![test_link("a:1", "b:1", 10)],
        )
        .unwrap();
        sim.configure(config);

        let start = (sim.nodes()[0].pos - sim.nodes()[1].pos).length();
        sim.restart(1.0);
        for _ in 0..30 {
            sim.step();
        }
        let end = (sim.nodes()[0].pos - sim.nodes()[1].pos).length();
        assert!(end < start, "distance grew from {start} to {end}");
    }
}
