//! Force-directed layout for the cluster graph.
//!
//! [`Simulation`] owns the position buffer while it runs. The host calls
//! [`Simulation::step`] once per frame; the run ends after the configured
//! cooldown, when alpha decays below its floor, or when kinetic energy drops
//! below the settle threshold. Any structural change to the graph must go
//! through [`Simulation::reset`], which discards the previous run.

mod forces;
mod quadtree;

use eframe::egui::Vec2;

use crate::history::ClusterGraph;
use crate::layout::seed_positions;
use forces::{Collision, Repulsion, accumulate_collisions, accumulate_repulsion};
use quadtree::QuadNode;
pub use quadtree::QuadtreeCell;

const MAX_FORCE: f32 = 120.0;
const MAX_SPEED: f32 = 40.0;
const SPRING_DAMPING: f32 = 0.2;
const SLEEP_SPEED_SQ: f32 = 0.02 * 0.02;
const SLEEP_FORCE_SQ: f32 = 0.05 * 0.05;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutConfig {
    pub charge_strength: f32,
    pub charge_softening: f32,
    /// Pull toward the origin, per unit of distance.
    pub center_strength: f32,
    /// Spring stiffness; each link scales it by its similarity.
    pub link_strength: f32,
    /// Added to half the node size to form the collision radius.
    pub collision_padding: f32,
    pub collision_strength: f32,
    pub velocity_damping: f32,
    pub cooldown_ticks: usize,
    pub settle_energy: f32,
    pub alpha_decay: f32,
    pub alpha_min: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            charge_strength: 24_000.0,
            charge_softening: 400.0,
            center_strength: 0.01,
            link_strength: 0.08,
            collision_padding: 6.0,
            collision_strength: 0.6,
            velocity_damping: 0.85,
            cooldown_ticks: 100,
            settle_energy: 0.05,
            alpha_decay: 0.0228,
            alpha_min: 0.001,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationState {
    /// No bodies to lay out.
    Idle,
    Running,
    Settled,
    Stopped,
}

#[derive(Clone, Copy, Debug)]
struct Body {
    position: Vec2,
    velocity: Vec2,
    radius: f32,
}

#[derive(Clone, Copy, Debug)]
struct Link {
    source: usize,
    target: usize,
    weight: f32,
    distance: f32,
}

#[derive(Default)]
struct Scratch {
    forces: Vec<Vec2>,
    positions: Vec<Vec2>,
    radii: Vec<f32>,
}

pub struct Simulation {
    config: LayoutConfig,
    bodies: Vec<Body>,
    links: Vec<Link>,
    state: SimulationState,
    tick: usize,
    alpha: f32,
    scratch: Scratch,
}

impl Simulation {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            bodies: Vec::new(),
            links: Vec::new(),
            state: SimulationState::Idle,
            tick: 0,
            alpha: 1.0,
            scratch: Scratch::default(),
        }
    }

    /// Replaces the simulated node set with `graph` and starts a fresh run.
    pub fn reset(&mut self, graph: &ClusterGraph) {
        let radii = graph
            .nodes
            .iter()
            .map(|node| node.size * 0.5 + self.config.collision_padding)
            .collect::<Vec<_>>();
        let ids = graph
            .nodes
            .iter()
            .map(|node| node.cluster_id)
            .collect::<Vec<_>>();

        self.bodies = seed_positions(&ids, &radii)
            .into_iter()
            .zip(radii)
            .map(|(position, radius)| Body {
                position,
                velocity: Vec2::ZERO,
                radius,
            })
            .collect();
        self.links = graph
            .edges
            .iter()
            .map(|edge| Link {
                source: edge.source,
                target: edge.target,
                weight: edge.similarity,
                distance: edge.distance,
            })
            .collect();

        self.restart();
        tracing::debug!(
            bodies = self.bodies.len(),
            links = self.links.len(),
            "layout simulation reset"
        );
    }

    /// Halts the current run, keeping positions as they are.
    pub fn stop(&mut self) {
        if self.state == SimulationState::Running {
            tracing::debug!(tick = self.tick, "layout simulation stopped");
            self.state = SimulationState::Stopped;
        }
    }

    /// Applies new parameters and restarts from the current positions.
    pub fn set_config(&mut self, config: LayoutConfig) {
        let padding_delta = config.collision_padding - self.config.collision_padding;
        for body in &mut self.bodies {
            body.radius = (body.radius + padding_delta).max(0.0);
        }
        self.config = config;
        self.restart();
    }

    pub fn config(&self) -> LayoutConfig {
        self.config
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SimulationState::Running
    }

    pub fn tick(&self) -> usize {
        self.tick
    }

    pub fn position(&self, index: usize) -> Option<Vec2> {
        self.bodies.get(index).map(|body| body.position)
    }

    pub fn positions(&self) -> impl ExactSizeIterator<Item = Vec2> + '_ {
        self.bodies.iter().map(|body| body.position)
    }

    pub fn kinetic_energy(&self) -> f32 {
        self.bodies
            .iter()
            .map(|body| 0.5 * body.velocity.length_sq())
            .sum()
    }

    /// Runs until the simulation leaves the running state. Returns ticks taken.
    pub fn run_to_completion(&mut self) -> usize {
        let start = self.tick;
        while self.step() {}
        self.tick - start
    }

    pub fn quadtree_cells(&self, cells: &mut Vec<QuadtreeCell>) {
        cells.clear();
        let positions = self.positions().collect::<Vec<_>>();
        if let Some(tree) = QuadNode::build(&positions) {
            tree.collect_cells(0, cells);
        }
    }

    /// Advances one tick. Returns `true` while further ticks are wanted.
    pub fn step(&mut self) -> bool {
        if self.state != SimulationState::Running {
            return false;
        }

        self.apply_forces();
        self.tick += 1;
        self.alpha *= 1.0 - self.config.alpha_decay;

        let energy = self.kinetic_energy();
        if self.tick >= self.config.cooldown_ticks
            || self.alpha < self.config.alpha_min
            || energy < self.config.settle_energy
        {
            self.state = SimulationState::Settled;
            tracing::debug!(tick = self.tick, energy, alpha = self.alpha, "layout settled");
        }

        self.is_running()
    }

    fn restart(&mut self) {
        self.tick = 0;
        self.alpha = 1.0;
        self.state = if self.bodies.is_empty() {
            SimulationState::Idle
        } else {
            SimulationState::Running
        };
    }

    fn apply_forces(&mut self) {
        let count = self.bodies.len();
        let config = self.config;
        let alpha = self.alpha;

        let scratch = &mut self.scratch;
        scratch.forces.clear();
        scratch.forces.resize(count, Vec2::ZERO);
        scratch.positions.clear();
        scratch.positions.extend(self.bodies.iter().map(|body| body.position));
        scratch.radii.clear();
        scratch.radii.extend(self.bodies.iter().map(|body| body.radius));

        let forces = &mut scratch.forces;
        let positions = &scratch.positions;
        let radii = &scratch.radii;

        if count >= 2
            && let Some(tree) = QuadNode::build(positions)
        {
            let repulsion = Repulsion {
                strength: config.charge_strength * alpha,
                softening: config.charge_softening.max(1.0),
            };
            if repulsion.strength > 0.0 {
                for (index, force) in forces.iter_mut().enumerate() {
                    accumulate_repulsion(&tree, index, positions, repulsion, force);
                }
            }

            let widest = radii.iter().copied().fold(0.0_f32, f32::max);
            let reach = widest * 2.0;
            accumulate_collisions(
                &tree,
                &tree,
                true,
                positions,
                radii,
                Collision {
                    strength: config.collision_strength,
                    reach_sq: reach * reach,
                },
                forces,
            );
        }

        for link in &self.links {
            if link.source >= count || link.target >= count || link.source == link.target {
                continue;
            }

            let source = &self.bodies[link.source];
            let target = &self.bodies[link.target];
            let delta = source.position - target.position;
            let distance = delta.length();
            if distance <= 0.0001 {
                continue;
            }
            let direction = delta / distance;

            let stiffness = config.link_strength * link.weight * alpha;
            let spring = (distance - link.distance) * stiffness;
            let closing_speed = (source.velocity - target.velocity).dot(direction);
            let correction = direction * (spring + closing_speed * SPRING_DAMPING * stiffness);

            forces[link.source] -= correction;
            forces[link.target] += correction;
        }

        for (force, body) in forces.iter_mut().zip(&self.bodies) {
            *force -= body.position * (config.center_strength * alpha);
        }

        let damping = config.velocity_damping.clamp(0.0, 0.99);
        for (body, force) in self.bodies.iter_mut().zip(forces.iter()) {
            let mut force = *force;
            let force_sq = force.length_sq();
            if force_sq > MAX_FORCE * MAX_FORCE {
                force *= MAX_FORCE / force_sq.sqrt();
            }

            let mut velocity = (body.velocity + force) * damping;
            let speed_sq = velocity.length_sq();
            if speed_sq > MAX_SPEED * MAX_SPEED {
                velocity *= MAX_SPEED / speed_sq.sqrt();
            }
            if velocity.length_sq() < SLEEP_SPEED_SQ && force_sq < SLEEP_FORCE_SQ {
                velocity = Vec2::ZERO;
            }

            body.velocity = velocity;
            body.position += velocity;
        }

        if count >= 2 {
            let centroid =
                self.bodies.iter().fold(Vec2::ZERO, |sum, body| sum + body.position) / count as f32;
            if centroid.length_sq() > 0.000_001 {
                for body in &mut self.bodies {
                    body.position -= centroid;
                }
            }
        }
    }
}
