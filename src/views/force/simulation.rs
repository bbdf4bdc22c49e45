use std::collections::HashMap;
use std::f32::consts::PI;

use eframe::egui::{Vec2, vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use super::forces::{ChargeParams, apply_centering, apply_charge, apply_collision, apply_links};

const INITIAL_RADIUS: f32 = 10.0;
const INITIAL_JITTER: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationParams {
    pub alpha_decay: f32,
    pub alpha_min: f32,
    pub velocity_decay: f32,
    pub collision_radius: f32,
    pub collision_strength: f32,
    pub charge_strength: f32,
    pub theta: f32,
    pub distance_min: f32,
    pub link_distance: f32,
    pub center: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeState {
    pub position: Vec2,
    pub velocity: Vec2,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimulationState {
    pub alpha: f32,
    pub alpha_target: f32,
    pub nodes: Vec<NodeState>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct SimLink {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) strength: f32,
    /// Share of the correction taken by the target.
    pub(super) bias: f32,
}

/// Link structure of the simulated vertices, with per-link strength and bias
/// derived from endpoint degrees.
#[derive(Clone, Debug, Default)]
pub struct SimGraph {
    node_count: usize,
    links: Vec<SimLink>,
}

impl SimGraph {
    pub fn new(node_count: usize, pairs: &[(usize, usize)]) -> Self {
        let pairs = pairs
            .iter()
            .copied()
            .filter(|&(source, target)| source != target && source < node_count && target < node_count)
            .collect::<Vec<_>>();

        let mut degree = vec![0u32; node_count];
        for &(source, target) in &pairs {
            degree[source] += 1;
            degree[target] += 1;
        }

        let links = pairs
            .into_iter()
            .map(|(source, target)| {
                let (source_degree, target_degree) = (degree[source] as f32, degree[target] as f32);
                SimLink {
                    source,
                    target,
                    strength: 1.0 / source_degree.min(target_degree),
                    bias: source_degree / (source_degree + target_degree),
                }
            })
            .collect();

        Self { node_count, links }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

/// Position overrides kept apart from the simulated state.
#[derive(Clone, Debug, Default)]
pub struct PinTable {
    pins: HashMap<usize, Vec2>,
}

impl PinTable {
    pub fn pin(&mut self, node: usize, position: Vec2) {
        self.pins.insert(node, position);
    }

    pub fn release(&mut self, node: usize) -> Option<Vec2> {
        self.pins.remove(&node)
    }

    pub fn get(&self, node: usize) -> Option<Vec2> {
        self.pins.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    fn translate(&mut self, offset: Vec2) {
        for pin in self.pins.values_mut() {
            *pin += offset;
        }
    }
}

/// Phyllotaxis spiral around `center` with a seeded jitter, so equal seeds
/// give equal starting layouts.
pub fn initial_state(node_count: usize, center: Vec2, seed: u64) -> SimulationState {
    let mut rng = StdRng::seed_from_u64(seed);
    let golden_angle = PI * (3.0 - 5.0_f32.sqrt());

    let nodes = (0..node_count)
        .map(|index| {
            let radius = INITIAL_RADIUS * (0.5 + index as f32).sqrt();
            let angle = index as f32 * golden_angle;
            let jitter = vec2(
                rng.gen_range(-INITIAL_JITTER..INITIAL_JITTER),
                rng.gen_range(-INITIAL_JITTER..INITIAL_JITTER),
            );
            NodeState {
                position: center + vec2(angle.cos(), angle.sin()) * radius + jitter,
                velocity: Vec2::ZERO,
            }
        })
        .collect();

    SimulationState {
        alpha: 1.0,
        alpha_target: 0.0,
        nodes,
    }
}

/// One tick of the layout: cool, apply forces to velocities, recentre, then
/// integrate. Pinned vertices end the tick on their pin with zero velocity.
pub fn step(state: &SimulationState, graph: &SimGraph, pins: &PinTable, params: &SimulationParams) -> SimulationState {
    let mut next = state.clone();
    next.alpha += (next.alpha_target - next.alpha) * params.alpha_decay;
    let alpha = next.alpha;

    apply_collision(&mut next.nodes, params.collision_radius, params.collision_strength);
    apply_links(&mut next.nodes, &graph.links, params.link_distance, alpha);
    apply_charge(
        &mut next.nodes,
        ChargeParams {
            strength: params.charge_strength,
            theta_sq: params.theta * params.theta,
            distance_min_sq: params.distance_min * params.distance_min,
            alpha,
        },
    );
    apply_centering(&mut next.nodes, params.center);

    let retained = 1.0 - params.velocity_decay;
    for (index, node) in next.nodes.iter_mut().enumerate() {
        if let Some(pin) = pins.get(index) {
            node.position = pin;
            node.velocity = Vec2::ZERO;
        } else {
            node.velocity *= retained;
            node.position += node.velocity;
        }
    }

    next
}

/// Tick pacing for [`ForceSimulation::advance`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickClock {
    pub ticks_per_second: f32,
    pub max_ticks_per_frame: usize,
}

/// Per-view simulation context: state, pins, parameters and tick pacing.
pub struct ForceSimulation {
    state: SimulationState,
    graph: SimGraph,
    pins: PinTable,
    params: SimulationParams,
    clock: TickClock,
    pending: f32,
    ticks: u64,
}

impl ForceSimulation {
    pub fn new(graph: SimGraph, params: SimulationParams, clock: TickClock, seed: u64) -> Self {
        let state = initial_state(graph.node_count(), params.center, seed);
        debug!(nodes = graph.node_count(), links = graph.link_count(), seed, "force simulation started");
        Self {
            state,
            graph,
            pins: PinTable::default(),
            params,
            clock,
            pending: 0.0,
            ticks: 0,
        }
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn pins(&self) -> &PinTable {
        &self.pins
    }

    pub fn position(&self, node: usize) -> Option<Vec2> {
        self.state.nodes.get(node).map(|node| node.position)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_running(&self) -> bool {
        self.state.alpha >= self.params.alpha_min || self.state.alpha_target > self.state.alpha
    }

    pub fn tick(&mut self) {
        self.state = step(&self.state, &self.graph, &self.pins, &self.params);
        self.ticks += 1;
        trace!(tick = self.ticks, alpha = self.state.alpha, "force tick");
    }

    /// Runs the whole ticks that fit into `elapsed` seconds plus any carried
    /// remainder, never more than the per-frame cap. Returns the tick count.
    pub fn advance(&mut self, elapsed: f32) -> usize {
        if !self.is_running() {
            self.pending = 0.0;
            return 0;
        }

        let interval = 1.0 / self.clock.ticks_per_second.max(1.0);
        self.pending += elapsed.max(0.0);
        let mut ran = 0;
        while self.pending >= interval && ran < self.clock.max_ticks_per_frame && self.is_running() {
            self.tick();
            self.pending -= interval;
            ran += 1;
        }
        if ran == self.clock.max_ticks_per_frame {
            self.pending = 0.0;
        }
        if !self.is_running() {
            debug!(ticks = self.ticks, "force simulation cooled");
        }
        ran
    }

    pub fn drag_start(&mut self, node: usize, alpha_target: f32) {
        let Some(position) = self.position(node) else {
            return;
        };
        self.state.alpha_target = alpha_target;
        self.pins.pin(node, position);
    }

    pub fn drag_move(&mut self, node: usize, position: Vec2) {
        if node < self.state.nodes.len() {
            self.pins.pin(node, position);
        }
    }

    /// Lets the layout cool again; the vertex stays pinned where it was dropped.
    pub fn drag_end(&mut self) {
        self.state.alpha_target = 0.0;
    }

    pub fn release(&mut self, node: usize) -> bool {
        self.pins.release(node).is_some()
    }

    pub fn halt(&mut self) {
        self.state.alpha = 0.0;
        self.state.alpha_target = 0.0;
        self.pending = 0.0;
    }

    pub fn reheat(&mut self) {
        self.state.alpha = 1.0;
    }

    /// Moves the layout with its canvas so resizing does not need a reheat.
    pub fn set_center(&mut self, center: Vec2) {
        let offset = center - self.params.center;
        self.params.center = center;
        for node in &mut self.state.nodes {
            node.position += offset;
        }
        self.pins.translate(offset);
    }
}
