//! Force-directed layout integrator.
//!
//! Each tick decays `alpha`, applies spring, gravity and charge forces to
//! node velocities, then damps velocities by friction and moves the nodes.
//! `alpha` scales every force, so the layout settles as it cools.

mod params;
mod quadtree;

use std::f64::consts::PI;

use log::debug;

use crate::graph::{GraphStore, Node, NodeId, Subgraph};

pub use params::{EXPLODE_GRAVITY, ForceParams};
pub use quadtree::QuadTree;

/// Alpha a (re)started simulation begins with.
pub const ALPHA_START: f64 = 0.1;
/// Per-tick alpha multiplier.
pub const ALPHA_DECAY: f64 = 0.99;
/// Below this alpha the simulation is cooling.
pub const ALPHA_COOLING: f64 = 0.05;
/// Below this alpha the simulation stops.
pub const ALPHA_MIN: f64 = 0.005;
/// Mean kinetic energy under which a cooling simulation stops early.
pub const ENERGY_MIN: f64 = 1e-4;

const INITIAL_RADIUS: f64 = 10.0;

/// Lifecycle of the integrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimState {
	/// No ticks are integrated.
	Stopped,
	/// Freshly (re)started.
	Running,
	/// Energy is decaying toward the stop threshold.
	Cooling,
}

#[derive(Clone, Debug)]
struct Link {
	source: NodeId,
	target: NodeId,
	distance: f64,
	strength: f64,
	/// Share of the correction applied to the target.
	bias: f64,
}

/// Integrates node positions of the assembled subgraph.
#[derive(Clone, Debug)]
pub struct ForceSimulation {
	size: (f64, f64),
	params: ForceParams,
	state: SimState,
	alpha: f64,
	energy: f64,
	ticks: u64,
	nodes: Vec<NodeId>,
	links: Vec<Link>,
}

impl ForceSimulation {
	/// Stopped simulation over an area of `width` × `height`.
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			size: (width, height),
			params: ForceParams::default(),
			state: SimState::Stopped,
			alpha: 0.0,
			energy: 0.0,
			ticks: 0,
			nodes: Vec::new(),
			links: Vec::new(),
		}
	}

	/// Area size.
	pub fn size(&self) -> (f64, f64) {
		self.size
	}

	/// Changes the area size; gravity pulls toward the new centre.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.size = (width, height);
	}

	/// Centre of the area.
	pub fn center(&self) -> (f64, f64) {
		(self.size.0 / 2.0, self.size.1 / 2.0)
	}

	/// Lifecycle state.
	pub fn state(&self) -> SimState {
		self.state
	}

	/// Current alpha.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Mean kinetic energy after the last tick.
	pub fn energy(&self) -> f64 {
		self.energy
	}

	/// Ticks integrated since construction.
	pub fn ticks(&self) -> u64 {
		self.ticks
	}

	/// Parameters in effect.
	pub fn params(&self) -> &ForceParams {
		&self.params
	}

	/// Nodes being simulated.
	pub fn nodes(&self) -> &[NodeId] {
		&self.nodes
	}

	/// Loads `subgraph` with `params` and restarts warm.
	///
	/// Positions and velocities of nodes already laid out are kept; nodes
	/// that have never been placed are put on a spiral around the centre.
	pub fn configure(&mut self, store: &mut GraphStore, subgraph: &Subgraph, params: ForceParams) {
		self.place_new_nodes(store, subgraph);

		let mut degree = vec![0usize; store.node_count()];
		let mut links = Vec::with_capacity(subgraph.edge_count());
		for &id in &subgraph.edges {
			let Some((source, target)) = store.edge(id).and_then(|e| e.nodes()) else {
				continue;
			};
			degree[source.index()] += 1;
			degree[target.index()] += 1;
			links.push((id, source, target));
		}

		let nodes = store.nodes();
		self.links = links
			.into_iter()
			.filter_map(|(id, source, target)| {
				let edge = store.edge(id)?;
				let (s, t) = (&nodes[source.index()], &nodes[target.index()]);
				let (ds, dt) = (degree[source.index()] as f64, degree[target.index()] as f64);
				Some(Link {
					source,
					target,
					distance: params.distance_between(s, t),
					strength: params.strength_of(edge),
					bias: ds / (ds + dt),
				})
			})
			.collect();
		self.nodes = subgraph.nodes.clone();
		self.params = params;
		self.restart();
	}

	/// Overrides gravity without touching the loaded subgraph.
	pub fn set_gravity(&mut self, gravity: f64) {
		self.params.gravity = gravity;
	}

	/// Warm restart into `Running`.
	pub fn restart(&mut self) {
		if self.state == SimState::Stopped {
			debug!("simulation started with {} nodes", self.nodes.len());
		}
		self.alpha = ALPHA_START;
		self.state = SimState::Running;
	}

	/// Halts without touching positions.
	pub fn stop(&mut self) {
		self.alpha = 0.0;
		self.state = SimState::Stopped;
	}

	/// Forgets the loaded subgraph and stops.
	pub fn reset(&mut self) {
		self.nodes.clear();
		self.links.clear();
		self.energy = 0.0;
		self.stop();
	}

	/// Integrates one tick. Returns `false` when stopped.
	pub fn tick(&mut self, nodes: &mut [Node]) -> bool {
		if self.state == SimState::Stopped {
			return false;
		}

		self.alpha *= ALPHA_DECAY;
		self.apply_links(nodes);
		self.apply_gravity(nodes);
		self.apply_charge(nodes);
		self.energy = self.integrate(nodes);
		self.ticks += 1;
		self.advance();
		true
	}

	fn advance(&mut self) {
		let cooled = self.alpha < ALPHA_MIN || (self.state == SimState::Cooling && self.energy < ENERGY_MIN);
		if cooled || self.nodes.is_empty() {
			debug!("simulation stopped after {} ticks (energy {:.2e})", self.ticks, self.energy);
			self.stop();
		} else if self.state == SimState::Running && self.alpha < ALPHA_COOLING {
			self.state = SimState::Cooling;
		}
	}

	fn apply_links(&self, nodes: &mut [Node]) {
		for link in &self.links {
			let (Some(s), Some(t)) = (nodes.get(link.source.index()), nodes.get(link.target.index())) else {
				continue;
			};
			let (mut dx, mut dy) = (t.x - s.x, t.y - s.y);
			let length = (dx * dx + dy * dy).sqrt();
			if length == 0.0 {
				continue;
			}
			let k = (length - link.distance) / length * self.alpha * link.strength;
			dx *= k;
			dy *= k;

			let t = &mut nodes[link.target.index()];
			t.vx -= dx * link.bias;
			t.vy -= dy * link.bias;
			let s = &mut nodes[link.source.index()];
			s.vx += dx * (1.0 - link.bias);
			s.vy += dy * (1.0 - link.bias);
		}
	}

	fn apply_gravity(&self, nodes: &mut [Node]) {
		let k = self.alpha * self.params.gravity;
		if k == 0.0 {
			return;
		}
		let (cx, cy) = self.center();
		for &id in &self.nodes {
			if let Some(node) = nodes.get_mut(id.index()) {
				node.vx += (cx - node.x) * k;
				node.vy += (cy - node.y) * k;
			}
		}
	}

	fn apply_charge(&self, nodes: &mut [Node]) {
		let point_charge = self.alpha * self.params.charge;
		if point_charge == 0.0 || self.nodes.len() < 2 {
			return;
		}
		let points: Vec<(f64, f64)> = self
			.nodes
			.iter()
			.map(|id| nodes.get(id.index()).map_or((0.0, 0.0), Node::position))
			.collect();
		let tree = QuadTree::new(&points, point_charge);

		for (i, &id) in self.nodes.iter().enumerate() {
			let Some(node) = nodes.get_mut(id.index()) else {
				continue;
			};
			if node.fixed {
				continue;
			}
			let (fx, fy) = tree.force_on(i, &points, point_charge, self.params.theta);
			node.vx += fx;
			node.vy += fy;
		}
	}

	/// Applies friction and moves nodes; returns mean kinetic energy.
	fn integrate(&self, nodes: &mut [Node]) -> f64 {
		let friction = self.params.friction;
		let mut energy = 0.0;
		let mut moving = 0usize;
		for &id in &self.nodes {
			let Some(node) = nodes.get_mut(id.index()) else {
				continue;
			};
			if node.fixed {
				node.vx = 0.0;
				node.vy = 0.0;
				continue;
			}
			node.vx *= friction;
			node.vy *= friction;
			node.x += node.vx;
			node.y += node.vy;
			energy += 0.5 * (node.vx * node.vx + node.vy * node.vy);
			moving += 1;
		}
		if moving == 0 { 0.0 } else { energy / moving as f64 }
	}

	fn place_new_nodes(&self, store: &mut GraphStore, subgraph: &Subgraph) {
		let (cx, cy) = self.center();
		let golden_angle = PI * (3.0 - 5f64.sqrt());
		for &id in &subgraph.nodes {
			let Some(node) = store.nodes_mut().get_mut(id.index()) else {
				continue;
			};
			if node.placed {
				continue;
			}
			let i = id.index() as f64;
			let radius = INITIAL_RADIUS * (0.5 + i).sqrt();
			let angle = i * golden_angle;
			node.x = cx + radius * angle.cos();
			node.y = cy + radius * angle.sin();
			node.placed = true;
		}
	}
}
