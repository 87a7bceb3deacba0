//! The engine object: one store, one simulation, one settings controller.
//!
//! Nothing here schedules itself. A driver calls [`Networker::step`] once
//! per frame; the only deferred action, the explode restore, is checked
//! against the engine clock that `step` advances.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::centrality::{CentralityAnalyzer, CentralityReport};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::graph::{Edge, EdgeId, GraphStore, Key, Node, NodeId, Subgraph, SubgraphAssembler};
use crate::settings::{Settings, SettingsController};
use crate::simulation::{EXPLODE_GRAVITY, ForceParams, ForceSimulation, SimState};

/// How long the explode transient overrides gravity.
pub const EXPLODE_DURATION: Duration = Duration::from_millis(75);

/// Bulk import record: nodes are added before edges.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
	/// Node attribute records.
	#[serde(default)]
	pub nodes: Vec<Value>,
	/// Edge attribute records, `source`/`target` naming node keys.
	#[serde(default)]
	pub edges: Vec<Value>,
}

impl GraphDocument {
	/// Parses `{"nodes": [...], "edges": [...]}`.
	pub fn from_json(text: &str) -> Result<Self> {
		serde_json::from_str(text).map_err(Error::InvalidDocument)
	}
}

/// Elements that became visible in a rebuild.
#[derive(Debug)]
pub struct Entered<'a> {
	/// Newly visible nodes, in insertion order.
	pub nodes: Vec<&'a Node>,
	/// Newly visible edges, in insertion order.
	pub edges: Vec<&'a Edge>,
}

/// Keys of elements that stopped being visible.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Exited {
	/// Keys of nodes that were filtered out or removed.
	pub nodes: Vec<Key>,
	/// Keys of edges that were filtered out or removed.
	pub edges: Vec<Key>,
}

/// Read-only view of the visible subgraph handed to a [`Renderer`].
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
	store: &'a GraphStore,
	subgraph: &'a Subgraph,
	/// Simulation alpha at the time of the frame.
	pub alpha: f64,
	/// Simulation state at the time of the frame.
	pub state: SimState,
}

impl<'a> Frame<'a> {
	fn new(store: &'a GraphStore, subgraph: &'a Subgraph, simulation: &ForceSimulation) -> Self {
		Self {
			store,
			subgraph,
			alpha: simulation.alpha(),
			state: simulation.state(),
		}
	}

	/// The whole store, including hidden elements.
	pub fn store(&self) -> &'a GraphStore {
		self.store
	}

	/// Visible nodes in insertion order.
	pub fn nodes(&self) -> impl Iterator<Item = &'a Node> {
		let store = self.store;
		self.subgraph.nodes.iter().filter_map(move |&id| store.node(id))
	}

	/// Visible edges in insertion order.
	pub fn edges(&self) -> impl Iterator<Item = &'a Edge> {
		let store = self.store;
		self.subgraph.edges.iter().filter_map(move |&id| store.edge(id))
	}

	/// Visible edges with the current positions of both endpoints.
	pub fn segments(&self) -> impl Iterator<Item = (&'a Edge, (f64, f64), (f64, f64))> {
		let store = self.store;
		self.edges().filter_map(move |edge| {
			let (s, t) = edge.nodes()?;
			Some((edge, store.node(s)?.position(), store.node(t)?.position()))
		})
	}
}

/// Drawing collaborator. Every hook defaults to doing nothing.
///
/// On rebuild the engine calls `on_exit`, then `on_enter`, then `on_style`;
/// `on_tick` follows every integrated tick.
pub trait Renderer {
	/// Elements that joined the visible subgraph.
	fn on_enter(&mut self, _entered: &Entered<'_>) {}
	/// Elements that left the visible subgraph.
	fn on_exit(&mut self, _exited: &Exited) {}
	/// Restyle pass over the whole visible subgraph after a rebuild.
	fn on_style(&mut self, _frame: &Frame<'_>) {}
	/// Positions changed.
	fn on_tick(&mut self, _frame: &Frame<'_>) {}
}

/// Renderer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {}

/// Which element set a listener is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
	/// Listeners receive [`Target::Node`].
	Nodes,
	/// Listeners receive [`Target::Edge`].
	Edges,
}

/// Element a listener is invoked for.
#[derive(Clone, Copy, Debug)]
pub enum Target<'a> {
	/// A node the event was dispatched for.
	Node(&'a Node),
	/// An edge the event was dispatched for.
	Edge(&'a Edge),
}

type Listener = Box<dyn FnMut(Target<'_>)>;
type TickHook = Box<dyn FnMut(&mut [Node], &[Edge])>;

#[derive(Default)]
struct Listeners {
	nodes: HashMap<String, Vec<Listener>>,
	edges: HashMap<String, Vec<Listener>>,
}

impl Listeners {
	fn domain_mut(&mut self, domain: Domain) -> &mut HashMap<String, Vec<Listener>> {
		match domain {
			Domain::Nodes => &mut self.nodes,
			Domain::Edges => &mut self.edges,
		}
	}
}

/// A graph, its layout simulation and its analysis.
pub struct Networker {
	store: GraphStore,
	assembler: SubgraphAssembler,
	subgraph: Subgraph,
	simulation: ForceSimulation,
	settings: SettingsController,
	analyzer: CentralityAnalyzer,
	stats: Option<CentralityReport>,
	renderer: Box<dyn Renderer>,
	tick_hook: Option<TickHook>,
	listeners: Listeners,
	visible_nodes: HashSet<Key>,
	visible_edges: HashSet<Key>,
	clock: Duration,
	restore_at: Option<Duration>,
}

impl Default for Networker {
	fn default() -> Self {
		Self::new(EngineConfig::default())
	}
}

impl Networker {
	/// Engine built from `config`. The config is not validated here; use
	/// [`EngineConfig::from_json`] or [`EngineConfig::validate`] first.
	pub fn new(config: EngineConfig) -> Self {
		let [width, height] = config.size;
		Self {
			store: GraphStore::with_key_attr(config.key),
			assembler: SubgraphAssembler::new(config.resolution),
			subgraph: Subgraph::default(),
			simulation: ForceSimulation::new(width, height),
			settings: SettingsController::new(config.settings),
			analyzer: CentralityAnalyzer::new(config.seed),
			stats: None,
			renderer: Box::new(NullRenderer),
			tick_hook: None,
			listeners: Listeners::default(),
			visible_nodes: HashSet::new(),
			visible_edges: HashSet::new(),
			clock: Duration::ZERO,
			restore_at: None,
		}
	}

	/// Every node and edge ever added, visible or not.
	pub fn store(&self) -> &GraphStore {
		&self.store
	}

	/// Result of the last rebuild.
	pub fn subgraph(&self) -> &Subgraph {
		&self.subgraph
	}

	/// Stored settings, without any explode override.
	pub fn settings(&self) -> &Settings {
		self.settings.settings()
	}

	/// Force parameters the simulation is using right now.
	pub fn params(&self) -> &ForceParams {
		self.simulation.params()
	}

	/// The layout integrator.
	pub fn simulation(&self) -> &ForceSimulation {
		&self.simulation
	}

	/// Lifecycle state of the simulation.
	pub fn state(&self) -> SimState {
		self.simulation.state()
	}

	/// Report of the last [`compute_stats`](Self::compute_stats) call.
	pub fn stats(&self) -> Option<&CentralityReport> {
		self.stats.as_ref()
	}

	/// Time accumulated by [`step`](Self::step).
	pub fn clock(&self) -> Duration {
		self.clock
	}

	/// Whether an explode restore is scheduled.
	pub fn explode_pending(&self) -> bool {
		self.restore_at.is_some()
	}

	/// Current frame over the visible subgraph.
	pub fn frame(&self) -> Frame<'_> {
		Frame::new(&self.store, &self.subgraph, &self.simulation)
	}

	/// Changes the identity attribute; fails once anything was added.
	pub fn set_key_attr(&mut self, key_attr: impl Into<String>) -> Result<()> {
		self.store.set_key_attr(key_attr)
	}

	/// Adds a node from an attribute record. Returns `false` and changes
	/// nothing when the key is already taken or the record is malformed.
	pub fn add_node(&mut self, attrs: Value, rebuild: bool) -> bool {
		let added = self.store.add_node(attrs).is_some();
		if added && rebuild {
			self.rebuild();
		}
		added
	}

	/// Adds an edge from an attribute record with `source` and `target`.
	pub fn add_edge(&mut self, attrs: Value, rebuild: bool) -> bool {
		let added = self.store.add_edge(attrs).is_some();
		if added && rebuild {
			self.rebuild();
		}
		added
	}

	/// Adds an edge between two stored nodes without going through keys.
	pub fn add_edge_between(&mut self, source: NodeId, target: NodeId, attrs: Value, rebuild: bool) -> bool {
		let added = self.store.add_edge_between(source, target, attrs).is_some();
		if added && rebuild {
			self.rebuild();
		}
		added
	}

	/// Adds every node, then every edge, then rebuilds once if asked.
	/// Returns how many records were accepted.
	pub fn add_many<N, E>(&mut self, nodes: N, edges: E, rebuild: bool) -> usize
	where
		N: IntoIterator<Item = Value>,
		E: IntoIterator<Item = Value>,
	{
		let mut accepted = 0;
		for attrs in nodes {
			accepted += usize::from(self.add_node(attrs, false));
		}
		for attrs in edges {
			accepted += usize::from(self.add_edge(attrs, false));
		}
		if rebuild {
			self.rebuild();
		}
		accepted
	}

	/// [`add_many`](Self::add_many) over a parsed document.
	pub fn add_document(&mut self, document: GraphDocument, rebuild: bool) -> usize {
		self.add_many(document.nodes, document.edges, rebuild)
	}

	/// Drops every node and edge. Visible elements are reported as exited.
	pub fn clear(&mut self) {
		self.store.clear();
		self.subgraph = Subgraph::default();
		self.simulation.reset();
		self.stats = None;
		self.restore_at = None;

		let mut exited = Exited {
			nodes: self.visible_nodes.drain().collect(),
			edges: self.visible_edges.drain().collect(),
		};
		if !exited.nodes.is_empty() || !exited.edges.is_empty() {
			exited.nodes.sort();
			exited.edges.sort();
			self.renderer.on_exit(&exited);
		}
		info!("graph cleared");
	}

	/// Pins a node at `(x, y)` and wakes the simulation.
	pub fn pin(&mut self, key: &Key, x: f64, y: f64) -> bool {
		let Some(node) = self.store.node_by_key_mut(key) else {
			return false;
		};
		node.fixed = true;
		node.x = x;
		node.y = y;
		node.vx = 0.0;
		node.vy = 0.0;
		node.placed = true;
		self.simulation.restart();
		true
	}

	/// Releases a pinned node.
	pub fn unpin(&mut self, key: &Key) -> bool {
		let Some(node) = self.store.node_by_key_mut(key) else {
			return false;
		};
		node.fixed = false;
		self.simulation.restart();
		true
	}

	/// Replaces the node filter; takes effect on the next rebuild.
	pub fn set_node_filter<F>(&mut self, filter: F)
	where
		F: Fn(&[&Node]) -> Vec<NodeId> + 'static,
	{
		self.assembler.set_node_filter(Box::new(filter));
	}

	/// Replaces the edge filter; takes effect on the next rebuild.
	pub fn set_edge_filter<F>(&mut self, filter: F)
	where
		F: Fn(&[&Edge]) -> Vec<EdgeId> + 'static,
	{
		self.assembler.set_edge_filter(Box::new(filter));
	}

	/// Restores identity filters; takes effect on the next rebuild.
	pub fn reset_filters(&mut self) {
		self.assembler.reset_filters();
	}

	/// Reassembles the visible subgraph, reapplies forces and restarts the
	/// simulation warm. Cancels a pending explode restore.
	pub fn rebuild(&mut self) {
		self.restore_at = None;
		self.subgraph = self.assembler.assemble(&mut self.store);
		self.apply_forces();
		self.notify_changes();

		let frame = Frame::new(&self.store, &self.subgraph, &self.simulation);
		self.renderer.on_style(&frame);
		info!(
			"rebuilt: {}/{} nodes, {}/{} edges visible",
			self.subgraph.node_count(),
			self.store.node_count(),
			self.subgraph.edge_count(),
			self.store.edge_count()
		);
	}

	/// Merges a partial settings record and reapplies forces immediately.
	/// Unknown keys are ignored; a pending explode restore is cancelled.
	pub fn set_force_settings(&mut self, partial: &Value) -> Result<()> {
		let merge = self.settings.set_force_settings(partial)?;
		self.restore_at = None;
		self.apply_forces();
		if merge.explode {
			self.explode();
		}
		Ok(())
	}

	/// Overrides gravity with [`EXPLODE_GRAVITY`] for [`EXPLODE_DURATION`].
	pub fn explode(&mut self) {
		self.simulation.set_gravity(EXPLODE_GRAVITY);
		self.simulation.restart();
		self.restore_at = Some(self.clock + EXPLODE_DURATION);
		debug!("explode until {:?}", self.clock + EXPLODE_DURATION);
	}

	/// Advances the clock by `dt` and integrates one tick.
	///
	/// The tick hook sees every node first, then forces are integrated,
	/// then the renderer gets the frame. Returns `false` when stopped.
	pub fn step(&mut self, dt: Duration) -> bool {
		self.clock += dt;
		if self.restore_at.is_some_and(|due| self.clock >= due) {
			self.restore_at = None;
			self.apply_forces();
			debug!("explode finished, settings restored");
		}
		if self.simulation.state() == SimState::Stopped {
			return false;
		}

		if let Some(hook) = self.tick_hook.as_mut() {
			let (nodes, edges) = self.store.parts_mut();
			hook(nodes, edges);
		}
		self.simulation.tick(self.store.nodes_mut());

		let frame = Frame::new(&self.store, &self.subgraph, &self.simulation);
		self.renderer.on_tick(&frame);
		true
	}

	/// Resizes the simulation area.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.simulation.resize(width, height);
	}

	/// Installs a hook that runs before every tick with all nodes and edges.
	pub fn set_tick_hook<F>(&mut self, hook: F)
	where
		F: FnMut(&mut [Node], &[Edge]) + 'static,
	{
		self.tick_hook = Some(Box::new(hook));
	}

	/// Removes the hook installed by [`set_tick_hook`](Self::set_tick_hook).
	pub fn clear_tick_hook(&mut self) {
		self.tick_hook = None;
	}

	/// Installs the drawing collaborator.
	pub fn set_renderer<R: Renderer + 'static>(&mut self, renderer: R) {
		self.renderer = Box::new(renderer);
	}

	/// Adds a listener for `event` on nodes or edges. Listeners accumulate.
	pub fn register_listener<F>(&mut self, domain: Domain, event: impl Into<String>, listener: F)
	where
		F: FnMut(Target<'_>) + 'static,
	{
		self.listeners
			.domain_mut(domain)
			.entry(event.into())
			.or_default()
			.push(Box::new(listener));
	}

	/// Invokes every listener for `event` on the element with `key`, in
	/// registration order. Returns how many ran.
	pub fn dispatch(&mut self, domain: Domain, event: &str, key: &Key) -> usize {
		let Some(listeners) = self.listeners.domain_mut(domain).get_mut(event) else {
			return 0;
		};
		let target = match domain {
			Domain::Nodes => self.store.node_by_key(key).map(Target::Node),
			Domain::Edges => self.store.edge_by_key(key).map(Target::Edge),
		};
		let Some(target) = target else {
			return 0;
		};
		for listener in listeners.iter_mut() {
			listener(target);
		}
		listeners.len()
	}

	/// Scores every node of the full graph and keeps the report.
	pub fn compute_stats(&mut self) -> &CentralityReport {
		let report = self.analyzer.analyze(&mut self.store);
		self.stats.insert(report)
	}

	fn apply_forces(&mut self) {
		let params = ForceParams::derive(self.settings.settings(), self.subgraph.node_count());
		self.simulation.configure(&mut self.store, &self.subgraph, params);
	}

	fn notify_changes(&mut self) {
		let store = &self.store;
		let node_keys: Vec<&Key> = self
			.subgraph
			.nodes
			.iter()
			.filter_map(|&id| store.node(id).map(Node::key))
			.collect();
		let edge_keys: Vec<&Key> = self
			.subgraph
			.edges
			.iter()
			.filter_map(|&id| store.edge(id).map(Edge::key))
			.collect();

		let current_nodes: HashSet<&Key> = node_keys.iter().copied().collect();
		let current_edges: HashSet<&Key> = edge_keys.iter().copied().collect();
		let mut exited = Exited {
			nodes: self.visible_nodes.iter().filter(|k| !current_nodes.contains(k)).cloned().collect(),
			edges: self.visible_edges.iter().filter(|k| !current_edges.contains(k)).cloned().collect(),
		};
		exited.nodes.sort();
		exited.edges.sort();

		let entered = Entered {
			nodes: self
				.subgraph
				.nodes
				.iter()
				.filter_map(|&id| store.node(id))
				.filter(|n| !self.visible_nodes.contains(n.key()))
				.collect(),
			edges: self
				.subgraph
				.edges
				.iter()
				.filter_map(|&id| store.edge(id))
				.filter(|e| !self.visible_edges.contains(e.key()))
				.collect(),
		};

		if !exited.nodes.is_empty() || !exited.edges.is_empty() {
			self.renderer.on_exit(&exited);
		}
		if !entered.nodes.is_empty() || !entered.edges.is_empty() {
			self.renderer.on_enter(&entered);
		}

		self.visible_nodes = node_keys.into_iter().cloned().collect();
		self.visible_edges = edge_keys.into_iter().cloned().collect();
	}
}
