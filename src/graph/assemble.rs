use log::debug;
use serde::{Deserialize, Serialize};

use super::{Edge, EdgeId, GraphStore, Node, NodeId};

/// Chooses which nodes take part in the next rebuild.
pub trait NodeFilter {
	/// Returns the selected subset of `nodes`.
	fn select(&self, nodes: &[&Node]) -> Vec<NodeId>;
}

/// Chooses which edges are candidates in the next rebuild.
pub trait EdgeFilter {
	/// Returns the selected subset of `edges`.
	fn select(&self, edges: &[&Edge]) -> Vec<EdgeId>;
}

impl<F> NodeFilter for F
where
	F: Fn(&[&Node]) -> Vec<NodeId>,
{
	fn select(&self, nodes: &[&Node]) -> Vec<NodeId> {
		self(nodes)
	}
}

impl<F> EdgeFilter for F
where
	F: Fn(&[&Edge]) -> Vec<EdgeId>,
{
	fn select(&self, edges: &[&Edge]) -> Vec<EdgeId> {
		self(edges)
	}
}

/// Keeps everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl NodeFilter for Identity {
	fn select(&self, nodes: &[&Node]) -> Vec<NodeId> {
		nodes.iter().map(|n| n.id()).collect()
	}
}

impl EdgeFilter for Identity {
	fn select(&self, edges: &[&Edge]) -> Vec<EdgeId> {
		edges.iter().map(|e| e.id()).collect()
	}
}

/// When unresolved edge endpoints get another chance to find their node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
	/// Only when the edge is added.
	AddTime,
	/// When the edge is added and again on every rebuild.
	#[default]
	Lazy,
}

/// The visible, simulated part of the graph, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Subgraph {
	/// Included nodes.
	pub nodes: Vec<NodeId>,
	/// Included edges; both endpoints of each are in `nodes`.
	pub edges: Vec<EdgeId>,
}

impl Subgraph {
	/// Number of included nodes.
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	/// Number of included edges.
	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}
}

/// Derives the visible subgraph from the store and the two filters.
pub struct SubgraphAssembler {
	node_filter: Box<dyn NodeFilter>,
	edge_filter: Box<dyn EdgeFilter>,
	resolution: Resolution,
}

impl Default for SubgraphAssembler {
	fn default() -> Self {
		Self::new(Resolution::default())
	}
}

impl SubgraphAssembler {
	/// Assembler with identity filters.
	pub fn new(resolution: Resolution) -> Self {
		Self {
			node_filter: Box::new(Identity),
			edge_filter: Box::new(Identity),
			resolution,
		}
	}

	/// Current resolution policy.
	pub fn resolution(&self) -> Resolution {
		self.resolution
	}

	/// Replaces the node filter.
	pub fn set_node_filter(&mut self, filter: Box<dyn NodeFilter>) {
		self.node_filter = filter;
	}

	/// Replaces the edge filter.
	pub fn set_edge_filter(&mut self, filter: Box<dyn EdgeFilter>) {
		self.edge_filter = filter;
	}

	/// Restores both identity filters.
	pub fn reset_filters(&mut self) {
		self.node_filter = Box::new(Identity);
		self.edge_filter = Box::new(Identity);
	}

	/// Recomputes every `included` flag and returns the visible subgraph.
	///
	/// An edge is kept only when the edge filter selects it and both of its
	/// endpoints are resolved and selected by the node filter.
	pub fn assemble(&self, store: &mut GraphStore) -> Subgraph {
		if self.resolution == Resolution::Lazy {
			let resolved = store.resolve_pending();
			if resolved > 0 {
				debug!("resolved {resolved} pending edge endpoints");
			}
		}

		for node in store.nodes_mut() {
			node.included = false;
		}
		for edge in store.edges_mut() {
			edge.included = false;
		}

		let selected = {
			let snapshot: Vec<&Node> = store.nodes().iter().collect();
			self.node_filter.select(&snapshot)
		};
		for id in selected {
			if let Some(node) = store.nodes_mut().get_mut(id.0) {
				node.included = true;
			}
		}

		let candidates = {
			let snapshot: Vec<&Edge> = store.edges().iter().collect();
			self.edge_filter.select(&snapshot)
		};
		let mut candidate = vec![false; store.edge_count()];
		for id in candidates {
			if let Some(slot) = candidate.get_mut(id.0) {
				*slot = true;
			}
		}

		let nodes = store.nodes();
		let mut visible_edges = Vec::new();
		for (edge, &wanted) in store.edges().iter().zip(&candidate) {
			let keep = wanted
				&& edge
					.nodes()
					.is_some_and(|(s, t)| included(nodes, s) && included(nodes, t));
			if keep {
				visible_edges.push(edge.id());
			}
		}
		for &id in &visible_edges {
			if let Some(edge) = store.edges_mut().get_mut(id.0) {
				edge.included = true;
			}
		}

		let visible_nodes = store
			.nodes()
			.iter()
			.filter(|n| n.included)
			.map(|n| n.id())
			.collect();

		Subgraph {
			nodes: visible_nodes,
			edges: visible_edges,
		}
	}
}

fn included(nodes: &[Node], id: NodeId) -> bool {
	nodes.get(id.0).is_some_and(|n| n.included)
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::graph::Key;

	fn sample() -> GraphStore {
		let mut store = GraphStore::new();
		for key in [1, 2, 3] {
			store.add_node(json!({ "id": key }));
		}
		store.add_edge(json!({"id": "e1", "source": 1, "target": 2}));
		store.add_edge(json!({"id": "e2", "source": 2, "target": 3}));
		store
	}

	#[test]
	fn identity_keeps_everything() {
		let mut store = sample();
		let sub = SubgraphAssembler::default().assemble(&mut store);
		assert_eq!(sub.node_count(), 3);
		assert_eq!(sub.edge_count(), 2);
	}

	#[test]
	fn excluded_endpoint_drops_edge() {
		let mut store = sample();
		let mut assembler = SubgraphAssembler::default();
		assembler.set_node_filter(Box::new(|nodes: &[&Node]| {
			nodes
				.iter()
				.filter(|n| n.key() != &Key::Int(3))
				.map(|n| n.id())
				.collect::<Vec<_>>()
		}));
		let sub = assembler.assemble(&mut store);

		let keys: Vec<_> = sub.nodes.iter().map(|&id| store.node(id).unwrap().key().clone()).collect();
		assert_eq!(keys, vec![Key::Int(1), Key::Int(2)]);
		assert_eq!(sub.edges.len(), 1);
		assert_eq!(store.edge(sub.edges[0]).unwrap().key(), &Key::from("e1"));
		assert!(!store.edge_by_key(&Key::from("e2")).unwrap().included());

		assembler.reset_filters();
		let sub = assembler.assemble(&mut store);
		assert_eq!(sub.edge_count(), 2);
	}

	#[test]
	fn edge_filter_limits_candidates() {
		let mut store = sample();
		let mut assembler = SubgraphAssembler::default();
		assembler.set_edge_filter(Box::new(|edges: &[&Edge]| {
			edges.iter().skip(1).map(|e| e.id()).collect::<Vec<_>>()
		}));
		let sub = assembler.assemble(&mut store);
		assert_eq!(sub.edges, vec![EdgeId(1)]);
		assert_eq!(sub.node_count(), 3);
	}

	#[test]
	fn unresolved_edges_wait_for_lazy_resolution() {
		let mut store = GraphStore::new();
		store.add_node(json!({"id": "a"}));
		store.add_edge(json!({"source": "a", "target": "b"}));

		let lazy = SubgraphAssembler::new(Resolution::Lazy);
		let eager = SubgraphAssembler::new(Resolution::AddTime);
		assert_eq!(lazy.assemble(&mut store).edge_count(), 0);

		store.add_node(json!({"id": "b"}));
		let mut one_shot = store.clone();
		assert_eq!(eager.assemble(&mut one_shot).edge_count(), 0);
		assert_eq!(lazy.assemble(&mut store).edge_count(), 1);
	}
}
