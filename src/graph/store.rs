use std::collections::HashMap;

use log::{debug, warn};
use serde_json::Value;

use super::{Attrs, Edge, EdgeId, Endpoint, Key, Node, NodeId};
use crate::error::{Error, Result};

/// Attribute used as identity unless configured otherwise.
pub const DEFAULT_KEY_ATTR: &str = "id";

/// Owns every node and edge, in insertion order, plus the key indexes.
#[derive(Clone, Debug)]
pub struct GraphStore {
	key_attr: String,
	nodes: Vec<Node>,
	edges: Vec<Edge>,
	node_keys: HashMap<Key, NodeId>,
	edge_keys: HashMap<Key, EdgeId>,
}

impl Default for GraphStore {
	fn default() -> Self {
		Self::with_key_attr(DEFAULT_KEY_ATTR)
	}
}

impl GraphStore {
	/// Empty store keyed by `"id"`.
	pub fn new() -> Self {
		Self::default()
	}

	/// Empty store keyed by `key_attr`.
	pub fn with_key_attr(key_attr: impl Into<String>) -> Self {
		Self {
			key_attr: key_attr.into(),
			nodes: Vec::new(),
			edges: Vec::new(),
			node_keys: HashMap::new(),
			edge_keys: HashMap::new(),
		}
	}

	/// Attribute name used as identity.
	pub fn key_attr(&self) -> &str {
		&self.key_attr
	}

	/// Changes the identity attribute. Only allowed on an empty store.
	pub fn set_key_attr(&mut self, key_attr: impl Into<String>) -> Result<()> {
		if !self.is_empty() {
			return Err(Error::KeyLocked {
				current: self.key_attr.clone(),
			});
		}
		self.key_attr = key_attr.into();
		Ok(())
	}

	/// Appends a node. Returns `None` when the key is taken or the record is
	/// unusable; the store is left untouched in that case.
	pub fn add_node(&mut self, attrs: Value) -> Option<NodeId> {
		let mut attrs = into_record(attrs, "node")?;
		let key = match self.read_key(&attrs, "node")? {
			Some(key) if self.node_keys.contains_key(&key) => {
				debug!("rejecting duplicate node key {key}");
				return None;
			}
			Some(key) => key,
			None => {
				let key = next_free_key(self.nodes.len(), &self.node_keys);
				attrs.insert(self.key_attr.clone(), key.to_value());
				key
			}
		};

		let id = NodeId(self.nodes.len());
		self.node_keys.insert(key.clone(), id);
		self.nodes.push(Node::new(id, key, attrs));
		Some(id)
	}

	/// Appends an edge, resolving `source` and `target` against the nodes
	/// present right now. Unmatched endpoints stay unresolved.
	pub fn add_edge(&mut self, attrs: Value) -> Option<EdgeId> {
		let attrs = into_record(attrs, "edge")?;
		let (Some(source), Some(target)) = (
			attrs.get("source").and_then(Key::from_value),
			attrs.get("target").and_then(Key::from_value),
		) else {
			warn!("edge record needs integer or string `source` and `target`");
			return None;
		};
		let source = self.resolve(source);
		let target = self.resolve(target);
		self.insert_edge(attrs, source, target)
	}

	/// Adds an edge between two nodes already in this store. The endpoints'
	/// keys are written into `source` and `target`, replacing any present.
	///
	/// Returns `None` when either id belongs to no node, or for the same
	/// record problems [`add_edge`](Self::add_edge) rejects.
	pub fn add_edge_between(&mut self, source: NodeId, target: NodeId, attrs: Value) -> Option<EdgeId> {
		let mut attrs = into_record(attrs, "edge")?;
		let (Some(from), Some(to)) = (self.node(source), self.node(target)) else {
			warn!("edge endpoints {source:?} -> {target:?} are not in this store");
			return None;
		};
		attrs.insert("source".to_owned(), from.key().to_value());
		attrs.insert("target".to_owned(), to.key().to_value());
		self.insert_edge(attrs, Endpoint::Resolved(source), Endpoint::Resolved(target))
	}

	fn insert_edge(&mut self, mut attrs: Attrs, source: Endpoint, target: Endpoint) -> Option<EdgeId> {
		let key = match self.read_key(&attrs, "edge")? {
			Some(key) if self.edge_keys.contains_key(&key) => {
				debug!("rejecting duplicate edge key {key}");
				return None;
			}
			Some(key) => key,
			None => {
				let key = next_free_key(self.edges.len(), &self.edge_keys);
				attrs.insert(self.key_attr.clone(), key.to_value());
				key
			}
		};

		let id = EdgeId(self.edges.len());
		self.edge_keys.insert(key.clone(), id);
		self.edges.push(Edge::new(id, key, source, target, attrs));
		Some(id)
	}

	/// Retries resolution of every unresolved endpoint. Returns how many
	/// endpoints were resolved by this pass.
	pub fn resolve_pending(&mut self) -> usize {
		let mut resolved = 0;
		for edge in &mut self.edges {
			for endpoint in [&mut edge.source, &mut edge.target] {
				if let Endpoint::Unresolved(key) = endpoint {
					if let Some(&id) = self.node_keys.get(key) {
						*endpoint = Endpoint::Resolved(id);
						resolved += 1;
					}
				}
			}
		}
		resolved
	}

	/// Drops every node, edge and key mapping.
	pub fn clear(&mut self) {
		self.nodes.clear();
		self.edges.clear();
		self.node_keys.clear();
		self.edge_keys.clear();
	}

	/// Nodes in insertion order.
	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	/// Mutable nodes in insertion order.
	pub fn nodes_mut(&mut self) -> &mut [Node] {
		&mut self.nodes
	}

	/// Edges in insertion order.
	pub fn edges(&self) -> &[Edge] {
		&self.edges
	}

	pub(crate) fn edges_mut(&mut self) -> &mut [Edge] {
		&mut self.edges
	}

	/// Mutable nodes alongside the edges, for per-tick hooks.
	pub fn parts_mut(&mut self) -> (&mut [Node], &[Edge]) {
		(&mut self.nodes, &self.edges)
	}

	/// Node by handle.
	pub fn node(&self, id: NodeId) -> Option<&Node> {
		self.nodes.get(id.0)
	}

	/// Edge by handle.
	pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
		self.edges.get(id.0)
	}

	/// Handle of the node with `key`.
	pub fn node_id(&self, key: &Key) -> Option<NodeId> {
		self.node_keys.get(key).copied()
	}

	/// Node with `key`.
	pub fn node_by_key(&self, key: &Key) -> Option<&Node> {
		self.node_id(key).and_then(|id| self.node(id))
	}

	/// Mutable node with `key`.
	pub fn node_by_key_mut(&mut self, key: &Key) -> Option<&mut Node> {
		let id = self.node_id(key)?;
		self.nodes.get_mut(id.0)
	}

	/// Edge with `key`.
	pub fn edge_by_key(&self, key: &Key) -> Option<&Edge> {
		self.edge_keys.get(key).and_then(|&id| self.edge(id))
	}

	/// Number of nodes.
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	/// Number of edges.
	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}

	/// True when the store holds neither nodes nor edges.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty() && self.edges.is_empty()
	}

	fn resolve(&self, key: Key) -> Endpoint {
		match self.node_keys.get(&key) {
			Some(&id) => Endpoint::Resolved(id),
			None => Endpoint::Unresolved(key),
		}
	}

	/// `Some(None)` means no key was supplied; a present but unusable key
	/// rejects the whole record.
	fn read_key(&self, attrs: &Attrs, kind: &str) -> Option<Option<Key>> {
		match attrs.get(&self.key_attr) {
			None | Some(Value::Null) => Some(None),
			Some(value) => match Key::from_value(value) {
				Some(key) => Some(Some(key)),
				None => {
					warn!("{kind} `{}` must be an integer or a string, got {value}", self.key_attr);
					None
				}
			},
		}
	}
}

fn into_record(attrs: Value, kind: &str) -> Option<Attrs> {
	match attrs {
		Value::Object(map) => Some(map),
		other => {
			warn!("{kind} attributes must be an object, got {other}");
			None
		}
	}
}

/// Sequential default key: the current count, or the next integer above it
/// that no caller-supplied key has taken.
fn next_free_key<T>(count: usize, taken: &HashMap<Key, T>) -> Key {
	let start = i64::try_from(count).unwrap_or(i64::MAX);
	let mut candidate = start;
	while taken.contains_key(&Key::Int(candidate)) {
		candidate += 1;
	}
	if candidate != start {
		warn!("default key {start} already taken, assigned {candidate} instead");
	}
	Key::Int(candidate)
}
