//! Graph data model: keys, nodes, edges and their endpoints.

mod assemble;
mod store;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::centrality::Centrality;

pub use assemble::{EdgeFilter, Identity, NodeFilter, Resolution, Subgraph, SubgraphAssembler};
pub use store::GraphStore;

/// Open attribute record attached to every node and edge.
pub type Attrs = Map<String, Value>;

/// Identity of a node or edge within one store.
///
/// Integers and strings live in the same namespace but never compare equal:
/// `1` and `"1"` are different keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
	/// Integer key, also used for sequential defaults.
	Int(i64),
	/// String key.
	Str(String),
}

impl Key {
	/// Reads a key from an attribute value. Only integers and strings qualify.
	pub fn from_value(value: &Value) -> Option<Self> {
		match value {
			Value::Number(n) => n.as_i64().map(Key::Int),
			Value::String(s) => Some(Key::Str(s.clone())),
			_ => None,
		}
	}

	/// Converts back into an attribute value.
	pub fn to_value(&self) -> Value {
		match self {
			Key::Int(i) => Value::from(*i),
			Key::Str(s) => Value::from(s.as_str()),
		}
	}
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Key::Int(i) => write!(f, "{i}"),
			Key::Str(s) => f.write_str(s),
		}
	}
}

impl From<i64> for Key {
	fn from(value: i64) -> Self {
		Key::Int(value)
	}
}

impl From<i32> for Key {
	fn from(value: i32) -> Self {
		Key::Int(value.into())
	}
}

impl From<&str> for Key {
	fn from(value: &str) -> Self {
		Key::Str(value.to_owned())
	}
}

impl From<String> for Key {
	fn from(value: String) -> Self {
		Key::Str(value)
	}
}

/// Position of a node in its store's insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
	/// Zero-based insertion index.
	pub fn index(self) -> usize {
		self.0
	}
}

/// Position of an edge in its store's insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) usize);

impl EdgeId {
	/// Zero-based insertion index.
	pub fn index(self) -> usize {
		self.0
	}
}

/// One side of an edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
	/// Raw key with no matching node at resolution time.
	Unresolved(Key),
	/// A node owned by the same store.
	Resolved(NodeId),
}

impl Endpoint {
	/// The referenced node, if resolved.
	pub fn node(&self) -> Option<NodeId> {
		match self {
			Endpoint::Resolved(id) => Some(*id),
			Endpoint::Unresolved(_) => None,
		}
	}

	/// Whether this endpoint points at a node.
	pub fn is_resolved(&self) -> bool {
		matches!(self, Endpoint::Resolved(_))
	}
}

/// A graph vertex together with its layout state.
#[derive(Clone, Debug)]
pub struct Node {
	pub(crate) id: NodeId,
	pub(crate) key: Key,
	/// Horizontal position.
	pub x: f64,
	/// Vertical position.
	pub y: f64,
	/// Horizontal velocity.
	pub vx: f64,
	/// Vertical velocity.
	pub vy: f64,
	/// Optional weight, lengthens incident springs in adaptive mode.
	pub weight: Option<f64>,
	/// Pinned nodes keep their position while the simulation runs.
	pub fixed: bool,
	pub(crate) centrality: Option<Centrality>,
	pub(crate) included: bool,
	pub(crate) placed: bool,
	attrs: Attrs,
}

impl Node {
	pub(crate) fn new(id: NodeId, key: Key, attrs: Attrs) -> Self {
		let weight = attrs.get("weight").and_then(Value::as_f64);
		let position = match (
			attrs.get("x").and_then(Value::as_f64),
			attrs.get("y").and_then(Value::as_f64),
		) {
			(Some(x), Some(y)) => Some((x, y)),
			_ => None,
		};
		let fixed = attrs.get("fixed").and_then(Value::as_bool).unwrap_or(false);
		let (x, y) = position.unwrap_or_default();

		Self {
			id,
			key,
			x,
			y,
			vx: 0.0,
			vy: 0.0,
			weight,
			fixed,
			centrality: None,
			included: false,
			placed: position.is_some(),
			attrs,
		}
	}

	/// Store-local handle.
	pub fn id(&self) -> NodeId {
		self.id
	}

	/// Identity key.
	pub fn key(&self) -> &Key {
		&self.key
	}

	/// Current position as `(x, y)`.
	pub fn position(&self) -> (f64, f64) {
		(self.x, self.y)
	}

	/// Score from the most recent centrality run.
	pub fn centrality(&self) -> Option<Centrality> {
		self.centrality
	}

	/// Whether the last rebuild put this node in the visible subgraph.
	pub fn included(&self) -> bool {
		self.included
	}

	/// The attribute record the node was added with.
	pub fn attrs(&self) -> &Attrs {
		&self.attrs
	}

	/// Shorthand for a single attribute.
	pub fn attr(&self, name: &str) -> Option<&Value> {
		self.attrs.get(name)
	}
}

/// A graph link.
#[derive(Clone, Debug)]
pub struct Edge {
	pub(crate) id: EdgeId,
	pub(crate) key: Key,
	pub(crate) source: Endpoint,
	pub(crate) target: Endpoint,
	/// Optional value, stiffens the spring in adaptive mode.
	pub value: Option<f64>,
	pub(crate) included: bool,
	attrs: Attrs,
}

impl Edge {
	pub(crate) fn new(id: EdgeId, key: Key, source: Endpoint, target: Endpoint, attrs: Attrs) -> Self {
		let value = attrs.get("value").and_then(Value::as_f64);
		Self {
			id,
			key,
			source,
			target,
			value,
			included: false,
			attrs,
		}
	}

	/// Store-local handle.
	pub fn id(&self) -> EdgeId {
		self.id
	}

	/// Identity key.
	pub fn key(&self) -> &Key {
		&self.key
	}

	/// Source endpoint.
	pub fn source(&self) -> &Endpoint {
		&self.source
	}

	/// Target endpoint.
	pub fn target(&self) -> &Endpoint {
		&self.target
	}

	/// Both endpoints when both are resolved.
	pub fn nodes(&self) -> Option<(NodeId, NodeId)> {
		Some((self.source.node()?, self.target.node()?))
	}

	/// Whether the last rebuild put this edge in the visible subgraph.
	pub fn included(&self) -> bool {
		self.included
	}

	/// The attribute record the edge was added with.
	pub fn attrs(&self) -> &Attrs {
		&self.attrs
	}

	/// Shorthand for a single attribute.
	pub fn attr(&self, name: &str) -> Option<&Value> {
		self.attrs.get(name)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn keys_from_values() {
		assert_eq!(Key::from_value(&json!(3)), Some(Key::Int(3)));
		assert_eq!(Key::from_value(&json!("a")), Some(Key::from("a")));
		assert_eq!(Key::from_value(&json!(1.5)), None);
		assert_eq!(Key::from_value(&json!(true)), None);
		assert_ne!(Key::Int(1), Key::from("1"));
	}

	#[test]
	fn node_reads_layout_attributes() {
		let attrs = json!({"id": "a", "x": 4.0, "y": 2, "weight": 3}).as_object().cloned().unwrap();
		let node = Node::new(NodeId(0), Key::from("a"), attrs);
		assert_eq!(node.position(), (4.0, 2.0));
		assert_eq!(node.weight, Some(3.0));
		assert!(node.placed);
		assert!(!node.fixed);
	}
}
