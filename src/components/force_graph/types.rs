use serde::Serialize;

use crate::engine::GraphDocument;

#[derive(Clone, Debug, Serialize)]
pub struct GraphNode {
	pub id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub group: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub weight: Option<f64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GraphLink {
	pub source: String,
	pub target: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub value: Option<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct GraphData {
	pub nodes: Vec<GraphNode>,
	pub links: Vec<GraphLink>,
}

impl GraphData {
	/// Attribute records for [`Networker::add_document`](crate::Networker::add_document).
	pub fn to_document(&self) -> GraphDocument {
		GraphDocument {
			nodes: self.nodes.iter().filter_map(|n| serde_json::to_value(n).ok()).collect(),
			edges: self.links.iter().filter_map(|l| serde_json::to_value(l).ok()).collect(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Key, Networker};

	#[test]
	fn data_imports_into_engine() {
		let data = GraphData {
			nodes: vec![
				GraphNode {
					id: "a".into(),
					label: Some("A".into()),
					color: None,
					group: Some(2),
					weight: None,
				},
				GraphNode {
					id: "b".into(),
					label: None,
					color: None,
					group: None,
					weight: Some(1.0),
				},
			],
			links: vec![GraphLink {
				source: "a".into(),
				target: "b".into(),
				value: Some(2.0),
			}],
		};
		let mut engine = Networker::default();
		assert_eq!(engine.add_document(data.to_document(), true), 3);
		let a = engine.store().node_by_key(&Key::from("a")).unwrap();
		assert_eq!(a.attr("label").and_then(|v| v.as_str()), Some("A"));
		assert_eq!(engine.store().edges()[0].value, Some(2.0));
		assert_eq!(engine.subgraph().edge_count(), 1);
	}
}
