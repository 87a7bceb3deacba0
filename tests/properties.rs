//! Property tests over randomly shaped graphs.
//!
//! Covers: visible edges only touch visible nodes, adjacency symmetry and
//! per-edge degree counts, seeded centrality determinism, and layout stability.

use std::collections::HashSet;
use std::time::Duration;

use networker::centrality::{CentralityAnalyzer, adjacency, index_map};
use networker::graph::SubgraphAssembler;
use networker::{GraphStore, Key, Networker, Node, Resolution};
use proptest::prelude::*;
use serde_json::json;

/// Node count plus edges over a slightly larger key space, so some
/// endpoints never resolve.
fn graph() -> impl Strategy<Value = (i64, Vec<(i64, i64)>)> {
	(0i64..12).prop_flat_map(|n| (Just(n), prop::collection::vec((0i64..n + 3, 0i64..n + 3), 0..30)))
}

fn store_of(n: i64, edges: &[(i64, i64)]) -> GraphStore {
	let mut store = GraphStore::new();
	for i in 0..n {
		store.add_node(json!({ "id": i }));
	}
	for (s, t) in edges {
		store.add_edge(json!({ "source": s, "target": t }));
	}
	store
}

proptest! {
	#[test]
	fn visible_edges_join_visible_nodes((n, edges) in graph(), mask in prop::collection::vec(any::<bool>(), 12)) {
		let mut store = store_of(n, &edges);
		let mut assembler = SubgraphAssembler::new(Resolution::Lazy);
		let keep = mask.clone();
		assembler.set_node_filter(Box::new(move |nodes: &[&Node]| {
			nodes.iter().filter(|n| keep[n.id().index()]).map(|n| n.id()).collect::<Vec<_>>()
		}));
		let sub = assembler.assemble(&mut store);

		let visible: HashSet<_> = sub.nodes.iter().copied().collect();
		for &id in &sub.edges {
			let (s, t) = store.edge(id).and_then(|e| e.nodes()).unwrap();
			prop_assert!(visible.contains(&s) && visible.contains(&t));
		}
		for node in store.nodes() {
			prop_assert_eq!(node.included(), mask[node.id().index()]);
		}
		let order: Vec<usize> = sub.nodes.iter().map(|id| id.index()).collect();
		let mut sorted = order.clone();
		sorted.sort_unstable();
		prop_assert_eq!(order, sorted);
	}

	#[test]
	fn adjacency_is_symmetric_and_degree_counts_edges((n, edges) in graph()) {
		let store = store_of(n, &edges);
		let index = index_map(&store);
		let (a, d) = adjacency(&store, &index);
		prop_assert_eq!(&a, &a.transpose());

		let counted = |i: i64| edges.iter().filter(|&&(s, t)| s != t && s < n && t < n && (s == i || t == i)).count();
		let laplacian = &d - &a;
		for i in 0..a.nrows() {
			prop_assert_eq!(a[(i, i)], 0.0);
			prop_assert_eq!(d[(i, i)], counted(i as i64) as f64);
			prop_assert!(laplacian.row(i).sum() >= 0.0);
		}
	}

	#[test]
	fn same_seed_same_scores((n, edges) in graph(), seed in any::<u64>()) {
		let mut first = store_of(n, &edges);
		let mut second = store_of(n, &edges);
		let a = CentralityAnalyzer::new(seed).analyze(&mut first);
		let b = CentralityAnalyzer::new(seed).analyze(&mut second);

		prop_assert_eq!(a.eigenvector.len(), n as usize);
		prop_assert_eq!(a.invalid, b.invalid);
		for (x, y) in first.nodes().iter().zip(second.nodes()) {
			prop_assert_eq!(x.centrality(), y.centrality());
		}
	}

	#[test]
	fn layout_stays_finite((n, edges) in graph(), theta in 0.0f64..=1.0) {
		let mut engine = Networker::default();
		engine.add_many(
			(0..n).map(|i| json!({ "id": i })),
			edges.iter().map(|(s, t)| json!({ "source": s, "target": t })),
			true,
		);
		engine.set_force_settings(&json!({ "theta": theta })).unwrap();
		for _ in 0..50 {
			engine.step(Duration::from_millis(16));
		}
		for node in engine.store().nodes() {
			let (x, y) = node.position();
			prop_assert!(x.is_finite() && y.is_finite(), "{} at ({x}, {y})", node.key());
		}
		prop_assert!(engine.store().node_by_key(&Key::Int(n)).is_none());
	}
}
