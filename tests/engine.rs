use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use networker::engine::EXPLODE_DURATION;
use networker::simulation::EXPLODE_GRAVITY;
use networker::{Centrality, EngineConfig, Error, GraphStore, Key, Networker, Node, Resolution, Settings, SimState};
use serde_json::json;

const FRAME: Duration = Duration::from_millis(16);

fn ring(engine: &mut Networker, n: i64) {
	engine.add_many(
		(0..n).map(|i| json!({ "id": i, "label": format!("n{i}") })),
		(0..n).map(|i| json!({ "source": i, "target": (i + 1) % n })),
		true,
	);
}

#[test]
fn duplicate_keys_leave_the_graph_alone() {
	let mut engine = Networker::default();
	assert!(engine.add_node(json!({"id": "a", "color": "red"}), true));
	assert!(!engine.add_node(json!({"id": "a", "color": "blue"}), true));

	assert_eq!(engine.store().node_count(), 1);
	let a = engine.store().node_by_key(&Key::from("a")).unwrap();
	assert_eq!(a.attr("color"), Some(&json!("red")));
}

#[test]
fn default_keys_count_up_and_skip_taken_ones() {
	let mut engine = Networker::default();
	assert!(engine.add_node(json!({}), false));
	assert!(engine.add_node(json!({"id": 2}), false));
	assert!(engine.add_node(json!({"name": "x"}), false));
	assert!(engine.add_node(json!({}), false));

	let keys: Vec<&Key> = engine.store().nodes().iter().map(Node::key).collect();
	assert_eq!(keys, [&Key::Int(0), &Key::Int(2), &Key::Int(3), &Key::Int(4)]);
	assert_eq!(engine.store().nodes()[2].attr("id"), Some(&json!(3)));
}

#[test]
fn key_attribute_is_locked_after_first_add() {
	let mut engine = Networker::default();
	engine.set_key_attr("name").unwrap();
	assert!(engine.add_node(json!({"name": "alpha"}), false));
	assert!(engine.store().node_by_key(&Key::from("alpha")).is_some());
	assert!(matches!(engine.set_key_attr("id"), Err(Error::KeyLocked { .. })));
}

#[test]
fn config_key_drives_identity() {
	let config = EngineConfig::from_json(r#"{"key": "name", "size": [300, 200]}"#).unwrap();
	let mut engine = Networker::new(config);
	engine.add_many(
		[json!({"name": "p"}), json!({"name": "q"})],
		[json!({"source": "p", "target": "q"})],
		true,
	);
	assert_eq!(engine.subgraph().edge_count(), 1);
	assert_eq!(engine.simulation().center(), (150.0, 100.0));
}

#[test]
fn filtered_nodes_take_their_edges_with_them() {
	let mut engine = Networker::default();
	engine.add_many(
		(1..=4).map(|i| json!({ "id": i })),
		[
			json!({"source": 1, "target": 2}),
			json!({"source": 2, "target": 3}),
			json!({"source": 3, "target": 4}),
			json!({"source": 4, "target": 1}),
		],
		false,
	);
	engine.set_node_filter(|nodes: &[&Node]| {
		nodes
			.iter()
			.filter(|n| *n.key() != Key::Int(3))
			.map(|n| n.id())
			.collect::<Vec<_>>()
	});
	engine.rebuild();

	let frame = engine.frame();
	let visible: Vec<&Key> = frame.nodes().map(Node::key).collect();
	assert_eq!(visible, [&Key::Int(1), &Key::Int(2), &Key::Int(4)]);
	assert_eq!(frame.edges().count(), 2);
	assert!(!engine.store().node_by_key(&Key::Int(3)).unwrap().included());

	engine.reset_filters();
	engine.rebuild();
	assert_eq!(engine.subgraph().edge_count(), 4);
}

#[test]
fn edges_to_late_nodes_resolve_on_rebuild() {
	let mut engine = Networker::default();
	assert!(engine.add_edge(json!({"source": "x", "target": "y"}), true));
	assert_eq!(engine.subgraph().edge_count(), 0);

	engine.add_many([json!({"id": "x"}), json!({"id": "y"})], [], true);
	assert_eq!(engine.subgraph().edge_count(), 1);
}

#[test]
fn edges_can_join_nodes_by_id() {
	let mut engine = Networker::new(EngineConfig {
		resolution: Resolution::AddTime,
		..EngineConfig::default()
	});
	engine.add_many([json!({"id": "x"}), json!({"id": "y"})], [], false);
	let x = engine.store().node_id(&Key::from("x")).unwrap();
	let y = engine.store().node_id(&Key::from("y")).unwrap();

	assert!(engine.add_edge_between(x, y, json!({"value": 3}), true));
	assert_eq!(engine.subgraph().edge_count(), 1);
	let edge = &engine.store().edges()[0];
	assert_eq!(edge.attr("target"), Some(&json!("y")));

	let mut elsewhere = GraphStore::new();
	let foreign = (0..5).filter_map(|i| elsewhere.add_node(json!({ "id": i }))).last().unwrap();
	assert!(!engine.add_edge_between(x, foreign, json!({}), true));
	assert_eq!(engine.store().edge_count(), 1);
}

#[test]
fn add_time_resolution_never_retries() {
	let mut engine = Networker::new(EngineConfig {
		resolution: Resolution::AddTime,
		..EngineConfig::default()
	});
	engine.add_edge(json!({"source": "x", "target": "y"}), false);
	engine.add_many([json!({"id": "x"}), json!({"id": "y"})], [], true);
	assert_eq!(engine.subgraph().edge_count(), 0);
	assert_eq!(engine.subgraph().node_count(), 2);
}

#[test]
fn layout_settles_and_stops() {
	let mut engine = Networker::default();
	ring(&mut engine, 8);
	assert_eq!(engine.state(), SimState::Running);

	let mut ticks = 0;
	while engine.step(FRAME) {
		ticks += 1;
		assert!(ticks < 1000, "simulation never stopped");
	}
	assert_eq!(engine.state(), SimState::Stopped);
	for node in engine.store().nodes() {
		let (x, y) = node.position();
		assert!(x.is_finite() && y.is_finite());
	}

	let (cx, cy) = engine.simulation().center();
	let n = engine.store().node_count() as f64;
	let (mx, my) = engine
		.store()
		.nodes()
		.iter()
		.fold((0.0, 0.0), |(sx, sy), node| (sx + node.x / n, sy + node.y / n));
	assert!((mx - cx).abs() < 50.0 && (my - cy).abs() < 50.0);
}

#[test]
fn falsy_settings_are_applied() {
	let mut engine = Networker::default();
	ring(&mut engine, 4);
	engine
		.set_force_settings(&json!({"gravity": 0, "theta": 0, "panZoom": false, "unknown": 1}))
		.unwrap();

	assert_eq!(engine.settings().gravity, 0.0);
	assert_eq!(engine.settings().theta, 0.0);
	assert!(!engine.settings().pan_zoom);
	assert_eq!(engine.params().gravity, 0.0);
	assert!(matches!(
		engine.set_force_settings(&json!({"charge": "lots"})),
		Err(Error::InvalidSettings(_))
	));
}

#[test]
fn advanced_mode_scales_with_visible_nodes() {
	let mut engine = Networker::default();
	ring(&mut engine, 10);
	engine.set_force_settings(&json!({"advanced": true, "spread": 1})).unwrap();

	let params = engine.params();
	assert_eq!(params.charge, -700.0 - 50.0 + 50.0);
	assert!((params.gravity - (0.07 + 0.02)).abs() < 1e-12);

	engine.set_node_filter(|nodes: &[&Node]| nodes.iter().take(5).map(|n| n.id()).collect::<Vec<_>>());
	engine.rebuild();
	assert_eq!(engine.params().charge, -700.0 - 25.0 + 50.0);
}

#[test]
fn explode_restores_gravity_after_its_window() {
	let mut engine = Networker::default();
	ring(&mut engine, 6);
	engine.set_force_settings(&json!({"explode": true})).unwrap();

	assert!(engine.explode_pending());
	assert_eq!(engine.params().gravity, EXPLODE_GRAVITY);
	assert_eq!(engine.settings(), &Settings::default());

	let mut elapsed = Duration::ZERO;
	while elapsed + FRAME < EXPLODE_DURATION {
		engine.step(FRAME);
		elapsed += FRAME;
		assert_eq!(engine.params().gravity, EXPLODE_GRAVITY);
	}
	engine.step(FRAME);
	assert!(!engine.explode_pending());
	assert_eq!(engine.params().gravity, 0.07);
}

#[test]
fn config_cannot_leave_explode_switched_on() {
	let config = EngineConfig::from_json(r#"{"settings": {"explode": true, "charge": -100}}"#).unwrap();
	let mut engine = Networker::new(config);
	ring(&mut engine, 4);

	assert!(!engine.explode_pending());
	assert_eq!(engine.settings().charge, -100.0);
	assert_eq!(engine.params().gravity, Settings::default().gravity);
	let wire = serde_json::to_value(engine.settings()).unwrap();
	assert!(wire.get("explode").is_none());
}

#[test]
fn explode_is_cancelled_by_settings_and_rebuilds() {
	let mut engine = Networker::default();
	ring(&mut engine, 6);

	engine.explode();
	engine.set_force_settings(&json!({"gravity": 0.2})).unwrap();
	assert!(!engine.explode_pending());
	assert_eq!(engine.params().gravity, 0.2);

	engine.explode();
	engine.rebuild();
	assert!(!engine.explode_pending());
	assert_eq!(engine.params().gravity, 0.2);
}

#[test]
fn stats_score_every_node() {
	let mut engine = Networker::default();
	let ids = ["a", "b", "c", "d"];
	let pairs = ids
		.iter()
		.enumerate()
		.flat_map(|(i, s)| ids[i + 1..].iter().map(move |t| json!({"source": s, "target": t})));
	engine.add_many(ids.iter().map(|id| json!({ "id": id })), pairs.collect::<Vec<_>>(), false);
	engine.add_node(json!({"id": "lonely"}), true);

	let report = engine.compute_stats();
	assert_eq!(report.index.len(), 5);
	assert_eq!(report.adjacency, report.adjacency.transpose());
	assert!((report.eigenvalue - 3.0).abs() < 1e-3, "eigenvalue {}", report.eigenvalue);
	assert!(report.is_valid());

	let scores: Vec<f64> = engine
		.store()
		.nodes()
		.iter()
		.filter_map(|n| n.centrality().and_then(Centrality::score))
		.collect();
	assert_eq!(scores.len(), 5);
	for score in &scores[..4] {
		assert!((score - 0.5).abs() < 1e-3, "score {score}");
	}
	assert_eq!(scores[4], 0.0);
	assert!(engine.stats().is_some());
}

#[test]
fn clicks_reach_listeners_with_the_node() {
	let seen = Rc::new(RefCell::new(None));
	let mut engine = Networker::default();
	ring(&mut engine, 3);
	let sink = Rc::clone(&seen);
	engine.register_listener(networker::Domain::Nodes, "click", move |target| {
		if let networker::Target::Node(node) = target {
			*sink.borrow_mut() = node.attr("label").cloned();
		}
	});

	assert_eq!(engine.dispatch(networker::Domain::Nodes, "click", &Key::Int(1)), 1);
	assert_eq!(*seen.borrow(), Some(json!("n1")));
}

#[test]
fn clear_empties_everything() {
	let mut engine = Networker::default();
	ring(&mut engine, 4);
	engine.compute_stats();
	engine.clear();

	assert!(engine.store().is_empty());
	assert_eq!(engine.subgraph().node_count(), 0);
	assert!(engine.stats().is_none());
	assert!(!engine.step(FRAME));
	assert!(engine.add_node(json!({"id": 0}), true));
}
