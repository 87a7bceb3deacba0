use crate::graph::{Edge, Node};
use crate::settings::Settings;

/// Gravity applied while the explode transient is active.
pub const EXPLODE_GRAVITY: f64 = 5.0;

const ADAPTIVE_CHARGE_PER_NODE: f64 = 5.0;
const ADAPTIVE_CHARGE_MAX: f64 = 700.0;
const ADAPTIVE_GRAVITY_PER_NODE: f64 = 0.002;
const ADAPTIVE_GRAVITY_MAX: f64 = 0.7;
const SPREAD_CHARGE: f64 = 50.0;
const WEIGHT_DISTANCE: f64 = 4.0;
const MAX_ADAPTIVE_DISTANCE: f64 = 80.0;
const VALUE_STRENGTH: f64 = 0.5;
const MAX_VALUE_STRENGTH: f64 = 2.0;

/// Parameters the integrator actually uses, derived from [`Settings`].
#[derive(Clone, Debug, PartialEq)]
pub struct ForceParams {
	/// Many-body strength; negative repels.
	pub charge: f64,
	/// Pull toward the center.
	pub gravity: f64,
	/// Velocity decay per tick.
	pub friction: f64,
	/// Base rest length of links.
	pub link_distance: f64,
	/// Base link stiffness.
	pub link_strength: f64,
	/// Barnes-Hut acceptance threshold.
	pub theta: f64,
	/// Per-edge distance and strength scale with weights and values.
	pub adaptive: bool,
}

impl Default for ForceParams {
	fn default() -> Self {
		Self::derive(&Settings::default(), 0)
	}
}

impl ForceParams {
	/// Resolves settings for a simulation of `node_count` nodes.
	///
	/// In adaptive mode charge weakens and gravity strengthens with the node
	/// count, each capped, and `spread` shifts the charge.
	pub fn derive(settings: &Settings, node_count: usize) -> Self {
		let n = node_count as f64;
		let (charge, gravity) = if settings.advanced {
			(
				settings.charge - (n * ADAPTIVE_CHARGE_PER_NODE).min(ADAPTIVE_CHARGE_MAX)
					+ settings.spread * SPREAD_CHARGE,
				settings.gravity + (n * ADAPTIVE_GRAVITY_PER_NODE).min(ADAPTIVE_GRAVITY_MAX),
			)
		} else {
			(settings.charge, settings.gravity)
		};

		Self {
			charge,
			gravity,
			friction: settings.friction,
			link_distance: settings.link_distance,
			link_strength: settings.link_strength,
			theta: settings.theta,
			adaptive: settings.advanced,
		}
	}

	/// Rest length for a spring between `source` and `target`.
	pub fn distance_between(&self, source: &Node, target: &Node) -> f64 {
		if !self.adaptive {
			return self.link_distance;
		}
		let grown = self.link_distance
			+ source.weight.unwrap_or(0.0) * WEIGHT_DISTANCE
			+ target.weight.unwrap_or(0.0) * WEIGHT_DISTANCE;
		grown.min(MAX_ADAPTIVE_DISTANCE)
	}

	/// Stiffness of the spring for `edge`.
	pub fn strength_of(&self, edge: &Edge) -> f64 {
		match (self.adaptive, edge.value) {
			(true, Some(value)) => self.link_strength + (value * VALUE_STRENGTH).min(MAX_VALUE_STRENGTH),
			_ => self.link_strength,
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::graph::GraphStore;

	#[test]
	fn plain_mode_passes_settings_through() {
		let settings = Settings::default();
		let params = ForceParams::derive(&settings, 500);
		assert_eq!(params.charge, settings.charge);
		assert_eq!(params.gravity, settings.gravity);
	}

	#[test]
	fn adaptive_mode_scales_with_node_count() {
		let settings = Settings {
			advanced: true,
			spread: 1.0,
			..Settings::default()
		};
		let small = ForceParams::derive(&settings, 10);
		assert_eq!(small.charge, -700.0 - 50.0 + 50.0);
		assert!((small.gravity - (0.07 + 0.02)).abs() < 1e-12);

		let huge = ForceParams::derive(&settings, 10_000);
		assert_eq!(huge.charge, -700.0 - 700.0 + 50.0);
		assert!((huge.gravity - 0.77).abs() < 1e-12);
	}

	#[test]
	fn adaptive_links_follow_weight_and_value() {
		let mut store = GraphStore::new();
		store.add_node(json!({"id": "a", "weight": 2}));
		store.add_node(json!({"id": "b", "weight": 30}));
		store.add_node(json!({"id": "c"}));
		store.add_edge(json!({"source": "a", "target": "c", "value": 1}));
		store.add_edge(json!({"source": "a", "target": "b", "value": 10}));
		let [a, b, c] = [0, 1, 2].map(|i| &store.nodes()[i]);
		let edges = store.edges();

		let params = ForceParams::derive(
			&Settings {
				advanced: true,
				..Settings::default()
			},
			3,
		);
		assert_eq!(params.distance_between(a, c), 28.0);
		assert_eq!(params.distance_between(a, b), 80.0);
		assert_eq!(params.strength_of(&edges[0]), 2.0);
		assert_eq!(params.strength_of(&edges[1]), 3.5);

		let plain = ForceParams::default();
		assert_eq!(plain.distance_between(a, b), 20.0);
		assert_eq!(plain.strength_of(&edges[1]), 1.5);
	}
}
