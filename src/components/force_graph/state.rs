use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use log::info;

use super::types::GraphData;
use crate::config::EngineConfig;
use crate::engine::{Domain, Entered, Exited, Frame, Networker, Renderer, Target};
use crate::graph::{Key, Node};

const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

pub const NODE_RADIUS: f64 = 5.0;
pub const HIT_RADIUS: f64 = 12.0;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeInfo {
	pub label: Option<String>,
	pub color: String,
}

impl NodeInfo {
	fn for_node(node: &Node) -> Self {
		let label = node.attr("label").and_then(|v| v.as_str()).map(str::to_owned);
		let color = node
			.attr("color")
			.and_then(|v| v.as_str())
			.map(str::to_owned)
			.unwrap_or_else(|| {
				let group = node.attr("group").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
				COLORS[group % COLORS.len()].into()
			});
		Self { label, color }
	}
}

/// Per-key styles, filled as nodes enter and dropped as they exit.
#[derive(Debug, Default)]
pub struct StyleBook {
	pub nodes: HashMap<Key, NodeInfo>,
	pub frames: u64,
}

#[derive(Clone, Debug, Default)]
pub struct SharedStyles(pub Rc<RefCell<StyleBook>>);

impl Renderer for SharedStyles {
	fn on_enter(&mut self, entered: &Entered<'_>) {
		let mut book = self.0.borrow_mut();
		for node in &entered.nodes {
			book.nodes.insert(node.key().clone(), NodeInfo::for_node(node));
		}
	}

	fn on_exit(&mut self, exited: &Exited) {
		let mut book = self.0.borrow_mut();
		for key in &exited.nodes {
			book.nodes.remove(key);
		}
	}

	fn on_tick(&mut self, _frame: &Frame<'_>) {
		self.0.borrow_mut().frames += 1;
	}
}

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node: Option<Key>,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f64,
	pub node_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<Key>,
	pub neighbors: HashSet<Key>,
	pub highlight_t: f64,
	pub prev_node: Option<Key>,
	pub prev_neighbors: HashSet<Key>,
	delay_t: f64,
}

pub struct ForceGraphState {
	pub engine: Networker,
	pub styles: Rc<RefCell<StyleBook>>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	pub width: f64,
	pub height: f64,
	pub animation_running: bool,
	pub flow_time: f64,
}

impl ForceGraphState {
	pub fn new(data: &GraphData, width: f64, height: f64) -> Self {
		let mut engine = Networker::new(EngineConfig {
			size: [width, height],
			..EngineConfig::default()
		});
		let styles = SharedStyles::default();
		engine.set_renderer(styles.clone());
		engine.register_listener(Domain::Nodes, "click", |target| {
			if let Target::Node(node) = target {
				info!("clicked node {} at {:?}", node.key(), node.position());
			}
		});

		let accepted = engine.add_document(data.to_document(), true);
		let stats = engine.compute_stats();
		info!(
			"graph ready: {accepted} records, eigenvalue {:.3}",
			stats.eigenvalue
		);

		Self {
			engine,
			styles: styles.0,
			transform: ViewTransform { x: 0.0, y: 0.0, k: 1.0 },
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			width,
			height,
			animation_running: true,
			flow_time: 0.0,
		}
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<Key> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		// HIT_RADIUS is in world-space, scales with zoom like nodes
		self.engine
			.frame()
			.nodes()
			.map(|node| (node, (node.x - gx).hypot(node.y - gy)))
			.filter(|&(_, dist)| dist < HIT_RADIUS)
			.min_by(|a, b| a.1.total_cmp(&b.1))
			.map(|(node, _)| node.key().clone())
	}

	/// Radius grown by the node's normalized centrality.
	pub fn radius_of(&self, node: &Node) -> f64 {
		let boost = self
			.engine
			.stats()
			.zip(node.centrality().and_then(|c| c.score()))
			.and_then(|(stats, score)| stats.normalized(score))
			.unwrap_or(0.0);
		NODE_RADIUS * (1.0 + boost)
	}

	pub fn style_of(&self, key: &Key) -> NodeInfo {
		self.styles.borrow().nodes.get(key).cloned().unwrap_or_else(|| NodeInfo {
			label: None,
			color: COLORS[0].into(),
		})
	}

	pub fn set_hover(&mut self, node: Option<Key>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// Save previous state for fade-out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.neighbors.clear();
		if let Some(key) = &node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			let frame = self.engine.frame();
			let store = frame.store();
			for edge in frame.edges() {
				let Some((s, t)) = edge.nodes() else {
					continue;
				};
				let (Some(src), Some(tgt)) = (store.node(s), store.node(t)) else {
					continue;
				};
				if src.key() == key {
					self.hover.neighbors.insert(tgt.key().clone());
				} else if tgt.key() == key {
					self.hover.neighbors.insert(src.key().clone());
				}
			}
		}
		self.hover.node = node;
	}

	pub fn is_highlighted(&self, key: &Key) -> bool {
		self.hover.node.as_ref() == Some(key)
			|| self.hover.neighbors.contains(key)
			|| self.hover.prev_node.as_ref() == Some(key)
			|| self.hover.prev_neighbors.contains(key)
	}

	pub fn is_hovered(&self, key: &Key) -> bool {
		self.hover.node.as_ref() == Some(key) || self.hover.prev_node.as_ref() == Some(key)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	pub fn tick(&mut self, dt: f64) {
		self.engine.step(Duration::from_secs_f64(dt));
		self.flow_time += dt;

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	/// Starts dragging the node under the pointer, or panning when there is
	/// none and the view may move.
	pub fn press(&mut self, x: f64, y: f64) {
		if let Some(key) = self.node_at_position(x, y) {
			let Some((nx, ny)) = self.engine.store().node_by_key(&key).map(Node::position) else {
				return;
			};
			self.drag = DragState {
				active: true,
				node: Some(key),
				moved: false,
				start_x: x,
				start_y: y,
				node_start_x: nx,
				node_start_y: ny,
			};
		} else if self.engine.settings().pan_zoom {
			self.pan = PanState {
				active: true,
				start_x: x,
				start_y: y,
				transform_start_x: self.transform.x,
				transform_start_y: self.transform.y,
			};
		}
	}

	/// Hover tracking, drag pinning and panning for one pointer move.
	pub fn pointer_move(&mut self, x: f64, y: f64) {
		if !self.drag.active {
			let hovered = self.node_at_position(x, y);
			self.set_hover(hovered);
		}

		if self.drag.active {
			let Some(key) = self.drag.node.clone() else {
				return;
			};
			let (dx, dy) = (
				(x - self.drag.start_x) / self.transform.k,
				(y - self.drag.start_y) / self.transform.k,
			);
			if dx != 0.0 || dy != 0.0 {
				self.drag.moved = true;
			}
			self.engine
				.pin(&key, self.drag.node_start_x + dx, self.drag.node_start_y + dy);
		} else if self.pan.active {
			self.transform.x = self.pan.transform_start_x + (x - self.pan.start_x);
			self.transform.y = self.pan.transform_start_y + (y - self.pan.start_y);
		}
	}

	/// Ends a drag or pan. A node pressed without moving gets a `click`
	/// dispatch and its key is returned. Dragged nodes stay pinned.
	pub fn release(&mut self) -> Option<Key> {
		let clicked = self.drag.node.take().filter(|_| !self.drag.moved);
		self.drag.active = false;
		self.pan.active = false;
		if let Some(key) = &clicked {
			self.engine.dispatch(Domain::Nodes, "click", key);
		}
		clicked
	}

	pub fn leave(&mut self) {
		self.drag.active = false;
		self.drag.node = None;
		self.pan.active = false;
		self.set_hover(None);
	}

	/// Zooms around `(x, y)`; ignored when the view is locked.
	pub fn zoom_at(&mut self, x: f64, y: f64, delta_y: f64) {
		if !self.engine.settings().pan_zoom {
			return;
		}
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		let new_k = (self.transform.k * factor).clamp(0.1, 10.0);
		let ratio = new_k / self.transform.k;
		self.transform.x = x - (x - self.transform.x) * ratio;
		self.transform.y = y - (y - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	/// Releases the pin on the node under the pointer.
	pub fn unpin_at(&mut self, x: f64, y: f64) -> bool {
		match self.node_at_position(x, y) {
			Some(key) => self.engine.unpin(&key),
			None => false,
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.engine.resize(width, height);
	}
}
