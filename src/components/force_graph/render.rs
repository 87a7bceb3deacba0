use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::{ForceGraphState, NODE_RADIUS};
use crate::graph::Node;

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

pub fn render(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn draw_edges(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (line_width, dash, gap, arrow_size) = (1.5 / k, 8.0 / k, 4.0 / k, 8.0 / k);
	let dash_offset = -(state.flow_time * 30.0) % (dash + gap);
	let t = ease_out_cubic(state.hover.highlight_t);
	let frame = state.engine.frame();
	let store = frame.store();

	for (edge, (x1, y1), (x2, y2)) in frame.segments() {
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}
		let Some((s, tg)) = edge.nodes() else {
			continue;
		};
		let (Some(src), Some(tgt)) = (store.node(s), store.node(tg)) else {
			continue;
		};
		let (r1, r2) = (state.radius_of(src), state.radius_of(tgt));

		let is_highlighted = state.is_highlighted(src.key()) && state.is_highlighted(tgt.key());
		// heavier links draw thicker, capped at 3x
		let weight = edge.value.map_or(1.0, |v| v.clamp(1.0, 3.0));

		// t=0: all edges at base (0.6), t=1: highlighted at 0.9, others at 0.15
		let (edge_alpha, arrow_alpha, width) = if is_highlighted {
			(0.6 + 0.3 * t, 0.8 + 0.1 * t, line_width * weight * (1.0 + 0.3 * t))
		} else {
			(0.6 - 0.45 * t, 0.8 - 0.45 * t, line_width * weight * (1.0 - 0.3 * t))
		};

		ctx.set_stroke_style_str(&format!("rgba(100, 180, 255, {})", edge_alpha));
		ctx.set_line_width(width);
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(dash),
			&JsValue::from_f64(gap),
		));
		ctx.set_line_dash_offset(dash_offset);

		let (ux, uy) = (dx / dist, dy / dist);
		ctx.begin_path();
		ctx.move_to(x1 + ux * r1, y1 + uy * r1);
		ctx.line_to(x2 - ux * (r2 + arrow_size), y2 - uy * (r2 + arrow_size));
		ctx.stroke();

		let _ = ctx.set_line_dash(&js_sys::Array::new());
		ctx.set_fill_style_str(&format!("rgba(100, 180, 255, {})", arrow_alpha));
		let (tip_x, tip_y) = (x2 - ux * r2, y2 - uy * r2);
		let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
		let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn draw_label(ctx: &CanvasRenderingContext2d, label: &str, color: &str, x: f64, y: f64, k: f64) {
	ctx.set_fill_style_str(color);
	ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
	let _ = ctx.fill_text(label, x, y);
}

fn draw_nodes(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let (has_highlight, t, k) = (
		state.has_active_highlight(),
		ease_out_cubic(state.hover.highlight_t),
		state.transform.k,
	);
	let frame = state.engine.frame();

	for node in frame.nodes() {
		if has_highlight && state.is_highlighted(node.key()) {
			continue;
		}
		let style = state.style_of(node.key());
		let (x, y) = node.position();
		let (alpha, radius) = (1.0 - 0.7 * t, state.radius_of(node) * (1.0 - 0.15 * t));

		ctx.set_global_alpha(alpha);
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&style.color);
		ctx.fill();
		if node.fixed {
			ctx.set_stroke_style_str("rgba(255, 255, 255, 0.6)");
			ctx.set_line_width(1.0 / k);
			ctx.stroke();
		}
		ctx.set_global_alpha(1.0);

		if let Some(label) = &style.label {
			let color = format!("rgba(255, 255, 255, {})", alpha * 0.8);
			draw_label(ctx, label, &color, x + radius + 3.0, y + 3.0, k);
		}
	}

	if has_highlight {
		for node in frame.nodes().filter(|n| state.is_highlighted(n.key())) {
			draw_highlighted(state, ctx, node, t, k);
		}
	}
}

fn draw_highlighted(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, node: &Node, t: f64, k: f64) {
	let key = node.key();
	let style = state.style_of(key);
	let (x, y) = node.position();
	let base = state.radius_of(node);
	let is_hovered = state.is_hovered(key);
	let is_neighbor = state.hover.neighbors.contains(key) || state.hover.prev_neighbors.contains(key);

	let (radius, glow_radius) = if is_hovered {
		(base * (1.0 + 0.35 * t), base.max(NODE_RADIUS) * (1.8 + 1.2 * t))
	} else if is_neighbor {
		(base * (1.0 + 0.2 * t), base.max(NODE_RADIUS) * (1.4 + 0.6 * t))
	} else {
		(base, 0.0)
	};

	if glow_radius > 0.0 && t > 0.01 {
		if let Ok(gradient) = ctx.create_radial_gradient(x, y, radius * 0.3, x, y, glow_radius) {
			let alpha = if is_hovered { 0.35 * t } else { 0.2 * t };
			let _ = gradient.add_color_stop(0.0, &format!("rgba(255, 255, 255, {})", alpha));
			let _ = gradient.add_color_stop(0.6, &format!("rgba(200, 220, 255, {})", alpha * 0.3));
			let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
			ctx.begin_path();
			let _ = ctx.arc(x, y, glow_radius, 0.0, 2.0 * PI);
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
			ctx.fill();
		}
	}

	ctx.begin_path();
	let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(&style.color);
	ctx.fill();

	if is_hovered && t > 0.01 {
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius + 2.0 / k, 0.0, 2.0 * PI);
		ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.7 * t));
		ctx.set_line_width(1.5 / k);
		ctx.stroke();
	}

	if let Some(label) = &style.label {
		draw_label(ctx, label, "white", x + radius + 3.0, y + 3.0, k);
	}
}
