use leptos::prelude::*;

use crate::components::force_graph::{ForceGraphCanvas, GraphData, GraphLink, GraphNode};

/// Random tree plus a few cross links. Every 25th node is heavier.
fn generate_sample_data(n: usize) -> GraphData {
	let nodes: Vec<GraphNode> = (0..n)
		.map(|i| GraphNode {
			id: i.to_string(),
			label: if i < 10 {
				Some(format!("Node {}", i))
			} else {
				None
			},
			color: None,
			group: Some((i % 10) as u32),
			weight: (i % 25 == 0).then_some(2.0),
		})
		.collect();

	let mut links: Vec<GraphLink> = (1..n)
		.map(|i| {
			let target = (rand_simple(i) * (i as f64)) as usize;
			GraphLink {
				source: i.to_string(),
				target: target.to_string(),
				value: Some(1.0 + (i % 3) as f64),
			}
		})
		.collect();
	links.extend((0..n / 10).map(|i| GraphLink {
		source: (i * 7 % n).to_string(),
		target: ((i * 13 + 5) % n).to_string(),
		value: None,
	}));

	GraphData { nodes, links }
}

/// Simple pseudo-random number generator (deterministic for consistency).
fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	// Create graph data signal
	let graph_data = Signal::derive(move || generate_sample_data(100));

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<ForceGraphCanvas data=graph_data fullscreen=true />
				<div class="graph-overlay">
					<h1>"Networker"</h1>
					<p class="subtitle">"Drag nodes to pin them, double-click to release. Scroll to zoom, drag the background to pan."</p>
				</div>
			</div>
		</ErrorBoundary>
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Networker;

	#[test]
	fn sample_data_is_fully_connected() {
		let data = generate_sample_data(100);
		let mut engine = Networker::default();
		assert_eq!(engine.add_document(data.to_document(), true), 100 + 99 + 10);
		assert_eq!(engine.subgraph().node_count(), 100);
		assert_eq!(engine.subgraph().edge_count(), 109);
	}
}
