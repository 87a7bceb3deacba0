//! Force-directed graph layout with eigenvector centrality, and the Leptos
//! canvas app that draws it.
//!
//! The engine ([`Networker`]) owns a [`GraphStore`], assembles the visible
//! subgraph through pluggable filters, integrates a spring/charge layout one
//! [`step`](Networker::step) at a time and scores nodes on demand with
//! [`compute_stats`](Networker::compute_stats).

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};

/// Adjacency, Laplacian and eigenvector centrality.
pub mod centrality;
/// Engine configuration.
pub mod config;
/// The [`Networker`] facade and renderer hooks.
pub mod engine;
pub mod error;
/// Node and edge storage plus subgraph assembly.
pub mod graph;
/// Force settings and their ranges.
pub mod settings;
/// Layout integrator.
pub mod simulation;

// Modules
mod components;
mod pages;

pub use centrality::{Centrality, CentralityAnalyzer, CentralityReport};
pub use config::EngineConfig;
pub use engine::{Domain, Entered, Exited, Frame, GraphDocument, Networker, NullRenderer, Renderer, Target};
pub use error::{Error, Result};
pub use graph::{Edge, EdgeId, Endpoint, GraphStore, Key, Node, NodeId, Resolution, Subgraph};
pub use settings::{Settings, SettingsController};
pub use simulation::{ForceParams, ForceSimulation, SimState};

// Top-Level pages
use crate::pages::home::Home;
use crate::pages::not_found::NotFound;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// An app router which renders the graph page and handles 404's
#[component]
pub fn App() -> impl IntoView {
	// Provides context that manages stylesheets, titles, meta tags, etc.
	provide_meta_context();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />

		// sets the document title
		<Title text="Networker" />

		// injects metadata in the <head> of the page
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Home />
			</Routes>
		</Router>
	}
}
