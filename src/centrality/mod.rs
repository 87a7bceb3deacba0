//! Eigenvector centrality over the full graph.
//!
//! The score of a node is its component of the dominant eigenvector of the
//! undirected 0/1 adjacency matrix, approximated by a fixed number of power
//! iteration rounds from a random start vector. Component `i` belongs to
//! the node at position `i` in insertion order.
//!
//! Bipartite graphs have a second eigenvalue of equal magnitude, so the
//! iteration does not converge on them; the scores are still reported.

use std::collections::HashMap;

use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::graph::{Endpoint, GraphStore, Key};

/// Power iteration rounds per analysis.
pub const POWER_ITERATIONS: usize = 10;

/// A node's centrality score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Centrality {
	/// Finite score.
	Score(f64),
	/// The iteration produced NaN or infinity for this node.
	Invalid,
}

impl Centrality {
	/// Flags non-finite values as invalid.
	pub fn from_raw(value: f64) -> Self {
		if value.is_finite() {
			Centrality::Score(value)
		} else {
			Centrality::Invalid
		}
	}

	/// The score, if valid.
	pub fn score(self) -> Option<f64> {
		match self {
			Centrality::Score(v) => Some(v),
			Centrality::Invalid => None,
		}
	}
}

/// Dominant eigenvalue estimate and its eigenvector.
#[derive(Clone, Debug, PartialEq)]
pub struct Eigenpair {
	/// Norm of the last product.
	pub value: f64,
	/// Unit eigenvector estimate.
	pub vector: DVector<f64>,
}

/// Repeatedly multiplies a random vector by `matrix` and normalizes it.
///
/// A zero-norm product yields NaN components, which callers must treat as
/// an invalid result.
pub fn power_iterate<R: Rng>(matrix: &DMatrix<f64>, rounds: usize, rng: &mut R) -> Eigenpair {
	let mut vector = DVector::from_fn(matrix.nrows(), |_, _| rng.r#gen::<f64>());
	let mut value = 0.0;
	for _ in 0..rounds {
		let next = matrix * &vector;
		value = next.norm();
		vector = next / value;
	}
	Eigenpair { value, vector }
}

/// Key of every node mapped to its insertion index.
pub fn index_map(store: &GraphStore) -> HashMap<Key, usize> {
	store.nodes().iter().enumerate().map(|(i, n)| (n.key().clone(), i)).collect()
}

/// Symmetric adjacency and diagonal degree matrices.
///
/// An edge counts once both endpoints map to an index; unresolved endpoints
/// are looked up by key. Self loops are skipped. Parallel edges set the
/// same adjacency entry but each one adds to the degree of its endpoints.
pub fn adjacency(store: &GraphStore, index: &HashMap<Key, usize>) -> (DMatrix<f64>, DMatrix<f64>) {
	let n = store.node_count();
	let mut adjacency = DMatrix::<f64>::zeros(n, n);
	let mut degree = DMatrix::<f64>::zeros(n, n);
	let lookup = |endpoint: &Endpoint| match endpoint {
		Endpoint::Resolved(id) => Some(id.index()),
		Endpoint::Unresolved(key) => index.get(key).copied(),
	};

	for edge in store.edges() {
		let (Some(i), Some(j)) = (lookup(edge.source()), lookup(edge.target())) else {
			continue;
		};
		if i == j {
			continue;
		}
		adjacency[(i, j)] = 1.0;
		adjacency[(j, i)] = 1.0;
		degree[(i, i)] += 1.0;
		degree[(j, j)] += 1.0;
	}
	(adjacency, degree)
}

/// Everything one centrality run computed.
#[derive(Clone, Debug)]
pub struct CentralityReport {
	/// Node key → row/column index.
	pub index: HashMap<Key, usize>,
	/// Symmetric 0/1 adjacency.
	pub adjacency: DMatrix<f64>,
	/// Diagonal count of incident edges.
	pub degree: DMatrix<f64>,
	/// `degree − adjacency`.
	pub laplacian: DMatrix<f64>,
	/// Dominant eigenvalue estimate.
	pub eigenvalue: f64,
	/// Raw eigenvector, one component per node in insertion order.
	pub eigenvector: DVector<f64>,
	/// Smallest valid score.
	pub min: Option<f64>,
	/// Largest valid score.
	pub max: Option<f64>,
	/// Nodes whose score came out non-finite.
	pub invalid: usize,
}

impl CentralityReport {
	/// Maps a score into `[0, 1]` using the observed range.
	pub fn normalized(&self, score: f64) -> Option<f64> {
		let (min, max) = (self.min?, self.max?);
		if max > min {
			Some((score - min) / (max - min))
		} else {
			Some(1.0)
		}
	}

	/// Whether every node received a finite score.
	pub fn is_valid(&self) -> bool {
		self.invalid == 0
	}
}

/// Runs centrality analyses with its own random source.
#[derive(Clone, Debug)]
pub struct CentralityAnalyzer {
	rng: SmallRng,
	rounds: usize,
}

impl CentralityAnalyzer {
	/// Analyzer whose start vectors derive from `seed`.
	pub fn new(seed: u64) -> Self {
		Self {
			rng: SmallRng::seed_from_u64(seed),
			rounds: POWER_ITERATIONS,
		}
	}

	/// Overrides the number of power iteration rounds.
	pub fn with_rounds(mut self, rounds: usize) -> Self {
		self.rounds = rounds;
		self
	}

	/// Scores every node of `store` and writes the scores back.
	pub fn analyze(&mut self, store: &mut GraphStore) -> CentralityReport {
		let index = index_map(store);
		let (adjacency, degree) = adjacency(store, &index);
		let laplacian = &degree - &adjacency;
		let Eigenpair { value, vector } = power_iterate(&adjacency, self.rounds, &mut self.rng);

		let (mut min, mut max) = (None::<f64>, None::<f64>);
		let mut invalid = 0;
		for (node, &raw) in store.nodes_mut().iter_mut().zip(vector.iter()) {
			let score = Centrality::from_raw(raw);
			node.centrality = Some(score);
			match score {
				Centrality::Score(v) => {
					min = Some(min.map_or(v, |m| m.min(v)));
					max = Some(max.map_or(v, |m| m.max(v)));
				}
				Centrality::Invalid => invalid += 1,
			}
		}

		if invalid > 0 {
			warn!("centrality produced {invalid} invalid scores (eigenvalue {value})");
		}
		info!(
			"centrality over {} nodes: eigenvalue {value:.4}, range {min:?}..{max:?}",
			vector.len()
		);

		CentralityReport {
			index,
			adjacency,
			degree,
			laplacian,
			eigenvalue: value,
			eigenvector: vector,
			min,
			max,
			invalid,
		}
	}
}
