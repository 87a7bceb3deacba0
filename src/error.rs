//! Error type shared by the engine's fallible operations.
//!
//! Graph mutation never goes through here: duplicate keys and malformed
//! attribute records are reported by a `false` return so callers can retry
//! with a corrected record.

use thiserror::Error;

/// Failures surfaced by configuration, settings and document parsing.
#[derive(Debug, Error)]
pub enum Error {
	/// The key attribute cannot change once the store holds nodes or edges.
	#[error("key attribute is locked to `{current}` while the store is non-empty")]
	KeyLocked {
		/// Attribute name currently used as identity.
		current: String,
	},

	/// A settings patch could not be read.
	#[error("invalid settings patch: {0}")]
	InvalidSettings(#[source] serde_json::Error),

	/// A setting lies outside the range the settings panel allows.
	#[error("setting `{key}` = {value} is outside [{min}, {max}]")]
	OutOfRange {
		/// Wire name of the setting.
		key: &'static str,
		/// Offending value.
		value: f64,
		/// Inclusive lower bound.
		min: f64,
		/// Inclusive upper bound.
		max: f64,
	},

	/// Engine configuration could not be parsed or is inconsistent.
	#[error("invalid engine config: {0}")]
	InvalidConfig(String),

	/// A `{nodes, edges}` document could not be parsed.
	#[error("invalid graph document: {0}")]
	InvalidDocument(#[source] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
