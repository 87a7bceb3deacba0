//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::Resolution;
use crate::settings::Settings;

/// Construction-time options for [`Networker`](crate::Networker).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
	/// Attribute used as node and edge identity.
	pub key: String,
	/// Simulation area as `[width, height]`.
	pub size: [f64; 2],
	/// When unresolved edge endpoints are retried.
	pub resolution: Resolution,
	/// Seed for centrality start vectors.
	pub seed: u64,
	/// Initial force settings.
	pub settings: Settings,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			key: "id".into(),
			size: [500.0, 400.0],
			resolution: Resolution::default(),
			seed: 0x5eed,
			settings: Settings::default(),
		}
	}
}

impl EngineConfig {
	/// Parses a JSON config; missing fields take their defaults.
	pub fn from_json(text: &str) -> Result<Self> {
		let config: Self = serde_json::from_str(text).map_err(|e| Error::InvalidConfig(e.to_string()))?;
		config.validate()?;
		Ok(config)
	}

	/// Rejects an empty key name, a degenerate area, or out-of-range settings.
	pub fn validate(&self) -> Result<()> {
		if self.key.is_empty() {
			return Err(Error::InvalidConfig("key attribute must not be empty".into()));
		}
		let [w, h] = self.size;
		if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
			return Err(Error::InvalidConfig(format!("size must be positive, got {w}×{h}")));
		}
		self.settings.validate()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_json_uses_defaults() {
		let config = EngineConfig::from_json(r#"{"key": "name", "resolution": "addTime"}"#).unwrap();
		assert_eq!(config.key, "name");
		assert_eq!(config.resolution, Resolution::AddTime);
		assert_eq!(config.size, [500.0, 400.0]);
		assert_eq!(config.settings, Settings::default());
	}

	#[test]
	fn nested_settings_are_read() {
		let config = EngineConfig::from_json(r#"{"settings": {"charge": -120, "advanced": true}}"#).unwrap();
		assert_eq!(config.settings.charge, -120.0);
		assert!(config.settings.advanced);
	}

	#[test]
	fn invalid_configs_are_rejected() {
		assert!(matches!(EngineConfig::from_json("{"), Err(Error::InvalidConfig(_))));
		assert!(EngineConfig::from_json(r#"{"size": [0, 10]}"#).is_err());
		assert!(EngineConfig::from_json(r#"{"key": ""}"#).is_err());
		assert!(matches!(
			EngineConfig::from_json(r#"{"settings": {"theta": 4}}"#),
			Err(Error::OutOfRange { key: "theta", .. })
		));
	}
}
