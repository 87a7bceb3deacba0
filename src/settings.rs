//! Tunable force parameters and the controller that merges partial updates.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// User-facing simulation parameters, serialized with camelCase names.
///
/// `explode` is not a setting; it is only read from a [`SettingsPatch`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
	/// Pairwise charge; negative repels.
	pub charge: f64,
	/// Pull toward the centre of the area.
	pub gravity: f64,
	/// Fraction of velocity kept each tick.
	pub friction: f64,
	/// Spring rest length.
	pub link_distance: f64,
	/// Spring stiffness.
	pub link_strength: f64,
	/// Barnes-Hut accuracy; 0 is exact.
	pub theta: f64,
	/// Scale charge, gravity and springs with the graph.
	pub advanced: bool,
	/// Extra charge offset in adaptive mode, in [-1, 1].
	pub spread: f64,
	/// Presentation only: whether the view may be panned and zoomed.
	pub pan_zoom: bool,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			charge: -700.0,
			gravity: 0.07,
			friction: 0.3,
			link_distance: 20.0,
			link_strength: 1.5,
			theta: 0.8,
			advanced: false,
			spread: 0.0,
			pan_zoom: true,
		}
	}
}

/// Inclusive range a settings panel should offer for one numeric setting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SettingRange {
	/// Wire name.
	pub key: &'static str,
	/// Lower bound.
	pub min: f64,
	/// Upper bound.
	pub max: f64,
}

const fn range(key: &'static str, min: f64, max: f64) -> SettingRange {
	SettingRange { key, min, max }
}

/// Ranges for every numeric setting.
pub const SETTINGS_RANGES: [SettingRange; 7] = [
	range("charge", -15000.0, 0.0),
	range("gravity", -1.0, 2.0),
	range("friction", 0.0, 1.0),
	range("linkDistance", 0.0, 600.0),
	range("linkStrength", 0.0, 5.0),
	range("theta", 0.0, 1.0),
	range("spread", -1.0, 1.0),
];

impl Settings {
	/// Numeric setting by wire name.
	pub fn get(&self, key: &str) -> Option<f64> {
		Some(match key {
			"charge" => self.charge,
			"gravity" => self.gravity,
			"friction" => self.friction,
			"linkDistance" => self.link_distance,
			"linkStrength" => self.link_strength,
			"theta" => self.theta,
			"spread" => self.spread,
			_ => return None,
		})
	}

	/// Checks every numeric setting against [`SETTINGS_RANGES`].
	///
	/// Merging never calls this; it is for panels and config loading.
	pub fn validate(&self) -> Result<()> {
		for r in SETTINGS_RANGES {
			let Some(value) = self.get(r.key) else {
				continue;
			};
			if !(r.min..=r.max).contains(&value) {
				return Err(Error::OutOfRange {
					key: r.key,
					value,
					min: r.min,
					max: r.max,
				});
			}
		}
		Ok(())
	}
}

/// Partial update. Absent and unknown keys leave settings untouched.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
	/// New [`Settings::charge`].
	pub charge: Option<f64>,
	/// New [`Settings::gravity`].
	pub gravity: Option<f64>,
	/// New [`Settings::friction`].
	pub friction: Option<f64>,
	/// New [`Settings::link_distance`].
	pub link_distance: Option<f64>,
	/// New [`Settings::link_strength`].
	pub link_strength: Option<f64>,
	/// New [`Settings::theta`].
	pub theta: Option<f64>,
	/// New [`Settings::advanced`].
	pub advanced: Option<bool>,
	/// New [`Settings::spread`].
	pub spread: Option<f64>,
	/// `true` starts the explode transient. Never stored.
	pub explode: Option<bool>,
	/// New [`Settings::pan_zoom`].
	pub pan_zoom: Option<bool>,
}

impl SettingsPatch {
	/// Parses a JSON record, ignoring keys outside the schema.
	pub fn from_value(partial: &Value) -> Result<Self> {
		Self::deserialize(partial).map_err(Error::InvalidSettings)
	}
}

/// What a merge changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Merge {
	/// Wire names of the settings whose value changed.
	pub changed: Vec<&'static str>,
	/// The patch asked for the explode transient.
	pub explode: bool,
}

/// Holds the current settings and applies patches.
#[derive(Clone, Debug, Default)]
pub struct SettingsController {
	settings: Settings,
}

impl SettingsController {
	/// Controller seeded with `settings`.
	pub fn new(settings: Settings) -> Self {
		Self { settings }
	}

	/// Current settings.
	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	/// Parses and merges a JSON patch such as `{"charge": -300}`.
	pub fn set_force_settings(&mut self, partial: &Value) -> Result<Merge> {
		let patch = SettingsPatch::from_value(partial)?;
		Ok(self.merge(patch))
	}

	/// Overwrites every setting present in `patch`.
	pub fn merge(&mut self, patch: SettingsPatch) -> Merge {
		let mut changed = Vec::new();
		let s = &mut self.settings;
		assign(&mut s.charge, patch.charge, "charge", &mut changed);
		assign(&mut s.gravity, patch.gravity, "gravity", &mut changed);
		assign(&mut s.friction, patch.friction, "friction", &mut changed);
		assign(&mut s.link_distance, patch.link_distance, "linkDistance", &mut changed);
		assign(&mut s.link_strength, patch.link_strength, "linkStrength", &mut changed);
		assign(&mut s.theta, patch.theta, "theta", &mut changed);
		assign(&mut s.advanced, patch.advanced, "advanced", &mut changed);
		assign(&mut s.spread, patch.spread, "spread", &mut changed);
		assign(&mut s.pan_zoom, patch.pan_zoom, "panZoom", &mut changed);

		let explode = patch.explode.unwrap_or(false);
		if !changed.is_empty() {
			debug!("settings changed: {}", changed.join(", "));
		}
		Merge { changed, explode }
	}
}

fn assign<T: PartialEq>(slot: &mut T, value: Option<T>, key: &'static str, changed: &mut Vec<&'static str>) {
	if let Some(value) = value {
		if *slot != value {
			*slot = value;
			changed.push(key);
		}
	}
}
