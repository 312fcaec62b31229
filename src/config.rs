//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Host-tunable engine settings.
///
/// Timing and per-voice volume constants are deliberately absent: they are
/// tuned by ear and live next to the recipes that use them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Output sample rate for the built-in synthesizer backend.
    pub sample_rate: u32,
    /// Gain applied to the summed mix before soft clipping.
    pub master_gain: f64,
    /// Start with the mute flag set (e.g. restored from a saved preference).
    pub start_muted: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: 48_000,
            master_gain: 0.8,
            start_muted: false,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
