use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ActivationError, ConfigError};

/// Focus band top edge, as a fraction of viewport height.
pub const DEFAULT_ACTIVATION_THRESHOLD: f64 = 0.20;

/// Fraction of a block's own height that must remain below the viewport top.
pub const DEFAULT_MIN_VISIBLE_FRACTION: f64 = 0.30;

/// Minimum time a block stays active before another transition is accepted.
pub const DEFAULT_MIN_DWELL_MS: u64 = 500;

/// Upper bound accepted for `min_dwell_ms` (one hour).
pub const MAX_MIN_DWELL_MS: u64 = 3_600_000;

/// Distance from the document edge still treated as "at the edge" (pixels).
pub const DEFAULT_BOUNDARY_EPSILON_PX: f64 = 2.0;

/// Panel unpins once the section bottom rises above this fraction of the viewport.
pub const DEFAULT_PIN_RELEASE_FRACTION: f64 = 0.50;

/// Tunable thresholds for the activation pipeline.
///
/// The defaults were tuned by eye against real pages; they are product
/// decisions, so every one of them can be overridden from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub activation_threshold: f64,
    pub min_visible_fraction: f64,
    pub min_dwell_ms: u64,
    pub boundary_epsilon_px: f64,
    pub pin_release_fraction: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            activation_threshold: DEFAULT_ACTIVATION_THRESHOLD,
            min_visible_fraction: DEFAULT_MIN_VISIBLE_FRACTION,
            min_dwell_ms: DEFAULT_MIN_DWELL_MS,
            boundary_epsilon_px: DEFAULT_BOUNDARY_EPSILON_PX,
            pin_release_fraction: DEFAULT_PIN_RELEASE_FRACTION,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document. Missing keys fall back to defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ActivationError> {
        check_fraction("activation_threshold", self.activation_threshold)?;
        check_fraction("min_visible_fraction", self.min_visible_fraction)?;
        check_fraction("pin_release_fraction", self.pin_release_fraction)?;
        if self.min_dwell_ms > MAX_MIN_DWELL_MS {
            return Err(ActivationError::InvalidConfig(format!(
                "min_dwell_ms must be at most {MAX_MIN_DWELL_MS}, got {}",
                self.min_dwell_ms
            )));
        }
        if !self.boundary_epsilon_px.is_finite() || self.boundary_epsilon_px < 0.0 {
            return Err(ActivationError::InvalidConfig(format!(
                "boundary_epsilon_px must be a non-negative number, got {}",
                self.boundary_epsilon_px
            )));
        }
        Ok(())
    }
}

fn check_fraction(name: &str, value: f64) -> Result<(), ActivationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ActivationError::InvalidConfig(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}
