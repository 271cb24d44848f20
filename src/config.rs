//! Configuration System using Figment
//!
//! Strongly-typed configuration for the dark hole controller. Configuration is
//! loaded from:
//! 1. `config/dark_hole.toml` (base configuration)
//! 2. Environment variables prefixed with `DARK_HOLE_`, nested with `__`
//!    (e.g. `DARK_HOLE_CONTROL__DIST_THRESHOLD_MAS=12.5`)
//!
//! The `[observing_block]` table has no defaults: the key names under which the
//! dispatcher delivers spectral resolution, axis mode and polarization mode are a
//! contract with the external control framework and must be spelled out.
//!
//! # Example
//! ```no_run
//! use dark_hole_control::config::DarkHoleConfig;
//!
//! let config = DarkHoleConfig::load()?;
//! config.validate()?;
//! println!("Threshold: {} mas", config.control.dist_threshold_mas);
//! # Ok::<(), dark_hole_control::error::DarkHoleError>(())
//! ```

use crate::error::{AppResult, DarkHoleError};
use crate::fiber::is_valid_threshold;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/dark_hole.toml";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DarkHoleConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Control loop settings
    #[serde(default)]
    pub control: ControlConfig,
    /// OB parameter key names
    pub observing_block: ObservingBlockKeys,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Control loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Fiber distance (mas) separating STAR from PLANET, also the per-axis
    /// tolerance for "same planet"
    #[serde(default = "default_dist_threshold")]
    pub dist_threshold_mas: f64,
    /// Capacity of the control actor's message queue
    #[serde(default = "default_queue_capacity")]
    pub command_queue_capacity: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            dist_threshold_mas: default_dist_threshold(),
            command_queue_capacity: default_queue_capacity(),
        }
    }
}

/// Key names of the three observing parameters inside an OB parameter set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservingBlockKeys {
    /// Key carrying the spectral resolution
    pub resolution_key: String,
    /// Key carrying the (dual) axis mode
    pub axis_key: String,
    /// Key carrying the polarization mode (combined or split)
    pub polarization_key: String,
}

fn default_dist_threshold() -> f64 {
    10.0
}

fn default_queue_capacity() -> usize {
    32
}

impl DarkHoleConfig {
    /// Load configuration from `config/dark_hole.toml` and environment variables
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("DARK_HOLE_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(DarkHoleError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let threshold = self.control.dist_threshold_mas;
        if !is_valid_threshold(threshold) {
            return Err(DarkHoleError::Configuration(format!(
                "Invalid dist_threshold_mas {threshold}. Must be a positive number of mas"
            )));
        }

        if self.control.command_queue_capacity == 0 {
            return Err(DarkHoleError::Configuration(
                "command_queue_capacity must be greater than 0".to_string(),
            ));
        }

        let keys = &self.observing_block;
        let named = [
            ("resolution_key", &keys.resolution_key),
            ("axis_key", &keys.axis_key),
            ("polarization_key", &keys.polarization_key),
        ];
        let mut seen = std::collections::HashSet::new();
        for (field, key) in named {
            if key.trim().is_empty() {
                return Err(DarkHoleError::Configuration(format!(
                    "observing_block.{field} cannot be empty"
                )));
            }
            if !seen.insert(key.as_str()) {
                return Err(DarkHoleError::Configuration(format!(
                    "Duplicate OB parameter key: {key}"
                )));
            }
        }

        Ok(())
    }
}
