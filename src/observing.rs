//! Observing-block parameters and mode changes.

use crate::config::ObservingBlockKeys;
use crate::error::{AppResult, DarkHoleError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Raw key/value parameter set delivered with `SETMODE`.
pub type ObParameterSet = BTreeMap<String, String>;

/// The three parameters defining an instrument mode.
///
/// Compared componentwise; a change in any of them invalidates cached sky and
/// science exposures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObservingParameters {
    /// Spectral resolution (e.g. `LOW`, `MED`, `HIGH`).
    pub spectral_resolution: String,
    /// Axis mode, single or dual field.
    pub axis_mode: String,
    /// Polarization mode, combined or split.
    pub polarization_mode: String,
}

/// Effect of a `SETMODE` call on the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    /// No mode was defined yet; the new one was adopted and caches kept.
    Initial,
    /// Same mode as before; caches kept.
    Unchanged,
    /// Different mode; adopted and caches cleared.
    Changed,
}

impl ObservingParameters {
    /// Build parameters from their three components.
    pub fn new(
        spectral_resolution: impl Into<String>,
        axis_mode: impl Into<String>,
        polarization_mode: impl Into<String>,
    ) -> Self {
        Self {
            spectral_resolution: spectral_resolution.into(),
            axis_mode: axis_mode.into(),
            polarization_mode: polarization_mode.into(),
        }
    }

    /// Extract parameters from an OB parameter set using the configured key names.
    ///
    /// All three keys must be present; nothing is partially applied.
    pub fn from_ob(ob: &ObParameterSet, keys: &ObservingBlockKeys) -> AppResult<Self> {
        let lookup = |key: &str| {
            ob.get(key)
                .cloned()
                .ok_or_else(|| DarkHoleError::MissingObParameter(key.to_string()))
        };
        Ok(Self {
            spectral_resolution: lookup(&keys.resolution_key)?,
            axis_mode: lookup(&keys.axis_key)?,
            polarization_mode: lookup(&keys.polarization_key)?,
        })
    }
}

impl fmt::Display for ObservingParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "res={} axis={} pol={}",
            self.spectral_resolution, self.axis_mode, self.polarization_mode
        )
    }
}
