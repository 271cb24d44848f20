//! Capability: Wavefront Correction
//!
//! The physics that turns retained science exposures into deformable-mirror
//! commands lives outside this crate. The controller only knows the capability:
//! hand over the exposures retained after deduplication, receive a correction.
//!
//! # Contract
//! - Called after every planet exposure, once deduplication has run
//! - Receives every science exposure currently retained, stars included
//! - Must not assume frames are present; payloads may still be in flight
//!
//! # Example
//!
//! ```rust
//! use anyhow::Result;
//! use dark_hole_control::correction::{CorrectionVector, WavefrontCorrector};
//! use dark_hole_control::database::ScienceExposure;
//!
//! struct FlatMirror {
//!     actuators: usize,
//! }
//!
//! impl WavefrontCorrector for FlatMirror {
//!     fn compute_correction(&self, _retained: &[ScienceExposure]) -> Result<CorrectionVector> {
//!         Ok(CorrectionVector::zeros(self.actuators))
//!     }
//! }
//! ```

use crate::database::ScienceExposure;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Deformable-mirror actuator commands.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrectionVector {
    /// One command per actuator, in the mirror's native units.
    pub actuator_commands: Vec<f64>,
}

impl CorrectionVector {
    /// A correction that leaves every actuator where it is.
    pub fn zeros(actuators: usize) -> Self {
        Self {
            actuator_commands: vec![0.0; actuators],
        }
    }

    /// Number of actuators addressed.
    pub fn len(&self) -> usize {
        self.actuator_commands.len()
    }

    /// True when no actuator is addressed.
    pub fn is_empty(&self) -> bool {
        self.actuator_commands.is_empty()
    }
}

/// Computes a dark hole correction from retained science data.
pub trait WavefrontCorrector: Send + Sync {
    /// Compute the correction for the retained science exposures.
    fn compute_correction(&self, retained: &[ScienceExposure]) -> Result<CorrectionVector>;
}
