//! Session state: current instrument mode and acquisition status.
//!
//! The session decides whether a `SETMODE` actually changes the instrument mode.
//! Cached sky and science exposures are only meaningful for the mode they were
//! taken in, so a change tells the controller to clear its database.
//!
//! # Status
//!
//! ```text
//! Idle ──GETSKY──> Sky ──GETSCIENCE──> Science
//!  ▲                │                    │
//!  └────STOP/INIT───┴────────────────────┘
//! ```

use crate::observing::{ModeChange, ObservingParameters};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What incoming frames are currently taken to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AcquisitionStatus {
    /// No acquisition; frames are ignored.
    #[default]
    Idle,
    /// Frames are sky background.
    Sky,
    /// Frames are science exposures.
    Science,
}

impl fmt::Display for AcquisitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionStatus::Idle => write!(f, "IDL"),
            AcquisitionStatus::Sky => write!(f, "SKY"),
            AcquisitionStatus::Science => write!(f, "SCIENCE"),
        }
    }
}

/// Mode and status of the current session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    parameters: Option<ObservingParameters>,
    status: AcquisitionStatus,
}

impl SessionState {
    /// A session with no mode defined, idle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a session from saved parts.
    pub fn from_parts(parameters: Option<ObservingParameters>, status: AcquisitionStatus) -> Self {
        Self { parameters, status }
    }

    /// Forget the mode and return to idle.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Adopt `params` and report how it relates to the previous mode.
    pub fn apply_mode(&mut self, params: ObservingParameters) -> ModeChange {
        match &self.parameters {
            None => {
                self.parameters = Some(params);
                ModeChange::Initial
            }
            Some(current) if *current == params => ModeChange::Unchanged,
            Some(_) => {
                self.parameters = Some(params);
                ModeChange::Changed
            }
        }
    }

    /// Current mode, if one has been set.
    pub fn parameters(&self) -> Option<&ObservingParameters> {
        self.parameters.as_ref()
    }

    /// Current acquisition status.
    pub fn status(&self) -> AcquisitionStatus {
        self.status
    }

    /// Set the acquisition status.
    pub fn set_status(&mut self, status: AcquisitionStatus) {
        self.status = status;
    }
}
