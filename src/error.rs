//! Custom error types for the controller.
//!
//! This module defines the primary error type, `DarkHoleError`. Using the `thiserror`
//! crate, it provides a centralized way to report the few things that can go wrong
//! around the dark hole control core: configuration problems, observing-block
//! parameter sets that lack a required key, malformed command lines and frames, and
//! failures reported by an injected wavefront corrector.
//!
//! ## Error Hierarchy
//!
//! - **`Config`**: Wraps errors from `figment`, typically a missing file, a TOML syntax
//!   error or a type mismatch while extracting the configuration.
//! - **`Configuration`**: Semantic errors that pass parsing but are logically incorrect
//!   (e.g. a negative distance threshold). Caught by `DarkHoleConfig::validate`.
//! - **`MissingObParameter`**: The OB parameter set delivered with `SETMODE` lacks one
//!   of the configured keys.
//! - **`InvalidCommand`** / **`InvalidFrame`**: Input rejected before it reaches the
//!   session state.
//! - **`Correction`**: The wavefront corrector failed. The exposure that triggered it
//!   is still recorded.
//! - **`Io`**: Wraps `std::io::Error`.
//! - **`ActorUnavailable`**: The control actor has shut down or dropped a reply.
//!
//! The core state machine itself never fails on empty databases or repeated calls;
//! those cases are no-ops.

use thiserror::Error;

/// Convenience alias for results using the controller error type.
pub type AppResult<T> = std::result::Result<T, DarkHoleError>;

/// Errors raised by the dark hole controller and its plumbing.
#[derive(Error, Debug)]
pub enum DarkHoleError {
    /// Configuration could not be loaded or extracted.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration loaded but failed validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// The OB parameter set lacks a configured key.
    #[error("OB parameter set is missing key '{0}'")]
    MissingObParameter(String),

    /// A command line could not be parsed.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// A frame payload is inconsistent with its declared shape.
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// A saved session snapshot is internally inconsistent.
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// The wavefront corrector reported a failure.
    #[error("Correction failed: {0}")]
    Correction(String),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The control actor is no longer accepting messages.
    #[error("Control actor is not running")]
    ActorUnavailable,
}

impl From<figment::Error> for DarkHoleError {
    fn from(value: figment::Error) -> Self {
        DarkHoleError::Config(Box::new(value))
    }
}

impl DarkHoleError {
    /// Whether the controller remains usable after this error.
    ///
    /// Rejected input and corrector failures leave the session state consistent, so
    /// the dispatcher can keep sending commands. Configuration and I/O problems need
    /// operator attention.
    pub fn can_recover(&self) -> bool {
        matches!(
            self,
            DarkHoleError::MissingObParameter(_)
                | DarkHoleError::InvalidCommand(_)
                | DarkHoleError::InvalidFrame(_)
                | DarkHoleError::Correction(_)
        )
    }
}
