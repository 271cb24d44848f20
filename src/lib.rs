//! # Dark Hole Control Library
//!
//! Session bookkeeping for the control loop of a dark hole nulling instrument.
//! Camera frames arrive on an event channel and are classified as sky background
//! or science exposures according to the current acquisition; a small rolling
//! database decides whether a new fiber position points at the same object as
//! before or at a new one, so superseded science exposures can be dropped before
//! a wavefront correction is computed.
//!
//! ## Crate Structure
//!
//! - **`controller`**: `DarkHoleController`, the `INIT` / `SETMODE` / `GETSKY` /
//!   `GETSCIENCE` / `STOP` callbacks and frame routing.
//! - **`session`**: `SessionState`, the current observing mode and acquisition status.
//! - **`database`**: `ExposureDatabase`, sky and science caches, rollback marks and
//!   the fiber-position deduplication pass.
//! - **`observing`**: `ObservingParameters` and their extraction from OB parameter sets.
//! - **`fiber`**: `FiberPosition` and star/planet classification.
//! - **`frame`**: decoded camera frames.
//! - **`correction`**: the `WavefrontCorrector` capability invoked after planet exposures.
//! - **`command`**: the dispatcher command grammar.
//! - **`messages`** / **`control_actor`**: the Tokio actor that serializes commands
//!   and frames onto the controller.
//! - **`snapshot`**: JSON snapshots of controller state.
//! - **`script`**: command scripts used by the `dark-hole` binary.
//! - **`config`**: figment configuration (`config/dark_hole.toml` + `DARK_HOLE_` env).
//! - **`tracing_setup`**: tracing-subscriber initialization.
//! - **`error`**: the `DarkHoleError` type.

pub mod command;
pub mod config;
pub mod control_actor;
pub mod controller;
pub mod correction;
pub mod database;
pub mod error;
pub mod fiber;
pub mod frame;
pub mod messages;
pub mod observing;
pub mod script;
pub mod session;
pub mod snapshot;
pub mod tracing_setup;
