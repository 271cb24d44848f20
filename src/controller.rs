//! The dark hole controller.
//!
//! `DarkHoleController` owns the session state and the exposure database and
//! implements the five server callbacks (`INIT`, `SETMODE`, `GETSKY`,
//! `GETSCIENCE`, `STOP`) plus routing of frames delivered by the event channel.
//! Every callback runs to completion and answers with a short acknowledgement for
//! the operator.
//!
//! # Example
//!
//! ```rust
//! use dark_hole_control::config::ObservingBlockKeys;
//! use dark_hole_control::controller::DarkHoleController;
//! use dark_hole_control::fiber::FiberPosition;
//! use dark_hole_control::observing::ObservingParameters;
//!
//! let keys = ObservingBlockKeys {
//!     resolution_key: "res".into(),
//!     axis_key: "axis".into(),
//!     polarization_key: "pol".into(),
//! };
//! let mut controller = DarkHoleController::new(keys);
//! controller.init();
//! controller.set_mode(ObservingParameters::new("LOW", "single", "combined"));
//! controller.get_science(FiberPosition::new(0.0, 0.0))?;
//! controller.get_science(FiberPosition::new(30.0, 0.0))?;
//! assert_eq!(controller.database().science_len(), 2);
//! # Ok::<(), dark_hole_control::error::DarkHoleError>(())
//! ```

use crate::command::Command;
use crate::config::{DarkHoleConfig, ObservingBlockKeys};
use crate::correction::{CorrectionVector, WavefrontCorrector};
use crate::database::{Deduplication, ExposureDatabase};
use crate::error::{AppResult, DarkHoleError};
use crate::fiber::{FiberPosition, TargetKind, DEFAULT_DIST_THRESHOLD_MAS};
use crate::frame::Frame;
use crate::observing::{ModeChange, ObParameterSet, ObservingParameters};
use crate::session::{AcquisitionStatus, SessionState};
use crate::snapshot::SessionSnapshot;
use std::fmt;
use tracing::{debug, info, warn};

/// Where a frame delivered by the event channel ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    /// Controller idle; frame discarded.
    Ignored,
    /// Appended to the sky frames.
    Sky,
    /// Attached to the science acquisition in progress.
    Science,
    /// Science status but no acquisition open (after a rollback); discarded.
    Dropped,
    /// Pixel buffer does not match the declared shape; discarded.
    Rejected,
}

/// Session and exposure bookkeeping for one dark hole control loop.
pub struct DarkHoleController {
    session: SessionState,
    database: ExposureDatabase,
    ob_keys: ObservingBlockKeys,
    configured_threshold_mas: f64,
    dist_threshold_mas: f64,
    corrector: Option<Box<dyn WavefrontCorrector>>,
    last_correction: Option<CorrectionVector>,
}

impl DarkHoleController {
    /// Create a controller using the default 10 mas threshold.
    pub fn new(ob_keys: ObservingBlockKeys) -> Self {
        Self {
            session: SessionState::new(),
            database: ExposureDatabase::new(),
            ob_keys,
            configured_threshold_mas: DEFAULT_DIST_THRESHOLD_MAS,
            dist_threshold_mas: DEFAULT_DIST_THRESHOLD_MAS,
            corrector: None,
            last_correction: None,
        }
    }

    /// Create a controller from validated configuration.
    pub fn from_config(config: &DarkHoleConfig) -> Self {
        Self::new(config.observing_block.clone()).with_threshold(config.control.dist_threshold_mas)
    }

    /// Use `threshold_mas` as the session's distance threshold, now and after `INIT`.
    pub fn with_threshold(mut self, threshold_mas: f64) -> Self {
        self.configured_threshold_mas = threshold_mas;
        self.dist_threshold_mas = threshold_mas;
        self
    }

    /// Install the capability invoked after planet exposures.
    pub fn with_corrector(mut self, corrector: Box<dyn WavefrontCorrector>) -> Self {
        self.corrector = Some(corrector);
        self
    }

    /// `INIT`: forget the mode, empty the caches, restore the threshold.
    pub fn init(&mut self) -> String {
        self.session.reset();
        self.database.clear();
        self.dist_threshold_mas = self.configured_threshold_mas;
        self.last_correction = None;
        info!(threshold_mas = self.dist_threshold_mas, "Controller initialized");
        "Dark hole control successfully initialized".to_string()
    }

    /// Empty the sky and science caches and return to idle.
    pub fn clear_database(&mut self) -> String {
        self.database.clear();
        self.session.set_status(AcquisitionStatus::Idle);
        info!("Exposure database cleared");
        "Cleared database".to_string()
    }

    /// `SETMODE` with already extracted parameters.
    ///
    /// Caches survive the first mode of a session and repeated identical modes;
    /// any actual change clears them.
    pub fn set_mode(&mut self, params: ObservingParameters) -> String {
        let summary = params.to_string();
        match self.session.apply_mode(params) {
            ModeChange::Initial => info!(mode = %summary, "Observing mode set"),
            ModeChange::Unchanged => {
                debug!(mode = %summary, "Observing mode unchanged, keeping caches")
            }
            ModeChange::Changed => {
                info!(mode = %summary, "Observing mode changed, caches are stale");
                self.clear_database();
            }
        }
        "OB parameters updated".to_string()
    }

    /// `SETMODE` with a raw OB parameter set, using the configured key names.
    pub fn set_mode_from_ob(&mut self, ob: &ObParameterSet) -> AppResult<String> {
        let params = ObservingParameters::from_ob(ob, &self.ob_keys)?;
        Ok(self.set_mode(params))
    }

    /// `GETSKY`: following frames are sky background.
    pub fn get_sky(&mut self) -> String {
        self.database.begin_sky();
        self.session.set_status(AcquisitionStatus::Sky);
        info!(
            rollback_mark = self.database.previous_sky_len(),
            "Sky acquisition started"
        );
        "Expecting sky frames".to_string()
    }

    /// `GETSCIENCE`: record a science exposure at `position` and deduplicate.
    ///
    /// For planet exposures the corrector, if any, is called with the retained
    /// exposures. A corrector failure is reported after the exposure is recorded.
    pub fn get_science(&mut self, position: FiberPosition) -> AppResult<String> {
        let outcome = self.database.begin_science(position, self.dist_threshold_mas);
        self.session.set_status(AcquisitionStatus::Science);

        match outcome {
            Deduplication::NewPlanet { pruned } => info!(
                %position,
                pruned,
                retained = self.database.science_len(),
                "New planet position, superseded exposures pruned"
            ),
            other => debug!(%position, outcome = %other, "Science exposure recorded"),
        }

        if outcome.target() == TargetKind::Planet {
            self.compute_correction()?;
        }

        Ok(format!("Science exposure at {position} recorded ({outcome})"))
    }

    fn compute_correction(&mut self) -> AppResult<()> {
        let Some(corrector) = self.corrector.as_ref() else {
            return Ok(());
        };
        let correction = corrector
            .compute_correction(self.database.science_exposures())
            .map_err(|e| DarkHoleError::Correction(format!("{e:#}")))?;
        debug!(actuators = correction.len(), "Correction computed");
        self.last_correction = Some(correction);
        Ok(())
    }

    /// `STOP`: abort the acquisition in progress and discard its data.
    ///
    /// The observing mode is kept.
    pub fn stop(&mut self) -> String {
        let rollback = self.database.stop();
        self.session.set_status(AcquisitionStatus::Idle);
        info!(
            sky_discarded = rollback.sky_discarded,
            science_discarded = rollback.science_discarded,
            "Acquisition stopped"
        );
        format!(
            "Acquisition stopped ({} sky frame(s), {} science exposure(s) discarded)",
            rollback.sky_discarded, rollback.science_discarded
        )
    }

    /// Route a frame from the event channel according to the current status.
    pub fn on_frame(&mut self, frame: Frame) -> FrameDisposition {
        let frame_number = frame.frame_number;
        if let Err(e) = frame.check_shape() {
            warn!(frame_number, error = %e, "Malformed frame rejected");
            return FrameDisposition::Rejected;
        }
        match self.session.status() {
            AcquisitionStatus::Idle => {
                debug!(frame_number, "Idle, frame ignored");
                FrameDisposition::Ignored
            }
            AcquisitionStatus::Sky => {
                self.database.record_sky_frame(frame);
                debug!(frame_number, sky_frames = self.database.sky_len(), "Sky frame recorded");
                FrameDisposition::Sky
            }
            AcquisitionStatus::Science => {
                if self.database.record_science_frame(frame) {
                    debug!(frame_number, "Science frame recorded");
                    FrameDisposition::Science
                } else {
                    warn!(frame_number, "No science acquisition open, frame dropped");
                    FrameDisposition::Dropped
                }
            }
        }
    }

    /// One-line summary of status and cache sizes.
    pub fn status_report(&self) -> String {
        let mode = self
            .session
            .parameters()
            .map(ToString::to_string)
            .unwrap_or_else(|| "undefined".to_string());
        format!(
            "status={} mode=[{}] sky={} science={} threshold={} mas",
            self.session.status(),
            mode,
            self.database.sky_len(),
            self.database.science_len(),
            self.dist_threshold_mas
        )
    }

    /// Run a parsed dispatcher command.
    pub fn execute(&mut self, command: Command) -> AppResult<String> {
        match command {
            Command::Init => Ok(self.init()),
            Command::SetMode(ob) => self.set_mode_from_ob(&ob),
            Command::GetSky => Ok(self.get_sky()),
            Command::GetScience(position) => self.get_science(position),
            Command::Stop => Ok(self.stop()),
            Command::Status => Ok(self.status_report()),
        }
    }

    /// Capture the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::new(
            self.session.clone(),
            self.dist_threshold_mas,
            self.database.clone(),
        )
    }

    /// Replace the current state with a saved one.
    ///
    /// The snapshot is checked before anything is replaced; a rejected snapshot
    /// leaves the controller untouched. The configured threshold is kept for the
    /// next `INIT`.
    pub fn restore(&mut self, snapshot: SessionSnapshot) -> AppResult<()> {
        snapshot.check()?;
        info!(snapshot_id = %snapshot.snapshot_id, "Restoring session snapshot");
        self.session = SessionState::from_parts(snapshot.parameters, snapshot.status);
        self.dist_threshold_mas = snapshot.dist_threshold_mas;
        self.database = snapshot.database;
        self.last_correction = None;
        Ok(())
    }

    /// Session state.
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Exposure database.
    pub fn database(&self) -> &ExposureDatabase {
        &self.database
    }

    /// Distance threshold in force (mas).
    pub fn dist_threshold_mas(&self) -> f64 {
        self.dist_threshold_mas
    }

    /// Most recent correction returned by the corrector.
    pub fn last_correction(&self) -> Option<&CorrectionVector> {
        self.last_correction.as_ref()
    }
}

impl fmt::Debug for DarkHoleController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DarkHoleController")
            .field("session", &self.session)
            .field("sky_frames", &self.database.sky_len())
            .field("science_exposures", &self.database.science_len())
            .field("dist_threshold_mas", &self.dist_threshold_mas)
            .field("has_corrector", &self.corrector.is_some())
            .finish_non_exhaustive()
    }
}
