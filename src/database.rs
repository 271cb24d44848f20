//! Rolling exposure database.
//!
//! Holds the sky frames and science exposures recorded during the current
//! observing block, the high-water marks needed to roll back an aborted
//! acquisition, and the fiber-position deduplication rule.
//!
//! # Deduplication
//!
//! After every new science exposure the recorded fiber positions are scanned:
//!
//! ```text
//! newest is STAR ───────────────────────────────> keep everything
//! newest is PLANET ─┬─ only planet so far ──────> keep everything
//!                   ├─ last two planets agree ──> keep everything (same planet)
//!                   └─ last two planets differ ─> drop all older planets
//! ```
//!
//! Only the last two planet entries are compared, so a target drifting by less
//! than the threshold per exposure is never reported as new.

use crate::error::{AppResult, DarkHoleError};
use crate::fiber::{FiberPosition, TargetKind};
use crate::frame::Frame;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A science exposure: the fiber position and the frame recorded there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScienceExposure {
    /// Fiber offset during the exposure.
    pub position: FiberPosition,
    /// Frame payload, `None` until the event channel delivers it.
    pub frame: Option<Frame>,
}

/// Outcome of the deduplication pass for a new science exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deduplication {
    /// The new position is on the star; nothing pruned.
    Star,
    /// First planet exposure in the database.
    FirstPlanet,
    /// Same planet as the previous planet exposure.
    SamePlanet,
    /// A new planet; older planet exposures were removed.
    NewPlanet {
        /// Number of exposures removed.
        pruned: usize,
    },
}

impl Deduplication {
    /// Target classification of the exposure that was just recorded.
    pub fn target(&self) -> TargetKind {
        match self {
            Deduplication::Star => TargetKind::Star,
            _ => TargetKind::Planet,
        }
    }
}

impl fmt::Display for Deduplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deduplication::Star => write!(f, "star"),
            Deduplication::FirstPlanet => write!(f, "first planet"),
            Deduplication::SamePlanet => write!(f, "same planet"),
            Deduplication::NewPlanet { pruned } => {
                write!(f, "new planet, {pruned} superseded exposure(s) pruned")
            }
        }
    }
}

/// Entries discarded by a rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rollback {
    /// Sky frames removed.
    pub sky_discarded: usize,
    /// Science exposures removed.
    pub science_discarded: usize,
}

/// Sky and science caches for one observing block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExposureDatabase {
    sky_frames: Vec<Frame>,
    science: Vec<ScienceExposure>,
    previous_sky_len: usize,
    previous_science_len: usize,
    expecting_sky: bool,
    expecting_science: bool,
}

impl ExposureDatabase {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a sky acquisition: remember the rollback point and expect sky frames.
    pub fn begin_sky(&mut self) {
        self.previous_sky_len = self.sky_frames.len();
        self.expecting_sky = true;
    }

    /// Append a sky frame.
    pub fn record_sky_frame(&mut self, frame: Frame) {
        self.sky_frames.push(frame);
    }

    /// Start a science acquisition at `position` and deduplicate.
    ///
    /// The exposure is recorded without a frame; the payload is attached by
    /// [`record_science_frame`](Self::record_science_frame).
    pub fn begin_science(&mut self, position: FiberPosition, threshold_mas: f64) -> Deduplication {
        self.previous_science_len = self.science.len();
        self.expecting_science = true;
        self.science.push(ScienceExposure {
            position,
            frame: None,
        });
        self.deduplicate(position, threshold_mas)
    }

    /// Attach a frame to the science acquisition in progress.
    ///
    /// Fills the pending exposure if it has no payload yet, otherwise appends a
    /// further exposure at the same position. Returns `false` when no science
    /// acquisition is open and the frame was dropped.
    pub fn record_science_frame(&mut self, frame: Frame) -> bool {
        if !self.expecting_science {
            return false;
        }
        match self.science.last_mut() {
            Some(pending) if pending.frame.is_none() => {
                pending.frame = Some(frame);
                true
            }
            Some(last) => {
                let position = last.position;
                self.science.push(ScienceExposure {
                    position,
                    frame: Some(frame),
                });
                true
            }
            None => false,
        }
    }

    /// Abort the acquisition in progress, rolling both logs back to their marks.
    pub fn stop(&mut self) -> Rollback {
        let rollback = Rollback {
            sky_discarded: self.sky_frames.len().saturating_sub(self.previous_sky_len),
            science_discarded: self.science.len().saturating_sub(self.previous_science_len),
        };
        self.expecting_sky = false;
        self.sky_frames.truncate(self.previous_sky_len);
        self.expecting_science = false;
        self.science.truncate(self.previous_science_len);
        rollback
    }

    /// Check that the rollback marks lie within the logs and every frame is well formed.
    pub fn check_consistency(&self) -> AppResult<()> {
        if self.previous_sky_len > self.sky_frames.len() {
            return Err(DarkHoleError::InvalidSnapshot(format!(
                "sky rollback mark {} beyond {} sky frame(s)",
                self.previous_sky_len,
                self.sky_frames.len()
            )));
        }
        if self.previous_science_len > self.science.len() {
            return Err(DarkHoleError::InvalidSnapshot(format!(
                "science rollback mark {} beyond {} science exposure(s)",
                self.previous_science_len,
                self.science.len()
            )));
        }
        let frames = self
            .sky_frames
            .iter()
            .chain(self.science.iter().filter_map(|e| e.frame.as_ref()));
        for frame in frames {
            frame
                .check_shape()
                .map_err(|e| DarkHoleError::InvalidSnapshot(e.to_string()))?;
        }
        Ok(())
    }

    /// Drop everything and reset the rollback marks.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn deduplicate(&mut self, newest: FiberPosition, threshold_mas: f64) -> Deduplication {
        if newest.classify(threshold_mas) == TargetKind::Star {
            return Deduplication::Star;
        }

        let planets: Vec<usize> = self
            .science
            .iter()
            .enumerate()
            .filter(|(_, e)| e.position.classify(threshold_mas) == TargetKind::Planet)
            .map(|(i, _)| i)
            .collect();

        let [.., previous, latest] = planets[..] else {
            return Deduplication::FirstPlanet;
        };
        if self.science[latest]
            .position
            .same_target_as(&self.science[previous].position, threshold_mas)
        {
            return Deduplication::SamePlanet;
        }

        // Every planet but the newest goes; `planets` is sorted.
        let doomed = &planets[..planets.len() - 1];
        let below_mark = doomed
            .iter()
            .filter(|&&i| i < self.previous_science_len)
            .count();
        let mut index = 0;
        self.science.retain(|_| {
            let keep = doomed.binary_search(&index).is_err();
            index += 1;
            keep
        });
        self.previous_science_len -= below_mark;

        Deduplication::NewPlanet {
            pruned: doomed.len(),
        }
    }

    /// Sky frames recorded so far.
    pub fn sky_frames(&self) -> &[Frame] {
        &self.sky_frames
    }

    /// Science exposures recorded so far.
    pub fn science_exposures(&self) -> &[ScienceExposure] {
        &self.science
    }

    /// Fiber positions of the science exposures, index-aligned with them.
    pub fn science_positions(&self) -> Vec<FiberPosition> {
        self.science.iter().map(|e| e.position).collect()
    }

    /// Number of sky frames.
    pub fn sky_len(&self) -> usize {
        self.sky_frames.len()
    }

    /// Number of science exposures.
    pub fn science_len(&self) -> usize {
        self.science.len()
    }

    /// Sky rollback point.
    pub fn previous_sky_len(&self) -> usize {
        self.previous_sky_len
    }

    /// Science rollback point.
    pub fn previous_science_len(&self) -> usize {
        self.previous_science_len
    }

    /// Whether a sky acquisition is open.
    pub fn expecting_sky(&self) -> bool {
        self.expecting_sky
    }

    /// Whether a science acquisition is open.
    pub fn expecting_science(&self) -> bool {
        self.expecting_science
    }

    /// True when neither log holds anything.
    pub fn is_empty(&self) -> bool {
        self.sky_frames.is_empty() && self.science.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiber::DEFAULT_DIST_THRESHOLD_MAS as T;

    fn observe(db: &mut ExposureDatabase, positions: &[(f64, f64)]) -> Vec<Deduplication> {
        positions
            .iter()
            .map(|&p| db.begin_science(p.into(), T))
            .collect()
    }

    #[test]
    fn consistency_check_rejects_marks_beyond_logs() {
        let mut db = ExposureDatabase::new();
        observe(&mut db, &[(0.0, 0.0)]);
        assert!(db.check_consistency().is_ok());

        db.previous_science_len = 5;
        let err = db.check_consistency().unwrap_err();
        assert!(err.to_string().contains("science rollback mark 5"), "got: {err}");

        db.previous_science_len = 0;
        db.previous_sky_len = 1;
        assert!(db.check_consistency().is_err());
    }

    #[test]
    fn new_planet_prunes_older_planets() {
        let mut db = ExposureDatabase::new();
        let outcomes = observe(&mut db, &[(0.0, 0.0), (20.0, 0.0), (20.0, 0.0), (-20.0, 0.0)]);

        assert_eq!(
            outcomes,
            vec![
                Deduplication::Star,
                Deduplication::FirstPlanet,
                Deduplication::SamePlanet,
                Deduplication::NewPlanet { pruned: 2 },
            ]
        );
        assert_eq!(
            db.science_positions(),
            vec![FiberPosition::new(0.0, 0.0), FiberPosition::new(-20.0, 0.0)]
        );
    }

    #[test]
    fn same_planet_is_retained() {
        let mut db = ExposureDatabase::new();
        observe(&mut db, &[(15.0, 0.0), (16.0, 0.0)]);
        assert_eq!(db.science_len(), 2);
    }

    #[test]
    fn stars_survive_pruning_wherever_they_sit() {
        let mut db = ExposureDatabase::new();
        observe(
            &mut db,
            &[(20.0, 0.0), (1.0, 1.0), (21.0, 0.0), (0.0, -2.0), (0.0, 50.0)],
        );
        assert_eq!(
            db.science_positions(),
            vec![
                FiberPosition::new(1.0, 1.0),
                FiberPosition::new(0.0, -2.0),
                FiberPosition::new(0.0, 50.0),
            ]
        );
    }

    #[test]
    fn star_exposure_never_prunes() {
        let mut db = ExposureDatabase::new();
        observe(&mut db, &[(20.0, 0.0), (-20.0, 5.0)]);
        assert_eq!(db.science_len(), 1);
        assert_eq!(db.begin_science(FiberPosition::new(0.0, 0.0), T), Deduplication::Star);
        assert_eq!(db.science_len(), 2);
    }

    #[test]
    fn stop_rolls_back_sky_frames() {
        let mut db = ExposureDatabase::new();
        db.begin_sky();
        db.record_sky_frame(Frame::filled(0, 2, 2, 1));
        db.begin_sky();
        for n in 1..=3 {
            db.record_sky_frame(Frame::filled(n, 2, 2, 1));
        }
        assert_eq!(db.sky_len(), 4);

        let rollback = db.stop();
        assert_eq!(rollback.sky_discarded, 3);
        assert_eq!(db.sky_len(), 1);
        assert!(!db.expecting_sky());
        assert!(!db.expecting_science());
    }

    #[test]
    fn stop_discards_the_aborted_science_exposure() {
        let mut db = ExposureDatabase::new();
        observe(&mut db, &[(0.0, 0.0), (20.0, 0.0)]);
        db.stop();
        assert_eq!(db.science_positions(), vec![FiberPosition::new(0.0, 0.0)]);
    }

    #[test]
    fn pruning_lowers_the_rollback_mark() {
        let mut db = ExposureDatabase::new();
        observe(&mut db, &[(0.0, 0.0), (20.0, 0.0)]);
        db.begin_science(FiberPosition::new(-20.0, 0.0), T);
        assert_eq!(db.previous_science_len(), 1);

        let rollback = db.stop();
        assert_eq!(rollback.science_discarded, 1);
        assert_eq!(db.science_positions(), vec![FiberPosition::new(0.0, 0.0)]);
    }

    #[test]
    fn science_frames_fill_pending_exposure_then_append() {
        let mut db = ExposureDatabase::new();
        assert!(!db.record_science_frame(Frame::filled(0, 1, 1, 0)));

        db.begin_science(FiberPosition::new(25.0, 0.0), T);
        assert!(db.record_science_frame(Frame::filled(1, 1, 1, 0)));
        assert!(db.record_science_frame(Frame::filled(2, 1, 1, 0)));

        let exposures = db.science_exposures();
        assert_eq!(exposures.len(), 2);
        assert!(exposures.iter().all(|e| e.frame.is_some()));
        assert!(exposures.iter().all(|e| e.position == FiberPosition::new(25.0, 0.0)));
    }

    #[test]
    fn clear_resets_everything() {
        let mut db = ExposureDatabase::new();
        db.begin_sky();
        db.record_sky_frame(Frame::filled(0, 1, 1, 0));
        observe(&mut db, &[(0.0, 0.0)]);
        db.clear();

        assert!(db.is_empty());
        assert_eq!(db.previous_sky_len(), 0);
        assert_eq!(db.previous_science_len(), 0);
        assert!(!db.expecting_sky());
        assert!(!db.expecting_science());
    }
}
