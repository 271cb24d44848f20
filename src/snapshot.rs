//! Session snapshots.
//!
//! A snapshot captures the controller's mode, status, threshold and exposure
//! database so that a restarted controller can pick up an observing block where
//! it left off, or so an operator can inspect what was cached.
//!
//! # Storage
//!
//! Snapshots are serialized to pretty-printed JSON. Frames are stored with their
//! pixel data, so snapshots of long sky sequences grow accordingly.

use crate::database::ExposureDatabase;
use crate::error::{AppResult, DarkHoleError};
use crate::fiber::is_valid_threshold;
use crate::observing::ObservingParameters;
use crate::session::{AcquisitionStatus, SessionState};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Serializable picture of a controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Unique snapshot identifier
    pub snapshot_id: Uuid,
    /// Snapshot creation timestamp
    pub taken_at: DateTime<Utc>,
    /// Observing mode, `None` before the first `SETMODE`
    pub parameters: Option<ObservingParameters>,
    /// Acquisition status
    pub status: AcquisitionStatus,
    /// Distance threshold in force (mas)
    pub dist_threshold_mas: f64,
    /// Cached exposures and rollback marks
    pub database: ExposureDatabase,
}

impl SessionSnapshot {
    /// Create a snapshot of the given state.
    pub fn new(session: SessionState, dist_threshold_mas: f64, database: ExposureDatabase) -> Self {
        Self {
            snapshot_id: Uuid::new_v4(),
            taken_at: Utc::now(),
            parameters: session.parameters().cloned(),
            status: session.status(),
            dist_threshold_mas,
            database,
        }
    }

    /// Save the snapshot to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The parent directory cannot be created
    /// - Serialization fails
    /// - File write fails
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize snapshot")?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).context("Failed to create snapshot directory")?;
        }

        fs::write(&path, json)
            .with_context(|| format!("Failed to write snapshot to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load a snapshot from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read snapshot from {:?}", path.as_ref()))?;

        let snapshot = serde_json::from_str(&json).context("Failed to deserialize snapshot")?;

        Ok(snapshot)
    }

    /// Check a snapshot before it replaces live state.
    ///
    /// The threshold must satisfy the same rule as `control.dist_threshold_mas`,
    /// and the database marks and frames must be consistent.
    pub fn check(&self) -> AppResult<()> {
        if !is_valid_threshold(self.dist_threshold_mas) {
            return Err(DarkHoleError::InvalidSnapshot(format!(
                "dist_threshold_mas {} is not a positive number of mas",
                self.dist_threshold_mas
            )));
        }
        self.database.check_consistency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiber::FiberPosition;
    use crate::frame::Frame;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("snapshot.json");

        let mut session = SessionState::new();
        session.apply_mode(ObservingParameters::new("MED", "dual", "split"));
        session.set_status(AcquisitionStatus::Science);

        let mut database = ExposureDatabase::new();
        database.begin_sky();
        database.record_sky_frame(Frame::filled(3, 2, 2, 17));
        database.begin_science(FiberPosition::new(25.0, -3.0), 10.0);

        let snapshot = SessionSnapshot::new(session, 10.0, database);
        snapshot.save(&path).unwrap();

        let loaded = SessionSnapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.database.sky_frames()[0].pixels, vec![17; 4]);
        assert!(loaded.database.expecting_science());
    }

    #[test]
    fn test_check_rejects_hand_edited_threshold() {
        let mut snapshot =
            SessionSnapshot::new(SessionState::new(), 10.0, ExposureDatabase::new());
        assert!(snapshot.check().is_ok());

        for bad in [-1.0, 0.0, f64::NAN] {
            snapshot.dist_threshold_mas = bad;
            assert!(matches!(snapshot.check(), Err(DarkHoleError::InvalidSnapshot(_))));
        }
    }

    #[test]
    fn test_load_missing_snapshot_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = SessionSnapshot::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("absent.json"));
    }
}
