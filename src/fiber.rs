//! Fiber positions and target classification.
//!
//! The injection fiber is pointed at an offset from the instrument center; that
//! offset is the controller's only proxy for which object is being observed. Close
//! to the center the fiber sees the star, further out a companion ("planet").

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default distance threshold separating star from planet, in milliarcseconds.
pub const DEFAULT_DIST_THRESHOLD_MAS: f64 = 10.0;

/// Whether `threshold_mas` can serve as a distance threshold (finite, positive).
pub fn is_valid_threshold(threshold_mas: f64) -> bool {
    threshold_mas.is_finite() && threshold_mas > 0.0
}

/// 2D fiber offset from the instrument center, in milliarcseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiberPosition {
    /// Offset along x (mas).
    pub x: f64,
    /// Offset along y (mas).
    pub y: f64,
}

/// What a fiber position points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    /// Within the threshold of the center.
    Star,
    /// Beyond the threshold.
    Planet,
}

impl FiberPosition {
    /// Create a position from its offsets in mas.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Radial distance from the instrument center (mas).
    pub fn distance(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Classify against `threshold_mas`: `distance <= threshold` is the star.
    pub fn classify(&self, threshold_mas: f64) -> TargetKind {
        if self.distance() <= threshold_mas {
            TargetKind::Star
        } else {
            TargetKind::Planet
        }
    }

    /// Whether two positions point at the same object.
    ///
    /// Both axis offsets must differ by strictly less than `threshold_mas`.
    pub fn same_target_as(&self, other: &FiberPosition, threshold_mas: f64) -> bool {
        (self.x - other.x).abs() < threshold_mas && (self.y - other.y).abs() < threshold_mas
    }

    /// Whether both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for FiberPosition {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for FiberPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}) mas", self.x, self.y)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Star => write!(f, "star"),
            TargetKind::Planet => write!(f, "planet"),
        }
    }
}
