//! Integration tests for session and deduplication behavior.
//!
//! These drive `DarkHoleController` the way the dispatcher does: INIT, SETMODE,
//! GETSKY/GETSCIENCE with frames arriving in between, and STOP.

use anyhow::{bail, Result};
use dark_hole_control::config::ObservingBlockKeys;
use dark_hole_control::controller::{DarkHoleController, FrameDisposition};
use dark_hole_control::correction::{CorrectionVector, WavefrontCorrector};
use dark_hole_control::database::ScienceExposure;
use dark_hole_control::error::DarkHoleError;
use dark_hole_control::fiber::FiberPosition;
use dark_hole_control::frame::Frame;
use dark_hole_control::observing::ObservingParameters;
use dark_hole_control::session::AcquisitionStatus;
use std::sync::{Arc, Mutex};

fn keys() -> ObservingBlockKeys {
    ObservingBlockKeys {
        resolution_key: "res".to_string(),
        axis_key: "axis".to_string(),
        polarization_key: "pol".to_string(),
    }
}

fn controller() -> DarkHoleController {
    let mut controller = DarkHoleController::new(keys());
    controller.init();
    controller
}

fn low_single_combined() -> ObservingParameters {
    ObservingParameters::new("LOW", "single", "combined")
}

fn positions(controller: &DarkHoleController) -> Vec<(f64, f64)> {
    controller
        .database()
        .science_positions()
        .iter()
        .map(|p| (p.x, p.y))
        .collect()
}

fn observe(controller: &mut DarkHoleController, points: &[(f64, f64)]) {
    for &point in points {
        controller.get_science(point.into()).unwrap();
    }
}

fn sky_frames(controller: &mut DarkHoleController, count: u64) {
    for n in 0..count {
        controller.on_frame(Frame::filled(n, 8, 8, 5));
    }
}

// =============================================================================
// Session / mode management
// =============================================================================

#[test]
fn init_twice_matches_init_once() {
    let mut once = controller();
    let mut twice = controller();
    twice.set_mode(low_single_combined());
    twice.get_sky();
    sky_frames(&mut twice, 2);
    observe(&mut twice, &[(0.0, 0.0), (20.0, 0.0)]);

    let ack = twice.init();
    twice.init();
    once.init();

    assert_eq!(ack, "Dark hole control successfully initialized");
    assert_eq!(twice.session(), once.session());
    assert_eq!(twice.database(), once.database());
    assert_eq!(twice.session().status(), AcquisitionStatus::Idle);
    assert!(twice.database().is_empty());
}

#[test]
fn identical_setmode_keeps_caches() {
    let mut controller = controller();
    controller.set_mode(low_single_combined());
    controller.get_sky();
    sky_frames(&mut controller, 3);
    observe(&mut controller, &[(0.0, 0.0), (25.0, 5.0)]);
    let before = controller.database().clone();

    let ack = controller.set_mode(low_single_combined());

    assert_eq!(ack, "OB parameters updated");
    assert_eq!(controller.database(), &before);
}

#[test]
fn changed_setmode_clears_caches() {
    let mut controller = controller();
    controller.set_mode(low_single_combined());
    controller.get_sky();
    sky_frames(&mut controller, 3);
    observe(&mut controller, &[(0.0, 0.0), (25.0, 5.0)]);

    controller.set_mode(ObservingParameters::new("LOW", "single", "split"));

    assert_eq!(controller.database().sky_len(), 0);
    assert_eq!(controller.database().science_len(), 0);
    assert_eq!(controller.session().status(), AcquisitionStatus::Idle);
    assert_eq!(
        controller.session().parameters().map(|p| p.polarization_mode.as_str()),
        Some("split")
    );
}

#[test]
fn first_setmode_keeps_data_recorded_before_it() {
    let mut controller = controller();
    controller.get_sky();
    sky_frames(&mut controller, 2);

    controller.set_mode(low_single_combined());

    assert_eq!(controller.database().sky_len(), 2);
}

// =============================================================================
// Rollback
// =============================================================================

#[test]
fn stop_rolls_back_sky_acquisition() {
    let mut controller = controller();
    controller.set_mode(low_single_combined());
    controller.get_sky();
    sky_frames(&mut controller, 4);
    let n = controller.database().sky_len();

    controller.get_sky();
    sky_frames(&mut controller, 3);
    assert_eq!(controller.database().sky_len(), n + 3);

    let ack = controller.stop();

    assert_eq!(controller.database().sky_len(), n);
    assert!(ack.contains("3 sky frame(s)"), "unexpected ack: {ack}");
    assert!(!controller.database().expecting_sky());
    assert_eq!(controller.session().parameters(), Some(&low_single_combined()));
}

#[test]
fn stop_on_empty_database_is_a_no_op() {
    let mut controller = controller();
    controller.stop();
    controller.stop();
    assert!(controller.database().is_empty());
}

#[test]
fn frames_after_stop_are_ignored() {
    let mut controller = controller();
    controller.get_science(FiberPosition::new(0.0, 0.0)).unwrap();
    controller.stop();
    assert_eq!(
        controller.on_frame(Frame::filled(9, 1, 1, 0)),
        FrameDisposition::Ignored
    );
    assert_eq!(controller.database().science_len(), 0);
}

// =============================================================================
// Deduplication
// =============================================================================

#[test]
fn star_positions_never_prune() {
    let mut controller = controller();
    observe(&mut controller, &[(20.0, 0.0), (0.0, 0.0), (-20.0, 0.0)]);
    let after_planets = positions(&controller);

    for _ in 0..3 {
        controller.get_science(FiberPosition::new(0.0, 0.0)).unwrap();
    }

    let mut expected = after_planets;
    expected.extend([(0.0, 0.0); 3]);
    assert_eq!(positions(&controller), expected);
}

#[test]
fn new_planet_keeps_star_and_newest_planet() {
    let mut controller = controller();
    observe(
        &mut controller,
        &[(0.0, 0.0), (20.0, 0.0), (20.0, 0.0), (-20.0, 0.0)],
    );
    assert_eq!(positions(&controller), vec![(0.0, 0.0), (-20.0, 0.0)]);
}

#[test]
fn same_planet_is_kept() {
    let mut controller = controller();
    observe(&mut controller, &[(15.0, 0.0), (16.0, 0.0)]);
    assert_eq!(positions(&controller), vec![(15.0, 0.0), (16.0, 0.0)]);
}

#[test]
fn full_session_scenario() {
    let mut controller = controller();
    controller.set_mode(low_single_combined());
    controller.get_sky();
    observe(&mut controller, &[(0.0, 0.0), (30.0, 0.0), (31.0, 1.0)]);

    assert_eq!(
        positions(&controller),
        vec![(0.0, 0.0), (30.0, 0.0), (31.0, 1.0)]
    );
    assert_eq!(controller.session().status(), AcquisitionStatus::Science);
}

#[test]
fn slow_drift_is_never_reported_as_new_planet() {
    let mut controller = controller();
    let drift: Vec<(f64, f64)> = (0..6).map(|i| (20.0 + 9.0 * i as f64, 0.0)).collect();
    observe(&mut controller, &drift);

    // (20,0) and (65,0) are 45 mas apart, yet every consecutive pair agrees.
    assert_eq!(controller.database().science_len(), 6);
}

#[test]
fn aligned_frames_survive_pruning() {
    let mut controller = controller();
    for (n, point) in [(0.0, 0.0), (20.0, 0.0), (-20.0, 0.0)].into_iter().enumerate() {
        controller.get_science(point.into()).unwrap();
        controller.on_frame(Frame::filled(n as u64, 2, 2, n as u16));
    }

    let exposures = controller.database().science_exposures();
    assert_eq!(exposures.len(), 2);
    let frame_numbers: Vec<u64> = exposures
        .iter()
        .map(|e| e.frame.as_ref().map(|f| f.frame_number).unwrap_or(u64::MAX))
        .collect();
    assert_eq!(frame_numbers, vec![0, 2]);
}

// =============================================================================
// Wavefront correction capability
// =============================================================================

#[derive(Clone, Default)]
struct RecordingCorrector {
    calls: Arc<Mutex<Vec<usize>>>,
}

impl WavefrontCorrector for RecordingCorrector {
    fn compute_correction(&self, retained: &[ScienceExposure]) -> Result<CorrectionVector> {
        self.calls.lock().unwrap().push(retained.len());
        Ok(CorrectionVector::zeros(12))
    }
}

struct FailingCorrector;

impl WavefrontCorrector for FailingCorrector {
    fn compute_correction(&self, _retained: &[ScienceExposure]) -> Result<CorrectionVector> {
        bail!("deformable mirror offline")
    }
}

#[test]
fn corrector_runs_after_planet_exposures_only() {
    let corrector = RecordingCorrector::default();
    let calls = corrector.calls.clone();
    let mut controller = DarkHoleController::new(keys()).with_corrector(Box::new(corrector));

    observe(
        &mut controller,
        &[(0.0, 0.0), (20.0, 0.0), (21.0, 0.0), (-20.0, 0.0), (1.0, 1.0)],
    );

    // Retained sizes seen after each planet exposure: first, same, new (pruned).
    assert_eq!(*calls.lock().unwrap(), vec![2, 3, 2]);
    assert_eq!(controller.last_correction().map(CorrectionVector::len), Some(12));
}

#[test]
fn corrector_failure_is_reported_after_recording() {
    let mut controller = DarkHoleController::new(keys()).with_corrector(Box::new(FailingCorrector));

    let err = controller
        .get_science(FiberPosition::new(40.0, 0.0))
        .unwrap_err();

    assert!(matches!(err, DarkHoleError::Correction(_)));
    assert!(err.to_string().contains("deformable mirror offline"));
    assert_eq!(controller.database().science_len(), 1);
    assert!(controller.last_correction().is_none());
}
