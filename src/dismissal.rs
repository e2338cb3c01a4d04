//! One tilt-to-dismiss session.
//!
//! ```text
//!  AwaitingPlacement ──place_target──► Active ──tap (hit)──► Dismissed
//!                                       │  ▲
//!                                       └──┘ tap (miss)
//! ```
//!
//! A session is created when the alarm presentation starts and is dropped
//! with it. The target is chosen exactly once; a missed tap leaves the
//! session active and there is no snooze or retry state.

use log::{debug, info};
use rand::Rng;

use crate::{
    geometry::{Geometry, Point},
    hit_test::{self, HitReport, DEFAULT_OVERLAP_FACTOR},
    motion::{CursorState, MotionIntegrator, MotionSample, DEFAULT_GAIN},
    target::{self, TargetState},
};

/// Hand-tuned knobs, exposed through config
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub gain: f64,
    pub overlap_factor: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            gain: DEFAULT_GAIN,
            overlap_factor: DEFAULT_OVERLAP_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingPlacement,
    Active,
    Dismissed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapOutcome {
    /// Cursor was on target; the session is now dismissed
    Hit(HitReport),
    Miss(HitReport),
    /// Tap arrived before placement or after dismissal
    Ignored,
}

#[derive(Debug, Clone)]
pub struct DismissalSession {
    phase: SessionPhase,
    geometry: Geometry,
    tuning: Tuning,
    integrator: MotionIntegrator,
    target: Option<TargetState>,
    taps: u32,
}

impl DismissalSession {
    pub fn new(geometry: Geometry, tuning: Tuning) -> Self {
        Self {
            phase: SessionPhase::AwaitingPlacement,
            geometry,
            tuning,
            integrator: MotionIntegrator::new(geometry, tuning.gain),
            target: None,
            taps: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn cursor(&self) -> CursorState {
        self.integrator.cursor()
    }

    pub fn target(&self) -> Option<TargetState> {
        self.target
    }

    pub fn taps(&self) -> u32 {
        self.taps
    }

    pub fn is_dismissed(&self) -> bool {
        self.phase == SessionPhase::Dismissed
    }

    /// Choose the target. Only the first call has an effect, so the target
    /// stays where the user first saw it.
    pub fn place_target<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TargetState {
        if let Some(existing) = self.target {
            return existing;
        }

        let placed = target::place(&self.geometry, rng);
        debug!("target placed at ({:.1}, {:.1})", placed.x, placed.y);
        self.target = Some(placed);
        self.phase = SessionPhase::Active;
        placed
    }

    pub fn on_motion(&mut self, sample: MotionSample) -> CursorState {
        if self.is_dismissed() {
            return self.integrator.cursor();
        }
        self.integrator.update(sample)
    }

    pub fn on_tap(&mut self) -> TapOutcome {
        let target = match (self.phase, self.target) {
            (SessionPhase::Active, Some(target)) => target,
            _ => return TapOutcome::Ignored,
        };
        self.taps += 1;

        let report = self.measure(target);
        debug!(
            "distance: {:.1}, threshold: {:.1}",
            report.distance, report.threshold
        );

        if report.is_hit() {
            info!("overlap detected after {} tap(s), dismissing", self.taps);
            self.phase = SessionPhase::Dismissed;
            TapOutcome::Hit(report)
        } else {
            debug!("no overlap");
            TapOutcome::Miss(report)
        }
    }

    fn measure(&self, target: TargetState) -> HitReport {
        let g = &self.geometry;
        let cursor_center: Point = self.cursor().center_of(g.cursor_diameter);
        let target_center: Point = target.center_of(g.target_diameter);

        hit_test::measure(
            cursor_center,
            target_center,
            g.cursor_diameter,
            g.target_diameter,
            self.tuning.overlap_factor,
        )
    }
}
