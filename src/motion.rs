use crate::geometry::{Geometry, Point};

/// Cursor displacement per unit of angular rate
pub const DEFAULT_GAIN: f64 = 20.0;

/// One gyroscope reading. Only the first two axes steer the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionSample {
    pub rate_axis0: f64,
    pub rate_axis1: f64,
}

impl MotionSample {
    pub fn new(rate_axis0: f64, rate_axis1: f64) -> Self {
        Self {
            rate_axis0,
            rate_axis1,
        }
    }
}

/// Cursor top-left offset in screen pixels
pub type CursorState = Point;

/// Integrates angular-rate samples into a clamped cursor position
#[derive(Debug, Clone)]
pub struct MotionIntegrator {
    cursor: CursorState,
    gain: f64,
    geometry: Geometry,
}

impl MotionIntegrator {
    pub fn new(geometry: Geometry, gain: f64) -> Self {
        Self {
            cursor: CursorState::ORIGIN,
            gain,
            geometry,
        }
    }

    pub fn cursor(&self) -> CursorState {
        self.cursor
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Apply one sample. Axis 1 moves x and axis 0 moves y.
    /// A sample that would make the position NaN is dropped.
    pub fn update(&mut self, sample: MotionSample) -> CursorState {
        let diameter = self.geometry.cursor_diameter;
        let x = self.cursor.x + sample.rate_axis1 * self.gain;
        let y = self.cursor.y + sample.rate_axis0 * self.gain;
        if x.is_nan() || y.is_nan() {
            return self.cursor;
        }

        self.cursor = CursorState {
            x: x.clamp(0.0, self.geometry.max_x(diameter)),
            y: y.clamp(0.0, self.geometry.max_y(diameter)),
        };
        self.cursor
    }
}
