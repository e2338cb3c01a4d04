use rand::Rng;

use crate::geometry::{Geometry, Point};

/// Target top-left offset in screen pixels
pub type TargetState = Point;

/// Pick a uniformly random target position that keeps the target fully on screen
pub fn place<R: Rng + ?Sized>(geometry: &Geometry, rng: &mut R) -> TargetState {
    let diameter = geometry.target_diameter;
    let fx: f64 = rng.gen();
    let fy: f64 = rng.gen();

    TargetState {
        x: fx * geometry.max_x(diameter),
        y: fy * geometry.max_y(diameter),
    }
}
