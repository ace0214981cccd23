//! Angle helpers shared by the matrix and display-object code.

use std::f32::consts::PI;

pub const DEG_TO_RAD: f32 = PI / 180.0;
pub const RAD_TO_DEG: f32 = 180.0 / PI;
pub const TWO_PI: f32 = PI * 2.0;

/// Sine of an angle in degrees.
///
/// Exact at multiples of 90 so axis-aligned rotations produce clean
/// matrices instead of rounding noise in the off-diagonal terms. Angles
/// that only miss a multiple of 90 by degree/radian round-trip error
/// snap as well.
pub fn sin_deg(degrees: f32) -> f32 {
    match quadrant(degrees) {
        Some(0) => 0.0,
        Some(1) => 1.0,
        Some(2) => 0.0,
        Some(3) => -1.0,
        _ => (degrees * DEG_TO_RAD).sin(),
    }
}

/// Cosine of an angle in degrees. See [`sin_deg`].
pub fn cos_deg(degrees: f32) -> f32 {
    match quadrant(degrees) {
        Some(0) => 1.0,
        Some(1) => 0.0,
        Some(2) => -1.0,
        Some(3) => 0.0,
        _ => (degrees * DEG_TO_RAD).cos(),
    }
}

fn quadrant(degrees: f32) -> Option<i32> {
    let turns = degrees / 90.0;
    let nearest = turns.round();
    if (turns - nearest).abs() > 1e-6 {
        return None;
    }
    Some((nearest as i64).rem_euclid(4) as i32)
}

/// Wrap a rotation in degrees into (-180, 180].
pub fn clamp_rotation(value: f32) -> f32 {
    let mut value = value % 360.0;
    if value > 180.0 {
        value -= 360.0;
    } else if value <= -180.0 {
        value += 360.0;
    }
    value
}
