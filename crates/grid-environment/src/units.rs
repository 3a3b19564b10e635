//! Unit and angle helpers.

use std::f64::consts::PI;

use crate::types::TWO_PI;

/// Metres per second in one knot.
pub const MS_PER_KNOT: f64 = 1852.0 / 3600.0;

pub fn to_knots(ms: f64) -> f64 {
    ms / MS_PER_KNOT
}

pub fn from_knots(knots: f64) -> f64 {
    knots * MS_PER_KNOT
}

/// Normalize an angle into `[0, 2pi)`.
pub fn norm_angle(a: f64) -> f64 {
    let r = a.rem_euclid(TWO_PI);
    // rem_euclid can round up to exactly 2pi for tiny negative inputs
    if r >= TWO_PI {
        0.0
    } else {
        r
    }
}

/// Normalize an angle difference into `[-pi, pi)`.
pub fn norm_angle_diff(d: f64) -> f64 {
    norm_angle(d + PI) - PI
}

/// Signed smallest rotation from `a` to `b`.
pub fn angle_diff(a: f64, b: f64) -> f64 {
    norm_angle_diff(b - a)
}
