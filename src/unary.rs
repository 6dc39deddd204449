use super::{AngleUnit, UnaryHandler};
use std::f64::consts;

/// Applies a direct trig function, reading the argument in `unit`.
pub fn trig(op: UnaryHandler, arg: f64, unit: AngleUnit) -> f64 {
    match unit {
        AngleUnit::Degrees => op(deg_to_rad(arg)),
        AngleUnit::Radians => op(arg),
    }
}

/// Applies an inverse trig function, reporting the angle in `unit`.
pub fn inverse_trig(op: UnaryHandler, arg: f64, unit: AngleUnit) -> f64 {
    match unit {
        AngleUnit::Degrees => rad_to_deg(op(arg)),
        AngleUnit::Radians => op(arg),
    }
}

pub fn rad_to_deg(rad: f64) -> f64 {
    rad * 180.0 / consts::PI
}
pub fn deg_to_rad(deg: f64) -> f64 {
    deg * consts::PI / 180.0
}

/// Rounds half-way cases toward positive infinity (`-2.5` becomes `-2`).
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Like `signum`, but zero maps to zero.
pub fn sign(x: f64) -> f64 {
    if x == 0.0 || x.is_nan() { x } else { x.signum() }
}
