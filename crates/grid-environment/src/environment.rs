//! The query surface shared by every environment.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{Position, VectorField};
use crate::units::norm_angle;

/// Wind and current at arbitrary positions and times.
pub trait Environment {
    /// Wind direction (where it blows from) and speed.
    fn get_wind(&self, positions: &[Position], time: DateTime<Utc>) -> Result<VectorField>;

    /// Current direction (where it flows to) and speed. With `filter_nodata`,
    /// positions dominated by missing source cells report no current.
    fn get_current(
        &self,
        positions: &[Position],
        time: DateTime<Utc>,
        filter_nodata: bool,
    ) -> Result<VectorField>;

    /// Poll for fresh data. Returns whether anything was reloaded.
    fn check(&mut self) -> Result<bool> {
        Ok(false)
    }
}

/// No wind, no current, everywhere and always.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalmEnvironment;

impl Environment for CalmEnvironment {
    fn get_wind(&self, positions: &[Position], _time: DateTime<Utc>) -> Result<VectorField> {
        Ok(VectorField::zeros(positions.len()))
    }

    fn get_current(
        &self,
        positions: &[Position],
        _time: DateTime<Utc>,
        _filter_nodata: bool,
    ) -> Result<VectorField> {
        Ok(VectorField::zeros(positions.len()))
    }
}

/// Wind field from eastward `u` and northward `v`: angle `atan2(u, v) + pi`.
pub fn wind_field(u: &[f64], v: &[f64]) -> VectorField {
    let (angles, speeds): (Vec<f64>, Vec<f64>) = u
        .iter()
        .zip(v)
        .map(|(u, v)| (u.atan2(*v) + std::f64::consts::PI, u.hypot(*v)))
        .unzip();
    VectorField::new(angles, speeds)
}

/// Current field from eastward `u` and northward `v`: angle `atan2(u, v)`
/// in `[0, 2pi)`.
pub fn current_field(u: &[f64], v: &[f64]) -> VectorField {
    let (angles, speeds): (Vec<f64>, Vec<f64>) = u
        .iter()
        .zip(v)
        .map(|(u, v)| (norm_angle(u.atan2(*v)), u.hypot(*v)))
        .unzip();
    VectorField::new(angles, speeds)
}
