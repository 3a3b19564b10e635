//! Core types for the gridded environment engine.
//!
//! Angles (latitudes, longitudes, directions) are radians unless a field or
//! constructor says otherwise.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// One full turn in radians.
pub const TWO_PI: f64 = 2.0 * PI;

/// Physical quantity stored in a variable series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variable {
    /// Eastward wind component.
    WindU,
    /// Northward wind component.
    WindV,
    /// Eastward sea water velocity.
    CurrentU,
    /// Northward sea water velocity.
    CurrentV,
}

impl Variable {
    pub const ALL: [Variable; 4] = [
        Variable::WindU,
        Variable::WindV,
        Variable::CurrentU,
        Variable::CurrentV,
    ];

    /// Map a GRIB element identifier onto a variable.
    ///
    /// Elements the engine does not track return `None`.
    pub fn from_element(element: &str) -> Option<Self> {
        match element {
            "UGRD" => Some(Self::WindU),
            "VGRD" => Some(Self::WindV),
            "UOGRD" => Some(Self::CurrentU),
            "VOGRD" => Some(Self::CurrentV),
            _ => None,
        }
    }

    /// GRIB element identifier for this variable.
    pub fn element(&self) -> &'static str {
        match self {
            Self::WindU => "UGRD",
            Self::WindV => "VGRD",
            Self::CurrentU => "UOGRD",
            Self::CurrentV => "VOGRD",
        }
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WindU => write!(f, "wind-u"),
            Self::WindV => write!(f, "wind-v"),
            Self::CurrentU => write!(f, "current-u"),
            Self::CurrentV => write!(f, "current-v"),
        }
    }
}

/// A query position in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn from_degrees(lat: f64, lon: f64) -> Self {
        Self {
            lat: lat.to_radians(),
            lon: lon.to_radians(),
        }
    }
}

/// Raster geo-referencing, converted to radians.
///
/// Origin and step describe cell boundaries as delivered by the raster
/// source; a north-up raster has a negative latitude step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_lon: f64,
    pub step_lon: f64,
    pub origin_lat: f64,
    pub step_lat: f64,
}

impl GeoTransform {
    pub fn new(origin_lon: f64, step_lon: f64, origin_lat: f64, step_lat: f64) -> Self {
        Self {
            origin_lon,
            step_lon,
            origin_lat,
            step_lat,
        }
    }

    /// Build from the six GDAL-ordered coefficients in degrees:
    /// `[origin_lon, step_lon, rot, origin_lat, rot, step_lat]`.
    ///
    /// Rotation terms are ignored; only axis-aligned rasters are supported.
    pub fn from_gdal_degrees(coefficients: [f64; 6]) -> Self {
        Self {
            origin_lon: coefficients[0].to_radians(),
            step_lon: coefficients[1].to_radians(),
            origin_lat: coefficients[3].to_radians(),
            step_lat: coefficients[5].to_radians(),
        }
    }
}

/// Sub-rectangle applied to the mesh at construction time, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipWindow {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl ClipWindow {
    pub fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    /// Parse `lat_min,lat_max,lon_min,lon_max`.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        match parts.as_slice() {
            [lat_min, lat_max, lon_min, lon_max] => {
                Some(Self::new(*lat_min, *lat_max, *lon_min, *lon_max))
            }
            _ => None,
        }
    }

    /// Bounds in radians as `(lat_min, lat_max, lon_min, lon_max)`.
    pub fn radians(&self) -> (f64, f64, f64, f64) {
        (
            self.lat_min.to_radians(),
            self.lat_max.to_radians(),
            self.lon_min.to_radians(),
            self.lon_max.to_radians(),
        )
    }
}

/// Spatial coverage of the mesh in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coverage {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl Coverage {
    pub fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    pub fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max
    }

    pub fn contains_lon(&self, lon: f64) -> bool {
        lon >= self.lon_min && lon <= self.lon_max
    }

    pub fn contains(&self, position: &Position) -> bool {
        self.contains_lat(position.lat) && self.contains_lon(position.lon)
    }

    /// Coverage converted to degrees, for logging.
    pub fn to_degrees(&self) -> (f64, f64, f64, f64) {
        (
            self.lat_min.to_degrees(),
            self.lat_max.to_degrees(),
            self.lon_min.to_degrees(),
            self.lon_max.to_degrees(),
        )
    }
}

/// Temporal coverage of a series: first timestamp and the duration to the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
    pub start: DateTime<Utc>,
    pub duration: Duration,
}

impl TimeSpan {
    pub fn new(start: DateTime<Utc>, duration: Duration) -> Self {
        Self { start, duration }
    }

    /// Degenerate span used when no data is loaded.
    pub fn empty_now() -> Self {
        Self::new(Utc::now(), Duration::zero())
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration
    }

    pub fn is_empty(&self) -> bool {
        self.duration.is_zero()
    }
}

/// Direction/magnitude pairs returned by environment queries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VectorField {
    /// Directions in radians.
    pub angles: Vec<f64>,
    /// Magnitudes in m/s (or the configured sentinel).
    pub speeds: Vec<f64>,
}

impl VectorField {
    pub fn new(angles: Vec<f64>, speeds: Vec<f64>) -> Self {
        Self { angles, speeds }
    }

    pub fn zeros(len: usize) -> Self {
        Self::new(vec![0.0; len], vec![0.0; len])
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    /// Iterate `(angle, speed)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.angles.iter().copied().zip(self.speeds.iter().copied())
    }

    /// Replace entry `i` with a zero angle and the given magnitude.
    pub(crate) fn blank(&mut self, i: usize, speed: f64) {
        self.angles[i] = 0.0;
        self.speeds[i] = speed;
    }
}
