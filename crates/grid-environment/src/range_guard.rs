//! Spatial coverage checks for queries.

use crate::error::{GridError, Result};
use crate::types::{Coverage, Position, VectorField};

/// Flags query positions outside the mesh coverage.
///
/// Without a sentinel value every out-of-range position is an error. With
/// one, out-of-range results get a zero angle and the sentinel magnitude.
#[derive(Debug, Clone, Copy)]
pub struct RangeGuard {
    coverage: Coverage,
    sentinel: Option<f64>,
}

impl RangeGuard {
    pub fn new(coverage: Coverage, sentinel: Option<f64>) -> Self {
        Self { coverage, sentinel }
    }

    pub fn coverage(&self) -> &Coverage {
        &self.coverage
    }

    pub fn sentinel(&self) -> Option<f64> {
        self.sentinel
    }

    /// Out-of-range mask for `positions`.
    ///
    /// Fails with a range error (latitudes reported first) when any
    /// position is outside and no sentinel is configured.
    pub fn check(&self, positions: &[Position]) -> Result<Vec<bool>> {
        if self.sentinel.is_none() {
            let lats: Vec<f64> = positions
                .iter()
                .filter(|p| !self.coverage.contains_lat(p.lat))
                .map(|p| p.lat)
                .collect();
            if !lats.is_empty() {
                return Err(GridError::range("latitude", lats));
            }
            let lons: Vec<f64> = positions
                .iter()
                .filter(|p| !self.coverage.contains_lon(p.lon))
                .map(|p| p.lon)
                .collect();
            if !lons.is_empty() {
                return Err(GridError::range("longitude", lons));
            }
        }
        Ok(positions
            .iter()
            .map(|p| !self.coverage.contains(p))
            .collect())
    }

    /// Substitute the sentinel for flagged entries.
    pub fn apply(&self, field: &mut VectorField, out_of_range: &[bool]) {
        if let Some(sentinel) = self.sentinel {
            for (i, out) in out_of_range.iter().enumerate() {
                if *out {
                    field.blank(i, sentinel);
                }
            }
        }
    }
}
