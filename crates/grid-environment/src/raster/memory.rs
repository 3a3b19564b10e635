//! In-memory raster datasets.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{format_valid_time, RasterDataset, ELEMENT_KEY, UNIT_KEY, VALID_TIME_KEY, VELOCITY_UNIT};
use crate::error::{GridError, Result};
use crate::grid::Grid;
use crate::types::Variable;

/// One band: metadata plus row-major north-up values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MemoryBand {
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub data: Vec<f64>,
}

impl MemoryBand {
    pub fn new(data: Vec<f64>) -> Self {
        Self {
            metadata: BTreeMap::new(),
            data,
        }
    }

    /// A velocity band of `variable` valid at `time`, in m/s.
    pub fn velocity(variable: Variable, time: DateTime<Utc>, data: Vec<f64>) -> Self {
        Self::new(data)
            .with_metadata(ELEMENT_KEY, variable.element())
            .with_metadata(UNIT_KEY, VELOCITY_UNIT)
            .with_metadata(VALID_TIME_KEY, format_valid_time(time))
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A raster held entirely in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryDataset {
    #[serde(default)]
    pub description: String,
    /// GDAL-ordered coefficients in degrees.
    pub geo_transform: [f64; 6],
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub bands: Vec<MemoryBand>,
}

impl MemoryDataset {
    pub fn new(
        description: impl Into<String>,
        geo_transform: [f64; 6],
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            description: description.into(),
            geo_transform,
            width,
            height,
            bands: Vec::new(),
        }
    }

    pub fn push_band(&mut self, band: MemoryBand) {
        self.bands.push(band);
    }

    pub fn with_band(mut self, band: MemoryBand) -> Self {
        self.push_band(band);
        self
    }
}

impl RasterDataset for MemoryDataset {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn geo_transform(&self) -> [f64; 6] {
        self.geo_transform
    }

    fn raster_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn band_metadata(&self, index: usize, key: &str) -> Option<String> {
        self.bands.get(index)?.metadata.get(key).cloned()
    }

    fn read_band(&self, index: usize) -> Result<Grid<f64>> {
        let band = self
            .bands
            .get(index)
            .ok_or_else(|| GridError::data(format!("band {} does not exist", index)))?;
        Grid::new(self.height, self.width, band.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_band_shape() {
        let ds = MemoryDataset::new("mem", [0.0, 1.0, 0.0, 0.0, 0.0, -1.0], 3, 2)
            .with_band(MemoryBand::new((0..6).map(f64::from).collect()));
        let grid = ds.read_band(0).unwrap();
        assert_eq!(grid.shape(), (2, 3));
        assert_eq!(grid.row(1), &[3.0, 4.0, 5.0]);
        assert!(ds.read_band(1).unwrap_err().is_data_error());
    }

    #[test]
    fn test_read_band_length_mismatch() {
        let ds = MemoryDataset::new("mem", [0.0, 1.0, 0.0, 0.0, 0.0, -1.0], 3, 2)
            .with_band(MemoryBand::new(vec![1.0; 5]));
        assert!(ds.read_band(0).unwrap_err().is_data_error());
    }
}
