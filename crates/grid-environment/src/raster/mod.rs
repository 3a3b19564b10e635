//! Raster collaborator interface.
//!
//! The engine never decodes GRIB itself. A [`RasterDriver`] opens a source
//! into a [`RasterDataset`] exposing the geo-transform, the raster size and
//! per-band metadata and data; the engine picks the velocity bands it tracks
//! by their GRIB metadata keys.

mod json;
mod memory;

pub use json::JsonRasterDriver;
pub use memory::{MemoryBand, MemoryDataset};

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

use crate::error::{GridError, Result};
use crate::grid::Grid;
use crate::types::Variable;

/// Band metadata key naming the GRIB element (`UGRD`, `VOGRD`, ...).
pub const ELEMENT_KEY: &str = "GRIB_ELEMENT";
/// Band metadata key holding the physical unit.
pub const UNIT_KEY: &str = "GRIB_UNIT";
/// Band metadata key holding the valid time as `"<seconds> sec UTC"`.
pub const VALID_TIME_KEY: &str = "GRIB_VALID_TIME";
/// The only velocity unit accepted.
pub const VELOCITY_UNIT: &str = "[m/s]";

/// An opened multi-band raster.
///
/// Bands are indexed from zero. Band data is row-major and north-up:
/// row 0 is the northernmost row.
pub trait RasterDataset {
    /// Human-readable name of the source.
    fn description(&self) -> String;

    /// GDAL-ordered affine coefficients in degrees.
    fn geo_transform(&self) -> [f64; 6];

    /// `(width, height)` in cells.
    fn raster_size(&self) -> (usize, usize);

    fn band_count(&self) -> usize;

    /// Metadata value of `key` on band `index`.
    fn band_metadata(&self, index: usize, key: &str) -> Option<String>;

    /// Read band `index` as a `height` × `width` grid.
    fn read_band(&self, index: usize) -> Result<Grid<f64>>;
}

/// Opens raster sources by path.
pub trait RasterDriver {
    fn open(&self, path: &Path) -> Result<Box<dyn RasterDataset>>;
}

/// A tracked velocity band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandInfo {
    pub variable: Variable,
    pub time: DateTime<Utc>,
}

/// Classify band `index` of `dataset`.
///
/// Returns `Ok(None)` for bands whose element is not tracked. Tracked bands
/// must carry `[m/s]` units and a UTC valid time.
pub fn classify_band(dataset: &dyn RasterDataset, index: usize) -> Result<Option<BandInfo>> {
    let element = dataset.band_metadata(index, ELEMENT_KEY).unwrap_or_default();
    debug!(band = index, element = %element, "Found band");
    let variable = match Variable::from_element(&element) {
        Some(variable) => variable,
        None => return Ok(None),
    };

    let unit = dataset.band_metadata(index, UNIT_KEY).unwrap_or_default();
    if unit != VELOCITY_UNIT {
        return Err(GridError::data(format!(
            "only {} is supported for velocity, band {} has {:?}",
            VELOCITY_UNIT, index, unit
        )));
    }

    let raw_time = dataset
        .band_metadata(index, VALID_TIME_KEY)
        .ok_or_else(|| GridError::data(format!("band {} has no {}", index, VALID_TIME_KEY)))?;
    let time = parse_valid_time(&raw_time)?;
    Ok(Some(BandInfo { variable, time }))
}

/// Parse a `"<unix-seconds> sec UTC"` valid time.
pub fn parse_valid_time(s: &str) -> Result<DateTime<Utc>> {
    let unsupported = || GridError::data(format!("only UTC timestamps are supported, got {:?}", s));
    let parts: Vec<&str> = s.split_whitespace().collect();
    let seconds = match parts.as_slice() {
        [value, "sec", "UTC"] => value.parse::<f64>().map_err(|_| unsupported())?,
        _ => return Err(unsupported()),
    };
    if !seconds.is_finite() {
        return Err(unsupported());
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    Utc.timestamp_opt(whole as i64, nanos)
        .single()
        .ok_or_else(unsupported)
}

/// Format a time the way [`parse_valid_time`] reads it.
pub fn format_valid_time(time: DateTime<Utc>) -> String {
    format!("{} sec UTC", time.timestamp())
}
