//! Pre-decoded rasters stored as JSON documents.

use std::fs;
use std::path::Path;

use tracing::debug;

use super::{MemoryDataset, RasterDataset, RasterDriver};
use crate::error::Result;

/// Reads [`MemoryDataset`] documents from `.json` files.
///
/// ```json
/// {
///   "description": "gfs 2024-06-01 12z",
///   "geo_transform": [3.0, 1.0, 0.0, 55.5, 0.0, -1.0],
///   "width": 6,
///   "height": 6,
///   "bands": [
///     { "metadata": { "GRIB_ELEMENT": "UGRD", "GRIB_UNIT": "[m/s]",
///                     "GRIB_VALID_TIME": "1717243200 sec UTC" },
///       "data": [ ... ] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRasterDriver;

impl JsonRasterDriver {
    pub fn new() -> Self {
        Self
    }

    /// Write `dataset` to `path` in the format [`RasterDriver::open`] reads.
    pub fn save(&self, dataset: &MemoryDataset, path: &Path) -> Result<()> {
        let json = serde_json::to_string(dataset)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl RasterDriver for JsonRasterDriver {
    fn open(&self, path: &Path) -> Result<Box<dyn RasterDataset>> {
        let content = fs::read_to_string(path)?;
        let mut dataset: MemoryDataset = serde_json::from_str(&content)?;
        if dataset.description.is_empty() {
            dataset.description = path.display().to_string();
        }
        debug!(path = %path.display(), bands = dataset.bands.len(), "Decoded JSON raster");
        Ok(Box::new(dataset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::MemoryBand;

    #[test]
    fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raster.json");
        let ds = MemoryDataset::new("", [0.0, 1.0, 0.0, 1.0, 0.0, -1.0], 2, 1)
            .with_band(MemoryBand::new(vec![1.0, 2.0]).with_metadata("GRIB_ELEMENT", "UGRD"));

        let driver = JsonRasterDriver::new();
        driver.save(&ds, &path).unwrap();
        let opened = driver.open(&path).unwrap();

        assert_eq!(opened.description(), path.display().to_string());
        assert_eq!(opened.raster_size(), (2, 1));
        assert_eq!(opened.band_metadata(0, "GRIB_ELEMENT").as_deref(), Some("UGRD"));
        assert_eq!(opened.read_band(0).unwrap().data(), &[1.0, 2.0]);
    }

    #[test]
    fn test_open_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = JsonRasterDriver::new().open(&dir.path().join("nope.json"));
        assert!(matches!(missing, Err(crate::GridError::Io(_))));

        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonRasterDriver::new().open(&path),
            Err(crate::GridError::Serialization(_))
        ));
    }
}
