//! Common test fixtures for grid-environment tests.
//!
//! This module provides pre-defined grids and times that represent common
//! scenarios in wind and current interpolation.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Sentinel used for missing cells in generated grids.
pub const MISSING: f64 = 9999.0;

/// A fixed reference time for tests (2024-06-01T12:00:00Z).
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// `reference_time()` plus `minutes`.
pub fn minutes_after(minutes: i64) -> DateTime<Utc> {
    reference_time() + Duration::minutes(minutes)
}

/// Common grid specifications for testing.
pub mod grid {
    /// One-degree grid with cell centres 50..55°N, 3..8°E.
    pub const NORTH_SEA: GridSpec = GridSpec {
        width: 6,
        height: 6,
        min_lon: 3.0,
        min_lat: 50.0,
        step: 1.0,
    };

    /// Global one-degree grid with cell centres 0..359°E, 80°S..80°N.
    pub const GLOBAL_1DEG: GridSpec = GridSpec {
        width: 360,
        height: 161,
        min_lon: 0.0,
        min_lat: -80.0,
        step: 1.0,
    };

    /// Grid with centres in -10..10°E, 40..44°N at half-degree spacing.
    pub const GREENWICH: GridSpec = GridSpec {
        width: 41,
        height: 9,
        min_lon: -10.0,
        min_lat: 40.0,
        step: 0.5,
    };

    /// Regular grid specification (cell centres, degrees).
    #[derive(Debug, Clone, Copy)]
    pub struct GridSpec {
        pub width: usize,
        pub height: usize,
        pub min_lon: f64,
        pub min_lat: f64,
        pub step: f64,
    }

    impl GridSpec {
        /// Returns the total number of grid cells.
        pub fn size(&self) -> usize {
            self.width * self.height
        }

        pub fn max_lon(&self) -> f64 {
            self.min_lon + self.step * (self.width - 1) as f64
        }

        pub fn max_lat(&self) -> f64 {
            self.min_lat + self.step * (self.height - 1) as f64
        }

        /// GDAL-ordered geo-transform of the north-up raster.
        pub fn transform(&self) -> [f64; 6] {
            crate::gdal_transform(self.min_lon, self.max_lat(), self.step)
        }

        /// Centre latitude of north-up raster row `row`.
        pub fn row_lat(&self, row: usize) -> f64 {
            self.max_lat() - self.step * row as f64
        }

        /// Centre longitude of column `col`.
        pub fn col_lon(&self, col: usize) -> f64 {
            self.min_lon + self.step * col as f64
        }
    }
}
