//! Spatio-temporal wind and current interpolation over gridded rasters
//!
//! This crate turns a sequence of GRIB-style rasters (eastward/northward
//! wind and sea-water velocity bands, each valid at one time) into a
//! queryable environment:
//!
//! - **Mesh**: cell-centred latitude/longitude axes with optional clipping
//!   and longitude wraparound for global grids
//! - **Missing data**: sentinel cells are reconstructed (interlaced grids are
//!   sub-sampled, scattered gaps antialiased) and a nodata-fraction surface
//!   is kept for filtering
//! - **Queries**: bicubic spatial interpolation blended linearly in time
//! - **Live reload**: a marker file signals new downloads
//!
//! All angles are radians. Directions of wind are where it blows from;
//! directions of current are where it flows to.
//!
//! # Architecture
//!
//! ```text
//! RasterDriver::open(path)
//!      │
//!      ▼
//! GribEnvironment::load_dataset ──► LoadCursor (one LoadEvent per band)
//!      │
//!      ├─► Mesh::prepare_band (flip, clip, wraparound)
//!      ├─► nodata::reconstruct ──► BicubicSpline (+ nodata fraction)
//!      └─► VariableSeries::insert_or_replace
//!
//! GribEnvironment::get_wind / get_current
//!      │
//!      ├─► compositor::blend_components (bracket + linear blend)
//!      ├─► wind_field / current_field
//!      └─► RangeGuard
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_environment::{EngineConfig, GribEnvironment, JsonRasterDriver, Position};
//!
//! let mut engine = GribEnvironment::new(EngineConfig::default());
//! engine.load_file(&JsonRasterDriver::new(), "gfs-2024060112.json".as_ref())?;
//!
//! let wind = engine.get_wind(&[Position::from_degrees(52.5, 5.5)], time)?;
//! for (angle, speed) in wind.iter() {
//!     println!("{:.0}° {:.1} m/s", angle.to_degrees(), speed);
//! }
//! ```

pub mod compositor;
pub mod config;
pub mod engine;
pub mod environment;
pub mod error;
pub mod grid;
pub mod ingest;
pub mod layer;
pub mod live;
pub mod mesh;
pub mod nodata;
pub mod range_guard;
pub mod raster;
pub mod spline;
pub mod types;
pub mod units;

// Re-export commonly used types at crate root
pub use config::{EngineConfig, ProviderConfig};
pub use engine::GribEnvironment;
pub use environment::{CalmEnvironment, Environment};
pub use error::{GridError, Result};
pub use grid::Grid;
pub use ingest::{LoadCursor, LoadEvent, UpdateCursor};
pub use layer::{Layer, VariableSeries};
pub use live::{LiveCursor, LiveGribEnvironment, MonitorState, UpdateMonitor};
pub use mesh::Mesh;
pub use nodata::ReconstructionParams;
pub use range_guard::RangeGuard;
pub use raster::{JsonRasterDriver, MemoryBand, MemoryDataset, RasterDataset, RasterDriver};
pub use spline::BicubicSpline;
pub use types::{ClipWindow, Coverage, GeoTransform, Position, TimeSpan, Variable, VectorField};
