//! Geographic mesh construction from raster geo-referencing.
//!
//! The mesh turns a north-up, cell-boundary based geo-transform into two
//! monotonic, cell-center based axes (latitude increasing with row index,
//! longitude increasing with column index). It also remembers how every
//! band of the source has to be reshaped to line up with those axes:
//! row flip, clip window and antimeridian wraparound.

use std::f64::consts::PI;
use std::ops::Range;

use tracing::info;

use crate::error::{GridError, Result};
use crate::grid::Grid;
use crate::types::{ClipWindow, Coverage, GeoTransform, TWO_PI};

/// Longitude spans above this fraction of a full turn wrap around the globe.
pub const WRAPAROUND_FRACTION: f64 = 0.975;

/// Rows and columns kept from a (south-first) band after clipping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipSlice {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

/// Sample grid shared by every layer of an engine instance.
#[derive(Debug, Clone)]
pub struct Mesh {
    lats: Vec<f64>,
    lons: Vec<f64>,
    raster_size: (usize, usize),
    clip: Option<ClipSlice>,
    wraparound: bool,
    negative_lon: bool,
}

/// One mesh axis while it is being normalized and clipped.
#[derive(Debug, Clone, Copy)]
struct AxisSpan {
    min: f64,
    max: f64,
    step: f64,
    size: usize,
}

impl AxisSpan {
    /// Trim the axis to `[lo, hi]`, returning the kept index range.
    ///
    /// Trims err on the inside: a partially covered edge cell is dropped.
    fn clip(&mut self, lo: f64, hi: f64) -> Result<Range<usize>> {
        let size = self.size as i64;
        let mut start = 0_i64;
        let mut end = size;
        if lo > self.min {
            let skip = ((lo - self.min) / self.step) as i64 + 1;
            self.min += skip as f64 * self.step;
            start = skip;
        }
        if hi < self.max {
            let trim = ((hi - self.max) / self.step) as i64 - 1;
            self.max += trim as f64 * self.step;
            end = size + trim;
        }
        if start >= end || start >= size || end <= 0 {
            return Err(GridError::data(
                "clip window does not overlap the raster",
            ));
        }
        self.size = (end - start) as usize;
        Ok(start as usize..end as usize)
    }

    fn range(&self) -> f64 {
        self.max - self.min
    }

    fn values(&self) -> Vec<f64> {
        linspace(self.min, self.max, self.size)
    }
}

impl Mesh {
    /// Build the mesh for a `width` × `height` raster.
    ///
    /// Fails with a data error when the raster is not north-up (the raw
    /// latitude step must be negative) or when the clip window leaves
    /// nothing.
    pub fn from_transform(
        transform: &GeoTransform,
        width: usize,
        height: usize,
        clip: Option<&ClipWindow>,
    ) -> Result<Self> {
        if transform.step_lat >= 0.0 {
            return Err(GridError::data(
                "expected negative latitude step (north-up raster)",
            ));
        }
        if width == 0 || height == 0 {
            return Err(GridError::data(format!(
                "raster has no cells ({}x{})",
                width, height
            )));
        }

        // Cell boundaries to cell centers; flip the latitude step
        let lon_min = transform.origin_lon + 0.5 * transform.step_lon;
        let lat_max = transform.origin_lat + 0.5 * transform.step_lat;
        let mut lon = AxisSpan {
            min: lon_min,
            max: lon_min + transform.step_lon * (width - 1) as f64,
            step: transform.step_lon,
            size: width,
        };
        let mut lat = AxisSpan {
            min: lat_max + transform.step_lat * (height - 1) as f64,
            max: lat_max,
            step: -transform.step_lat,
            size: height,
        };

        // Keep longitudes within [-pi, 2pi]
        if lon.max > TWO_PI {
            lon.min -= TWO_PI;
            lon.max -= TWO_PI;
        }
        if lon.min < -PI {
            lon.min += TWO_PI;
            lon.max += TWO_PI;
        }

        let clip = match clip {
            Some(window) => {
                let (lat_lo, lat_hi, lon_lo, lon_hi) = window.radians();
                let slice = ClipSlice {
                    rows: lat.clip(lat_lo, lat_hi)?,
                    cols: lon.clip(lon_lo, lon_hi)?,
                };
                info!(rows = ?slice.rows, cols = ?slice.cols, "Clipping mesh");
                Some(slice)
            }
            None => None,
        };

        let range = lon.range();
        let wraparound = range > WRAPAROUND_FRACTION * TWO_PI && range < TWO_PI;
        if wraparound {
            lon.size += 1;
            lon.max = lon.min + lon.step * (lon.size - 1) as f64;
            info!("Wrapping around longitude");
        }
        let negative_lon = lon.min < 0.0;

        info!(
            lat_min = lat.min.to_degrees(),
            lat_max = lat.max.to_degrees(),
            rows = lat.size,
            lon_min = lon.min.to_degrees(),
            lon_max = lon.max.to_degrees(),
            cols = lon.size,
            "Creating mesh"
        );

        Ok(Self {
            lats: lat.values(),
            lons: lon.values(),
            raster_size: (width, height),
            clip,
            wraparound,
            negative_lon,
        })
    }

    /// Latitude axis (radians, increasing).
    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    /// Longitude axis (radians, increasing).
    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    /// `(rows, cols)` of every prepared band.
    pub fn shape(&self) -> (usize, usize) {
        (self.lats.len(), self.lons.len())
    }

    /// `(width, height)` of the source raster.
    pub fn raster_size(&self) -> (usize, usize) {
        self.raster_size
    }

    pub fn clip_slice(&self) -> Option<&ClipSlice> {
        self.clip.as_ref()
    }

    /// Whether the first column is repeated past the last one.
    pub fn wraparound(&self) -> bool {
        self.wraparound
    }

    pub fn has_negative_longitudes(&self) -> bool {
        self.negative_lon
    }

    /// Latitude of every mesh node.
    pub fn lat_grid(&self) -> Grid<f64> {
        Grid::from_fn(self.lats.len(), self.lons.len(), |r, _| self.lats[r])
    }

    /// Longitude of every mesh node.
    pub fn lon_grid(&self) -> Grid<f64> {
        Grid::from_fn(self.lats.len(), self.lons.len(), |_, c| self.lons[c])
    }

    pub fn coverage(&self) -> Coverage {
        Coverage::new(
            self.lats[0],
            self.lats[self.lats.len() - 1],
            self.lons[0],
            self.lons[self.lons.len() - 1],
        )
    }

    /// Bring a query longitude into the mesh's longitude convention.
    pub fn normalize_longitude(&self, lon: f64) -> f64 {
        if !self.negative_lon && lon < 0.0 {
            lon + TWO_PI
        } else {
            lon
        }
    }

    /// Reshape a north-up raster band onto the mesh.
    pub fn prepare_band(&self, raw: &Grid<f64>) -> Result<Grid<f64>> {
        let (width, height) = self.raster_size;
        if raw.shape() != (height, width) {
            return Err(GridError::data(format!(
                "band has shape {:?}, raster is {}x{}",
                raw.shape(),
                height,
                width
            )));
        }
        let mut band = raw.flip_rows();
        // Seam column is raw column 0, before any clipping
        if self.wraparound {
            band = band.with_first_column_repeated();
        }
        if let Some(slice) = &self.clip {
            let mut cols = slice.cols.clone();
            if self.wraparound {
                cols.end += 1;
            }
            band = band.window(slice.rows.clone(), cols);
        }
        Ok(band)
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        end
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}
