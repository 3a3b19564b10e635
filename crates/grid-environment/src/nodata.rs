//! Reconstruction of raster bands that contain "missing data" sentinels.
//!
//! GRIB producers mark missing cells with huge sentinel values (typically
//! 9999). Fitting a spline straight through those would ruin the surface,
//! so before fitting:
//!
//! - rows or columns that are entirely missing in an alternating pattern
//!   (interlaced data) are dropped,
//! - otherwise missing cells are zeroed and then filled from their
//!   diagonal neighbours.
//!
//! A second spline over the 0/1 missing-data mask gives a continuous
//! "nodata fraction" that queries can use to detect points inside
//! originally missing regions.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::grid::Grid;
use crate::spline::BicubicSpline;

/// Values with a larger magnitude are treated as missing.
pub const SENTINEL_THRESHOLD: f64 = 1000.0;

/// Weight of the diagonal neighbour sum used to fill missing cells.
pub const ANTIALIAS_WEIGHT: f64 = 0.4;

/// Nodata fractions above this are reported as missing by filtered queries.
pub const NODATA_FRACTION_CUTOFF: f64 = 0.35;

/// Tunables of the reconstruction and nodata filtering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionParams {
    pub sentinel_threshold: f64,
    pub antialias_weight: f64,
    pub nodata_fraction_cutoff: f64,
}

impl Default for ReconstructionParams {
    fn default() -> Self {
        Self {
            sentinel_threshold: SENTINEL_THRESHOLD,
            antialias_weight: ANTIALIAS_WEIGHT,
            nodata_fraction_cutoff: NODATA_FRACTION_CUTOFF,
        }
    }
}

/// Interlacing along one grid axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interlace {
    #[default]
    None,
    /// Every odd line is missing; even lines are kept.
    FromOne,
    /// Every even line is missing; odd lines are kept.
    FromZero,
}

impl Interlace {
    /// Classify an axis from the "line is entirely missing" flags.
    fn detect(missing: &[bool]) -> Self {
        if missing.len() < 2 {
            return Self::None;
        }
        if missing.iter().skip(1).step_by(2).all(|m| *m) {
            Self::FromOne
        } else if missing.iter().step_by(2).all(|m| *m) {
            Self::FromZero
        } else {
            Self::None
        }
    }

    pub fn is_interlaced(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Indices of the lines kept out of `n`.
    pub fn kept(&self, n: usize) -> Vec<usize> {
        match self {
            Self::None => (0..n).collect(),
            Self::FromOne => (0..n).step_by(2).collect(),
            Self::FromZero => (1..n).step_by(2).collect(),
        }
    }
}

/// Interlacing detected along both axes of a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterlaceLayout {
    pub rows: Interlace,
    pub cols: Interlace,
}

impl InterlaceLayout {
    pub fn is_interlaced(&self) -> bool {
        self.rows.is_interlaced() || self.cols.is_interlaced()
    }
}

/// Splines fitted for one band.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub surface: BicubicSpline,
    pub nodata: Option<BicubicSpline>,
    pub layout: InterlaceLayout,
}

/// Mark cells whose magnitude exceeds `threshold`.
pub fn nodata_mask(grid: &Grid<f64>, threshold: f64) -> Grid<bool> {
    grid.map(|v| v.abs() > threshold)
}

/// Detect row and column interlacing in a missing-data mask.
pub fn detect_interlace(mask: &Grid<bool>) -> InterlaceLayout {
    let rows: Vec<bool> = (0..mask.rows())
        .map(|r| mask.row(r).iter().all(|m| *m))
        .collect();
    let cols: Vec<bool> = (0..mask.cols())
        .map(|c| (0..mask.rows()).all(|r| mask.at(r, c)))
        .collect();
    InterlaceLayout {
        rows: Interlace::detect(&rows),
        cols: Interlace::detect(&cols),
    }
}

/// Fill missing cells with `weight` times the sum of their diagonal
/// neighbours. Missing cells must already be zeroed.
pub fn antialias(grid: &mut Grid<f64>, mask: &Grid<bool>, weight: f64) {
    let (rows, cols) = grid.shape();
    let source = grid.clone();
    for r in 0..rows {
        for c in 0..cols {
            if !mask.at(r, c) {
                continue;
            }
            let mut stamp = 0.0;
            for (dr, dc) in [(-1_i64, -1_i64), (-1, 1), (1, -1), (1, 1)] {
                let nr = r as i64 + dr;
                let nc = c as i64 + dc;
                if nr >= 0 && nc >= 0 && (nr as usize) < rows && (nc as usize) < cols {
                    stamp += source.at(nr as usize, nc as usize);
                }
            }
            grid.set(r, c, source.at(r, c) + weight * stamp);
        }
    }
}

/// Reconstruct a band sampled at `lats` × `lons` and fit its splines.
pub fn reconstruct(
    band: &Grid<f64>,
    lats: &[f64],
    lons: &[f64],
    params: &ReconstructionParams,
) -> Result<Reconstruction> {
    let mask = nodata_mask(band, params.sentinel_threshold);
    if !mask.any() {
        return Ok(Reconstruction {
            surface: BicubicSpline::fit(lats, lons, band)?,
            nodata: None,
            layout: InterlaceLayout::default(),
        });
    }

    debug!(cells = mask.count(), "Band contains NODATA values");
    let layout = detect_interlace(&mask);
    match layout.rows {
        Interlace::FromOne => info!("Band is row-interlaced from 1"),
        Interlace::FromZero => info!("Band is row-interlaced from 0"),
        Interlace::None => {}
    }
    match layout.cols {
        Interlace::FromOne => info!("Band is column-interlaced from 1"),
        Interlace::FromZero => info!("Band is column-interlaced from 0"),
        Interlace::None => {}
    }

    // Zero every missing cell
    let mut clean = Grid::from_fn(band.rows(), band.cols(), |r, c| {
        if mask.at(r, c) {
            0.0
        } else {
            band.at(r, c)
        }
    });
    let mask_values = mask.map(|m| if m { 1.0 } else { 0.0 });

    if !layout.is_interlaced() {
        debug!("Antialiasing NODATA values");
        antialias(&mut clean, &mask, params.antialias_weight);
        return Ok(Reconstruction {
            surface: BicubicSpline::fit(lats, lons, &clean)?,
            nodata: Some(BicubicSpline::fit(lats, lons, &mask_values)?),
            layout,
        });
    }

    let rows = layout.rows.kept(band.rows());
    let cols = layout.cols.kept(band.cols());
    let sub_lats: Vec<f64> = rows.iter().map(|r| lats[*r]).collect();
    let sub_lons: Vec<f64> = cols.iter().map(|c| lons[*c]).collect();
    Ok(Reconstruction {
        surface: BicubicSpline::fit(&sub_lats, &sub_lons, &clean.select(&rows, &cols))?,
        nodata: Some(BicubicSpline::fit(
            &sub_lats,
            &sub_lons,
            &mask_values.select(&rows, &cols),
        )?),
        layout,
    })
}
