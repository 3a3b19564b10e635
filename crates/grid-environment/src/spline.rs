//! Interpolating cubic splines over rectilinear grids.
//!
//! [`BicubicSpline`] is the tensor product of natural cubic splines along
//! both axes. It reproduces the input values exactly at the grid nodes and
//! has continuous first and second derivatives in between.

use crate::error::{GridError, Result};
use crate::grid::Grid;

/// Second derivatives of the natural cubic spline through `(xs, ys)`.
///
/// `xs` must be strictly increasing. With two knots the spline is linear and
/// all second derivatives are zero.
pub fn natural_second_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut y2 = vec![0.0; n];
    if n < 3 {
        return y2;
    }
    let mut u = vec![0.0; n - 1];

    // Forward sweep of the tridiagonal system
    for i in 1..n - 1 {
        let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
        let p = sig * y2[i - 1] + 2.0;
        y2[i] = (sig - 1.0) / p;
        let slope = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
            - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
        u[i] = (6.0 * slope / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
    }

    // Back substitution
    for k in (0..n - 2).rev() {
        y2[k + 1] = y2[k + 1] * y2[k + 2] + u[k + 1];
    }

    y2
}

/// Basis weights of one cubic spline interval.
#[derive(Debug, Clone, Copy)]
struct Basis {
    /// Index of the left knot.
    index: usize,
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

impl Basis {
    /// Locate `x` on `knots` (clamped to the knot range) and compute weights.
    fn locate(knots: &[f64], x: f64) -> Self {
        let n = knots.len();
        let x = x.clamp(knots[0], knots[n - 1]);
        let index = knots
            .partition_point(|k| *k <= x)
            .saturating_sub(1)
            .min(n - 2);
        let h = knots[index + 1] - knots[index];
        let a = (knots[index + 1] - x) / h;
        let b = 1.0 - a;
        let h2 = h * h / 6.0;
        Self {
            index,
            a,
            b,
            c: (a * a * a - a) * h2,
            d: (b * b * b - b) * h2,
        }
    }

    /// `(knot index, value weight, curvature weight)` for both interval ends.
    fn terms(&self) -> [(usize, f64, f64); 2] {
        [(self.index, self.a, self.c), (self.index + 1, self.b, self.d)]
    }
}

/// Interpolating bicubic spline over a rectilinear grid.
///
/// The first axis (`xs`) runs along grid rows, the second (`ys`) along grid
/// columns, so `values.at(i, j)` is the sample at `(xs[i], ys[j])`.
#[derive(Debug, Clone)]
pub struct BicubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    z: Grid<f64>,
    /// d²z/dx²
    zxx: Grid<f64>,
    /// d²z/dy²
    zyy: Grid<f64>,
    /// d⁴z/dx²dy²
    zxxyy: Grid<f64>,
}

impl BicubicSpline {
    /// Fit a spline through `values` sampled at `xs` × `ys`.
    ///
    /// Both axes need at least two strictly increasing knots.
    pub fn fit(xs: &[f64], ys: &[f64], values: &Grid<f64>) -> Result<Self> {
        check_axis("first", xs)?;
        check_axis("second", ys)?;
        if values.shape() != (xs.len(), ys.len()) {
            return Err(GridError::data(format!(
                "spline values have shape {:?}, axes need ({}, {})",
                values.shape(),
                xs.len(),
                ys.len()
            )));
        }

        let zxx = along_first_axis(xs, values);
        let zyy = along_second_axis(ys, values);
        let zxxyy = along_first_axis(xs, &zyy);

        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            z: values.clone(),
            zxx,
            zyy,
            zxxyy,
        })
    }

    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    /// The values the spline was fitted on.
    pub fn values(&self) -> &Grid<f64> {
        &self.z
    }

    /// Evaluate the spline at `(x, y)`.
    ///
    /// Points outside the knot range are clamped onto the boundary.
    pub fn ev(&self, x: f64, y: f64) -> f64 {
        let bx = Basis::locate(&self.xs, x);
        let by = Basis::locate(&self.ys, y);

        let mut sum = 0.0;
        for (i, wa, wc) in bx.terms() {
            for (j, va, vc) in by.terms() {
                sum += wa * va * self.z.at(i, j)
                    + wa * vc * self.zyy.at(i, j)
                    + wc * va * self.zxx.at(i, j)
                    + wc * vc * self.zxxyy.at(i, j);
            }
        }
        sum
    }

    /// Evaluate at many `(x, y)` points.
    pub fn ev_many(&self, points: impl IntoIterator<Item = (f64, f64)>) -> Vec<f64> {
        points.into_iter().map(|(x, y)| self.ev(x, y)).collect()
    }
}

fn check_axis(name: &str, knots: &[f64]) -> Result<()> {
    if knots.len() < 2 {
        return Err(GridError::data(format!(
            "{} spline axis needs at least 2 knots, got {}",
            name,
            knots.len()
        )));
    }
    if knots.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(GridError::data(format!(
            "{} spline axis is not strictly increasing",
            name
        )));
    }
    Ok(())
}

/// Natural-spline second derivatives down every column.
fn along_first_axis(xs: &[f64], values: &Grid<f64>) -> Grid<f64> {
    let mut out = Grid::filled(values.rows(), values.cols(), 0.0);
    for col in 0..values.cols() {
        let d2 = natural_second_derivatives(xs, &values.column(col));
        for (row, v) in d2.into_iter().enumerate() {
            out.set(row, col, v);
        }
    }
    out
}

/// Natural-spline second derivatives along every row.
fn along_second_axis(ys: &[f64], values: &Grid<f64>) -> Grid<f64> {
    let mut out = Grid::filled(values.rows(), values.cols(), 0.0);
    for row in 0..values.rows() {
        let d2 = natural_second_derivatives(ys, values.row(row));
        for (col, v) in d2.into_iter().enumerate() {
            out.set(row, col, v);
        }
    }
    out
}
