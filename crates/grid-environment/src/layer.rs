//! Time-indexed layer storage.
//!
//! Every tracked variable owns a [`VariableSeries`]: layers sorted by
//! strictly increasing timestamp. Re-ingesting a timestamp (a refreshed
//! forecast run) replaces the existing layer in place.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::error::{GridError, Result};
use crate::grid::Grid;
use crate::spline::BicubicSpline;
use crate::types::{TimeSpan, Variable};

/// One spline-fitted band at a single valid time.
#[derive(Debug, Clone)]
pub struct Layer {
    time: DateTime<Utc>,
    surface: BicubicSpline,
    nodata: Option<BicubicSpline>,
    raw: Option<Grid<f64>>,
}

impl Layer {
    pub fn new(
        time: DateTime<Utc>,
        surface: BicubicSpline,
        nodata: Option<BicubicSpline>,
        raw: Option<Grid<f64>>,
    ) -> Self {
        Self {
            time,
            surface,
            nodata,
            raw,
        }
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn surface(&self) -> &BicubicSpline {
        &self.surface
    }

    pub fn nodata(&self) -> Option<&BicubicSpline> {
        self.nodata.as_ref()
    }

    /// The prepared band, unless memory saving discarded it.
    pub fn raw(&self) -> Option<&Grid<f64>> {
        self.raw.as_ref()
    }

    /// Spatially interpolated value at `(lat, lon)`.
    pub fn evaluate(&self, lat: f64, lon: f64) -> f64 {
        self.surface.ev(lat, lon)
    }

    /// Interpolated missing-data fraction, if the band had missing cells.
    pub fn nodata_fraction(&self, lat: f64, lon: f64) -> Option<f64> {
        self.nodata.as_ref().map(|n| n.ev(lat, lon))
    }
}

/// Outcome of [`VariableSeries::insert_or_replace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Inserted(usize),
    Replaced(usize),
}

impl Insertion {
    pub fn index(&self) -> usize {
        match self {
            Self::Inserted(i) | Self::Replaced(i) => *i,
        }
    }

    pub fn replaced(&self) -> bool {
        matches!(self, Self::Replaced(_))
    }
}

/// The pair of layers enclosing a query time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    /// Index of the later layer; the earlier one is `later - 1`.
    pub later: usize,
    /// Position between the two layers in `[0, 1)`.
    pub fraction: f64,
}

impl Bracket {
    pub fn earlier(&self) -> usize {
        self.later - 1
    }
}

/// Time-ascending layers of one physical variable.
#[derive(Debug, Clone)]
pub struct VariableSeries {
    variable: Variable,
    layers: Vec<Layer>,
}

impl VariableSeries {
    pub fn new(variable: Variable) -> Self {
        Self {
            variable,
            layers: Vec::new(),
        }
    }

    pub fn variable(&self) -> Variable {
        self.variable
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn get(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn times(&self) -> Vec<DateTime<Utc>> {
        self.layers.iter().map(|l| l.time).collect()
    }

    /// Insert a layer at its sorted position, replacing a layer with the
    /// same timestamp.
    pub fn insert_or_replace(&mut self, layer: Layer) -> Insertion {
        match self.layers.binary_search_by(|l| l.time.cmp(&layer.time)) {
            Ok(index) => {
                info!(variable = %self.variable, index, time = %layer.time, "Replacing existing layer");
                self.layers[index] = layer;
                Insertion::Replaced(index)
            }
            Err(index) => {
                info!(variable = %self.variable, index, time = %layer.time, "Inserting layer");
                self.layers.insert(index, layer);
                Insertion::Inserted(index)
            }
        }
    }

    /// Drop leading layers strictly older than `threshold`.
    ///
    /// Returns the number of layers removed.
    pub fn prune_before(&mut self, threshold: DateTime<Utc>) -> usize {
        let count = self.layers.partition_point(|l| l.time < threshold);
        for layer in &self.layers[..count] {
            info!(variable = %self.variable, time = %layer.time, "Pruning layer");
        }
        self.layers.drain(..count);
        count
    }

    /// Drop layers older than `older_than` before now.
    pub fn prune(&mut self, older_than: Duration) -> usize {
        self.prune_before(Utc::now() - older_than)
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    /// First timestamp and duration to the last, or `(now, 0)` when empty.
    pub fn span(&self) -> TimeSpan {
        match (self.layers.first(), self.layers.last()) {
            (Some(first), Some(last)) => TimeSpan::new(first.time, last.time - first.time),
            _ => TimeSpan::empty_now(),
        }
    }

    /// Locate the layers enclosing `time`.
    ///
    /// The query must satisfy `first <= time < last`; no extrapolation is
    /// attempted outside the covered window.
    pub fn bracket(&self, time: DateTime<Utc>) -> Result<Bracket> {
        let (first, last) = match (self.layers.first(), self.layers.last()) {
            (Some(first), Some(last)) => (first.time, last.time),
            _ => {
                return Err(GridError::span(format!(
                    "no {} data loaded",
                    self.variable
                )))
            }
        };

        let later = self.layers.partition_point(|l| l.time <= time);
        if later == 0 || later == self.layers.len() {
            return Err(GridError::span(format!(
                "time {} out of range {} - {}",
                time, first, last
            )));
        }

        let t0 = self.layers[later - 1].time;
        let t1 = self.layers[later].time;
        let fraction = seconds(time - t0) / seconds(t1 - t0);
        Ok(Bracket { later, fraction })
    }
}

fn seconds(d: Duration) -> f64 {
    match d.num_microseconds() {
        Some(us) => us as f64 * 1e-6,
        None => d.num_milliseconds() as f64 * 1e-3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
    }

    fn constant_layer(time: DateTime<Utc>, value: f64) -> Layer {
        let values = Grid::filled(2, 2, value);
        let surface = BicubicSpline::fit(&[0.0, 1.0], &[0.0, 1.0], &values).unwrap();
        Layer::new(time, surface, None, Some(values))
    }

    fn series(hours: &[i64]) -> VariableSeries {
        let mut s = VariableSeries::new(Variable::WindU);
        for h in hours {
            s.insert_or_replace(constant_layer(t(*h), *h as f64));
        }
        s
    }

    #[test]
    fn test_insert_keeps_order() {
        let s = series(&[6, 0, 3, 12]);
        assert_eq!(s.times(), vec![t(0), t(3), t(6), t(12)]);
    }

    #[test]
    fn test_equal_timestamp_replaces() {
        let mut s = series(&[0, 3, 6]);
        let outcome = s.insert_or_replace(constant_layer(t(3), 42.0));
        assert_eq!(outcome, Insertion::Replaced(1));
        assert!(outcome.replaced());
        assert_eq!(s.len(), 3);
        assert_eq!(s.times(), vec![t(0), t(3), t(6)]);
        assert_eq!(s.get(1).unwrap().evaluate(0.5, 0.5), 42.0);
    }

    #[test]
    fn test_prune_is_prefix_trim_and_idempotent() {
        let mut s = series(&[0, 3, 6, 9]);
        assert_eq!(s.prune_before(t(6)), 2);
        assert_eq!(s.times(), vec![t(6), t(9)]);
        assert_eq!(s.prune_before(t(6)), 0);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_prune_relative_to_now() {
        let now = Utc::now();
        let mut s = VariableSeries::new(Variable::CurrentU);
        s.insert_or_replace(constant_layer(now - Duration::hours(30), 1.0));
        s.insert_or_replace(constant_layer(now + Duration::hours(1), 1.0));
        assert_eq!(s.prune(Duration::hours(24)), 1);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_span() {
        let s = series(&[0, 3, 6]);
        let span = s.span();
        assert_eq!(span.start, t(0));
        assert_eq!(span.duration, Duration::hours(6));

        let empty = VariableSeries::new(Variable::WindV);
        assert!(empty.span().is_empty());
    }

    #[test]
    fn test_bracket_fraction() {
        let s = series(&[0, 4, 8]);
        let b = s.bracket(t(1)).unwrap();
        assert_eq!(b.later, 1);
        assert_eq!(b.earlier(), 0);
        assert!((b.fraction - 0.25).abs() < 1e-12);

        // Exactly on an intermediate layer
        let b = s.bracket(t(4)).unwrap();
        assert_eq!(b.later, 2);
        assert_eq!(b.fraction, 0.0);
    }

    #[test]
    fn test_bracket_out_of_span() {
        let s = series(&[0, 4, 8]);
        assert!(s.bracket(t(-1)).unwrap_err().is_span_error());
        assert!(s.bracket(t(8)).unwrap_err().is_span_error());
        assert!(s.bracket(t(9)).unwrap_err().is_span_error());
        assert!(s.bracket(t(0)).is_ok());

        let empty = VariableSeries::new(Variable::WindU);
        assert!(empty.bracket(t(0)).unwrap_err().is_span_error());
    }
}
