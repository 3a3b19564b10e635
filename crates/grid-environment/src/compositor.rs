//! Linear time blending of spatially interpolated vector components.

use chrono::{DateTime, Utc};

use crate::error::{GridError, Result};
use crate::layer::{Bracket, VariableSeries};
use crate::types::Position;

/// Blended u/v components at every query position.
#[derive(Debug, Clone, PartialEq)]
pub struct Blend {
    pub u: Vec<f64>,
    pub v: Vec<f64>,
    pub bracket: Bracket,
}

/// Blend one series between the bracketing layers.
///
/// Evaluates `fraction * later + (1 - fraction) * earlier` at every position.
pub fn time_interpolate(
    series: &VariableSeries,
    bracket: &Bracket,
    positions: &[Position],
) -> Vec<f64> {
    let layers = series.layers();
    let earlier = &layers[bracket.earlier()];
    let later = &layers[bracket.later];
    let f = bracket.fraction;
    positions
        .iter()
        .map(|p| f * later.evaluate(p.lat, p.lon) + (1.0 - f) * earlier.evaluate(p.lat, p.lon))
        .collect()
}

/// Blend the u and v series of one vector quantity at `time`.
///
/// Both series must hold identical timestamps; the bracket is located on
/// the u series.
pub fn blend_components(
    u: &VariableSeries,
    v: &VariableSeries,
    time: DateTime<Utc>,
    positions: &[Position],
) -> Result<Blend> {
    let bracket = u.bracket(time)?;
    check_aligned(u, v, &bracket)?;
    Ok(Blend {
        u: time_interpolate(u, &bracket, positions),
        v: time_interpolate(v, &bracket, positions),
        bracket,
    })
}

fn check_aligned(u: &VariableSeries, v: &VariableSeries, bracket: &Bracket) -> Result<()> {
    let aligned = [bracket.earlier(), bracket.later].iter().all(|i| {
        match (u.get(*i), v.get(*i)) {
            (Some(a), Some(b)) => a.time() == b.time(),
            _ => false,
        }
    });
    if aligned {
        Ok(())
    } else {
        Err(GridError::span(format!(
            "{} and {} layers do not share timestamps",
            u.variable(),
            v.variable()
        )))
    }
}
