//! Curve generation: sampling a decline model over a time grid.

use super::models::{DeclineModelType, ModelParameters};
use super::series::{validate_grid, TimePoint, TimeSeries};
use crate::error::Result;

/// Sample a decline model at every time of `grid`.
///
/// Deterministic: the same arguments always give a bit-identical series.
/// `curvature` is required for the hyperbolic model and ignored otherwise.
///
/// # Errors
///
/// * `DeclineError::InvalidParameter` for non-positive `qi`, `di` or `b`, or a
///   grid that is empty or not strictly increasing
pub fn generate_curve(
    model_type: DeclineModelType,
    initial_rate: f64,
    decline_rate: f64,
    curvature: Option<f64>,
    grid: &[u32],
) -> Result<TimeSeries> {
    let params = ModelParameters::new(model_type, initial_rate, decline_rate, curvature)?;
    curve_for(model_type, &params, grid)
}

/// Sample a decline model with already validated parameters.
pub fn curve_for(
    model_type: DeclineModelType,
    params: &ModelParameters,
    grid: &[u32],
) -> Result<TimeSeries> {
    validate_grid(grid)?;

    let points = grid
        .iter()
        .map(|&time| {
            model_type
                .rate(params, f64::from(time))
                .map(|rate| TimePoint { time, rate })
        })
        .collect::<Result<Vec<_>>>()?;

    TimeSeries::new(points)
}
