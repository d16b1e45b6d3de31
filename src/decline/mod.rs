//! Production decline curves.
//!
//! Data flows one way: an observed [`TimeSeries`] and a [`DeclineModelType`]
//! go into a [`DeclineResidual`], the Levenberg-Marquardt solver estimates
//! the free parameters, and [`generate_curve`] turns them back into a rate
//! series for display.

pub mod curve;
pub mod fit;
pub mod models;
pub mod residual;
pub mod series;

pub use curve::{curve_for, generate_curve};
pub use fit::{
    fit, DeclineFitter, FitResult, InitialGuess, DEFAULT_CURVATURE_GUESS,
    DEFAULT_DECLINE_RATE_GUESS,
};
pub use models::{
    exponential_rate, harmonic_rate, hyperbolic_rate, DeclineModelType, ModelParameters,
};
pub use residual::DeclineResidual;
pub use series::{
    cumulative_volume, monthly_grid, TimePoint, TimeSeries, DEFAULT_HORIZON_MONTHS,
};
