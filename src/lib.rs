//! # decline-fit
//!
//! `decline-fit` models hydrocarbon production decline and fits decline
//! parameters to observed monthly rates.
//!
//! The library provides:
//! - The Arps family of decline-rate functions (exponential, harmonic, hyperbolic)
//! - Curve generation over a discrete time grid
//! - A self-contained Levenberg-Marquardt solver with finite-difference Jacobians
//! - A fit orchestrator that holds `qi` fixed and estimates `di` (and `b`)
//!
//! ## Basic Usage
//!
//! ```
//! use decline_fit::{fit, generate_curve, monthly_grid, DeclineModelType, TimeSeries};
//!
//! let observed = TimeSeries::from_rates(&[
//!     800.0, 720.0, 645.0, 585.0, 540.0, 500.0, 465.0, 435.0, 410.0, 385.0, 365.0, 350.0, 335.0,
//! ])?;
//! let result = fit(DeclineModelType::Harmonic, 800.0, &observed, None)?;
//! assert!(result.converged);
//!
//! let curve = generate_curve(
//!     DeclineModelType::Harmonic,
//!     800.0,
//!     result.decline_rate,
//!     result.curvature,
//!     &monthly_grid(12),
//! )?;
//! assert_eq!(curve.len(), 13);
//! # Ok::<(), decline_fit::DeclineError>(())
//! ```

// Public modules
pub mod decline;
pub mod error;
pub mod lm;
pub mod problem;

mod utils;

// Re-exports for convenience
pub use decline::{
    cumulative_volume, fit, generate_curve, monthly_grid, DeclineFitter, DeclineModelType,
    FitResult, InitialGuess, ModelParameters, TimePoint, TimeSeries,
};
pub use error::{DeclineError, Result};
pub use lm::{LevenbergMarquardt, LmConfig, LmResult};
pub use problem::Problem;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
