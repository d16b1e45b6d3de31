//! Levenberg-Marquardt algorithm implementation.
//!
//! A damped Gauss-Newton solver for nonlinear least squares. The Jacobian is
//! estimated by finite differences unless the problem supplies one, the
//! damped normal equations are solved by Cholesky factorisation, and
//! ill-conditioning ends a run with a non-converged status instead of an error.

pub mod algorithm;
pub mod config;
pub mod convergence;
pub mod step;

// Re-export key types
pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::{DiffMethod, LmConfig};
pub use convergence::{ConvergenceCriteria, ConvergenceStatus};
pub use step::{LmStep, StepResult};
