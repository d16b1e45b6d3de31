//! Configuration options for the Levenberg-Marquardt algorithm.
//!
//! This module defines the tolerances, damping schedule and differentiation
//! settings of the solver. Configurations are plain serde structures so they
//! can be stored next to other application settings and loaded from JSON.

use serde::{Deserialize, Serialize};

use crate::error::{DeclineError, Result};
use crate::utils::finite_difference::DEFAULT_EPSILON;

/// Finite difference scheme used to estimate the Jacobian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffMethod {
    /// One extra residual evaluation per parameter
    #[default]
    Forward,

    /// Two extra residual evaluations per parameter, second-order accurate
    Central,
}

/// Configuration options for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Maximum number of iterations. Default: 100
    pub max_iterations: usize,

    /// Tolerance for the relative decrease of the cost between accepted steps. Default: 1e-10
    pub ftol: f64,

    /// Tolerance for the relative step norm. Default: 1e-10
    pub xtol: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Factor by which to increase lambda after a rejected step. Default: 10.0
    pub lambda_up_factor: f64,

    /// Factor by which to decrease lambda after an accepted step. Default: 0.1
    pub lambda_down_factor: f64,

    /// Minimum value for lambda. Default: 1e-12
    pub min_lambda: f64,

    /// Ceiling for lambda; growing past it ends the fit unconverged. Default: 1e10
    pub max_lambda: f64,

    /// Rejected trial steps allowed within one iteration. Default: 10
    pub max_step_retries: usize,

    /// Finite difference scheme for the Jacobian. Default: Forward
    pub diff_method: DiffMethod,

    /// Relative finite difference step. Default: 1e-8
    pub diff_step: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            ftol: 1e-10,
            xtol: 1e-10,
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e10,
            max_step_retries: 10,
            diff_method: DiffMethod::default(),
            diff_step: DEFAULT_EPSILON,
        }
    }
}

impl LmConfig {
    /// Load a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LmConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that tolerances, damping bounds and caps are usable.
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(DeclineError::InvalidInput(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )))
            }
        };

        positive("ftol", self.ftol)?;
        positive("xtol", self.xtol)?;
        positive("initial_lambda", self.initial_lambda)?;
        positive("min_lambda", self.min_lambda)?;
        positive("max_lambda", self.max_lambda)?;
        positive("diff_step", self.diff_step)?;

        if self.max_iterations == 0 || self.max_step_retries == 0 {
            return Err(DeclineError::InvalidInput(
                "max_iterations and max_step_retries must be at least 1".to_string(),
            ));
        }
        if !(self.lambda_up_factor > 1.0) {
            return Err(DeclineError::InvalidInput(format!(
                "lambda_up_factor must exceed 1, got {}",
                self.lambda_up_factor
            )));
        }
        if !(self.lambda_down_factor > 0.0 && self.lambda_down_factor < 1.0) {
            return Err(DeclineError::InvalidInput(format!(
                "lambda_down_factor must lie in (0, 1), got {}",
                self.lambda_down_factor
            )));
        }
        if self.min_lambda > self.initial_lambda || self.initial_lambda > self.max_lambda {
            return Err(DeclineError::InvalidInput(format!(
                "Damping bounds must satisfy min_lambda <= initial_lambda <= max_lambda, \
                 got {} / {} / {}",
                self.min_lambda, self.initial_lambda, self.max_lambda
            )));
        }

        Ok(())
    }
}
