//! Fit orchestration: decline model + solver + domain validation.
//!
//! [`DeclineFitter`] binds a model type and a fixed `qi` to the
//! Levenberg-Marquardt solver, checks that the estimate stays inside the
//! model domain and optionally regenerates the fitted curve over the observed
//! grid. This is the one place where solver breakdowns become errors.

use ndarray::{array, Array1};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use super::curve::curve_for;
use super::models::{ensure_positive, DeclineModelType, ModelParameters};
use super::residual::DeclineResidual;
use super::series::TimeSeries;
use crate::error::{DeclineError, Result};
use crate::lm::{LevenbergMarquardt, LmConfig, LmResult};

/// Default starting decline rate for a fit.
pub const DEFAULT_DECLINE_RATE_GUESS: f64 = 0.6;

/// Default starting curvature for a hyperbolic fit.
pub const DEFAULT_CURVATURE_GUESS: f64 = 1.1;

/// Starting point of a fit. `curvature` is only used by the hyperbolic model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialGuess {
    pub decline_rate: f64,
    pub curvature: f64,
}

impl Default for InitialGuess {
    fn default() -> Self {
        Self {
            decline_rate: DEFAULT_DECLINE_RATE_GUESS,
            curvature: DEFAULT_CURVATURE_GUESS,
        }
    }
}

impl InitialGuess {
    fn to_params(self, model_type: DeclineModelType) -> Result<Array1<f64>> {
        ensure_positive("initial decline rate guess", self.decline_rate)?;
        if model_type.uses_curvature() {
            ensure_positive("initial curvature guess", self.curvature)?;
            Ok(array![self.decline_rate, self.curvature])
        } else {
            Ok(array![self.decline_rate])
        }
    }
}

/// Estimated decline parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Fitted `di`
    pub decline_rate: f64,
    /// Fitted `b`; `None` unless the model is hyperbolic
    pub curvature: Option<f64>,
    /// Whether the solver met a convergence criterion
    pub converged: bool,
    /// Accepted solver iterations
    pub iterations: usize,
    /// Sum of squared residuals at the estimate
    pub cost: f64,
}

impl FitResult {
    fn from_solution(model_type: DeclineModelType, solution: &LmResult) -> Self {
        Self {
            decline_rate: solution.params[0],
            curvature: model_type.uses_curvature().then(|| solution.params[1]),
            converged: solution.success,
            iterations: solution.iterations,
            cost: solution.cost,
        }
    }

    /// The fitted curve parameters for an initial rate `qi`.
    pub fn model_parameters(
        &self,
        model_type: DeclineModelType,
        initial_rate: f64,
    ) -> Result<ModelParameters> {
        ModelParameters::new(model_type, initial_rate, self.decline_rate, self.curvature)
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "di = {:.6}", self.decline_rate)?;
        if let Some(b) = self.curvature {
            write!(f, ", b = {:.6}", b)?;
        }
        write!(
            f,
            " ({}, {} iterations, SSR {:.4e})",
            if self.converged { "converged" } else { "not converged" },
            self.iterations,
            self.cost
        )
    }
}

/// Fits decline models to observed rate series.
#[derive(Debug, Clone, Default)]
pub struct DeclineFitter {
    initial_guess: InitialGuess,
    solver: LevenbergMarquardt,
}

impl DeclineFitter {
    /// Create a fitter with the default initial guess and solver settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the starting point of the fit.
    pub fn with_initial_guess(mut self, initial_guess: InitialGuess) -> Self {
        self.initial_guess = initial_guess;
        self
    }

    /// Replace the solver configuration.
    pub fn with_solver_config(mut self, config: LmConfig) -> Self {
        self.solver = LevenbergMarquardt::with_config(config);
        self
    }

    /// The configured starting point.
    pub fn initial_guess(&self) -> InitialGuess {
        self.initial_guess
    }

    /// Fit `model_type` with `qi` held fixed to an observed series.
    ///
    /// Running out of iterations is not an error: the estimate comes back
    /// with `converged == false`.
    ///
    /// # Errors
    ///
    /// * `DeclineError::InvalidParameter` for a non-positive `qi` or guess
    /// * `DeclineError::InvalidInput` if the series is shorter than the
    ///   number of free parameters
    /// * `DeclineError::FitFailed` if the solver broke down numerically or
    ///   returned parameters outside the model domain
    pub fn fit(
        &self,
        model_type: DeclineModelType,
        initial_rate: f64,
        observed: &TimeSeries,
    ) -> Result<FitResult> {
        let residual = DeclineResidual::new(model_type, initial_rate, observed)?;
        let initial_params = self.initial_guess.to_params(model_type)?;

        let solution = self.solver.minimize(&residual, initial_params)?;
        let estimate = FitResult::from_solution(model_type, &solution);

        if solution.status.is_numerical_failure() {
            warn!(
                model = %model_type,
                status = solution.status.description(),
                "decline fit broke down"
            );
            return Err(fit_failed(solution.message, estimate));
        }

        if let Err(e) = estimate.model_parameters(model_type, initial_rate) {
            warn!(model = %model_type, error = %e, "decline fit left the model domain");
            return Err(fit_failed(e.to_string(), estimate));
        }

        if estimate.converged {
            info!(
                model = %model_type,
                iterations = estimate.iterations,
                cost = estimate.cost,
                "decline fit converged"
            );
        } else {
            warn!(
                model = %model_type,
                iterations = estimate.iterations,
                "decline fit did not converge"
            );
        }

        Ok(estimate)
    }

    /// Fit and regenerate the fitted curve over the observed time grid.
    pub fn fit_with_curve(
        &self,
        model_type: DeclineModelType,
        initial_rate: f64,
        observed: &TimeSeries,
    ) -> Result<(FitResult, TimeSeries)> {
        let result = self.fit(model_type, initial_rate, observed)?;
        let params = result.model_parameters(model_type, initial_rate)?;
        let curve = curve_for(model_type, &params, &observed.grid())?;
        Ok((result, curve))
    }
}

fn fit_failed(reason: String, estimate: FitResult) -> DeclineError {
    DeclineError::FitFailed {
        reason,
        estimate: Box::new(FitResult {
            converged: false,
            ..estimate
        }),
    }
}

/// Fit with default solver settings; `None` uses [`InitialGuess::default`].
pub fn fit(
    model_type: DeclineModelType,
    initial_rate: f64,
    observed: &TimeSeries,
    initial_guess: Option<InitialGuess>,
) -> Result<FitResult> {
    DeclineFitter::new()
        .with_initial_guess(initial_guess.unwrap_or_default())
        .fit(model_type, initial_rate, observed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decline::curve::generate_curve;
    use crate::decline::series::monthly_grid;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_guess() {
        let guess = InitialGuess::default();
        assert_eq!(guess.decline_rate, 0.6);
        assert_eq!(guess.curvature, 1.1);

        let partial: InitialGuess = serde_json::from_str(r#"{ "decline_rate": 0.2 }"#).unwrap();
        assert_eq!(partial.decline_rate, 0.2);
        assert_eq!(partial.curvature, DEFAULT_CURVATURE_GUESS);
    }

    #[test]
    fn test_exponential_fit_recovers_decline() {
        let observed =
            generate_curve(DeclineModelType::Exponential, 1000.0, 0.1, None, &monthly_grid(12))
                .unwrap();

        let result = fit(DeclineModelType::Exponential, 1000.0, &observed, None).unwrap();

        assert!(result.converged, "{}", result);
        assert_relative_eq!(result.decline_rate, 0.1, max_relative = 1e-6);
        assert_eq!(result.curvature, None);
    }

    #[test]
    fn test_fit_with_curve_uses_observed_grid() {
        let observed =
            generate_curve(DeclineModelType::Harmonic, 500.0, 0.2, None, &[0, 1, 3, 6, 12])
                .unwrap();

        let (result, curve) = DeclineFitter::new()
            .fit_with_curve(DeclineModelType::Harmonic, 500.0, &observed)
            .unwrap();

        assert!(result.converged);
        assert_eq!(curve.grid(), observed.grid());
        for (fitted, original) in curve.points().iter().zip(observed.points()) {
            assert_relative_eq!(fitted.rate, original.rate, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_invalid_guess_is_rejected() {
        let observed = TimeSeries::from_rates(&[100.0, 90.0, 80.0]).unwrap();
        let fitter = DeclineFitter::new().with_initial_guess(InitialGuess {
            decline_rate: 0.3,
            curvature: -1.0,
        });

        assert!(matches!(
            fitter.fit(DeclineModelType::Hyperbolic, 100.0, &observed),
            Err(DeclineError::InvalidParameter(_))
        ));
        // The curvature guess is irrelevant to a harmonic fit
        assert!(fitter.fit(DeclineModelType::Harmonic, 100.0, &observed).is_ok());
    }

    #[test]
    fn test_iteration_cap_reports_not_converged() {
        let observed =
            generate_curve(DeclineModelType::Exponential, 1000.0, 0.1, None, &monthly_grid(12))
                .unwrap();
        let config = LmConfig {
            max_iterations: 1,
            ..LmConfig::default()
        };

        let result = DeclineFitter::new()
            .with_solver_config(config)
            .fit(DeclineModelType::Exponential, 1000.0, &observed)
            .unwrap();

        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn test_out_of_domain_estimate_is_fit_failed() {
        // Rates that grow with time pull di below zero
        let observed = TimeSeries::from_rates(&[100.0, 110.0, 121.0, 133.1, 146.41]).unwrap();

        match fit(DeclineModelType::Exponential, 100.0, &observed, None) {
            Err(DeclineError::FitFailed { estimate, .. }) => {
                assert!(!estimate.converged);
                assert!(estimate.decline_rate <= 0.0);
            }
            other => panic!("Expected FitFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_display() {
        let result = FitResult {
            decline_rate: 0.25,
            curvature: Some(0.9),
            converged: true,
            iterations: 6,
            cost: 1.5,
        };
        let text = result.to_string();
        assert!(text.contains("di = 0.250000"));
        assert!(text.contains("b = 0.900000"));
        assert!(text.contains("converged"));
    }
}
