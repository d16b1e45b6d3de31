//! Residual function builder for decline fits.
//!
//! Binds a model type, a fixed initial rate and an observed series into a
//! least-squares [`Problem`] over the free parameters: `[di]` for the
//! exponential and harmonic models, `[di, b]` for the hyperbolic one.

use ndarray::Array1;

use super::models::{ensure_positive, unchecked_rate, DeclineModelType};
use super::series::TimeSeries;
use crate::error::{DeclineError, Result};
use crate::problem::Problem;

/// Residuals `observed - predicted` of a decline model with `qi` held fixed.
#[derive(Debug, Clone)]
pub struct DeclineResidual {
    model_type: DeclineModelType,
    initial_rate: f64,
    times: Array1<f64>,
    rates: Array1<f64>,
}

impl DeclineResidual {
    /// Build the residual function for `observed`.
    ///
    /// # Errors
    ///
    /// * `DeclineError::InvalidParameter` if `qi` is not finite and positive
    /// * `DeclineError::InvalidInput` if the series has fewer samples than the
    ///   model has free parameters
    pub fn new(
        model_type: DeclineModelType,
        initial_rate: f64,
        observed: &TimeSeries,
    ) -> Result<Self> {
        ensure_positive("initial rate qi", initial_rate)?;
        if observed.len() < model_type.free_parameter_count() {
            return Err(DeclineError::InvalidInput(format!(
                "{} fit needs at least {} samples, got {}",
                model_type,
                model_type.free_parameter_count(),
                observed.len()
            )));
        }

        Ok(Self {
            model_type,
            initial_rate,
            times: observed.times(),
            rates: observed.rates(),
        })
    }

    /// The decline model being fitted.
    pub fn model_type(&self) -> DeclineModelType {
        self.model_type
    }

    /// The fixed initial rate `qi`.
    pub fn initial_rate(&self) -> f64 {
        self.initial_rate
    }

    /// The prediction function `t -> rate` for a free-parameter vector.
    ///
    /// No domain checks are made, so points outside the model domain produce
    /// non-finite rates rather than errors.
    ///
    /// # Errors
    ///
    /// * `DeclineError::DimensionMismatch` if `params` does not hold exactly
    ///   the model's free parameters
    pub fn prediction(&self, params: &Array1<f64>) -> Result<impl Fn(f64) -> f64> {
        if params.len() != self.parameter_count() {
            return Err(DeclineError::DimensionMismatch(format!(
                "{} model has {} free parameters, got {}",
                self.model_type,
                self.parameter_count(),
                params.len()
            )));
        }

        let model_type = self.model_type;
        let qi = self.initial_rate;
        let di = params[0];
        let b = if model_type.uses_curvature() {
            params[1]
        } else {
            f64::NAN
        };
        Ok(move |t: f64| unchecked_rate(model_type, qi, di, b, t))
    }
}

impl Problem for DeclineResidual {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        let predict = self.prediction(params)?;
        Ok(self
            .times
            .iter()
            .zip(self.rates.iter())
            .map(|(&t, &observed)| observed - predict(t))
            .collect())
    }

    fn parameter_count(&self) -> usize {
        self.model_type.free_parameter_count()
    }

    fn residual_count(&self) -> usize {
        self.times.len()
    }
}
