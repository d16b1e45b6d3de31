//! Problem definition trait and the curve-fitting adapter.
//!
//! This module defines the `Problem` trait, which represents a nonlinear
//! least squares problem to be solved with the Levenberg-Marquardt algorithm,
//! and `CurveProblem`, which turns a scalar model `f(params, x) -> y` plus
//! observed `(x, y)` pairs into such a problem.

use ndarray::{Array1, Array2};

use crate::error::{DeclineError, Result};
use crate::lm::config::DiffMethod;
use crate::utils::finite_difference;

/// A trait representing a nonlinear least squares problem.
///
/// This trait defines the interface for problems that can be solved using
/// the Levenberg-Marquardt algorithm.
pub trait Problem {
    /// Evaluate the residuals at the given parameters.
    ///
    /// Residuals may come back non-finite for parameters outside the model's
    /// domain; the solver treats such a trial point as a rejected step.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameter values at which to evaluate the residuals
    ///
    /// # Returns
    ///
    /// * A vector of residuals, or an error if the evaluation fails
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Get the number of parameters in the problem.
    fn parameter_count(&self) -> usize;

    /// Get the number of residuals in the problem.
    fn residual_count(&self) -> usize;

    /// Evaluate the Jacobian matrix of the residuals at the given parameters.
    ///
    /// The default implementation uses forward finite differences. The solver
    /// only calls this method when [`Problem::has_custom_jacobian`] is true and
    /// otherwise runs its own configured difference scheme.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        finite_difference::jacobian(self, params, DiffMethod::Forward, None)
    }

    /// Check if this problem provides a custom Jacobian implementation.
    fn has_custom_jacobian(&self) -> bool {
        false
    }

    /// Evaluate the sum of squared residuals at the given parameters.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}

/// Least-squares problem built from an opaque scalar model.
///
/// `model_factory(params)` returns a prediction function `x -> y`; residuals
/// are `ys[i] - f(params, xs[i])`.
pub struct CurveProblem<'a, F> {
    xs: &'a Array1<f64>,
    ys: &'a Array1<f64>,
    model_factory: F,
    n_params: usize,
}

impl<'a, F, M> CurveProblem<'a, F>
where
    F: Fn(&Array1<f64>) -> M,
    M: Fn(f64) -> f64,
{
    /// Create a problem over observed `(xs, ys)` pairs with `n_params` free parameters.
    pub fn new(
        xs: &'a Array1<f64>,
        ys: &'a Array1<f64>,
        model_factory: F,
        n_params: usize,
    ) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(DeclineError::DimensionMismatch(format!(
                "Got {} x values but {} y values",
                xs.len(),
                ys.len()
            )));
        }
        if xs.is_empty() {
            return Err(DeclineError::InvalidInput(
                "Cannot fit a model to an empty data set".to_string(),
            ));
        }
        if n_params == 0 {
            return Err(DeclineError::InvalidInput(
                "A curve fit needs at least one free parameter".to_string(),
            ));
        }

        Ok(Self {
            xs,
            ys,
            model_factory,
            n_params,
        })
    }
}

impl<'a, F, M> Problem for CurveProblem<'a, F>
where
    F: Fn(&Array1<f64>) -> M,
    M: Fn(f64) -> f64,
{
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        if params.len() != self.n_params {
            return Err(DeclineError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                self.n_params,
                params.len()
            )));
        }

        let model = (self.model_factory)(params);
        Ok(self
            .xs
            .iter()
            .zip(self.ys.iter())
            .map(|(&x, &y)| y - model(x))
            .collect())
    }

    fn parameter_count(&self) -> usize {
        self.n_params
    }

    fn residual_count(&self) -> usize {
        self.xs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn line(params: &Array1<f64>) -> impl Fn(f64) -> f64 {
        let (a, b) = (params[0], params[1]);
        move |x| a * x + b
    }

    #[test]
    fn test_curve_problem_residuals() {
        let x = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = array![2.0, 4.0, 6.0, 8.0, 10.0]; // y = 2x
        let problem = CurveProblem::new(&x, &y, line, 2).unwrap();

        // Parameters [a, b] = [2, 0] should give zero residuals
        let residuals = problem.eval(&array![2.0, 0.0]).unwrap();
        assert_eq!(residuals.len(), 5);
        for r in residuals.iter() {
            assert_relative_eq!(*r, 0.0, epsilon = 1e-12);
        }

        // [1, 0] under-predicts by x, so residuals are +x
        let residuals = problem.eval(&array![1.0, 0.0]).unwrap();
        for (i, r) in residuals.iter().enumerate() {
            assert_relative_eq!(*r, (i as f64) + 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_default_jacobian_is_negative_model_gradient() {
        let x = array![1.0, 2.0, 3.0];
        let y = array![0.0, 0.0, 0.0];
        let problem = CurveProblem::new(&x, &y, line, 2).unwrap();

        let jacobian = problem.jacobian(&array![2.0, 1.0]).unwrap();
        assert_eq!(jacobian.shape(), &[3, 2]);
        for i in 0..3 {
            assert_relative_eq!(jacobian[[i, 0]], -x[i], epsilon = 1e-6);
            assert_relative_eq!(jacobian[[i, 1]], -1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_eval_cost() {
        let x = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = array![2.0, 4.0, 6.0, 8.0, 10.0];
        let problem = CurveProblem::new(&x, &y, line, 2).unwrap();

        let cost = problem.eval_cost(&array![1.0, 0.0]).unwrap();
        let expected_cost = (1..=5).map(|i| (i as f64).powi(2)).sum::<f64>();
        assert_relative_eq!(cost, expected_cost, epsilon = 1e-10);
    }

    #[test]
    fn test_shape_checks() {
        let x = array![1.0, 2.0];
        let y = array![1.0];
        assert!(matches!(
            CurveProblem::new(&x, &y, line, 2),
            Err(DeclineError::DimensionMismatch(_))
        ));

        let empty = Array1::<f64>::zeros(0);
        assert!(matches!(
            CurveProblem::new(&empty, &empty, line, 2),
            Err(DeclineError::InvalidInput(_))
        ));

        let y = array![1.0, 2.0];
        let problem = CurveProblem::new(&x, &y, line, 2).unwrap();
        assert!(problem.eval(&array![1.0]).is_err());
    }
}
