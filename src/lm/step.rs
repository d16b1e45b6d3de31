//! Step calculation for the Levenberg-Marquardt algorithm.
//!
//! The step solves the damped normal equations
//! `(JᵗJ + λ·diag(JᵗJ)) δ = -Jᵗr`, where `J` is the Jacobian of the residuals.
//! Small λ gives a Gauss-Newton step, large λ a short scaled gradient step.

use ndarray::{Array1, Array2};

use crate::error::{DeclineError, Result};
use crate::utils::matrix_convert::{
    nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra,
};

/// Result of a Levenberg-Marquardt step calculation.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The calculated step vector
    pub step: Array1<f64>,
}

/// Handles step calculation for the Levenberg-Marquardt algorithm.
pub struct LmStep;

impl LmStep {
    /// Calculates the Levenberg-Marquardt step for damping factor `lambda`.
    ///
    /// # Errors
    ///
    /// * `DeclineError::NumericalInstability` if `JᵗJ` has a zero or non-finite
    ///   diagonal entry, or the damped system is not positive definite
    pub fn calculate_step(
        jacobian: &Array2<f64>,
        residuals: &Array1<f64>,
        lambda: f64,
    ) -> Result<StepResult> {
        if jacobian.nrows() != residuals.len() {
            return Err(DeclineError::DimensionMismatch(format!(
                "Jacobian has {} rows but there are {} residuals",
                jacobian.nrows(),
                residuals.len()
            )));
        }

        let j_t_j = jacobian.t().dot(jacobian);
        let j_t_r = jacobian.t().dot(residuals);

        // A parameter that does not move any residual leaves a zero on the diagonal
        let degenerate = (0..j_t_j.nrows()).find(|&i| {
            let d = j_t_j[[i, i]];
            !(d.is_finite() && d > 0.0)
        });
        if let Some(i) = degenerate {
            return Err(DeclineError::NumericalInstability(format!(
                "JᵗJ is singular: diagonal entry {} is {}",
                i,
                j_t_j[[i, i]]
            )));
        }
        if j_t_r.iter().any(|g| !g.is_finite()) {
            return Err(DeclineError::NumericalInstability(
                "Gradient Jᵗr is not finite".to_string(),
            ));
        }

        let mut augmented = j_t_j.clone();
        for i in 0..augmented.nrows() {
            augmented[[i, i]] += lambda * j_t_j[[i, i]];
        }

        let step = LmStep::solve_cholesky(&augmented, &-&j_t_r)?;
        Ok(StepResult { step })
    }

    /// Solves the symmetric positive definite system `a * x = b`.
    fn solve_cholesky(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
        let a_nalgebra = ndarray_to_nalgebra(a)?;
        let b_nalgebra = ndarray_vec_to_nalgebra(b)?;

        let cholesky = a_nalgebra.cholesky().ok_or_else(|| {
            DeclineError::NumericalInstability(
                "Damped normal equations are not positive definite".to_string(),
            )
        })?;

        let x = nalgebra_vec_to_ndarray(&cholesky.solve(&b_nalgebra));
        if x.iter().any(|v| !v.is_finite()) {
            return Err(DeclineError::NumericalInstability(
                "Step is not finite".to_string(),
            ));
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_undamped_step_is_gauss_newton() {
        // r = y - (a x + b) is linear, so one Gauss-Newton step lands on the solution
        let x = array![0.0, 1.0, 2.0, 3.0];
        let y = array![1.0, 3.0, 5.0, 7.0];
        let (a, b) = (0.5, 0.0);

        let residuals: Array1<f64> = x
            .iter()
            .zip(y.iter())
            .map(|(&x, &y)| y - (a * x + b))
            .collect();
        let mut jacobian = Array2::zeros((4, 2));
        for i in 0..4 {
            jacobian[[i, 0]] = -x[i];
            jacobian[[i, 1]] = -1.0;
        }

        let result = LmStep::calculate_step(&jacobian, &residuals, 0.0).unwrap();

        assert_relative_eq!(a + result.step[0], 2.0, epsilon = 1e-10);
        assert_relative_eq!(b + result.step[1], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_damping_shortens_the_step() {
        let jacobian = array![[-1.0], [-2.0], [-3.0]];
        let residuals = array![1.0, 2.0, 3.0];

        let gn = LmStep::calculate_step(&jacobian, &residuals, 0.0).unwrap();
        let damped = LmStep::calculate_step(&jacobian, &residuals, 9.0).unwrap();

        assert_relative_eq!(gn.step[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(damped.step[0], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_column_is_singular() {
        let jacobian = array![[1.0, 0.0], [2.0, 0.0]];
        let residuals = array![1.0, 1.0];

        let result = LmStep::calculate_step(&jacobian, &residuals, 1e-3);
        assert!(matches!(result, Err(DeclineError::NumericalInstability(_))));
    }
}
