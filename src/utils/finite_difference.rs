//! Finite difference methods for numerical differentiation.
//!
//! The solver treats every model as opaque, so the Jacobian of the residuals is
//! estimated here from residual evaluations alone.

use ndarray::{Array1, Array2};

use crate::error::{DeclineError, Result};
use crate::lm::config::DiffMethod;
use crate::problem::Problem;

/// Default relative step size for finite differences.
pub const DEFAULT_EPSILON: f64 = 1e-8;

/// Step used for the j-th parameter: relative to its magnitude, absolute near zero.
fn parameter_step(value: f64, eps: f64) -> f64 {
    if value.abs() > eps {
        value.abs() * eps
    } else {
        eps
    }
}

/// Compute the Jacobian matrix of the residuals, J[i,j] = ∂residual[i]/∂param[j].
///
/// # Arguments
///
/// * `problem` - The problem to evaluate
/// * `params` - The parameter values at which to evaluate the Jacobian
/// * `method` - Forward or central differences
/// * `epsilon` - The relative step size (optional, defaults to [`DEFAULT_EPSILON`])
///
/// # Returns
///
/// * `Result<Array2<f64>>` - The Jacobian matrix
pub fn jacobian<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    method: DiffMethod,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    if !(eps.is_finite() && eps > 0.0) {
        return Err(DeclineError::InvalidInput(format!(
            "Finite difference step must be positive, got {}",
            eps
        )));
    }

    let n_params = params.len();
    let n_residuals = problem.residual_count();

    let residuals = match method {
        DiffMethod::Forward => Some(checked_eval(problem, params, n_residuals)?),
        DiffMethod::Central => None,
    };

    let mut jac = Array2::zeros((n_residuals, n_params));

    for j in 0..n_params {
        let h = parameter_step(params[j], eps);

        let mut forward = params.clone();
        forward[j] += h;
        let r_forward = checked_eval(problem, &forward, n_residuals)?;

        match &residuals {
            Some(r) => {
                for i in 0..n_residuals {
                    jac[[i, j]] = (r_forward[i] - r[i]) / h;
                }
            }
            None => {
                let mut backward = params.clone();
                backward[j] -= h;
                let r_backward = checked_eval(problem, &backward, n_residuals)?;
                for i in 0..n_residuals {
                    jac[[i, j]] = (r_forward[i] - r_backward[i]) / (2.0 * h);
                }
            }
        }
    }

    Ok(jac)
}

fn checked_eval<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    n_residuals: usize,
) -> Result<Array1<f64>> {
    let residuals = problem.eval(params)?;
    if residuals.len() != n_residuals {
        return Err(DeclineError::DimensionMismatch(format!(
            "Expected {} residuals, got {}",
            n_residuals,
            residuals.len()
        )));
    }
    Ok(residuals)
}
