//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! This module contains the solver loop: Jacobian estimation, damped
//! Gauss-Newton steps with a bounded number of retries per iteration, and the
//! termination logic. Ordinary ill-conditioning never surfaces as an error;
//! it ends the run with a non-converged [`ConvergenceStatus`].

use ndarray::{Array1, Array2};
use std::fmt;
use tracing::{debug, trace};

use crate::error::{DeclineError, Result};
use crate::problem::{CurveProblem, Problem};
use crate::utils::finite_difference;

use super::config::{DiffMethod, LmConfig};
use super::convergence::{ConvergenceCriteria, ConvergenceStatus};
use super::step::LmStep;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values (the best point reached)
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of accepted iterations
    pub iterations: usize,

    /// Number of residual evaluations
    pub func_evals: usize,

    /// Why the solver stopped
    pub status: ConvergenceStatus,

    /// Whether the optimization converged
    pub success: bool,

    /// A message describing the result
    pub message: String,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// A step that lowered the cost.
struct AcceptedStep {
    step: Array1<f64>,
    params: Array1<f64>,
    residuals: Array1<f64>,
    cost: f64,
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance for the relative cost decrease.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for the relative step norm.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Set the factor by which to increase lambda.
    pub fn with_lambda_up_factor(mut self, factor: f64) -> Self {
        self.config.lambda_up_factor = factor;
        self
    }

    /// Set the factor by which to decrease lambda.
    pub fn with_lambda_down_factor(mut self, factor: f64) -> Self {
        self.config.lambda_down_factor = factor;
        self
    }

    /// Set the minimum value for lambda.
    pub fn with_min_lambda(mut self, min_lambda: f64) -> Self {
        self.config.min_lambda = min_lambda;
        self
    }

    /// Set the maximum value for lambda.
    pub fn with_max_lambda(mut self, max_lambda: f64) -> Self {
        self.config.max_lambda = max_lambda;
        self
    }

    /// Set how many rejected steps one iteration may try.
    pub fn with_max_step_retries(mut self, retries: usize) -> Self {
        self.config.max_step_retries = retries;
        self
    }

    /// Set the finite difference scheme used for the Jacobian.
    pub fn with_differentiation_method(mut self, method: DiffMethod) -> Self {
        self.config.diff_method = method;
        self
    }

    /// Set the relative finite difference step.
    pub fn with_diff_step(mut self, step: f64) -> Self {
        self.config.diff_step = step;
        self
    }

    /// Fit a scalar model `f(params, x) -> y` to observed `(xs, ys)` pairs.
    ///
    /// `model_factory(params)` returns the prediction function for a given
    /// parameter vector; the solver never looks inside it.
    ///
    /// # Arguments
    ///
    /// * `xs` - The independent variable values
    /// * `ys` - The observed values
    /// * `model_factory` - Builds the prediction function for a parameter vector
    /// * `initial_params` - Initial guess, which also fixes the parameter count
    pub fn fit_curve<F, M>(
        &self,
        xs: &Array1<f64>,
        ys: &Array1<f64>,
        model_factory: F,
        initial_params: Array1<f64>,
    ) -> Result<LmResult>
    where
        F: Fn(&Array1<f64>) -> M,
        M: Fn(f64) -> f64,
    {
        let problem = CurveProblem::new(xs, ys, model_factory, initial_params.len())?;
        self.minimize(&problem, initial_params)
    }

    /// Minimize the sum of squared residuals for the given problem.
    ///
    /// # Arguments
    ///
    /// * `problem` - The problem to solve
    /// * `initial_params` - Initial guess for the parameter values
    ///
    /// # Errors
    ///
    /// Only contract violations are errors: an invalid configuration, a
    /// parameter count that does not match the problem, or an empty problem.
    /// Non-convergence is reported through [`LmResult::status`].
    pub fn minimize<P: Problem + ?Sized>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
    ) -> Result<LmResult> {
        self.config.validate()?;

        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(DeclineError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }
        if n_params == 0 || problem.residual_count() == 0 {
            return Err(DeclineError::InvalidInput(
                "Problem has no parameters or no residuals".to_string(),
            ));
        }

        let criteria = ConvergenceCriteria::new(
            self.config.xtol,
            self.config.ftol,
            self.config.max_iterations,
        );

        let mut params = initial_params;
        let mut residuals = self.eval_residuals(problem, &params)?;
        let mut cost = sum_of_squares(&residuals);
        let mut func_evals = 1;
        let mut iterations = 0;
        let mut lambda = self.config.initial_lambda;

        let status = if !cost.is_finite() {
            ConvergenceStatus::NonFiniteCost
        } else if cost == 0.0 {
            ConvergenceStatus::FunctionValueConvergence
        } else {
            loop {
                let jacobian = self.jacobian(problem, &params)?;
                func_evals += self.jacobian_evals(problem, n_params);

                let mut accepted = None;
                let mut terminal = None;

                for attempt in 0..self.config.max_step_retries {
                    let step = match LmStep::calculate_step(&jacobian, &residuals, lambda) {
                        Ok(result) => result.step,
                        Err(DeclineError::NumericalInstability(reason)) => {
                            debug!(
                                iteration = iterations,
                                lambda,
                                %reason,
                                "step calculation failed"
                            );
                            terminal = Some(ConvergenceStatus::SingularMatrix);
                            break;
                        }
                        Err(e) => return Err(e),
                    };

                    // Only the step at the iteration's starting damping says anything
                    // about stationarity; retries shrink it artificially.
                    if attempt == 0 && criteria.step_converged(&params, &step) {
                        terminal = Some(ConvergenceStatus::ParameterConvergence);
                        break;
                    }

                    let trial_params = &params + &step;
                    let trial_residuals = self.eval_residuals(problem, &trial_params)?;
                    func_evals += 1;
                    let trial_cost = sum_of_squares(&trial_residuals);

                    if trial_cost.is_finite() && trial_cost < cost {
                        accepted = Some(AcceptedStep {
                            step,
                            params: trial_params,
                            residuals: trial_residuals,
                            cost: trial_cost,
                        });
                        break;
                    }

                    // At the optimum a tiny step can lose to rounding in the cost
                    if attempt == 0
                        && trial_cost.is_finite()
                        && criteria.stalled(&params, &step, cost, trial_cost)
                    {
                        terminal = Some(ConvergenceStatus::FunctionValueConvergence);
                        break;
                    }

                    trace!(iteration = iterations, attempt, lambda, trial_cost, "step rejected");
                    lambda *= self.config.lambda_up_factor;
                    if lambda > self.config.max_lambda {
                        terminal = Some(ConvergenceStatus::DampingOverflow);
                        break;
                    }
                }

                if let Some(status) = terminal {
                    break status;
                }
                let Some(accepted) = accepted else {
                    break ConvergenceStatus::NoProgress;
                };

                iterations += 1;
                let status =
                    criteria.check(&params, &accepted.step, cost, accepted.cost, iterations);

                params = accepted.params;
                residuals = accepted.residuals;
                cost = accepted.cost;
                lambda = (lambda * self.config.lambda_down_factor).max(self.config.min_lambda);

                debug!(iteration = iterations, cost, lambda, "step accepted");

                if status.is_terminated() {
                    break status;
                }
            }
        };

        debug!(
            iterations,
            func_evals,
            cost,
            status = status.description(),
            "Levenberg-Marquardt finished"
        );

        Ok(LmResult {
            params,
            residuals,
            cost,
            iterations,
            func_evals,
            status,
            success: status.is_converged(),
            message: status.description().to_string(),
        })
    }

    fn eval_residuals<P: Problem + ?Sized>(
        &self,
        problem: &P,
        params: &Array1<f64>,
    ) -> Result<Array1<f64>> {
        let residuals = problem.eval(params)?;
        if residuals.len() != problem.residual_count() {
            return Err(DeclineError::DimensionMismatch(format!(
                "Expected {} residuals, got {}",
                problem.residual_count(),
                residuals.len()
            )));
        }
        Ok(residuals)
    }

    fn jacobian<P: Problem + ?Sized>(
        &self,
        problem: &P,
        params: &Array1<f64>,
    ) -> Result<Array2<f64>> {
        if problem.has_custom_jacobian() {
            let jacobian = problem.jacobian(params)?;
            if jacobian.dim() != (problem.residual_count(), params.len()) {
                return Err(DeclineError::DimensionMismatch(format!(
                    "Expected a {}x{} Jacobian, got {:?}",
                    problem.residual_count(),
                    params.len(),
                    jacobian.dim()
                )));
            }
            Ok(jacobian)
        } else {
            finite_difference::jacobian(
                problem,
                params,
                self.config.diff_method,
                Some(self.config.diff_step),
            )
        }
    }

    fn jacobian_evals<P: Problem + ?Sized>(&self, problem: &P, n_params: usize) -> usize {
        if problem.has_custom_jacobian() {
            return 0;
        }
        match self.config.diff_method {
            DiffMethod::Forward => n_params + 1,
            DiffMethod::Central => 2 * n_params,
        }
    }
}

fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    residuals.iter().map(|r| r.powi(2)).sum()
}
