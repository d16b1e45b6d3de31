//! Convergence criteria for the Levenberg-Marquardt solver.
//!
//! This module defines the criteria used to decide when the solver has
//! converged, and the terminal states it reports when it has not.

use ndarray::Array1;

/// Possible convergence states for the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStatus {
    /// The algorithm is still running.
    Running,

    /// Converged: the step norm fell below `xtol`.
    ParameterConvergence,

    /// Converged: the cost stopped decreasing while the parameters settled, or
    /// the model reproduces the data exactly.
    FunctionValueConvergence,

    /// Terminated: the iteration cap was reached.
    MaxIterationsReached,

    /// Terminated: the damped normal equations could not be solved.
    SingularMatrix,

    /// Terminated: lambda grew past its ceiling without an accepted step.
    DampingOverflow,

    /// Terminated: every trial step of an iteration was rejected.
    NoProgress,

    /// Terminated: the cost at the initial parameters is not finite.
    NonFiniteCost,
}

impl ConvergenceStatus {
    /// Returns true if the optimization has terminated (either converged or failed).
    pub fn is_terminated(&self) -> bool {
        !matches!(self, ConvergenceStatus::Running)
    }

    /// Returns true if the optimization has converged.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::ParameterConvergence | ConvergenceStatus::FunctionValueConvergence
        )
    }

    /// Returns true for terminations caused by ill-conditioning rather than
    /// by the iteration budget.
    pub fn is_numerical_failure(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::SingularMatrix
                | ConvergenceStatus::DampingOverflow
                | ConvergenceStatus::NoProgress
                | ConvergenceStatus::NonFiniteCost
        )
    }

    /// Returns a description of the convergence status.
    pub fn description(&self) -> &'static str {
        match self {
            ConvergenceStatus::Running => "Optimization is still running",
            ConvergenceStatus::ParameterConvergence => "Converged: small parameter change",
            ConvergenceStatus::FunctionValueConvergence => "Converged: small cost change",
            ConvergenceStatus::MaxIterationsReached => "Terminated: maximum iterations reached",
            ConvergenceStatus::SingularMatrix => "Terminated: singular normal equations",
            ConvergenceStatus::DampingOverflow => "Terminated: damping factor exceeded its ceiling",
            ConvergenceStatus::NoProgress => "Terminated: no trial step reduced the cost",
            ConvergenceStatus::NonFiniteCost => "Terminated: cost is not finite",
        }
    }
}

/// Criteria for determining when the solver has converged.
#[derive(Debug, Clone)]
pub struct ConvergenceCriteria {
    /// Tolerance for the relative step norm.
    pub xtol: f64,

    /// Tolerance for the relative cost decrease.
    pub ftol: f64,

    /// Maximum number of iterations.
    pub max_iterations: usize,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            xtol: 1e-10,
            ftol: 1e-10,
            max_iterations: 100,
        }
    }
}

impl ConvergenceCriteria {
    /// Creates a new set of convergence criteria with the given tolerances.
    pub fn new(xtol: f64, ftol: f64, max_iterations: usize) -> Self {
        Self {
            xtol,
            ftol,
            max_iterations,
        }
    }

    /// Step norm relative to the parameter norm: `||dp|| / (||p|| + xtol)`.
    pub fn relative_step(&self, params: &Array1<f64>, step: &Array1<f64>) -> f64 {
        let step_norm = step.dot(step).sqrt();
        let param_norm = params.dot(params).sqrt();
        step_norm / (param_norm + self.xtol)
    }

    /// Returns true if a proposed step is too small to move the parameters.
    pub fn step_converged(&self, params: &Array1<f64>, step: &Array1<f64>) -> bool {
        self.relative_step(params, step) < self.xtol
    }

    /// Returns true if moving by `step` changes the cost by less than `ftol`
    /// relative while the step itself is below `sqrt(ftol)` relative.
    pub fn stalled(
        &self,
        params: &Array1<f64>,
        step: &Array1<f64>,
        cost: f64,
        new_cost: f64,
    ) -> bool {
        let relative_change = (cost - new_cost).abs() / cost;
        relative_change < self.ftol && self.relative_step(params, step) < self.ftol.sqrt()
    }

    /// Checks the state after an accepted step.
    ///
    /// A small relative cost decrease only counts as convergence once the step
    /// has also shrunk below `sqrt(ftol)`: a parameter sliding down a flat
    /// valley keeps taking large steps while the cost barely moves.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameter values before the step
    /// * `step` - The accepted step
    /// * `cost` - The cost before the step
    /// * `new_cost` - The cost after the step
    /// * `iterations` - The number of accepted iterations so far
    pub fn check(
        &self,
        params: &Array1<f64>,
        step: &Array1<f64>,
        cost: f64,
        new_cost: f64,
        iterations: usize,
    ) -> ConvergenceStatus {
        if new_cost == 0.0 {
            return ConvergenceStatus::FunctionValueConvergence;
        }

        if self.relative_step(params, step) < self.xtol {
            return ConvergenceStatus::ParameterConvergence;
        }

        if self.stalled(params, step, cost, new_cost) {
            return ConvergenceStatus::FunctionValueConvergence;
        }

        if iterations >= self.max_iterations {
            return ConvergenceStatus::MaxIterationsReached;
        }

        ConvergenceStatus::Running
    }
}
