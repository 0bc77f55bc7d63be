//! Convergence criteria for the damped least-squares backend.
//!
//! Tests follow the usual trust-region conventions: the gradient test uses
//! the infinity norm of `Jᵀr`, the cost test compares accepted reductions to
//! the current cost, and the step test compares the step length to the
//! parameter vector length.

use ndarray::Array1;

/// Why a trust-region run stopped, or that it has not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceStatus {
    /// No test has fired yet.
    Running,

    /// Step shorter than `xtol` relative to the parameters.
    ParameterConvergence,

    /// Actual and predicted reductions below `ftol` relative to the cost,
    /// or a cost of exactly zero.
    FunctionValueConvergence,

    /// `‖Jᵀr‖∞ ≤ gtol`.
    GradientConvergence,

    /// The damping saturated without finding a step that lowers the cost.
    NoFurtherReduction,

    /// The function evaluation budget ran out.
    MaxEvaluationsReached,

    /// A cancellation request was observed.
    Cancelled,

    /// Non-finite cost or gradient at an accepted point.
    NumericalError,
}

impl ConvergenceStatus {
    /// Anything but `Running`.
    pub fn is_terminated(&self) -> bool {
        !matches!(self, ConvergenceStatus::Running)
    }

    /// Stopped at a point the tests accept as a minimum.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::ParameterConvergence
                | ConvergenceStatus::FunctionValueConvergence
                | ConvergenceStatus::GradientConvergence
                | ConvergenceStatus::NoFurtherReduction
        )
    }

    /// Human-readable reason, used as the result message.
    pub fn description(&self) -> String {
        match self {
            ConvergenceStatus::Running => "Optimization is still running".to_string(),
            ConvergenceStatus::ParameterConvergence => {
                "Converged: small parameter change".to_string()
            }
            ConvergenceStatus::FunctionValueConvergence => {
                "Converged: small function value change".to_string()
            }
            ConvergenceStatus::GradientConvergence => "Converged: small gradient".to_string(),
            ConvergenceStatus::NoFurtherReduction => {
                "Converged: no further reduction possible".to_string()
            }
            ConvergenceStatus::MaxEvaluationsReached => {
                "Terminated: maximum function evaluations reached".to_string()
            }
            ConvergenceStatus::Cancelled => "Terminated: cancelled".to_string(),
            ConvergenceStatus::NumericalError => "Terminated: numerical error".to_string(),
        }
    }
}

/// Tolerances and budget of a trust-region run.
#[derive(Debug, Clone)]
pub struct ConvergenceCriteria {
    /// Relative step length.
    pub xtol: f64,

    /// Relative cost reduction.
    pub ftol: f64,

    /// Infinity norm of `Jᵀr`.
    pub gtol: f64,

    /// Maximum number of residual evaluations, Jacobian columns included.
    pub max_evaluations: usize,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            xtol: 1e-8,
            ftol: 1e-8,
            gtol: 1e-8,
            max_evaluations: 100_000,
        }
    }
}

impl ConvergenceCriteria {
    pub fn new(xtol: f64, ftol: f64, gtol: f64, max_evaluations: usize) -> Self {
        Self {
            xtol,
            ftol,
            gtol,
            max_evaluations,
        }
    }

    /// Test at the start of an iteration, before any step is tried.
    ///
    /// # Arguments
    ///
    /// * `cost` - The current sum of squares
    /// * `gradient` - `Jᵀr` at the current parameters
    /// * `evaluations` - Residual evaluations used so far
    pub fn check_point(
        &self,
        cost: f64,
        gradient: &Array1<f64>,
        evaluations: usize,
    ) -> ConvergenceStatus {
        if !cost.is_finite() || gradient.iter().any(|g| !g.is_finite()) {
            return ConvergenceStatus::NumericalError;
        }
        if cost == 0.0 {
            return ConvergenceStatus::FunctionValueConvergence;
        }

        let gradient_norm = gradient.iter().fold(0.0_f64, |acc, g| acc.max(g.abs()));
        if gradient_norm <= self.gtol {
            return ConvergenceStatus::GradientConvergence;
        }

        if evaluations >= self.max_evaluations {
            return ConvergenceStatus::MaxEvaluationsReached;
        }

        ConvergenceStatus::Running
    }

    /// Test after a trial step has been evaluated.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameters the step starts from
    /// * `step` - The trial step
    /// * `cost` - The cost at `params`
    /// * `actual_reduction` - `cost - new_cost`
    /// * `predicted_reduction` - Reduction predicted by the linear model
    pub fn check_step(
        &self,
        params: &Array1<f64>,
        step: &Array1<f64>,
        cost: f64,
        actual_reduction: f64,
        predicted_reduction: f64,
    ) -> ConvergenceStatus {
        if actual_reduction >= 0.0
            && actual_reduction <= self.ftol * cost
            && predicted_reduction <= self.ftol * cost
        {
            return ConvergenceStatus::FunctionValueConvergence;
        }

        let step_norm = step.dot(step).sqrt();
        let param_norm = params.dot(params).sqrt();
        if step_norm <= self.xtol * (self.xtol + param_norm) {
            return ConvergenceStatus::ParameterConvergence;
        }

        ConvergenceStatus::Running
    }
}
