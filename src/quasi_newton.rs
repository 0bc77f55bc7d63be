//! Quasi-Newton minimization of the scalar sum of squares.
//!
//! Runs argmin's BFGS with a More–Thuente line search. Gradients come from
//! central finite differences, and the final inverse Hessian approximation
//! is returned so that callers can derive a covariance from it.

use argmin::core::{CostFunction, Executor, Gradient, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::BFGS;
use ndarray::{Array1, Array2};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::cancel::{is_cancelled, CancellationToken};
use crate::error::{EisFitError, Result};
use crate::problem::Problem;
use crate::utils::finite_difference::gradient;

/// Floor on the gradient tolerance; central differences are not more
/// accurate than this relative to the cost scale.
const GRADIENT_TOLERANCE_FLOOR: f64 = 1e-10;

/// Result of a quasi-Newton run.
#[derive(Debug, Clone)]
pub struct QuasiNewtonResult {
    /// Best parameters found
    pub params: Array1<f64>,
    /// Sum of squares at `params`
    pub cost: f64,
    /// Solver iterations
    pub iterations: u64,
    /// Cost evaluations, gradient evaluations included
    pub func_evals: usize,
    pub success: bool,
    pub message: String,
    /// Final inverse Hessian approximation of the sum of squares
    pub inv_hessian: Option<Array2<f64>>,
}

impl fmt::Display for QuasiNewtonResult {
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

/// Evaluation count and best point, shared with the caller while argmin
/// owns the objective.
#[derive(Default)]
struct Tracker {
    evaluations: AtomicUsize,
    best: Mutex<Option<(f64, Array1<f64>)>>,
}

impl Tracker {
    fn record(&self, cost: f64, params: &Array1<f64>) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut best) = self.best.lock() {
            let improved = match best.as_ref() {
                Some((best_cost, _)) => cost < *best_cost,
                None => cost.is_finite(),
            };
            if improved {
                *best = Some((cost, params.clone()));
            }
        }
    }

    fn best(&self) -> Option<(f64, Array1<f64>)> {
        self.best.lock().ok().and_then(|best| best.clone())
    }
}

/// Wrapper exposing a `Problem` to argmin as a scalar objective.
struct ArgminObjective<'a, P: Problem> {
    problem: &'a P,
    cancel: Option<&'a CancellationToken>,
    tracker: Arc<Tracker>,
}

impl<'a, P: Problem> ArgminObjective<'a, P> {
    fn evaluate(&self, params: &Array1<f64>) -> Result<f64> {
        if is_cancelled(self.cancel) {
            return Err(EisFitError::Cancelled);
        }
        let cost = self.problem.eval_cost(params)?;
        self.tracker.record(cost, params);
        Ok(cost)
    }
}

impl<'a, P: Problem> CostFunction for ArgminObjective<'a, P> {
    type Param = Array1<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
        self.evaluate(params)
            .map_err(|e| argmin::core::Error::msg(e.to_string()))
    }
}

impl<'a, P: Problem> Gradient for ArgminObjective<'a, P> {
    type Param = Array1<f64>;
    type Gradient = Array1<f64>;

    fn gradient(
        &self,
        params: &Self::Param,
    ) -> std::result::Result<Self::Gradient, argmin::core::Error> {
        gradient(|p| self.evaluate(p), params, None)
            .map_err(|e| argmin::core::Error::msg(e.to_string()))
    }
}

/// BFGS minimizer for the sum of squared residuals of a `Problem`.
#[derive(Debug, Clone)]
pub struct QuasiNewton {
    tolerance: f64,
    max_iterations: u64,
}

impl Default for QuasiNewton {
    fn default() -> Self {
        Self {
            tolerance: f64::EPSILON,
            max_iterations: 10_000,
        }
    }
}

impl QuasiNewton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cost-change tolerance; also the gradient tolerance, floored at `1e-10`.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Minimize `Σr²` starting from `initial_params`.
    ///
    /// If the line search gives up the best point seen so far is returned
    /// with `success == false` and no inverse Hessian.
    ///
    /// # Errors
    ///
    /// * `Cancelled` when the token was triggered during the run
    /// * `OptimizationFailure` when the solver fails before any finite cost
    ///   was observed
    pub fn minimize<P: Problem>(
        &self,
        problem: &P,
        initial_params: &Array1<f64>,
        cancel: Option<&CancellationToken>,
    ) -> Result<QuasiNewtonResult> {
        let n = initial_params.len();
        if n != problem.parameter_count() {
            return Err(EisFitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                problem.parameter_count(),
                n
            )));
        }

        let tracker = Arc::new(Tracker::default());
        let objective = ArgminObjective {
            problem,
            cancel,
            tracker: tracker.clone(),
        };

        let linesearch = MoreThuenteLineSearch::new();
        let solver = BFGS::new(linesearch)
            .with_tolerance_grad(self.tolerance.max(GRADIENT_TOLERANCE_FLOOR))
            .map_err(|e| EisFitError::InvalidInput(format!("Invalid gradient tolerance: {}", e)))?
            .with_tolerance_cost(self.tolerance)
            .map_err(|e| EisFitError::InvalidInput(format!("Invalid cost tolerance: {}", e)))?;

        let init_hessian: Array2<f64> = Array2::eye(n);
        let run = Executor::new(objective, solver)
            .configure(|state| {
                state
                    .param(initial_params.clone())
                    .inv_hessian(init_hessian)
                    .max_iters(self.max_iterations)
            })
            .run();

        if is_cancelled(cancel) {
            return Err(EisFitError::Cancelled);
        }
        let func_evals = tracker.evaluations.load(Ordering::Relaxed);

        match run {
            Ok(res) => {
                let state = res.state();
                let params = state.get_best_param().cloned().ok_or_else(|| {
                    EisFitError::OptimizationFailure("No best parameters found".to_string())
                })?;
                let termination = state.get_termination_status();
                let success = matches!(
                    termination,
                    TerminationStatus::Terminated(TerminationReason::SolverConverged)
                        | TerminationStatus::Terminated(TerminationReason::TargetCostReached)
                );
                let message = termination.to_string();
                log::debug!("BFGS finished after {} iterations: {}", state.get_iter(), message);

                Ok(QuasiNewtonResult {
                    params,
                    cost: state.get_best_cost(),
                    iterations: state.get_iter(),
                    func_evals,
                    success,
                    message,
                    inv_hessian: state.get_inv_hessian().cloned(),
                })
            }
            Err(e) => {
                log::warn!("BFGS stopped early: {}", e);
                let (cost, params) = tracker.best().ok_or_else(|| {
                    EisFitError::OptimizationFailure(format!("BFGS failed: {}", e))
                })?;
                Ok(QuasiNewtonResult {
                    params,
                    cost,
                    iterations: 0,
                    func_evals,
                    success: false,
                    message: e.to_string(),
                    inv_hessian: None,
                })
            }
        }
    }
}
