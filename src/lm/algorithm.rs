//! Trust-region least-squares minimization.
//!
//! A damped Gauss–Newton iteration with Marquardt scaling. Each iteration
//! builds a forward-difference Jacobian, then tries steps of increasing
//! damping until one lowers the cost or a convergence test fires.

use ndarray::{Array1, Array2};
use std::fmt;

use crate::cancel::{is_cancelled, CancellationToken};
use crate::error::{EisFitError, Result};
use crate::problem::Problem;
use crate::utils::finite_difference::jacobian_from_base;

use super::config::LmConfig;
use super::convergence::{ConvergenceCriteria, ConvergenceStatus};
use super::step::LmStep;
use super::trust_region::TrustRegion;

/// Outcome of a trust-region run.
///
/// `cost` is `Σr²` at `params`, without the conventional factor ½.
#[derive(Debug, Clone)]
pub struct LmResult {
    pub params: Array1<f64>,
    pub residuals: Array1<f64>,
    pub cost: f64,
    /// Accepted steps
    pub iterations: usize,
    /// Residual evaluations, finite-difference columns included
    pub func_evals: usize,
    pub success: bool,
    pub message: String,
    /// Jacobian at `params`, unless disabled in the config
    pub jacobian: Option<Array2<f64>>,
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

/// The trust-region least-squares optimizer.
#[derive(Debug, Clone, Default)]
pub struct TrustRegionLeastSquares {
    config: LmConfig,
}

impl TrustRegionLeastSquares {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    /// Cap on residual evaluations.
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.config.max_evaluations = max_evaluations;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Drive `Σr²` of `problem` downhill from `initial_params`.
    ///
    /// # Arguments
    ///
    /// * `problem` - Residual source
    /// * `initial_params` - Starting point
    /// * `cancel` - Optional token polled once per iteration
    ///
    /// # Returns
    ///
    /// * `Result<LmResult>` - The result of the optimization. Running out of
    ///   evaluations or being cancelled is reported through `success` and
    ///   `message`, not as an error.
    pub fn minimize<P: Problem>(
        &self,
        problem: &P,
        initial_params: &Array1<f64>,
        cancel: Option<&CancellationToken>,
    ) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(EisFitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }
        if n_params == 0 {
            return Err(EisFitError::InvalidInput(
                "No free parameters to optimize".to_string(),
            ));
        }

        let criteria = ConvergenceCriteria::new(
            self.config.xtol,
            self.config.ftol,
            self.config.gtol,
            self.config.max_evaluations,
        );
        let mut trust_region = TrustRegion {
            lambda: self.config.initial_lambda,
            lambda_min: self.config.min_lambda,
            lambda_max: self.config.max_lambda,
            lambda_increase_factor: self.config.lambda_up_factor,
            lambda_decrease_factor: self.config.lambda_down_factor,
            ..TrustRegion::default()
        };

        let mut params = initial_params.clone();
        let mut residuals = problem.eval(&params)?;
        let mut cost = residuals.dot(&residuals);
        let mut func_evals = 1;
        let mut iterations = 0;
        let mut jacobian = None;

        let status = 'outer: loop {
            if is_cancelled(cancel) {
                break ConvergenceStatus::Cancelled;
            }

            let jac = self.jacobian_at(problem, &params, &residuals)?;
            func_evals += if problem.has_custom_jacobian() { 0 } else { n_params };
            let gradient = jac.t().dot(&residuals);

            let status = criteria.check_point(cost, &gradient, func_evals);
            if status.is_terminated() {
                jacobian = Some(jac);
                break status;
            }

            loop {
                if func_evals >= criteria.max_evaluations {
                    jacobian = Some(jac);
                    break 'outer ConvergenceStatus::MaxEvaluationsReached;
                }

                let step = LmStep::calculate_step(&jac, &residuals, &trust_region)?;
                let new_params = &params + &step.step;
                let new_residuals = problem.eval(&new_params)?;
                func_evals += 1;

                let new_cost = new_residuals.dot(&new_residuals);
                let gain = TrustRegion::gain_ratio(cost, new_cost, step.predicted_reduction);
                let status = if new_cost.is_finite() {
                    criteria.check_step(
                        &params,
                        &step.step,
                        cost,
                        cost - new_cost,
                        step.predicted_reduction,
                    )
                } else {
                    ConvergenceStatus::Running
                };

                if trust_region.update_lambda(gain) {
                    params = new_params;
                    residuals = new_residuals;
                    cost = new_cost;
                    iterations += 1;
                    log::trace!(
                        "Iteration {}: cost = {:.6e}, lambda = {:.3e}",
                        iterations,
                        cost,
                        trust_region.lambda
                    );
                    if status.is_terminated() {
                        // The Jacobian is rebuilt at the accepted point below
                        break 'outer status;
                    }
                    break;
                }

                if status.is_terminated() {
                    jacobian = Some(jac);
                    break 'outer status;
                }
                if trust_region.is_saturated() {
                    jacobian = Some(jac);
                    break 'outer ConvergenceStatus::NoFurtherReduction;
                }
            }
        };

        if self.config.calc_jacobian && jacobian.is_none() && status != ConvergenceStatus::Cancelled {
            jacobian = Some(self.jacobian_at(problem, &params, &residuals)?);
            func_evals += if problem.has_custom_jacobian() { 0 } else { n_params };
        }
        if !self.config.calc_jacobian {
            jacobian = None;
        }

        log::debug!(
            "Trust-region least squares finished after {} iterations and {} evaluations: {}",
            iterations,
            func_evals,
            status.description()
        );

        Ok(LmResult {
            params,
            residuals,
            cost,
            iterations,
            func_evals,
            success: status.is_converged(),
            message: status.description(),
            jacobian,
        })
    }

    fn jacobian_at<P: Problem>(
        &self,
        problem: &P,
        params: &Array1<f64>,
        residuals: &Array1<f64>,
    ) -> Result<Array2<f64>> {
        if problem.has_custom_jacobian() {
            problem.jacobian(params)
        } else {
            jacobian_from_base(problem, params, residuals, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// Relaxation current y = a·exp(−b·t)
    struct DecayProblem {
        x: Array1<f64>,
        y: Array1<f64>,
    }

    impl DecayProblem {
        fn new(a: f64, b: f64) -> Self {
            let x = Array1::linspace(0.0, 4.0, 20);
            let y = x.mapv(|x| a * (-b * x).exp());
            Self { x, y }
        }
    }

    impl Problem for DecayProblem {
        fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
            Ok(self
                .x
                .iter()
                .zip(self.y.iter())
                .map(|(x, y)| params[0] * (-params[1] * x).exp() - y)
                .collect())
        }

        fn parameter_count(&self) -> usize {
            2
        }

        fn residual_count(&self) -> usize {
            self.x.len()
        }
    }

    #[test]
    fn test_decay_fit() {
        let problem = DecayProblem::new(2.5, 0.7);
        let result = TrustRegionLeastSquares::new()
            .minimize(&problem, &array![1.0, 0.2], None)
            .unwrap();

        assert!(result.success, "{}", result.message);
        assert_relative_eq!(result.params[0], 2.5, epsilon = 1e-6);
        assert_relative_eq!(result.params[1], 0.7, epsilon = 1e-6);
        assert!(result.cost < 1e-12);

        let jac = result.jacobian.unwrap();
        assert_eq!(jac.shape(), &[20, 2]);
    }

    #[test]
    fn test_evaluation_budget_is_reported() {
        let problem = DecayProblem::new(2.5, 0.7);
        let result = TrustRegionLeastSquares::new()
            .with_max_evaluations(4)
            .minimize(&problem, &array![1.0, 0.2], None)
            .unwrap();

        assert!(!result.success);
        assert!(result.message.contains("maximum function evaluations"));
    }

    #[test]
    fn test_cancelled_before_start() {
        let problem = DecayProblem::new(2.5, 0.7);
        let token = CancellationToken::new();
        token.cancel();
        let result = TrustRegionLeastSquares::new()
            .minimize(&problem, &array![1.0, 0.2], Some(&token))
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.params, array![1.0, 0.2]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let problem = DecayProblem::new(2.5, 0.7);
        let result = TrustRegionLeastSquares::new().minimize(&problem, &array![1.0], None);
        assert!(matches!(result, Err(EisFitError::DimensionMismatch(_))));
    }
}
