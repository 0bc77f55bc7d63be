//! Classic Levenberg–Marquardt backend.
//!
//! Delegates to the MINPACK-derived solver in the `levenberg-marquardt`
//! crate through [`LmAdapter`].

use ndarray::Array1;

use crate::cancel::CancellationToken;
use crate::error::{EisFitError, Result};
use crate::problem::lm_adapter::LmAdapter;
use crate::problem::Problem;

use super::algorithm::LmResult;
use super::config::LmConfig;

/// Levenberg–Marquardt driven by the `levenberg-marquardt` crate.
#[derive(Debug, Clone, Default)]
pub struct ClassicLevenbergMarquardt {
    config: LmConfig,
}

impl ClassicLevenbergMarquardt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    /// Patience as understood by the crate: it allows `patience * (n + 1)`
    /// evaluations.
    fn patience(&self, n_params: usize) -> usize {
        let per_round = n_params + 1;
        ((self.config.max_evaluations + per_round - 1) / per_round).max(1)
    }

    /// Minimize the sum of squared residuals for the given problem.
    ///
    /// A cancellation request makes every further residual evaluation fail,
    /// which ends the run with `success == false`.
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

        let adapter = LmAdapter::new(problem, initial_params).with_cancellation(cancel);
        let solver = levenberg_marquardt::LevenbergMarquardt::new()
            .with_ftol(self.config.ftol)
            .with_xtol(self.config.xtol)
            .with_gtol(self.config.gtol)
            .with_patience(self.patience(n_params));

        let (adapter, report) = solver.minimize(adapter);
        let params = adapter.current_params();
        let cancelled = adapter.was_cancelled();
        let func_evals = adapter.evaluations();

        let residuals = problem.eval(&params)?;
        let cost = residuals.dot(&residuals);
        let jacobian = if self.config.calc_jacobian && !cancelled {
            Some(problem.jacobian(&params)?)
        } else {
            None
        };

        let message = if cancelled {
            "Terminated: cancelled".to_string()
        } else {
            format!("{:?}", report.termination)
        };
        log::debug!(
            "Classic Levenberg-Marquardt finished after {} evaluations: {}",
            func_evals,
            message
        );

        Ok(LmResult {
            params,
            residuals,
            cost,
            iterations: report.number_of_evaluations,
            func_evals,
            success: report.termination.was_successful() && !cancelled,
            message,
            jacobian,
        })
    }
}
