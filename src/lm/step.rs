//! Step calculation for the damped least-squares backend.
//!
//! Solves the Marquardt-scaled normal equations
//! `(JᵀJ + λ·diag(JᵀJ)) δ = −Jᵀr`.

use crate::error::{EisFitError, Result};
use crate::lm::trust_region::TrustRegion;
use crate::utils::matrix_convert::{nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra};
use ndarray::{Array1, Array2};

/// Floor applied to the diagonal scaling so that insensitive parameters
/// still receive damping.
const MIN_DIAGONAL: f64 = 1e-10;

/// Result of a step calculation.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The calculated step vector
    pub step: Array1<f64>,

    /// The reduction in sum of squares predicted by the linearized model
    pub predicted_reduction: f64,

    /// The damping parameter used to calculate the step
    pub lambda: f64,
}

/// Handles step calculation.
pub struct LmStep;

impl LmStep {
    /// Calculates the damped Gauss–Newton step.
    ///
    /// # Arguments
    ///
    /// * `jacobian` - The Jacobian matrix at the current position
    /// * `residuals` - The residuals at the current position
    /// * `trust_region` - The trust region controller
    ///
    /// # Returns
    ///
    /// * The step result containing the step vector and predicted reduction
    pub fn calculate_step(
        jacobian: &Array2<f64>,
        residuals: &Array1<f64>,
        trust_region: &TrustRegion,
    ) -> Result<StepResult> {
        let j_t_j = jacobian.t().dot(jacobian);
        let j_t_r = jacobian.t().dot(residuals);

        let mut augmented = j_t_j.clone();
        for i in 0..augmented.nrows() {
            augmented[[i, i]] += trust_region.lambda * j_t_j[[i, i]].max(MIN_DIAGONAL);
        }

        let step = match LmStep::solve_cholesky(&augmented, &-&j_t_r) {
            Ok(step) => step,
            // Fall back to a scaled gradient step
            Err(_) => -&j_t_r * (1.0 / (trust_region.lambda + 1.0)),
        };

        let predicted_reduction = LmStep::predicted_reduction(&j_t_j, &j_t_r, &step);

        Ok(StepResult {
            step,
            predicted_reduction,
            lambda: trust_region.lambda,
        })
    }

    /// Solves the symmetric positive definite system `A·x = b`.
    fn solve_cholesky(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
        let chol = ndarray_to_nalgebra(a)
            .cholesky()
            .ok_or(EisFitError::SingularMatrix)?;
        let x = chol.solve(&ndarray_vec_to_nalgebra(b));
        if x.iter().any(|v| !v.is_finite()) {
            return Err(EisFitError::LinearAlgebraError(
                "Non-finite step from Cholesky solve".to_string(),
            ));
        }
        Ok(nalgebra_vec_to_ndarray(&x))
    }

    /// Reduction of `‖r + Jδ‖²` relative to `‖r‖²`: `−2δᵀJᵀr − δᵀJᵀJδ`.
    fn predicted_reduction(j_t_j: &Array2<f64>, j_t_r: &Array1<f64>, step: &Array1<f64>) -> f64 {
        -2.0 * step.dot(j_t_r) - step.dot(&j_t_j.dot(step))
    }
}
