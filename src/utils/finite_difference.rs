//! Numerical derivatives of fit objectives.
//!
//! Circuit blocks are closed-form but their parameter derivatives are not
//! worth deriving by hand for every block, so every backend that needs
//! derivative information gets it from here.

use crate::error::{EisFitError, Result};
use crate::problem::Problem;
use ndarray::{Array1, Array2, Zip};

/// Relative step used when the caller gives none.
const DEFAULT_EPSILON: f64 = 1e-8;

/// Step for parameter `value`, scaled to its magnitude.
///
/// Capacitances sit near 1e-6 and resistances near 1e2, so an absolute
/// step would be useless for one of them.
fn step_for(value: f64, eps: f64) -> f64 {
    if value.abs() > eps {
        value.abs() * eps
    } else {
        eps
    }
}

/// Forward-difference Jacobian `∂r_i/∂x_j` of a problem's residuals.
///
/// Costs `n + 1` residual evaluations.
pub fn jacobian(
    problem: &dyn Problem,
    params: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let base = problem.eval(params)?;
    jacobian_from_base(problem, params, &base, epsilon)
}

/// Forward-difference Jacobian around residuals already evaluated at `params`.
///
/// # Arguments
///
/// * `problem` - Source of the residuals
/// * `params` - The point of linearization
/// * `base` - `problem.eval(params)`
/// * `epsilon` - Relative step, `1e-8` when `None`
///
/// # Errors
///
/// `DimensionMismatch` when `base` does not have `residual_count()` entries,
/// and any error from evaluating the problem.
pub fn jacobian_from_base(
    problem: &dyn Problem,
    params: &Array1<f64>,
    base: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let m = problem.residual_count();
    if base.len() != m {
        return Err(EisFitError::DimensionMismatch(format!(
            "Problem declares {} residuals but {} were supplied",
            m,
            base.len()
        )));
    }

    let mut jac = Array2::zeros((m, params.len()));
    let mut shifted = params.clone();
    for (j, mut column) in jac.columns_mut().into_iter().enumerate() {
        let h = step_for(params[j], eps);
        shifted[j] = params[j] + h;
        let perturbed = problem.eval(&shifted)?;
        shifted[j] = params[j];

        Zip::from(&mut column)
            .and(&perturbed)
            .and(base)
            .for_each(|d, &up, &r| *d = (up - r) / h);
    }

    Ok(jac)
}

/// Central-difference gradient of a scalar objective.
///
/// Costs `2n` evaluations of `f`.
pub fn gradient<F>(f: F, params: &Array1<f64>, epsilon: Option<f64>) -> Result<Array1<f64>>
where
    F: Fn(&Array1<f64>) -> Result<f64>,
{
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let mut shifted = params.clone();
    let mut grad = Array1::zeros(params.len());

    for j in 0..params.len() {
        let h = step_for(params[j], eps);
        shifted[j] = params[j] + h;
        let upper = f(&shifted)?;
        shifted[j] = params[j] - h;
        let lower = f(&shifted)?;
        shifted[j] = params[j];

        grad[j] = (upper - lower) / (2.0 * h);
    }

    Ok(grad)
}
