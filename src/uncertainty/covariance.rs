//! # Covariance Matrix Calculations
//!
//! Unscaled ("base") covariance estimates from the quantities the different
//! backends leave behind: a Jacobian, or an inverse Hessian approximation.
//! Scaling by the reduced chi-square happens in [`super::UncertaintyCalculator`].

use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

use crate::error::{EisFitError, Result};
use crate::utils::matrix_convert::{nalgebra_to_ndarray, ndarray_to_nalgebra};

/// Covariance `V·S⁻²·Vᵀ` from the thin SVD `J = U·S·Vᵀ`.
///
/// Singular values at or below `eps·max(m, n)·s_max` are discarded, so a
/// rank-deficient Jacobian yields a pseudo-inverse rather than an error.
pub fn covariance_from_jacobian_svd(jacobian: &Array2<f64>) -> Result<Array2<f64>> {
    let (m, n) = jacobian.dim();
    if n == 0 {
        return Err(EisFitError::InvalidInput(
            "Jacobian has no columns".to_string(),
        ));
    }
    if jacobian.iter().any(|v| !v.is_finite()) {
        return Err(EisFitError::LinearAlgebraError(
            "Jacobian contains non-finite entries".to_string(),
        ));
    }

    let svd = ndarray_to_nalgebra(jacobian).svd(false, true);
    let v_t = svd.v_t.ok_or_else(|| {
        EisFitError::LinearAlgebraError("SVD did not return right singular vectors".to_string())
    })?;
    let singular_values = svd.singular_values;

    let s_max = singular_values.iter().fold(0.0_f64, |acc, s| acc.max(*s));
    let threshold = f64::EPSILON * m.max(n) as f64 * s_max;

    let k = singular_values.len();
    let mut inv_s2 = DMatrix::<f64>::zeros(k, k);
    for (i, s) in singular_values.iter().enumerate() {
        if *s > threshold {
            inv_s2[(i, i)] = 1.0 / (s * s);
        }
    }

    let covar = v_t.transpose() * inv_s2 * &v_t;
    Ok(nalgebra_to_ndarray(&covar))
}

/// Covariance `(JᵀJ)⁻¹`, or `None` when `JᵀJ` is singular.
pub fn covariance_from_normal_equations(jacobian: &Array2<f64>) -> Option<Array2<f64>> {
    let jtj = jacobian.t().dot(jacobian);
    ndarray_to_nalgebra(&jtj)
        .try_inverse()
        .map(|inv| nalgebra_to_ndarray(&inv))
        .filter(|inv| inv.iter().all(|v| v.is_finite()))
}

/// Covariance `2·H⁻¹` from the inverse Hessian of the sum of squares.
///
/// The Hessian of `Σr²` is `2·JᵀJ`, hence the factor of two.
pub fn covariance_from_inverse_hessian(inv_hessian: &Array2<f64>) -> Array2<f64> {
    inv_hessian * 2.0
}

/// Calculate correlation matrix from covariance matrix.
///
/// The correlation matrix is calculated as:
///   correl[i,j] = covar[i,j] / sqrt(covar[i,i] * covar[j,j])
pub fn calculate_correlation(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();
    let mut correl = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..n {
            if i == j {
                correl[[i, j]] = 1.0;
            } else {
                let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
                if denom > 0.0 {
                    correl[[i, j]] = covar[[i, j]] / denom;
                }
            }
        }
    }

    correl
}

/// Extract standard errors from the covariance matrix.
///
/// A negative variance has no real square root and is reported as NaN.
pub fn standard_errors_from_covariance(covar: &Array2<f64>) -> Array1<f64> {
    covar.diag().mapv(|v| if v >= 0.0 { v.sqrt() } else { f64::NAN })
}
