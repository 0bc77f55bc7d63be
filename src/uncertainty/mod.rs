//! # Uncertainty Calculation
//!
//! Standard errors of fitted parameters from a covariance estimate. Every
//! backend contributes an unscaled base covariance (or none); the
//! [`UncertaintyCalculator`] applies the one scaling convention, multiplying
//! by the reduced chi-square, and turns the diagonal into per-parameter
//! [`Uncertainty`] values.

mod covariance;

pub use covariance::{
    calculate_correlation, covariance_from_inverse_hessian, covariance_from_jacobian_svd,
    covariance_from_normal_equations, standard_errors_from_covariance,
};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{EisFitError, Result};

/// Uncertainty of one fitted parameter.
///
/// `Unavailable` means the backend produced no usable covariance; it is not
/// the same thing as an error of zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Uncertainty {
    Available {
        /// Standard error
        stderr: f64,
        /// Standard error relative to the value, in percent
        percent: f64,
    },
    Unavailable,
}

impl Uncertainty {
    /// Uncertainty of `value` with standard error `stderr`.
    pub fn from_stderr(value: f64, stderr: f64) -> Self {
        Uncertainty::Available {
            stderr,
            percent: 100.0 * stderr / value,
        }
    }

    pub fn stderr(&self) -> Option<f64> {
        match self {
            Uncertainty::Available { stderr, .. } => Some(*stderr),
            Uncertainty::Unavailable => None,
        }
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            Uncertainty::Available { percent, .. } => Some(*percent),
            Uncertainty::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Uncertainty::Available { .. })
    }
}

/// Reduced chi-square `chisqr / (n_points - n_free)`.
///
/// # Errors
///
/// `DegenerateDof` when there are no degrees of freedom left.
pub fn reduced_chi_square(chisqr: f64, n_points: usize, n_free: usize) -> Result<f64> {
    if n_free >= n_points {
        return Err(EisFitError::DegenerateDof { n_points, n_free });
    }
    Ok(chisqr / (n_points - n_free) as f64)
}

/// Calculator for parameter uncertainties.
#[derive(Debug, Clone)]
pub struct UncertaintyCalculator {
    /// Degrees of freedom (n_points - n_parameters)
    pub nfree: usize,
    /// Chi-square value at minimum
    pub chisqr: f64,
    /// Reduced chi-square (chi^2 / nfree)
    pub redchi: f64,
}

impl UncertaintyCalculator {
    /// Create a new UncertaintyCalculator.
    ///
    /// # Errors
    ///
    /// `DegenerateDof` when `nvarys >= ndata`.
    pub fn new(ndata: usize, nvarys: usize, chisqr: f64) -> Result<Self> {
        let redchi = reduced_chi_square(chisqr, ndata, nvarys)?;
        Ok(Self {
            nfree: ndata - nvarys,
            chisqr,
            redchi,
        })
    }

    /// Scale a base covariance by the reduced chi-square.
    pub fn scale(&self, base: &Array2<f64>) -> Array2<f64> {
        base * self.redchi
    }

    /// Per-parameter uncertainties for `values` given an optional covariance.
    ///
    /// Without a covariance every entry is `Unavailable`.
    pub fn uncertainties(
        &self,
        covar: Option<&Array2<f64>>,
        values: &Array1<f64>,
    ) -> Result<Vec<Uncertainty>> {
        let Some(covar) = covar else {
            return Ok(vec![Uncertainty::Unavailable; values.len()]);
        };
        if covar.nrows() != values.len() || covar.ncols() != values.len() {
            return Err(EisFitError::DimensionMismatch(format!(
                "Covariance is {}x{} but there are {} parameters",
                covar.nrows(),
                covar.ncols(),
                values.len()
            )));
        }

        let stderr = standard_errors_from_covariance(covar);
        Ok(values
            .iter()
            .zip(stderr.iter())
            .map(|(&value, &err)| Uncertainty::from_stderr(value, err))
            .collect())
    }
}
