//! Problem definition trait and the `levenberg-marquardt` adapter.
//!
//! This module defines the `Problem` trait, the least-squares view of a fit
//! that every residual-based backend consumes. It also provides an adapter
//! that exposes a `Problem` through the `levenberg-marquardt` crate's
//! `LeastSquaresProblem` interface.

use crate::error::Result;
use ndarray::{Array1, Array2};

/// A nonlinear least-squares objective.
///
/// Implementors map a flat parameter vector to a residual vector whose sum of
/// squares is the objective.
pub trait Problem {
    /// Residual vector at `params`.
    ///
    /// Implementations that answer bad candidates with a penalty vector
    /// should still return `Ok`; errors abort the backend.
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Length of the parameter vector.
    fn parameter_count(&self) -> usize;

    /// Length of the residual vector.
    fn residual_count(&self) -> usize;

    /// `∂r_i/∂x_j` at `params`; forward differences unless overridden.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>>
    where
        Self: Sized,
    {
        crate::utils::finite_difference::jacobian(self, params, None)
    }

    /// Whether `jacobian` is analytic. Backends skip the finite-difference
    /// path when it is.
    fn has_custom_jacobian(&self) -> bool {
        false
    }

    /// `Σr²` at `params`.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}

/// Bridge to the `levenberg-marquardt` crate.
///
/// The crate drives the problem through `set_params`/`residuals`/`jacobian`
/// and stops as soon as either callback returns `None`, which is how
/// evaluation errors and cancellation are surfaced.
pub mod lm_adapter {
    use super::*;
    use crate::cancel::{is_cancelled, CancellationToken};
    use crate::utils::matrix_convert::{
        nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra,
    };
    use levenberg_marquardt::LeastSquaresProblem;
    use nalgebra::storage::Owned;
    use nalgebra::{DMatrix, DVector, Dyn};
    use std::cell::Cell;

    /// A `Problem` seen as a `LeastSquaresProblem` over `nalgebra` storage.
    pub struct LmAdapter<'a, P: Problem> {
        problem: &'a P,
        params: DVector<f64>,
        cancel: Option<&'a CancellationToken>,
        evaluations: Cell<usize>,
        cancelled: Cell<bool>,
    }

    impl<'a, P: Problem> LmAdapter<'a, P> {
        /// Create a new adapter starting at `initial`.
        pub fn new(problem: &'a P, initial: &Array1<f64>) -> Self {
            Self {
                problem,
                params: ndarray_vec_to_nalgebra(initial),
                cancel: None,
                evaluations: Cell::new(0),
                cancelled: Cell::new(false),
            }
        }

        /// Poll `token` inside every residual evaluation.
        pub fn with_cancellation(mut self, token: Option<&'a CancellationToken>) -> Self {
            self.cancel = token;
            self
        }

        /// Current parameters as an ndarray vector.
        pub fn current_params(&self) -> Array1<f64> {
            nalgebra_vec_to_ndarray(&self.params)
        }

        /// Residual evaluations requested by the solver, Jacobian columns included.
        pub fn evaluations(&self) -> usize {
            self.evaluations.get()
        }

        /// Whether the run was stopped by the cancellation token.
        pub fn was_cancelled(&self) -> bool {
            self.cancelled.get()
        }
    }

    impl<'a, P: Problem> LeastSquaresProblem<f64, Dyn, Dyn> for LmAdapter<'a, P> {
        type ResidualStorage = Owned<f64, Dyn>;
        type JacobianStorage = Owned<f64, Dyn, Dyn>;
        type ParameterStorage = Owned<f64, Dyn>;

        fn set_params(&mut self, x: &DVector<f64>) {
            self.params.copy_from(x);
        }

        fn params(&self) -> DVector<f64> {
            self.params.clone()
        }

        fn residuals(&self) -> Option<DVector<f64>> {
            if is_cancelled(self.cancel) {
                self.cancelled.set(true);
                return None;
            }
            self.evaluations.set(self.evaluations.get() + 1);
            match self.problem.eval(&self.current_params()) {
                Ok(residuals) => Some(ndarray_vec_to_nalgebra(&residuals)),
                Err(e) => {
                    log::debug!("Residual evaluation failed: {}", e);
                    None
                }
            }
        }

        fn jacobian(&self) -> Option<DMatrix<f64>> {
            let x = self.current_params();
            self.evaluations
                .set(self.evaluations.get() + self.problem.parameter_count() + 1);
            match self.problem.jacobian(&x) {
                Ok(jac) => Some(ndarray_to_nalgebra(&jac)),
                Err(e) => {
                    log::debug!("Jacobian evaluation failed: {}", e);
                    None
                }
            }
        }
    }
}
