//! Configuration options for the damped least-squares backends.

/// Configuration options shared by the trust-region and classic
/// Levenberg–Marquardt backends.
#[derive(Debug, Clone)]
pub struct LmConfig {
    /// Maximum number of residual evaluations, Jacobian columns included. Default: 100000
    pub max_evaluations: usize,

    /// Tolerance for change in the sum of squares. Default: machine epsilon
    pub ftol: f64,

    /// Tolerance for change in parameter values. Default: machine epsilon
    pub xtol: f64,

    /// Tolerance for the gradient infinity norm. Default: machine epsilon
    pub gtol: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Factor by which to increase lambda. Default: 10.0
    pub lambda_up_factor: f64,

    /// Factor by which to decrease lambda. Default: 0.1
    pub lambda_down_factor: f64,

    /// Minimum value for lambda. Default: 1e-10
    pub min_lambda: f64,

    /// Maximum value for lambda. Default: 1e10
    pub max_lambda: f64,

    /// Whether to calculate and return the Jacobian at the solution. Default: true
    pub calc_jacobian: bool,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_evaluations: 100_000,
            ftol: f64::EPSILON,
            xtol: f64::EPSILON,
            gtol: f64::EPSILON,
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            min_lambda: 1e-10,
            max_lambda: 1e10,
            calc_jacobian: true,
        }
    }
}

impl LmConfig {
    /// Use `tolerance` for all three convergence tests.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.ftol = tolerance;
        self.xtol = tolerance;
        self.gtol = tolerance;
        self
    }

    /// Set the evaluation budget.
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }
}
