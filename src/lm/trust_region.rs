//! Trust region control for the damped least-squares backend.
//!
//! The damping parameter adapts to the agreement between the reduction the
//! linearized model predicts and the reduction actually obtained.

/// Trust region state: the Marquardt damping parameter and its update rules.
#[derive(Debug, Clone)]
pub struct TrustRegion {
    /// Current value of the damping parameter
    pub lambda: f64,

    /// Minimum allowed value for the damping parameter
    pub lambda_min: f64,

    /// Maximum allowed value for the damping parameter
    pub lambda_max: f64,

    /// Factor to increase lambda by when step is rejected
    pub lambda_increase_factor: f64,

    /// Factor to decrease lambda by when step is accepted
    pub lambda_decrease_factor: f64,

    /// Minimum gain ratio required to accept a step
    pub min_gain_ratio: f64,

    /// Gain ratio above which lambda is decreased
    pub good_gain_ratio: f64,
}

impl Default for TrustRegion {
    fn default() -> Self {
        Self {
            lambda: 1e-3,
            lambda_min: 1e-10,
            lambda_max: 1e10,
            lambda_increase_factor: 10.0,
            lambda_decrease_factor: 0.1,
            min_gain_ratio: 1e-3,
            good_gain_ratio: 0.75,
        }
    }
}

impl TrustRegion {
    /// Creates a new TrustRegion with default parameters.
    pub fn new() -> Self {
        Default::default()
    }

    /// Trust region starting from the given damping.
    pub fn with_lambda(lambda: f64) -> Self {
        Self {
            lambda,
            ..Default::default()
        }
    }

    /// Updates the damping parameter based on the gain ratio.
    ///
    /// # Returns
    ///
    /// * `true` if the step should be accepted
    pub fn update_lambda(&mut self, gain_ratio: f64) -> bool {
        if gain_ratio > self.min_gain_ratio {
            if gain_ratio > self.good_gain_ratio {
                self.lambda = (self.lambda * self.lambda_decrease_factor).max(self.lambda_min);
            }
            true
        } else {
            self.lambda = (self.lambda * self.lambda_increase_factor).min(self.lambda_max);
            false
        }
    }

    /// Whether the damping has hit its ceiling.
    pub fn is_saturated(&self) -> bool {
        self.lambda >= self.lambda_max
    }

    /// Calculates the gain ratio between actual and predicted reduction.
    ///
    /// A non-finite new cost or a non-positive prediction yields a ratio that
    /// rejects the step.
    pub fn gain_ratio(current_cost: f64, new_cost: f64, predicted_reduction: f64) -> f64 {
        if !new_cost.is_finite() || predicted_reduction <= 0.0 {
            return f64::NEG_INFINITY;
        }
        (current_cost - new_cost) / predicted_reduction
    }
}
