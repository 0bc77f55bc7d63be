//! Equivalent-circuit models of electrochemical impedance.
//!
//! A [`Model`] maps a [`ParameterSet`] and a frequency vector (Hz) to a
//! complex impedance vector. The provided models are [`Circuit`]s, ordered
//! series sums of the closed-form [`blocks`].
//!
//! ## Example Usage
//!
//! ```rust
//! use eisfit_rs::models::{simulate, Circuit};
//! use eisfit_rs::parameters::ParameterSet;
//! use ndarray::array;
//!
//! let circuit = Circuit::by_name("rc").unwrap();
//! let params = ParameterSet::from_pairs([("r", 100.0), ("c", 1e-6)]);
//! let z = simulate(&circuit, &params, &array![1.0, 1e3, 1e6]).unwrap();
//! assert!((z[0].re - 100.0).abs() < 1e-3);
//! ```

pub mod blocks;
pub mod circuit;

pub use circuit::{Block, Circuit, CircuitBuilder, AVAILABLE_MODELS};

use crate::error::Result;
use crate::parameters::ParameterSet;
use ndarray::Array1;
use num_complex::Complex64;

/// A stateless impedance model.
///
/// Implementations must be pure: the same parameter set and frequencies
/// always give the same prediction, and models can be shared across threads.
pub trait Model: Send + Sync {
    /// Short identifier of the model.
    fn name(&self) -> &str;

    /// Every parameter name the model reads.
    fn required_parameters(&self) -> Vec<String>;

    /// Check that every required parameter is present.
    ///
    /// # Returns
    ///
    /// * `Ok(())`, or `MissingParameter` naming the first absent key
    fn validate(&self, params: &ParameterSet) -> Result<()> {
        params.require(self.required_parameters())
    }

    /// Evaluate the model at the given frequencies (Hz).
    ///
    /// # Arguments
    ///
    /// * `params` - Values for every required parameter
    /// * `freqs` - Frequencies in Hz
    ///
    /// # Returns
    ///
    /// * The predicted impedance at each frequency. Non-finite values are
    ///   returned as-is, not reported as errors.
    fn evaluate(&self, params: &ParameterSet, freqs: &Array1<f64>) -> Result<Array1<Complex64>>;
}

/// Validate the parameters and evaluate the model once.
pub fn simulate(
    model: &dyn Model,
    params: &ParameterSet,
    freqs: &Array1<f64>,
) -> Result<Array1<Complex64>> {
    model.validate(params)?;
    let z = model.evaluate(params, freqs)?;
    log::debug!("Simulated {} points with model '{}'", z.len(), model.name());
    Ok(z)
}
