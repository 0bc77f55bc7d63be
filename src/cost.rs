//! Residual and cost construction.
//!
//! Turns the mismatch between a model prediction and measured complex
//! impedance into a real residual vector of length `2N` (real and imaginary
//! parts interleaved) under a chosen weighting. Candidates that are
//! non-physical or make the model blow up are answered with a flat penalty
//! instead of an error, so every backend sees a total objective.

use crate::data::ImpedanceSpectrum;
use crate::error::{EisFitError, Result};
use crate::models::Model;
use crate::parameters::{FreeParameterList, ParameterSet};
use crate::problem::Problem;
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Value of every residual element for a rejected candidate.
pub const PENALTY: f64 = 1e16;

/// The one parameter allowed to be non-positive during a search.
pub const POSITIVITY_EXEMPT: &str = "r_str";

/// Residual weighting scheme.
///
/// With `r = data − calc`:
/// - `Unit`: `r`
/// - `DataProportional`: `Re(r)/Re(data) + j·Im(r)/Im(data)`
/// - `CalcProportional`: `Re(r)/Re(calc) + j·Im(r)/Im(calc)`
/// - `DataModulus`: `r/|data|`
/// - `CalcModulus`: `r/|calc|`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    #[default]
    Unit,
    DataProportional,
    CalcProportional,
    DataModulus,
    CalcModulus,
}

impl Weighting {
    /// Map a numeric weighting code: 2 data-proportional, 3 calc-proportional,
    /// 4 data-modulus, 5 calc-modulus, anything else unit.
    ///
    /// # Examples
    ///
    /// ```
    /// use eisfit_rs::cost::Weighting;
    ///
    /// assert_eq!(Weighting::from_code(4), Weighting::DataModulus);
    /// assert_eq!(Weighting::from_code(0), Weighting::Unit);
    /// ```
    pub fn from_code(code: i32) -> Self {
        match code {
            2 => Weighting::DataProportional,
            3 => Weighting::CalcProportional,
            4 => Weighting::DataModulus,
            5 => Weighting::CalcModulus,
            _ => Weighting::Unit,
        }
    }

    /// Numeric code of this scheme (1 for unit).
    pub fn code(&self) -> i32 {
        match self {
            Weighting::Unit => 1,
            Weighting::DataProportional => 2,
            Weighting::CalcProportional => 3,
            Weighting::DataModulus => 4,
            Weighting::CalcModulus => 5,
        }
    }

    /// Weighted residual for one point.
    pub fn apply(&self, data: Complex64, calc: Complex64) -> Complex64 {
        let r = data - calc;
        match self {
            Weighting::Unit => r,
            Weighting::DataProportional => Complex64::new(r.re / data.re, r.im / data.im),
            Weighting::CalcProportional => Complex64::new(r.re / calc.re, r.im / calc.im),
            Weighting::DataModulus => r / data.norm(),
            Weighting::CalcModulus => r / calc.norm(),
        }
    }
}

/// Weighted residuals flattened as `[Re0, Im0, Re1, Im1, ...]`.
///
/// Divisions by zero are not guarded; non-finite elements are logged and
/// returned as they are.
pub fn weighted_residuals(
    measured: &Array1<Complex64>,
    predicted: &Array1<Complex64>,
    weighting: Weighting,
) -> Result<Array1<f64>> {
    if measured.len() != predicted.len() {
        return Err(EisFitError::DimensionMismatch(format!(
            "{} measured points but {} predicted",
            measured.len(),
            predicted.len()
        )));
    }

    let mut out = Array1::zeros(2 * measured.len());
    for (i, (&data, &calc)) in measured.iter().zip(predicted.iter()).enumerate() {
        let r = weighting.apply(data, calc);
        out[2 * i] = r.re;
        out[2 * i + 1] = r.im;
    }

    if out.iter().any(|v| !v.is_finite()) {
        log::debug!("Non-finite weighted residual under {:?} weighting", weighting);
    }
    Ok(out)
}

/// Whether any candidate component is non-positive, ignoring the exempt name.
fn violates_positivity(candidate: &Array1<f64>, free: &FreeParameterList) -> bool {
    candidate
        .iter()
        .zip(free.iter())
        .any(|(&value, name)| value <= 0.0 && name != POSITIVITY_EXEMPT)
}

/// Residual vector of a fit objective.
///
/// # Arguments
///
/// * `candidate` - Optimizer-space values of the free parameters
/// * `measured` - The points being fitted
/// * `weighting` - Residual weighting scheme
/// * `model` - The circuit model
/// * `free` - Names of the free parameters, in candidate order
/// * `params` - Full parameter set supplying the fixed values
/// * `scale` - Per-parameter multipliers for normalized mode
///
/// # Returns
///
/// * A vector of length `2N`. Every element is [`PENALTY`] if a candidate
///   component is non-positive (other than `r_str`), if the model fails, or
///   if the prediction is not finite.
pub fn cost_vector(
    candidate: &Array1<f64>,
    measured: &ImpedanceSpectrum,
    weighting: Weighting,
    model: &dyn Model,
    free: &FreeParameterList,
    params: &ParameterSet,
    scale: Option<&Array1<f64>>,
) -> Result<Array1<f64>> {
    let penalty = || Array1::from_elem(2 * measured.len(), PENALTY);

    if candidate.len() != free.len() {
        return Err(EisFitError::DimensionMismatch(format!(
            "Expected {} free values, got {}",
            free.len(),
            candidate.len()
        )));
    }
    if violates_positivity(candidate, free) {
        return Ok(penalty());
    }

    let local = free.inject(params, candidate, scale)?;
    let predicted = match model.evaluate(&local, measured.frequencies()) {
        Ok(z) => z,
        Err(e) => {
            log::debug!("Model '{}' failed during search: {}", model.name(), e);
            return Ok(penalty());
        }
    };
    if predicted.iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
        return Ok(penalty());
    }

    weighted_residuals(measured.impedance(), &predicted, weighting)
}

/// Sum of squares of [`cost_vector`].
pub fn cost_scalar(
    candidate: &Array1<f64>,
    measured: &ImpedanceSpectrum,
    weighting: Weighting,
    model: &dyn Model,
    free: &FreeParameterList,
    params: &ParameterSet,
    scale: Option<&Array1<f64>>,
) -> Result<f64> {
    let residuals = cost_vector(candidate, measured, weighting, model, free, params, scale)?;
    Ok(residuals.iter().map(|r| r * r).sum())
}

/// A fit objective bound to its data, model and parameters.
///
/// Implements [`Problem`] so residual-based backends consume it directly, and
/// counts every evaluation.
pub struct ImpedanceCost<'a> {
    model: &'a dyn Model,
    measured: &'a ImpedanceSpectrum,
    free: &'a FreeParameterList,
    params: &'a ParameterSet,
    weighting: Weighting,
    scale: Option<&'a Array1<f64>>,
    evaluations: AtomicUsize,
}

impl<'a> ImpedanceCost<'a> {
    pub fn new(
        model: &'a dyn Model,
        measured: &'a ImpedanceSpectrum,
        free: &'a FreeParameterList,
        params: &'a ParameterSet,
    ) -> Self {
        Self {
            model,
            measured,
            free,
            params,
            weighting: Weighting::Unit,
            scale: None,
            evaluations: AtomicUsize::new(0),
        }
    }

    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    /// Interpret candidates as multiples of `scale` (normalized mode).
    pub fn with_scale(mut self, scale: Option<&'a Array1<f64>>) -> Self {
        self.scale = scale;
        self
    }

    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale
    }

    pub fn free(&self) -> &FreeParameterList {
        self.free
    }

    /// Number of objective evaluations so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Residual vector at `candidate`.
    pub fn residuals(&self, candidate: &Array1<f64>) -> Result<Array1<f64>> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        cost_vector(
            candidate,
            self.measured,
            self.weighting,
            self.model,
            self.free,
            self.params,
            self.scale,
        )
    }

    /// Sum of squared residuals at `candidate`.
    pub fn scalar(&self, candidate: &Array1<f64>) -> Result<f64> {
        let residuals = self.residuals(candidate)?;
        Ok(residuals.iter().map(|r| r * r).sum())
    }

    /// Physical parameter set for an optimizer-space candidate.
    pub fn parameters_at(&self, candidate: &Array1<f64>) -> Result<ParameterSet> {
        self.free.inject(self.params, candidate, self.scale)
    }
}

impl<'a> Problem for ImpedanceCost<'a> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        self.residuals(params)
    }

    fn parameter_count(&self) -> usize {
        self.free.len()
    }

    fn residual_count(&self) -> usize {
        2 * self.measured.len()
    }
}
