//! Fit orchestration.
//!
//! A [`Fitter`] binds a model to a [`FitConfig`] and runs one of four
//! backends behind a single contract: validate once, minimize the weighted
//! residuals, then derive chi-square, covariance and uncertainties with the
//! same convention whatever backend produced the solution.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::cancel::{is_cancelled, CancellationToken};
use crate::cost::{ImpedanceCost, Weighting};
use crate::data::{FitData, ImpedanceSpectrum};
use crate::derived::DerivedSpectrum;
use crate::error::{EisFitError, Result};
use crate::global_opt::{DifferentialEvolution, GlobalOptimizer};
use crate::lm::{ClassicLevenbergMarquardt, LmConfig, TrustRegionLeastSquares};
use crate::models::Model;
use crate::parameters::{format_parameter_table, FreeParameterList, ParameterSet, ParameterTableEntry};
use crate::quasi_newton::QuasiNewton;
use crate::uncertainty::{
    calculate_correlation, covariance_from_inverse_hessian, covariance_from_jacobian_svd,
    covariance_from_normal_equations, Uncertainty, UncertaintyCalculator,
};

/// Optimization backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Bounded global search, no covariance
    DifferentialEvolution,
    /// Trust-region least squares
    #[default]
    #[serde(alias = "least_squares")]
    TrustRegion,
    /// Classic Levenberg–Marquardt
    #[serde(alias = "leastsq")]
    LevenbergMarquardt,
    /// BFGS on the scalar cost
    #[serde(alias = "minimize")]
    QuasiNewton,
}

impl Algorithm {
    /// Every backend, in the order they are usually offered.
    pub const ALL: [Algorithm; 4] = [
        Algorithm::LevenbergMarquardt,
        Algorithm::TrustRegion,
        Algorithm::QuasiNewton,
        Algorithm::DifferentialEvolution,
    ];

    /// The short method name (`leastsq`, `least_squares`, `minimize`,
    /// `differential_evolution`).
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::DifferentialEvolution => "differential_evolution",
            Algorithm::TrustRegion => "least_squares",
            Algorithm::LevenbergMarquardt => "leastsq",
            Algorithm::QuasiNewton => "minimize",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = EisFitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "differential_evolution" => Ok(Algorithm::DifferentialEvolution),
            "least_squares" | "trust_region" => Ok(Algorithm::TrustRegion),
            "leastsq" | "levenberg_marquardt" => Ok(Algorithm::LevenbergMarquardt),
            "minimize" | "quasi_newton" | "bfgs" => Ok(Algorithm::QuasiNewton),
            _ => Err(EisFitError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Fit settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Backend. Default: trust region
    pub algorithm: Algorithm,
    /// Residual weighting. Default: unit
    pub weighting: Weighting,
    /// Optimize multiples of the initial guess instead of raw values. Default: false
    pub normalized: bool,
    /// Evaluation budget; generation cap for differential evolution. Default: 100000
    pub max_evaluations: usize,
    /// Fit only the points with negative imaginary impedance. Default: true
    pub restrict_negative_imag: bool,
    /// Local backend tolerance. Default: machine epsilon
    pub tolerance: f64,
    /// Differential evolution tolerance. Default: 1e-4
    pub global_tolerance: f64,
    /// Differential evolution box, in optimizer space. Default: (0.1, 10)
    pub global_bounds: (f64, f64),
    /// Differential evolution seed. Default: 211
    pub seed: u64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::TrustRegion,
            weighting: Weighting::Unit,
            normalized: false,
            max_evaluations: 100_000,
            restrict_negative_imag: true,
            tolerance: f64::EPSILON,
            global_tolerance: 1e-4,
            global_bounds: (0.1, 10.0),
            seed: 211,
        }
    }
}

impl FitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }

    pub fn with_restrict_negative_imag(mut self, restrict: bool) -> Self {
        self.restrict_negative_imag = restrict;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_global_tolerance(mut self, tolerance: f64) -> Self {
        self.global_tolerance = tolerance;
        self
    }

    pub fn with_global_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.global_bounds = (lower, upper);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Load a configuration from JSON; missing fields take their defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use eisfit_rs::fit::{Algorithm, FitConfig};
    ///
    /// let config = FitConfig::from_json(r#"{"algorithm": "leastsq", "normalized": true}"#).unwrap();
    /// assert_eq!(config.algorithm, Algorithm::LevenbergMarquardt);
    /// assert!(config.normalized);
    /// assert_eq!(config.seed, 211);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Immutable record of one completed fit.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Full parameter set with the fitted values written in
    pub parameters: ParameterSet,
    /// The parameters that were varied
    pub free: FreeParameterList,
    /// One entry per free parameter, in free-list order
    pub uncertainties: Vec<Uncertainty>,
    /// Covariance of the free parameters in physical units
    pub covariance: Option<Array2<f64>>,
    pub chisqr: f64,
    pub redchi: f64,
    pub success: bool,
    pub message: String,
    /// Objective evaluations spent by the backend
    pub nfev: usize,
    /// `Σ|Z_fit − Z_measured|` over the fitted points
    pub residual_sum: f64,
    /// Fitted model over the full frequency series
    pub predicted: ImpedanceSpectrum,
    pub algorithm: Algorithm,
}

impl FitResult {
    /// Fitted value of a parameter.
    pub fn value(&self, name: &str) -> Result<f64> {
        self.parameters.get(name)
    }

    /// Uncertainty of a free parameter; `None` for fixed or unknown names.
    pub fn uncertainty(&self, name: &str) -> Option<Uncertainty> {
        self.free
            .index_of(name)
            .and_then(|i| self.uncertainties.get(i).copied())
    }

    /// Correlation matrix of the free parameters.
    pub fn correlation(&self) -> Option<Array2<f64>> {
        self.covariance.as_ref().map(calculate_correlation)
    }

    /// Interchange entries for every parameter, free ones carrying their errors.
    pub fn table_entries(&self) -> Vec<ParameterTableEntry> {
        self.parameters
            .iter()
            .map(|(name, &value)| {
                let uncertainty = self.uncertainty(name);
                ParameterTableEntry {
                    name: name.clone(),
                    value,
                    error: uncertainty.and_then(|u| u.stderr()),
                    error_percent: uncertainty.and_then(|u| u.percent()),
                }
            })
            .collect()
    }

    /// Interchange `(header, values)` rows.
    pub fn to_table(&self) -> (String, String) {
        format_parameter_table(&self.table_entries())
    }

    /// Admittance and capacitance of the fitted spectrum.
    pub fn derived(&self) -> Result<DerivedSpectrum> {
        DerivedSpectrum::from_spectrum(&self.predicted)
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit Result ({}):", self.algorithm)?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Function evaluations: {}", self.nfev)?;
        writeln!(f, "  Chi-square: {:.6e}", self.chisqr)?;
        writeln!(f, "  Reduced chi-square: {:.6e}", self.redchi)?;
        writeln!(f, "  Residual sum: {:.6e}", self.residual_sum)?;
        writeln!(f, "  Parameters:")?;
        for (name, value) in self.parameters.iter() {
            match self.uncertainty(name) {
                Some(Uncertainty::Available { stderr, percent }) => writeln!(
                    f,
                    "    {:<12} {:>14.6e} +/- {:.6e} ({:.2}%)",
                    name, value, stderr, percent
                )?,
                Some(Uncertainty::Unavailable) => {
                    writeln!(f, "    {:<12} {:>14.6e} +/- N/A", name, value)?
                }
                None => writeln!(f, "    {:<12} {:>14.6e} (fixed)", name, value)?,
            }
        }
        Ok(())
    }
}

/// What a backend leaves behind, in optimizer space.
struct BackendOutcome {
    solution: Array1<f64>,
    success: bool,
    message: String,
    base_covariance: Option<Array2<f64>>,
}

/// Runs fits of one model with one configuration.
#[derive(Clone)]
pub struct Fitter {
    model: Arc<dyn Model>,
    config: FitConfig,
}

impl fmt::Debug for Fitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fitter")
            .field("model", &self.model.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Fitter {
    pub fn new<M: Model + 'static>(model: M, config: FitConfig) -> Self {
        Self::with_shared_model(Arc::new(model), config)
    }

    pub fn with_shared_model(model: Arc<dyn Model>, config: FitConfig) -> Self {
        Self { model, config }
    }

    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }

    pub fn shared_model(&self) -> Arc<dyn Model> {
        Arc::clone(&self.model)
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Fit the free parameters to `spectrum`.
    ///
    /// # Arguments
    ///
    /// * `spectrum` - Measured frequencies and impedances
    /// * `params` - Initial values for every model parameter
    /// * `free` - The parameters to vary
    ///
    /// # Returns
    ///
    /// * The fit result. A backend that fails to converge still yields
    ///   `Ok` with `success == false`; configuration problems are errors.
    pub fn fit(
        &self,
        spectrum: &ImpedanceSpectrum,
        params: &ParameterSet,
        free: &FreeParameterList,
    ) -> Result<FitResult> {
        self.fit_with_cancel(spectrum, params, free, None)
    }

    /// [`Fitter::fit`] with a cancellation token.
    ///
    /// # Errors
    ///
    /// `Cancelled` when the token is set by the time the backend returns.
    pub fn fit_with_cancel(
        &self,
        spectrum: &ImpedanceSpectrum,
        params: &ParameterSet,
        free: &FreeParameterList,
        cancel: Option<&CancellationToken>,
    ) -> Result<FitResult> {
        let model = self.model.as_ref();
        model.validate(params)?;
        free.validate_against(params)?;
        if free.is_empty() {
            return Err(EisFitError::InvalidInput(
                "At least one free parameter is required".to_string(),
            ));
        }

        let data = FitData::new(spectrum, self.config.restrict_negative_imag);
        let measured = data.subset();
        let n_points = measured.len();
        let n_free = free.len();
        if n_points <= n_free {
            return Err(EisFitError::DegenerateDof { n_points, n_free });
        }

        let guess = free.values_from(params)?;
        let scale = if self.config.normalized {
            if guess.iter().any(|&g| g == 0.0 || !g.is_finite()) {
                return Err(EisFitError::InvalidInput(
                    "Normalized fitting needs finite non-zero initial values".to_string(),
                ));
            }
            Some(guess.clone())
        } else {
            None
        };
        let initial = match scale {
            Some(_) => Array1::ones(n_free),
            None => guess,
        };

        log::info!(
            "Fitting model '{}' with {} ({} free parameters, {} points, weighting {:?})",
            model.name(),
            self.config.algorithm,
            n_free,
            n_points,
            self.config.weighting
        );

        let cost = ImpedanceCost::new(model, measured, free, params)
            .with_weighting(self.config.weighting)
            .with_scale(scale.as_ref());

        let outcome = self.run_backend(&cost, &initial, cancel)?;
        if is_cancelled(cancel) {
            return Err(EisFitError::Cancelled);
        }
        let nfev = cost.evaluations();
        log::debug!("Backend finished: {}", outcome.message);

        let chisqr = cost.scalar(&outcome.solution)?;
        let calculator = UncertaintyCalculator::new(n_points, n_free, chisqr)?;

        let (values, covariance) = match scale.as_ref() {
            Some(scale) => (
                &outcome.solution * scale,
                outcome
                    .base_covariance
                    .map(|base| calculator.scale(&base) * &outer(scale)),
            ),
            None => (
                outcome.solution.clone(),
                outcome.base_covariance.map(|base| calculator.scale(&base)),
            ),
        };
        let uncertainties = calculator.uncertainties(covariance.as_ref(), &values)?;

        let fitted = cost.parameters_at(&outcome.solution)?;

        let fitted_subset = model.evaluate(&fitted, measured.frequencies())?;
        let residual_sum: f64 = fitted_subset
            .iter()
            .zip(measured.impedance().iter())
            .map(|(z_fit, z_meas)| (z_fit - z_meas).norm())
            .sum();

        let predicted = model
            .evaluate(&fitted, spectrum.frequencies())?
            .mapv(|z| if z.is_finite() { z } else { Complex64::new(0.0, 0.0) });
        let predicted = ImpedanceSpectrum::new(spectrum.frequencies().clone(), predicted)?;

        log::info!(
            "Fit of '{}' finished: success = {}, chisqr = {:.6e}, redchi = {:.6e}, nfev = {}",
            model.name(),
            outcome.success,
            chisqr,
            calculator.redchi,
            nfev
        );

        Ok(FitResult {
            parameters: fitted,
            free: free.clone(),
            uncertainties,
            covariance,
            chisqr,
            redchi: calculator.redchi,
            success: outcome.success,
            message: outcome.message,
            nfev,
            residual_sum,
            predicted,
            algorithm: self.config.algorithm,
        })
    }

    fn run_backend(
        &self,
        cost: &ImpedanceCost<'_>,
        initial: &Array1<f64>,
        cancel: Option<&CancellationToken>,
    ) -> Result<BackendOutcome> {
        let config = &self.config;
        let lm_config = LmConfig::default()
            .with_tolerance(config.tolerance)
            .with_max_evaluations(config.max_evaluations);

        match config.algorithm {
            Algorithm::DifferentialEvolution => {
                let bounds = vec![config.global_bounds; initial.len()];
                let result = DifferentialEvolution::new()
                    .with_tolerance(config.global_tolerance)
                    .with_max_generations(config.max_evaluations)
                    .with_seed(config.seed)
                    .optimize(cost, &bounds, cancel)?;
                Ok(BackendOutcome {
                    solution: result.params,
                    success: result.success,
                    message: result.message,
                    base_covariance: None,
                })
            }
            Algorithm::TrustRegion => {
                let result =
                    TrustRegionLeastSquares::with_config(lm_config).minimize(cost, initial, cancel)?;
                let base_covariance = result.jacobian.as_ref().and_then(|jac| {
                    covariance_from_jacobian_svd(jac)
                        .map_err(|e| log::warn!("Covariance unavailable: {}", e))
                        .ok()
                });
                Ok(BackendOutcome {
                    solution: result.params,
                    success: result.success,
                    message: result.message,
                    base_covariance,
                })
            }
            Algorithm::LevenbergMarquardt => {
                let result = ClassicLevenbergMarquardt::with_config(lm_config)
                    .minimize(cost, initial, cancel)?;
                let base_covariance = result
                    .jacobian
                    .as_ref()
                    .and_then(covariance_from_normal_equations);
                if base_covariance.is_none() {
                    log::warn!("Covariance unavailable: singular normal matrix at the solution");
                }
                Ok(BackendOutcome {
                    solution: result.params,
                    success: result.success,
                    message: result.message,
                    base_covariance,
                })
            }
            Algorithm::QuasiNewton => {
                let result = QuasiNewton::new()
                    .with_tolerance(config.tolerance)
                    .with_max_iterations(config.max_evaluations as u64)
                    .minimize(cost, initial, cancel)?;
                let base_covariance = result.inv_hessian.as_ref().map(covariance_from_inverse_hessian);
                if base_covariance.is_none() {
                    log::warn!("Covariance unavailable: no inverse Hessian from BFGS");
                }
                Ok(BackendOutcome {
                    solution: result.params,
                    success: result.success,
                    message: result.message,
                    base_covariance,
                })
            }
        }
    }
}

/// `s·sᵀ`, the elementwise factor that maps a covariance to scaled units.
fn outer(scale: &Array1<f64>) -> Array2<f64> {
    let n = scale.len();
    Array2::from_shape_fn((n, n), |(i, j)| scale[i] * scale[j])
}
