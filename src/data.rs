//! Measured impedance spectra and the subset used for fitting.

use crate::error::{EisFitError, Result};
use crate::models::Model;
use crate::parameters::ParameterSet;
use ndarray::Array1;
use num_complex::Complex64;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Paired frequency (Hz) and complex impedance series of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpedanceSpectrum {
    frequencies: Array1<f64>,
    impedance: Array1<Complex64>,
}

impl ImpedanceSpectrum {
    /// Pair frequencies with impedances.
    ///
    /// # Returns
    ///
    /// * The spectrum, or `DimensionMismatch` if the lengths differ
    pub fn new(frequencies: Array1<f64>, impedance: Array1<Complex64>) -> Result<Self> {
        if frequencies.len() != impedance.len() {
            return Err(EisFitError::DimensionMismatch(format!(
                "{} frequencies but {} impedance values",
                frequencies.len(),
                impedance.len()
            )));
        }
        Ok(Self {
            frequencies,
            impedance,
        })
    }

    /// Build a spectrum from separate real and imaginary parts.
    pub fn from_parts(frequencies: Array1<f64>, re: &Array1<f64>, im: &Array1<f64>) -> Result<Self> {
        if re.len() != im.len() {
            return Err(EisFitError::DimensionMismatch(format!(
                "{} real parts but {} imaginary parts",
                re.len(),
                im.len()
            )));
        }
        let impedance = re
            .iter()
            .zip(im.iter())
            .map(|(&r, &i)| Complex64::new(r, i))
            .collect();
        Self::new(frequencies, impedance)
    }

    pub fn frequencies(&self) -> &Array1<f64> {
        &self.frequencies
    }

    pub fn impedance(&self) -> &Array1<Complex64> {
        &self.impedance
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Points at the given indices, in the order given.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            frequencies: indices.iter().map(|&i| self.frequencies[i]).collect(),
            impedance: indices.iter().map(|&i| self.impedance[i]).collect(),
        }
    }

    /// Indices of the points whose imaginary part is strictly negative.
    pub fn negative_imaginary_indices(&self) -> Vec<usize> {
        self.impedance
            .iter()
            .enumerate()
            .filter(|(_, z)| z.im < 0.0)
            .map(|(i, _)| i)
            .collect()
    }

    /// The capacitive (`Im(Z) < 0`) points, in original order.
    ///
    /// # Examples
    ///
    /// ```
    /// use eisfit_rs::data::ImpedanceSpectrum;
    /// use ndarray::array;
    /// use num_complex::Complex64;
    ///
    /// let spectrum = ImpedanceSpectrum::new(
    ///     array![1.0, 10.0, 100.0],
    ///     array![
    ///         Complex64::new(5.0, -2.0),
    ///         Complex64::new(4.0, 0.0),
    ///         Complex64::new(3.0, 0.5),
    ///     ],
    /// )
    /// .unwrap();
    /// let subset = spectrum.negative_imaginary_subset();
    /// assert_eq!(subset.len(), 1);
    /// assert_eq!(subset.frequencies()[0], 1.0);
    /// ```
    pub fn negative_imaginary_subset(&self) -> Self {
        self.select(&self.negative_imaginary_indices())
    }
}

/// The full measured spectrum together with the points a fit uses.
#[derive(Debug, Clone, PartialEq)]
pub struct FitData {
    full: ImpedanceSpectrum,
    subset: ImpedanceSpectrum,
}

impl FitData {
    /// Select the fit subset.
    ///
    /// With `restrict_negative_imag` only the capacitive points are fitted;
    /// otherwise the whole spectrum is.
    pub fn new(spectrum: &ImpedanceSpectrum, restrict_negative_imag: bool) -> Self {
        let subset = if restrict_negative_imag {
            spectrum.negative_imaginary_subset()
        } else {
            spectrum.clone()
        };
        Self {
            full: spectrum.clone(),
            subset,
        }
    }

    pub fn full(&self) -> &ImpedanceSpectrum {
        &self.full
    }

    pub fn subset(&self) -> &ImpedanceSpectrum {
        &self.subset
    }
}

/// `n` frequencies spaced evenly in log10 between `f_min` and `f_max` (Hz).
pub fn log_spaced_frequencies(f_min: f64, f_max: f64, n: usize) -> Array1<f64> {
    Array1::logspace(10.0, f_min.log10(), f_max.log10(), n)
}

/// Simulate a spectrum and add proportional Gaussian noise.
///
/// Each real and imaginary part is multiplied by `1 + noise·ε` with
/// independent standard-normal `ε`. A `noise` of zero returns the exact
/// model prediction.
///
/// # Arguments
///
/// * `model` - The model to simulate
/// * `params` - Values for every parameter the model reads
/// * `freqs` - Frequencies in Hz
/// * `noise` - Relative noise level
/// * `rng` - Source of randomness, seeded by the caller for reproducibility
pub fn synthetic_spectrum<R: Rng + ?Sized>(
    model: &dyn Model,
    params: &ParameterSet,
    freqs: &Array1<f64>,
    noise: f64,
    rng: &mut R,
) -> Result<ImpedanceSpectrum> {
    model.validate(params)?;
    let clean = model.evaluate(params, freqs)?;

    let noisy = clean.mapv(|z| {
        if noise == 0.0 {
            return z;
        }
        let er: f64 = StandardNormal.sample(rng);
        let ei: f64 = StandardNormal.sample(rng);
        Complex64::new(z.re * (1.0 + noise * er), z.im * (1.0 + noise * ei))
    });

    ImpedanceSpectrum::new(freqs.clone(), noisy)
}
