//! Quantities derived from an impedance spectrum.
//!
//! With `Y = 1/Z = G + jωC`, the real part of the admittance is the
//! conductance `G = Re(Z)/|Z|²` and the imaginary part gives the effective
//! capacitance `C = −Im(Z)/(|Z|²·ω)`.

use ndarray::{Array1, Zip};
use num_complex::Complex64;
use std::f64::consts::PI;

use crate::data::ImpedanceSpectrum;
use crate::error::{EisFitError, Result};

fn check_lengths(frequencies: &Array1<f64>, other: usize, what: &str) -> Result<()> {
    if frequencies.len() != other {
        return Err(EisFitError::DimensionMismatch(format!(
            "{} frequencies but {} {}",
            frequencies.len(),
            other,
            what
        )));
    }
    Ok(())
}

/// Conductance `Re(Z)/|Z|²` at every point.
pub fn admittance(impedance: &Array1<Complex64>) -> Array1<f64> {
    impedance.mapv(|z| z.re / z.norm_sqr())
}

/// Effective capacitance `−Im(Z)/(|Z|²·2πf)` at every point.
///
/// # Errors
///
/// `DimensionMismatch` when the series lengths differ.
pub fn capacitance(frequencies: &Array1<f64>, impedance: &Array1<Complex64>) -> Result<Array1<f64>> {
    check_lengths(frequencies, impedance.len(), "impedance values")?;
    Ok(Zip::from(frequencies)
        .and(impedance)
        .map_collect(|&f, z| -z.im / (z.norm_sqr() * 2.0 * PI * f)))
}

/// Magnitude of [`capacitance`].
pub fn abs_capacitance(
    frequencies: &Array1<f64>,
    impedance: &Array1<Complex64>,
) -> Result<Array1<f64>> {
    capacitance(frequencies, impedance).map(|c| c.mapv(f64::abs))
}

/// Impedance `1/(G + jωC)` from conductance and capacitance.
///
/// Inverse of [`admittance`] and [`capacitance`].
pub fn impedance_from_admittance_capacitance(
    frequencies: &Array1<f64>,
    conductance: &Array1<f64>,
    capacitance: &Array1<f64>,
) -> Result<Array1<Complex64>> {
    check_lengths(frequencies, conductance.len(), "conductance values")?;
    check_lengths(frequencies, capacitance.len(), "capacitance values")?;
    Ok(Zip::from(frequencies)
        .and(conductance)
        .and(capacitance)
        .map_collect(|&f, &g, &c| Complex64::new(g, 2.0 * PI * f * c).inv()))
}

/// Admittance and capacitance views of one spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSpectrum {
    pub frequencies: Array1<f64>,
    pub admittance: Array1<f64>,
    pub capacitance: Array1<f64>,
    pub abs_capacitance: Array1<f64>,
}

impl DerivedSpectrum {
    /// Compute every derived quantity of `spectrum`.
    pub fn from_spectrum(spectrum: &ImpedanceSpectrum) -> Result<Self> {
        let frequencies = spectrum.frequencies().clone();
        let capacitance = capacitance(&frequencies, spectrum.impedance())?;
        Ok(Self {
            admittance: admittance(spectrum.impedance()),
            abs_capacitance: capacitance.mapv(f64::abs),
            capacitance,
            frequencies,
        })
    }

    /// Rebuild the impedance spectrum from the admittance and capacitance.
    pub fn to_spectrum(&self) -> Result<ImpedanceSpectrum> {
        let impedance = impedance_from_admittance_capacitance(
            &self.frequencies,
            &self.admittance,
            &self.capacitance,
        )?;
        ImpedanceSpectrum::new(self.frequencies.clone(), impedance)
    }
}
