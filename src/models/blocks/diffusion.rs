//! Finite-length diffusion impedance for three particle geometries.

use crate::error::{EisFitError, Result};
use crate::utils::special::{bessel_i1_i0_ratio, saturating_tanh};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::j_omega;

/// Shape of the diffusion domain.
///
/// The geometry factor (1, 2, 3) also scales the diffusion capacitance
/// increment of the cathode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffusionGeometry {
    Planar,
    Cylindrical,
    Spherical,
}

impl DiffusionGeometry {
    pub fn factor(&self) -> f64 {
        match self {
            DiffusionGeometry::Planar => 1.0,
            DiffusionGeometry::Cylindrical => 2.0,
            DiffusionGeometry::Spherical => 3.0,
        }
    }

    /// Geometry for a factor of 1, 2 or 3.
    pub fn from_factor(factor: u8) -> Result<Self> {
        match factor {
            1 => Ok(DiffusionGeometry::Planar),
            2 => Ok(DiffusionGeometry::Cylindrical),
            3 => Ok(DiffusionGeometry::Spherical),
            other => Err(EisFitError::InvalidInput(format!(
                "diffusion geometry factor must be 1, 2 or 3, got {}",
                other
            ))),
        }
    }
}

/// Diffusion impedance with resistance `rd` and complex capacitance `cstar`.
///
/// With `x = sqrt(Rd·jω·C*)`:
/// - planar: `sqrt(Rd/(jωC*)) / tanh(x)`
/// - cylindrical: `Rd·I0(x) / (x·I1(x))`
/// - spherical: `tanh(x) / (sqrt(jωC*/Rd) − tanh(x)/Rd)`
pub fn diffusion_impedance(
    geometry: DiffusionGeometry,
    rd: f64,
    cstar: Complex64,
    omega: f64,
) -> Complex64 {
    let jwc = j_omega(omega) * cstar;
    let x = (rd * jwc).sqrt();

    match geometry {
        DiffusionGeometry::Planar => (rd / jwc).sqrt() / saturating_tanh(x),
        DiffusionGeometry::Cylindrical => rd / (x * bessel_i1_i0_ratio(x)),
        DiffusionGeometry::Spherical => {
            let t = saturating_tanh(x);
            t / ((jwc / rd).sqrt() - t / rd)
        }
    }
}
