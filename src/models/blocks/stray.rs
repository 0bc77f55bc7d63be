//! Stray inductance and series resistance of the cell and leads.

use crate::error::Result;
use crate::parameters::ParameterSet;
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::{j_omega, ImpedanceBlock};

/// Inductance used in place of a non-positive `l_str`.
pub const STRAY_INDUCTANCE_FLOOR: f64 = 1e-20;

/// Resistance used in place of a non-positive `r_str`.
pub const STRAY_RESISTANCE_CEILING: f64 = 1e20;

/// Inductance `L` in parallel with `R`, in series with `R_ohm`.
///
/// Keys `l_str`, `r_str`, `r_ohm`. `r_str` may legitimately be driven to zero
/// or below by a search; the block then treats the resistor as open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stray;

impl Stray {
    pub const INDUCTANCE: &'static str = "l_str";
    pub const RESISTANCE: &'static str = "r_str";
    pub const OHMIC: &'static str = "r_ohm";

    pub fn new() -> Self {
        Stray
    }
}

impl ImpedanceBlock for Stray {
    fn parameter_names(&self) -> Vec<String> {
        vec![
            Self::INDUCTANCE.to_string(),
            Self::RESISTANCE.to_string(),
            Self::OHMIC.to_string(),
        ]
    }

    fn impedance(&self, params: &ParameterSet, omega: &Array1<f64>) -> Result<Array1<Complex64>> {
        let mut l = params.get(Self::INDUCTANCE)?;
        let mut r = params.get(Self::RESISTANCE)?;
        let r_ohm = params.get(Self::OHMIC)?;

        if l <= 0.0 {
            l = STRAY_INDUCTANCE_FLOOR;
        }
        if r <= 0.0 {
            r = STRAY_RESISTANCE_CEILING;
        }

        // 1/(1/(jωL) + 1/R), written so that ω = 0 stays finite
        Ok(omega.mapv(|w| {
            let zl = j_omega(w) * l;
            zl * r / (zl + r) + r_ohm
        }))
    }
}
