//! Constant-phase element.

use crate::error::Result;
use crate::parameters::ParameterSet;
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::{j_omega, ImpedanceBlock};

/// Complex capacitance `T·(jω)^(P−1)` of a constant-phase element.
pub fn cpe_capacitance(t: f64, p: f64, omega: f64) -> Complex64 {
    t * j_omega(omega).powf(p - 1.0)
}

/// Constant-phase element with impedance `1/(jω·T·(jω)^(P−1)) = 1/(T·(jω)^P)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantPhase {
    t_key: String,
    p_key: String,
}

impl Default for ConstantPhase {
    /// The blocking element of the cathode, keys `cpe_b_t` and `cpe_b_p`.
    fn default() -> Self {
        Self::new("cpe_b_t", "cpe_b_p")
    }
}

impl ConstantPhase {
    pub fn new(t_key: &str, p_key: &str) -> Self {
        Self {
            t_key: t_key.to_ascii_lowercase(),
            p_key: p_key.to_ascii_lowercase(),
        }
    }

    /// Complex capacitance at each angular frequency.
    pub fn capacitance(
        &self,
        params: &ParameterSet,
        omega: &Array1<f64>,
    ) -> Result<Array1<Complex64>> {
        let t = params.get(&self.t_key)?;
        let p = params.get(&self.p_key)?;
        Ok(omega.mapv(|w| cpe_capacitance(t, p, w)))
    }
}

impl ImpedanceBlock for ConstantPhase {
    fn parameter_names(&self) -> Vec<String> {
        vec![self.t_key.clone(), self.p_key.clone()]
    }

    fn impedance(&self, params: &ParameterSet, omega: &Array1<f64>) -> Result<Array1<Complex64>> {
        let t = params.get(&self.t_key)?;
        let p = params.get(&self.p_key)?;
        Ok(omega.mapv(|w| (j_omega(w) * cpe_capacitance(t, p, w)).inv()))
    }
}
