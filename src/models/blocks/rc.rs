//! Parallel resistor-capacitor element.

use crate::error::Result;
use crate::parameters::ParameterSet;
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::{j_omega, ImpedanceBlock};

/// `R / (1 + jωRC)`.
#[inline]
pub fn parallel_rc(r: f64, c: f64, omega: f64) -> Complex64 {
    r / (1.0 + j_omega(omega) * (r * c))
}

/// A resistor in parallel with a capacitor, with configurable keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelRc {
    r_key: String,
    c_key: String,
}

impl ParallelRc {
    /// # Examples
    ///
    /// ```
    /// use eisfit_rs::models::blocks::{ImpedanceBlock, ParallelRc};
    /// use eisfit_rs::parameters::ParameterSet;
    /// use ndarray::array;
    ///
    /// let anode = ParallelRc::new("r_an", "c_an");
    /// let params = ParameterSet::from_pairs([("r_an", 5.0), ("c_an", 1e-3)]);
    /// let z = anode.impedance(&params, &array![0.0]).unwrap();
    /// assert_eq!(z[0].re, 5.0);
    /// ```
    pub fn new(r_key: &str, c_key: &str) -> Self {
        Self {
            r_key: r_key.to_ascii_lowercase(),
            c_key: c_key.to_ascii_lowercase(),
        }
    }

    /// The anode element, keys `r_an` and `c_an`.
    pub fn anode() -> Self {
        Self::new("r_an", "c_an")
    }
}

impl ImpedanceBlock for ParallelRc {
    fn parameter_names(&self) -> Vec<String> {
        vec![self.r_key.clone(), self.c_key.clone()]
    }

    fn impedance(&self, params: &ParameterSet, omega: &Array1<f64>) -> Result<Array1<Complex64>> {
        let r = params.get(&self.r_key)?;
        let c = params.get(&self.c_key)?;
        Ok(omega.mapv(|w| parallel_rc(r, c, w)))
    }
}
