//! Two-rail transmission-line model of the separator.
//!
//! Two conducting rails (`Z1`, `Z2`) are coupled by a distributed cross
//! element (`Z3`), with terminal elements `ZA` and `ZB` in series. Every
//! sub-element is a parallel RC.

use crate::error::Result;
use crate::parameters::ParameterSet;
use crate::utils::special::saturating_tanh;
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::rc::parallel_rc;
use super::ImpedanceBlock;

const SEPARATOR_KEYS: [(&str, &str); 5] = [
    ("sep_r1", "sep_c1"),
    ("sep_r2", "sep_c2"),
    ("sep_r3", "sep_c3"),
    ("sep_ra", "sep_ca"),
    ("sep_rb", "sep_cb"),
];

/// Closed-form impedance of the two-rail ladder from its five sub-impedances.
///
/// With `S = Z1 + Z2`, `k = sqrt(S/Z3)` and `t = tanh(k/2)`:
/// `Z = Z1·Z2/S + [(Z1 − Z2)²·t + S²/t] / (2kS) + ZA + ZB`.
pub fn separator_impedance(
    z1: Complex64,
    z2: Complex64,
    z3: Complex64,
    za: Complex64,
    zb: Complex64,
) -> Complex64 {
    let s = z1 + z2;
    let k = (s / z3).sqrt();
    let t = saturating_tanh(k / 2.0);
    let diff = z1 - z2;
    z1 * z2 / s + (diff * diff * t + s * s / t) / (2.0 * k * s) + za + zb
}

/// Separator block reading `sep_r1 sep_c1 … sep_rb sep_cb`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Separator;

impl Separator {
    pub fn new() -> Self {
        Separator
    }
}

impl ImpedanceBlock for Separator {
    fn parameter_names(&self) -> Vec<String> {
        SEPARATOR_KEYS
            .iter()
            .flat_map(|(r, c)| [r.to_string(), c.to_string()])
            .collect()
    }

    fn impedance(&self, params: &ParameterSet, omega: &Array1<f64>) -> Result<Array1<Complex64>> {
        let mut rc = [(0.0, 0.0); 5];
        for (slot, (r_key, c_key)) in rc.iter_mut().zip(SEPARATOR_KEYS.iter()) {
            *slot = (params.get(r_key)?, params.get(c_key)?);
        }

        Ok(omega.mapv(|w| {
            let [z1, z2, z3, za, zb] = rc.map(|(r, c)| parallel_rc(r, c, w));
            separator_impedance(z1, z2, z3, za, zb)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// The textbook two-channel result in hyperbolic functions.
    fn hyperbolic_form(z1: Complex64, z2: Complex64, z3: Complex64) -> Complex64 {
        let s = z1 + z2;
        let k = (s / z3).sqrt();
        z1 * z2 / s * (1.0 + 2.0 / (k * k.sinh())) + (z1 * z1 + z2 * z2) / (s * k) / k.tanh()
    }

    #[test]
    fn test_matches_hyperbolic_form() {
        let cases = [
            (
                Complex64::new(3.0, -2.0),
                Complex64::new(0.5, -0.1),
                Complex64::new(7.0, -4.0),
            ),
            (
                Complex64::new(10.0, 0.0),
                Complex64::new(10.0, 0.0),
                Complex64::new(1.0, -1.0),
            ),
            (
                Complex64::new(0.2, -0.05),
                Complex64::new(40.0, -3.0),
                Complex64::new(200.0, -150.0),
            ),
        ];
        let zero = Complex64::new(0.0, 0.0);
        for (z1, z2, z3) in cases {
            let closed = separator_impedance(z1, z2, z3, zero, zero);
            let expected = hyperbolic_form(z1, z2, z3);
            assert_relative_eq!(closed.re, expected.re, max_relative = 1e-10);
            assert_relative_eq!(closed.im, expected.im, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_dc_limit() {
        // At DC every sub-element is its resistance
        let params = ParameterSet::from_pairs([
            ("sep_r1", 2.0),
            ("sep_c1", 1e-6),
            ("sep_r2", 3.0),
            ("sep_c2", 1e-6),
            ("sep_r3", 5.0),
            ("sep_c3", 1e-6),
            ("sep_ra", 0.5),
            ("sep_ca", 1e-6),
            ("sep_rb", 0.25),
            ("sep_cb", 1e-6),
        ]);
        let sep = Separator::new();
        assert_eq!(sep.parameter_names().len(), 10);

        let z = sep.impedance(&params, &array![0.0]).unwrap();
        let r = |v: f64| Complex64::new(v, 0.0);
        let expected = separator_impedance(r(2.0), r(3.0), r(5.0), r(0.5), r(0.25));
        assert_relative_eq!(z[0].re, expected.re, max_relative = 1e-12);
        assert_relative_eq!(z[0].im, 0.0, epsilon = 1e-12);
    }
}
