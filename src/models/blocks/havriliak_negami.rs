//! Havriliak–Negami relaxation capacitance.

use crate::error::Result;
use crate::parameters::ParameterSet;
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::j_omega;

/// How the relaxation time of a Havriliak–Negami block is obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelaxationTime {
    /// Read directly from `{prefix}_hnt`.
    Direct,
    /// Derived from the named resistance and the block's own shape parameters.
    FromResistance(String),
}

/// Complex capacitance `C0 + ΔC_eff / (1 + (jωτ)^U)^P` at one angular frequency.
///
/// # Examples
///
/// ```
/// use eisfit_rs::models::blocks::hn_capacitance;
///
/// // Debye relaxation (P = U = 1) at ωτ = 1 loses half of its increment
/// let c = hn_capacitance(1.0, 1.0, 2.0, 1.0, 1.0, 1.0);
/// assert!((c.re - 2.0).abs() < 1e-12);
/// assert!((c.im + 1.0).abs() < 1e-12);
/// ```
pub fn hn_capacitance(omega: f64, c0: f64, delta_c: f64, tau: f64, p: f64, u: f64) -> Complex64 {
    let relaxation = (1.0 + (j_omega(omega) * tau).powf(u)).powf(p);
    c0 + delta_c / relaxation
}

/// Relaxation time implied by a resistance in series with the relaxation:
/// `τ = R·ΔC·[sin(πUP/(2(P+1))) / sin(πU/(2(P+1)))]^(1/U)`.
pub fn relaxation_time_from_resistance(r: f64, delta_c: f64, p: f64, u: f64) -> f64 {
    let denom = 2.0 * (p + 1.0);
    let ratio = (PI * u * p / denom).sin() / (PI * u / denom).sin();
    r * delta_c * ratio.powf(1.0 / u)
}

/// Resolved values of a Havriliak–Negami block for one parameter set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HnValues {
    pub c0: f64,
    /// Increment after the geometry factor has been applied.
    pub delta_c: f64,
    pub tau: f64,
    pub p: f64,
    pub u: f64,
}

impl HnValues {
    /// Capacitance at angular frequency `omega`.
    pub fn at(&self, omega: f64) -> Complex64 {
        hn_capacitance(omega, self.c0, self.delta_c, self.tau, self.p, self.u)
    }
}

/// A Havriliak–Negami capacitance whose parameters share a name prefix.
///
/// Keys are `{prefix}_c0`, `{prefix}_hnc`, `{prefix}_hnp`, `{prefix}_hnu` and,
/// for a direct relaxation time, `{prefix}_hnt`.
///
/// The geometry factor `g` rescales the increment to
/// `g·(ΔC + C0) − C0`, which is `ΔC` for `g = 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HavriliakNegami {
    prefix: String,
    relaxation: RelaxationTime,
    geometry_factor: f64,
}

impl HavriliakNegami {
    /// Create a block with a direct relaxation time and geometry factor 1.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_ascii_lowercase(),
            relaxation: RelaxationTime::Direct,
            geometry_factor: 1.0,
        }
    }

    pub fn with_relaxation(mut self, relaxation: RelaxationTime) -> Self {
        self.relaxation = relaxation;
        self
    }

    pub fn with_geometry_factor(mut self, factor: f64) -> Self {
        self.geometry_factor = factor;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn relaxation(&self) -> &RelaxationTime {
        &self.relaxation
    }

    pub fn geometry_factor(&self) -> f64 {
        self.geometry_factor
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}_{}", self.prefix, suffix)
    }

    /// Parameter names this block reads.
    pub fn parameter_names(&self) -> Vec<String> {
        let mut names = vec![self.key("c0"), self.key("hnc")];
        match &self.relaxation {
            RelaxationTime::Direct => names.push(self.key("hnt")),
            RelaxationTime::FromResistance(r_key) => names.push(r_key.to_ascii_lowercase()),
        }
        names.push(self.key("hnp"));
        names.push(self.key("hnu"));
        names
    }

    /// Read the block's values out of a parameter set.
    pub fn resolve(&self, params: &ParameterSet) -> Result<HnValues> {
        let c0 = params.get(&self.key("c0"))?;
        let hnc = params.get(&self.key("hnc"))?;
        let p = params.get(&self.key("hnp"))?;
        let u = params.get(&self.key("hnu"))?;
        let tau = match &self.relaxation {
            RelaxationTime::Direct => params.get(&self.key("hnt"))?,
            RelaxationTime::FromResistance(r_key) => {
                relaxation_time_from_resistance(params.get(r_key)?, hnc, p, u)
            }
        };

        Ok(HnValues {
            c0,
            delta_c: self.geometry_factor * (hnc + c0) - c0,
            tau,
            p,
            u,
        })
    }

    /// Capacitance at each angular frequency.
    pub fn capacitance(
        &self,
        params: &ParameterSet,
        omega: &Array1<f64>,
    ) -> Result<Array1<Complex64>> {
        let values = self.resolve(params)?;
        Ok(omega.mapv(|w| values.at(w)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn hn_params() -> ParameterSet {
        ParameterSet::from_pairs([
            ("cd_c0", 1e-3),
            ("cd_hnc", 5e-2),
            ("cd_hnt", 1e-2),
            ("cd_hnp", 0.8),
            ("cd_hnu", 0.9),
            ("rd", 25.0),
        ])
    }

    #[test]
    fn test_limits() {
        let params = hn_params();
        let block = HavriliakNegami::new("cd");

        // Low frequency recovers C0 + ΔC, high frequency only C0
        let c = block.capacitance(&params, &array![1e-9, 1e12]).unwrap();
        assert_relative_eq!(c[0].re, 1e-3 + 5e-2, max_relative = 1e-6);
        assert_relative_eq!(c[1].re, 1e-3, max_relative = 1e-3);
    }

    #[test]
    fn test_geometry_factor_one_is_plain_block() {
        let params = hn_params();
        let omega = array![0.1, 10.0, 1e3];
        let plain = HavriliakNegami::new("cd").capacitance(&params, &omega).unwrap();
        let scaled = HavriliakNegami::new("cd")
            .with_geometry_factor(1.0)
            .capacitance(&params, &omega)
            .unwrap();
        for (a, b) in plain.iter().zip(scaled.iter()) {
            assert_relative_eq!(a.re, b.re, max_relative = 1e-14);
            assert_relative_eq!(a.im, b.im, max_relative = 1e-14);
        }

        // g = 2 doubles the total low-frequency capacitance
        let values = HavriliakNegami::new("cd")
            .with_geometry_factor(2.0)
            .resolve(&params)
            .unwrap();
        assert_relative_eq!(values.c0 + values.delta_c, 2.0 * (1e-3 + 5e-2), max_relative = 1e-14);
    }

    #[test]
    fn test_relaxation_from_resistance() {
        // Debye case: the bracket is 1 and τ = R·ΔC
        assert_relative_eq!(relaxation_time_from_resistance(10.0, 1e-3, 1.0, 1.0), 1e-2);

        let block = HavriliakNegami::new("cd")
            .with_relaxation(RelaxationTime::FromResistance("rd".to_string()));
        let names = block.parameter_names();
        assert!(names.contains(&"rd".to_string()));
        assert!(!names.contains(&"cd_hnt".to_string()));

        let values = block.resolve(&hn_params()).unwrap();
        assert_relative_eq!(
            values.tau,
            relaxation_time_from_resistance(25.0, 5e-2, 0.8, 0.9),
            max_relative = 1e-14
        );
    }

    #[test]
    fn test_missing_key() {
        let params = ParameterSet::from_pairs([("cdl_c0", 1.0)]);
        assert!(HavriliakNegami::new("cdl").resolve(&params).is_err());
    }
}
