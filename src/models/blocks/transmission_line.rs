//! Porous-electrode transmission line (the cathode block).

use crate::error::Result;
use crate::parameters::ParameterSet;
use crate::utils::special::saturating_coth;
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::cpe::ConstantPhase;
use super::diffusion::{diffusion_impedance, DiffusionGeometry};
use super::havriliak_negami::{HavriliakNegami, RelaxationTime};
use super::{j_omega, ImpedanceBlock};

/// Transmission line with matrix resistance `rm`, an interfacial branch of
/// double-layer capacitance in parallel with charge transfer (`rct`) plus
/// diffusion (`rd`), and a blocking constant-phase element at the end.
///
/// The double-layer (`cdl_*`) and diffusion (`cd_*`) capacitances are
/// Havriliak–Negami blocks. The diffusion capacitance increment is scaled by
/// the geometry factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionLine {
    geometry: DiffusionGeometry,
    double_layer: HavriliakNegami,
    diffusion: HavriliakNegami,
    blocking: ConstantPhase,
}

impl TransmissionLine {
    pub const MATRIX_RESISTANCE: &'static str = "rm";
    pub const CHARGE_TRANSFER: &'static str = "rct";
    pub const DIFFUSION_RESISTANCE: &'static str = "rd";

    /// Cathode with direct relaxation times (`cdl_hnt`, `cd_hnt`).
    pub fn new(geometry: DiffusionGeometry) -> Self {
        Self {
            geometry,
            double_layer: HavriliakNegami::new("cdl"),
            diffusion: HavriliakNegami::new("cd").with_geometry_factor(geometry.factor()),
            blocking: ConstantPhase::default(),
        }
    }

    /// Derive the relaxation times from `rct` (double layer) and `rd`
    /// (diffusion) instead of reading them.
    pub fn with_relaxation_from_resistance(mut self) -> Self {
        self.double_layer = self
            .double_layer
            .with_relaxation(RelaxationTime::FromResistance(Self::CHARGE_TRANSFER.to_string()));
        self.diffusion = self
            .diffusion
            .with_relaxation(RelaxationTime::FromResistance(
                Self::DIFFUSION_RESISTANCE.to_string(),
            ));
        self
    }

    pub fn geometry(&self) -> DiffusionGeometry {
        self.geometry
    }
}

impl ImpedanceBlock for TransmissionLine {
    fn parameter_names(&self) -> Vec<String> {
        let mut names = vec![
            Self::MATRIX_RESISTANCE.to_string(),
            Self::CHARGE_TRANSFER.to_string(),
            Self::DIFFUSION_RESISTANCE.to_string(),
        ];
        for name in self
            .double_layer
            .parameter_names()
            .into_iter()
            .chain(self.diffusion.parameter_names())
            .chain(self.blocking.parameter_names())
        {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    fn impedance(&self, params: &ParameterSet, omega: &Array1<f64>) -> Result<Array1<Complex64>> {
        let rm = params.get(Self::MATRIX_RESISTANCE)?;
        let rct = params.get(Self::CHARGE_TRANSFER)?;
        let rd = params.get(Self::DIFFUSION_RESISTANCE)?;
        let dl = self.double_layer.resolve(params)?;
        let diff = self.diffusion.resolve(params)?;
        let cb = self.blocking.capacitance(params, omega)?;

        let mut z = Array1::zeros(omega.len());
        for (i, &w) in omega.iter().enumerate() {
            let jw = j_omega(w);
            let zd = diffusion_impedance(self.geometry, rd, diff.at(w), w);

            let zs = rm;
            let y_p = jw * dl.at(w) + 1.0 / (rct + zd);
            let z_b = (jw * cb[i]).inv();

            let q = (y_p / zs).sqrt();
            let coth = saturating_coth((zs * y_p).sqrt());
            z[i] = (1.0 + z_b * q * coth) / (z_b * y_p / zs + q * coth);
        }
        Ok(z)
    }
}
