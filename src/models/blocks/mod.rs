//! Circuit building blocks.
//!
//! Each block is a closed-form transfer function of angular frequency that
//! reads its values from a [`ParameterSet`] by name. Blocks are stateless: the
//! same block value can be evaluated concurrently for different parameter sets.
//!
//! Blocks never panic on degenerate values. Non-finite results are passed
//! through so the cost builder can turn them into a penalty.

use crate::error::Result;
use crate::parameters::ParameterSet;
use ndarray::Array1;
use num_complex::Complex64;

mod cpe;
mod diffusion;
mod havriliak_negami;
mod rc;
mod separator;
mod stray;
mod transmission_line;

pub use cpe::{cpe_capacitance, ConstantPhase};
pub use diffusion::{diffusion_impedance, DiffusionGeometry};
pub use havriliak_negami::{
    hn_capacitance, relaxation_time_from_resistance, HavriliakNegami, HnValues, RelaxationTime,
};
pub use rc::{parallel_rc, ParallelRc};
pub use separator::Separator;
pub use stray::{Stray, STRAY_INDUCTANCE_FLOOR, STRAY_RESISTANCE_CEILING};
pub use transmission_line::TransmissionLine;

/// A block that contributes an impedance to a series circuit.
pub trait ImpedanceBlock {
    /// Parameter names this block reads.
    fn parameter_names(&self) -> Vec<String>;

    /// Impedance at each angular frequency `omega` (rad/s).
    fn impedance(&self, params: &ParameterSet, omega: &Array1<f64>) -> Result<Array1<Complex64>>;
}

/// The imaginary unit times `omega`.
#[inline]
pub(crate) fn j_omega(omega: f64) -> Complex64 {
    Complex64::new(0.0, omega)
}
