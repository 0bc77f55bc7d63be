//! Circuits as ordered series sums of blocks.

use crate::error::{EisFitError, Result};
use crate::models::blocks::{
    ConstantPhase, DiffusionGeometry, ImpedanceBlock, ParallelRc, Separator, Stray,
    TransmissionLine,
};
use crate::models::Model;
use crate::parameters::ParameterSet;
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Names accepted by [`Circuit::by_name`].
pub const AVAILABLE_MODELS: [&str; 6] = [
    "rc",
    "bpl-planar",
    "bpl-cylindrical",
    "bpl-spherical",
    "phy-eis",
    "half-cell",
];

/// One element of a series circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
    TransmissionLine(TransmissionLine),
    Separator(Separator),
    ParallelRc(ParallelRc),
    ConstantPhase(ConstantPhase),
    Stray(Stray),
}

impl ImpedanceBlock for Block {
    fn parameter_names(&self) -> Vec<String> {
        match self {
            Block::TransmissionLine(b) => b.parameter_names(),
            Block::Separator(b) => b.parameter_names(),
            Block::ParallelRc(b) => b.parameter_names(),
            Block::ConstantPhase(b) => b.parameter_names(),
            Block::Stray(b) => b.parameter_names(),
        }
    }

    fn impedance(&self, params: &ParameterSet, omega: &Array1<f64>) -> Result<Array1<Complex64>> {
        match self {
            Block::TransmissionLine(b) => b.impedance(params, omega),
            Block::Separator(b) => b.impedance(params, omega),
            Block::ParallelRc(b) => b.impedance(params, omega),
            Block::ConstantPhase(b) => b.impedance(params, omega),
            Block::Stray(b) => b.impedance(params, omega),
        }
    }
}

impl From<TransmissionLine> for Block {
    fn from(b: TransmissionLine) -> Self {
        Block::TransmissionLine(b)
    }
}

impl From<Separator> for Block {
    fn from(b: Separator) -> Self {
        Block::Separator(b)
    }
}

impl From<ParallelRc> for Block {
    fn from(b: ParallelRc) -> Self {
        Block::ParallelRc(b)
    }
}

impl From<ConstantPhase> for Block {
    fn from(b: ConstantPhase) -> Self {
        Block::ConstantPhase(b)
    }
}

impl From<Stray> for Block {
    fn from(b: Stray) -> Self {
        Block::Stray(b)
    }
}

/// Builder for [`Circuit`].
///
/// # Examples
///
/// ```
/// use eisfit_rs::models::blocks::{ParallelRc, Stray};
/// use eisfit_rs::models::{CircuitBuilder, Model};
///
/// let circuit = CircuitBuilder::new("rc-with-leads")
///     .block(ParallelRc::new("r", "c"))
///     .block(Stray::new())
///     .build()
///     .unwrap();
/// assert_eq!(circuit.required_parameters(), vec!["r", "c", "l_str", "r_str", "r_ohm"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CircuitBuilder {
    name: String,
    blocks: Vec<Block>,
}

impl CircuitBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            blocks: Vec::new(),
        }
    }

    /// Append a block in series.
    pub fn block(mut self, block: impl Into<Block>) -> Self {
        self.blocks.push(block.into());
        self
    }

    /// Finish the circuit. A circuit needs at least one block.
    pub fn build(self) -> Result<Circuit> {
        if self.blocks.is_empty() {
            return Err(EisFitError::InvalidInput(format!(
                "circuit '{}' has no blocks",
                self.name
            )));
        }
        Ok(Circuit {
            name: self.name,
            blocks: self.blocks,
        })
    }
}

/// An ordered series sum of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    name: String,
    blocks: Vec<Block>,
}

impl Circuit {
    /// Look up a named circuit.
    ///
    /// | Name | Blocks |
    /// |---|---|
    /// | `rc` | parallel RC (`r`, `c`) |
    /// | `bpl-planar` | planar cathode, direct relaxation times, stray |
    /// | `bpl-cylindrical` | cylindrical cathode, stray |
    /// | `bpl-spherical` | spherical cathode, stray |
    /// | `phy-eis` | cathode with derived relaxation times, separator, anode, stray |
    /// | `half-cell` | cathode with derived relaxation times, stray |
    ///
    /// Names are case-insensitive and `_` is accepted for `-`.
    pub fn by_name(name: &str) -> Result<Self> {
        let key = name.trim().to_ascii_lowercase().replace('_', "-");
        let builder = CircuitBuilder::new(&key);

        let builder = match key.as_str() {
            "rc" => builder.block(ParallelRc::new("r", "c")),
            "bpl-planar" => builder
                .block(TransmissionLine::new(DiffusionGeometry::Planar))
                .block(Stray::new()),
            "bpl-cylindrical" => builder
                .block(TransmissionLine::new(DiffusionGeometry::Cylindrical))
                .block(Stray::new()),
            "bpl-spherical" => builder
                .block(TransmissionLine::new(DiffusionGeometry::Spherical))
                .block(Stray::new()),
            "phy-eis" => builder
                .block(
                    TransmissionLine::new(DiffusionGeometry::Planar)
                        .with_relaxation_from_resistance(),
                )
                .block(Separator::new())
                .block(ParallelRc::anode())
                .block(Stray::new()),
            "half-cell" => builder
                .block(
                    TransmissionLine::new(DiffusionGeometry::Planar)
                        .with_relaxation_from_resistance(),
                )
                .block(Stray::new()),
            _ => return Err(EisFitError::UnknownModel(name.to_string())),
        };

        builder.build()
    }

    /// Blocks in series order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }
}

impl Model for Circuit {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_parameters(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.blocks.iter().flat_map(|b| b.parameter_names()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    fn evaluate(&self, params: &ParameterSet, freqs: &Array1<f64>) -> Result<Array1<Complex64>> {
        let omega = freqs.mapv(|f| 2.0 * PI * f);
        let mut total = Array1::<Complex64>::zeros(freqs.len());
        for block in &self.blocks {
            total = total + block.impedance(params, &omega)?;
        }
        Ok(total)
    }
}
