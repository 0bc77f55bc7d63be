//! Bounded global optimization.
//!
//! Global search needs no starting point inside the basin of the optimum,
//! only a box for every parameter. The optimizers here minimize the sum of
//! squares of a [`Problem`] and return the best point found.

use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;

use crate::cancel::CancellationToken;
use crate::error::{EisFitError, Result};
use crate::problem::Problem;

mod differential_evolution;

pub use differential_evolution::{DEStrategy, DifferentialEvolution};

/// A box-constrained minimizer of `Σr²`.
pub trait GlobalOptimizer {
    /// Search `bounds` for the lowest cost of `problem`.
    ///
    /// # Arguments
    ///
    /// * `problem` - Residual source
    /// * `bounds` - `(lower, upper)` per parameter, both finite
    /// * `cancel` - Optional token polled between generations
    ///
    /// # Returns
    ///
    /// * The best solution found and its cost, or `Cancelled`
    fn optimize<P: Problem>(
        &self,
        problem: &P,
        bounds: &[(f64, f64)],
        cancel: Option<&CancellationToken>,
    ) -> Result<GlobalOptResult>;
}

/// Best member of a finished search.
#[derive(Debug, Clone)]
pub struct GlobalOptResult {
    pub params: Array1<f64>,
    pub cost: f64,
    /// Generations run
    pub iterations: usize,
    pub func_evals: usize,
    /// Whether the spread test fired before the generation cap
    pub success: bool,
    pub message: String,
}

impl fmt::Display for GlobalOptResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Global Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// Check that every bound is finite and ordered.
fn validate_bounds(bounds: &[(f64, f64)], n_params: usize) -> Result<()> {
    if n_params != bounds.len() {
        return Err(EisFitError::DimensionMismatch(format!(
            "{} parameters but {} bounds",
            n_params,
            bounds.len()
        )));
    }
    for (i, &(lo, hi)) in bounds.iter().enumerate() {
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(EisFitError::InvalidInput(format!(
                "Invalid bounds for parameter {}: ({}, {})",
                i, lo, hi
            )));
        }
    }
    Ok(())
}

/// Latin hypercube sample of `size` points inside `bounds`.
///
/// Each parameter's range is cut into `size` equal strata and every stratum
/// receives exactly one point.
fn latin_hypercube(bounds: &[(f64, f64)], size: usize, rng: &mut impl Rng) -> Vec<Array1<f64>> {
    let mut population = vec![Array1::zeros(bounds.len()); size];
    let segment = 1.0 / size as f64;

    for (j, &(lo, hi)) in bounds.iter().enumerate() {
        let mut strata: Vec<usize> = (0..size).collect();
        strata.shuffle(rng);
        for (member, stratum) in population.iter_mut().zip(strata) {
            let unit = (stratum as f64 + rng.gen::<f64>()) * segment;
            member[j] = lo + unit * (hi - lo);
        }
    }

    population
}

/// Sum of squares at `point`, with non-finite costs mapped to infinity.
fn calculate_cost<P: Problem>(problem: &P, point: &Array1<f64>) -> Result<f64> {
    let cost = problem.eval_cost(point)?;
    Ok(if cost.is_finite() { cost } else { f64::INFINITY })
}

/// Clip a point to the bounds.
fn clip_to_bounds(point: &Array1<f64>, bounds: &[(f64, f64)]) -> Array1<f64> {
    point
        .iter()
        .zip(bounds.iter())
        .map(|(&x, &(lo, hi))| x.clamp(lo, hi))
        .collect()
}
