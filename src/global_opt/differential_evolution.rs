//! Bounded global search by differential evolution.
//!
//! Used to locate the basin of an equivalent-circuit fit when the initial
//! guess is poor. Runs are reproducible: all randomness comes from a seeded
//! `StdRng`.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::cancel::{is_cancelled, CancellationToken};
use crate::cost::PENALTY;
use crate::error::{EisFitError, Result};
use crate::global_opt::{
    calculate_cost, clip_to_bounds, latin_hypercube, validate_bounds, GlobalOptResult,
    GlobalOptimizer,
};
use crate::problem::Problem;

/// Differential evolution over a box.
///
/// Defaults: population `15·n`, best/1/bin, `F` dithered in `[0.5, 1)` per
/// generation, `CR = 0.7`, Latin hypercube start.
#[derive(Debug, Clone)]
pub struct DifferentialEvolution {
    /// Population is this times the parameter count
    pub pop_size_multiplier: usize,

    /// Range the differential weight (F) is drawn from once per generation
    pub mutation: (f64, f64),

    /// Binomial crossover rate `CR`
    pub crossover_prob: f64,

    /// Mutation base
    pub strategy: DEStrategy,

    /// Relative tolerance on the spread of population costs
    pub tol: f64,

    /// Maximum number of generations
    pub max_generations: usize,

    /// Seed for the random number generator
    pub seed: u64,
}

/// Mutation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DEStrategy {
    /// DE/rand/1: x_r1 + F * (x_r2 - x_r3)
    Rand1,

    /// DE/best/1: x_best + F * (x_r1 - x_r2)
    Best1,
}

impl Default for DifferentialEvolution {
    fn default() -> Self {
        Self {
            pop_size_multiplier: 15,
            mutation: (0.5, 1.0),
            crossover_prob: 0.7,
            strategy: DEStrategy::Best1,
            tol: 1e-4,
            max_generations: 1000,
            seed: 211,
        }
    }
}

impl DifferentialEvolution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the population size multiplier.
    pub fn with_population_multiplier(mut self, multiplier: usize) -> Self {
        self.pop_size_multiplier = multiplier;
        self
    }

    /// Set a fixed differential weight (F) instead of dithering.
    pub fn with_differential_weight(mut self, weight: f64) -> Self {
        self.mutation = (weight, weight);
        self
    }

    pub fn with_crossover_probability(mut self, prob: f64) -> Self {
        self.crossover_prob = prob;
        self
    }

    pub fn with_strategy(mut self, strategy: DEStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the relative convergence tolerance.
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_max_generations(mut self, max_generations: usize) -> Self {
        self.max_generations = max_generations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Differential weight for one generation.
    fn draw_weight(&self, rng: &mut StdRng) -> f64 {
        let (lo, hi) = self.mutation;
        if hi > lo {
            rng.gen_range(lo..hi)
        } else {
            lo
        }
    }

    /// Mutant of member `target_idx` after binomial crossover, clipped to
    /// `bounds`. Donors are drawn without replacement from the other members.
    fn create_trial_vector(
        &self,
        target_idx: usize,
        best_idx: usize,
        population: &[Array1<f64>],
        weight: f64,
        bounds: &[(f64, f64)],
        rng: &mut StdRng,
    ) -> Array1<f64> {
        let n_params = population[target_idx].len();
        let mut candidates: Vec<usize> = (0..population.len())
            .filter(|&i| i != target_idx)
            .collect();
        candidates.shuffle(rng);

        let mut trial = match self.strategy {
            DEStrategy::Rand1 => {
                let (r1, r2, r3) = (candidates[0], candidates[1], candidates[2]);
                &population[r1] + &((&population[r2] - &population[r3]) * weight)
            }
            DEStrategy::Best1 => {
                let (r1, r2) = (candidates[0], candidates[1]);
                &population[best_idx] + &((&population[r1] - &population[r2]) * weight)
            }
        };

        // Binomial crossover with the target; one component always mutates
        let target = &population[target_idx];
        let j_rand = rng.gen_range(0..n_params);
        for j in 0..n_params {
            if j != j_rand && rng.gen::<f64>() >= self.crossover_prob {
                trial[j] = target[j];
            }
        }

        clip_to_bounds(&trial, bounds)
    }

    /// Spread test on the population costs: `std ≤ tol·|mean|`.
    fn is_converged(&self, costs: &[f64]) -> bool {
        if costs.iter().any(|c| !c.is_finite()) {
            return false;
        }
        let n = costs.len() as f64;
        let mean = costs.iter().sum::<f64>() / n;
        let variance = costs.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
        variance.sqrt() <= self.tol * mean.abs()
    }
}

fn best_index(costs: &[f64]) -> usize {
    costs
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

impl GlobalOptimizer for DifferentialEvolution {
    fn optimize<P: Problem>(
        &self,
        problem: &P,
        bounds: &[(f64, f64)],
        cancel: Option<&CancellationToken>,
    ) -> Result<GlobalOptResult> {
        let n_params = problem.parameter_count();
        validate_bounds(bounds, n_params)?;
        if n_params == 0 {
            return Err(EisFitError::InvalidInput(
                "No free parameters to optimize".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);

        // Best/1 needs the target plus two distinct donors
        let pop_size = (self.pop_size_multiplier * n_params).max(5);
        let mut population = latin_hypercube(bounds, pop_size, &mut rng);
        let mut costs = population
            .iter()
            .map(|member| calculate_cost(problem, member))
            .collect::<Result<Vec<f64>>>()?;
        let mut func_evals = pop_size;
        let mut best_idx = best_index(&costs);

        let mut iterations = 0;
        let mut converged = self.is_converged(&costs);

        while !converged && iterations < self.max_generations {
            if is_cancelled(cancel) {
                return Err(EisFitError::Cancelled);
            }

            let weight = self.draw_weight(&mut rng);
            for i in 0..pop_size {
                let trial =
                    self.create_trial_vector(i, best_idx, &population, weight, bounds, &mut rng);
                let trial_cost = calculate_cost(problem, &trial)?;
                func_evals += 1;

                if trial_cost <= costs[i] {
                    population[i] = trial;
                    costs[i] = trial_cost;
                    if trial_cost < costs[best_idx] {
                        best_idx = i;
                    }
                }
            }

            iterations += 1;
            converged = self.is_converged(&costs);
            log::trace!(
                "Generation {}: best cost = {:.6e}",
                iterations,
                costs[best_idx]
            );
        }

        // A single penalized residual already costs PENALTY²
        let rejected = costs[best_idx] >= PENALTY * PENALTY;
        let message = if rejected {
            "No member of the population left the penalized region".to_string()
        } else if converged {
            "Optimization terminated successfully: population cost spread below tolerance"
                .to_string()
        } else {
            format!("Maximum number of generations reached: {}", self.max_generations)
        };

        Ok(GlobalOptResult {
            params: population[best_idx].clone(),
            cost: costs[best_idx],
            iterations,
            func_evals,
            success: converged && !rejected,
            message,
        })
    }
}
