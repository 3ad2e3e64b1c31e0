//! Variation operators: mutation and crossover of parameter sets.

use rand::prelude::*;
use rand::seq::index;
use rand_distr::StandardNormal;

use crate::schema::{Gene, Individual, NoiseDistribution};

/// Variation operator contract violations.
#[derive(Debug, thiserror::Error)]
pub enum OperatorError {
    #[error("Parents have different parameter schemas")]
    SchemaMismatch,
    #[error("Need at least two parents to choose from, got {0}")]
    NotEnoughParents(usize),
}

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
    noise: NoiseDistribution,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            noise: NoiseDistribution::default(),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            noise: NoiseDistribution::default(),
        }
    }

    /// Set the mutation noise distribution.
    pub fn with_noise(mut self, noise: NoiseDistribution) -> Self {
        self.noise = noise;
        self
    }

    /// Return a mutated copy of `individual`.
    ///
    /// Each numeric gene is perturbed with probability `rate` by noise bounded
    /// by `intensity`, then floored at zero; non-finite results become zero.
    /// Categorical genes are copied unchanged.
    pub fn mutate(&mut self, individual: &Individual, rate: f64, intensity: f64) -> Individual {
        let genes = individual
            .genes()
            .iter()
            .map(|gene| match gene {
                Gene::Numeric(value) => {
                    if self.rng.r#gen::<f64>() >= rate {
                        return gene.clone();
                    }
                    let mutated = value + self.noise(intensity);
                    Gene::Numeric(if mutated.is_finite() {
                        mutated.max(0.0)
                    } else {
                        0.0
                    })
                }
                Gene::Categorical(_) => gene.clone(),
            })
            .collect();
        individual.with_genes(genes)
    }

    fn noise(&mut self, intensity: f64) -> f64 {
        if !(intensity.is_finite() && intensity > 0.0) {
            return 0.0;
        }
        // Sample in unit range: `2 * intensity` may overflow.
        let unit = match self.noise {
            NoiseDistribution::Uniform => self.rng.gen_range(-1.0..=1.0),
            NoiseDistribution::Gaussian => {
                let z: f64 = self.rng.sample(StandardNormal);
                (z / 3.0).clamp(-1.0, 1.0)
            }
        };
        unit * intensity
    }

    /// Pick two distinct indices uniformly from `0..len`.
    pub fn choose_parents(&mut self, len: usize) -> Result<(usize, usize), OperatorError> {
        if len < 2 {
            return Err(OperatorError::NotEnoughParents(len));
        }
        let picked = index::sample(&mut self.rng, len, 2);
        Ok((picked.index(0), picked.index(1)))
    }
}

/// Combine two parents into a child.
///
/// Numeric genes take the mean of both parents. Categorical genes always
/// come from `first`, so the first parent wins every categorical choice.
pub fn crossover(first: &Individual, second: &Individual) -> Result<Individual, OperatorError> {
    if !first.same_schema(second) {
        return Err(OperatorError::SchemaMismatch);
    }

    let genes = first
        .genes()
        .iter()
        .zip(second.genes())
        .map(|(a, b)| match (a, b) {
            (Gene::Numeric(x), Gene::Numeric(y)) => Gene::Numeric((x + y) / 2.0),
            (a, _) => a.clone(),
        })
        .collect();
    Ok(first.with_genes(genes))
}
