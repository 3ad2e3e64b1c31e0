//! Generational genetic search over simulator parameters.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use crate::compute::gateway::SimulatorGateway;
use crate::schema::{
    ConfigError, Dataset, EvolutionHistory, EvolutionPhase, EvolutionProgress, EvolutionResult,
    EvolutionStats, Individual, OptimizerConfig, StopReason,
};

use super::fitness::{FitnessError, FitnessEvaluator, NEUTRAL_FITNESS};
use super::genome::{GenomeRng, OperatorError, crossover};
use super::selection::{SelectionError, select};

/// Errors that abort an evolution run.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Fitness comparison failed: {0}")]
    Fitness(#[from] FitnessError),
    #[error("Variation failed: {0}")]
    Operator(#[from] OperatorError),
    #[error("Selection failed: {0}")]
    Selection(#[from] SelectionError),
    #[error("Seed individual has no parameters")]
    EmptySeed,
}

/// Score of one evaluation.
#[derive(Debug, Clone, Copy)]
struct Evaluation {
    fitness: f64,
    failed: bool,
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine<G> {
    config: OptimizerConfig,
    rng: GenomeRng,
    evaluator: FitnessEvaluator,
    gateway: G,
    reference: Dataset,
    seed: Individual,
    population: Vec<Individual>,
    fitnesses: Vec<f64>,
    history: EvolutionHistory,
    generation: usize,
    phase: EvolutionPhase,
    best_fitness: f64,
    stagnation_count: usize,
    evaluations: u64,
    failed_evaluations: u64,
    cancelled: Arc<AtomicBool>,
}

impl<G: SimulatorGateway> EvolutionEngine<G> {
    /// Create a new evolution engine.
    ///
    /// Fails when the configuration is invalid, the seed has no parameters
    /// or the reference lacks one of the fitness channels.
    pub fn new(
        config: OptimizerConfig,
        gateway: G,
        reference: Dataset,
        seed: Individual,
    ) -> Result<Self, EvolutionError> {
        config.validate()?;
        if seed.schema().is_empty() {
            return Err(EvolutionError::EmptySeed);
        }

        let evaluator = FitnessEvaluator::new(config.fitness.clone());
        evaluator.check_reference(&reference)?;

        let rng = match config.random_seed {
            Some(seed) => GenomeRng::new(seed),
            None => GenomeRng::random(),
        }
        .with_noise(config.variation.noise);

        Ok(Self {
            config,
            rng,
            evaluator,
            gateway,
            reference,
            seed,
            population: Vec::new(),
            fitnesses: Vec::new(),
            history: EvolutionHistory::default(),
            generation: 0,
            phase: EvolutionPhase::Initializing,
            best_fitness: f64::NEG_INFINITY,
            stagnation_count: 0,
            evaluations: 0,
            failed_evaluations: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Current population.
    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// Convergence history so far.
    pub fn history(&self) -> &EvolutionHistory {
        &self.history
    }

    /// Build the starting population from independent mutations of the seed.
    pub fn initialize(&mut self) {
        self.phase = EvolutionPhase::Initializing;
        self.generation = 0;
        self.history = EvolutionHistory::default();
        self.best_fitness = f64::NEG_INFINITY;
        self.stagnation_count = 0;

        let var = &self.config.variation;
        let (rate, intensity) = (var.initial_rate, var.initial_intensity);
        self.population = (0..self.config.population.size)
            .map(|_| self.rng.mutate(&self.seed, rate, intensity))
            .collect();
        self.fitnesses.clear();
    }

    fn evaluate_one(&self, individual: &Individual) -> Result<Evaluation, FitnessError> {
        match self.gateway.evaluate(individual) {
            Ok(output) => {
                let fitness = self.evaluator.score(&self.reference, &output)?;
                log::debug!("Evaluated individual: fitness {:.6}", fitness);
                Ok(Evaluation {
                    fitness,
                    failed: false,
                })
            }
            Err(failure) => {
                log::warn!("Simulation failed, scoring {}: {}", NEUTRAL_FITNESS, failure);
                Ok(Evaluation {
                    fitness: NEUTRAL_FITNESS,
                    failed: true,
                })
            }
        }
    }

    /// Evaluate all candidates in the population, in population order.
    ///
    /// Returns the number of evaluations that degraded to the neutral score.
    fn evaluate_population(&mut self) -> Result<usize, EvolutionError> {
        self.phase = EvolutionPhase::Evaluating;

        let results: Vec<Evaluation> = if self.config.parallel_evaluation {
            self.population
                .par_iter()
                .map(|individual| self.evaluate_one(individual))
                .collect::<Result<_, _>>()?
        } else {
            self.population
                .iter()
                .map(|individual| self.evaluate_one(individual))
                .collect::<Result<_, _>>()?
        };

        let failed = results.iter().filter(|r| r.failed).count();
        self.evaluations += results.len() as u64;
        self.failed_evaluations += failed as u64;
        self.fitnesses = results.into_iter().map(|r| r.fitness).collect();
        Ok(failed)
    }

    /// Keep the elite and refill the population with offspring.
    fn breed(&mut self) -> Result<(), EvolutionError> {
        self.phase = EvolutionPhase::Selecting;
        let elite = select(
            &self.population,
            &self.fitnesses,
            self.config.population.elite_count,
        )?;

        self.phase = EvolutionPhase::Breeding;
        let var = &self.config.variation;
        let (rate, intensity) = (var.offspring_rate, var.offspring_intensity);
        let mut next_gen = Vec::with_capacity(self.config.population.size);
        next_gen.extend(elite.iter().cloned());

        while next_gen.len() < self.config.population.size {
            let (i, j) = self.rng.choose_parents(elite.len())?;
            let child = crossover(&elite[i], &elite[j])?;
            next_gen.push(self.rng.mutate(&child, rate, intensity));
        }

        self.population = next_gen;
        self.fitnesses.clear();
        Ok(())
    }

    /// Run a single generation: evaluate, record, select and breed.
    fn step_generation<F>(&mut self, callback: &F) -> Result<(), EvolutionError>
    where
        F: Fn(&EvolutionProgress),
    {
        let failed = self.evaluate_population()?;

        let gen_best = self
            .fitnesses
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if gen_best > self.best_fitness {
            self.best_fitness = gen_best;
            self.stagnation_count = 0;
        } else {
            self.stagnation_count += 1;
        }
        self.history.push(self.generation + 1, gen_best);

        log::info!(
            "Generation {} - best fitness: {:.4}",
            self.generation + 1,
            gen_best
        );
        if failed > 0 {
            log::warn!(
                "Generation {}: {} of {} simulations failed",
                self.generation + 1,
                failed,
                self.population.len()
            );
        }
        callback(&self.progress(gen_best, failed));

        self.breed()?;
        self.generation += 1;
        Ok(())
    }

    fn progress(&self, generation_best: f64, failed: usize) -> EvolutionProgress {
        let mean_fitness = if self.fitnesses.is_empty() {
            0.0
        } else {
            self.fitnesses.iter().sum::<f64>() / self.fitnesses.len() as f64
        };

        EvolutionProgress {
            generation: self.generation,
            total_generations: self.config.population.generations,
            generation_best,
            best_fitness: self.best_fitness,
            mean_fitness,
            failed_evaluations: failed,
            stagnation_count: self.stagnation_count,
            phase: self.phase,
        }
    }

    /// Check if evolution should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if self.generation >= self.config.population.generations {
            return Some(StopReason::MaxGenerations);
        }

        if let Some(target) = self.config.population.target_fitness
            && self.best_fitness >= target
        {
            return Some(StopReason::TargetReached);
        }

        if let Some(limit) = self.config.population.stagnation_limit
            && self.stagnation_count >= limit
        {
            return Some(StopReason::Stagnation);
        }

        None
    }

    /// Run evolution with progress callback.
    pub fn run_with_callback<F>(&mut self, callback: F) -> Result<EvolutionResult, EvolutionError>
    where
        F: Fn(&EvolutionProgress),
    {
        let start_time = Instant::now();
        self.evaluations = 0;
        self.failed_evaluations = 0;

        self.initialize();

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }
            self.step_generation(&callback)?;
        };

        // The bred population has not been scored yet.
        self.evaluate_population()?;
        self.phase = EvolutionPhase::Terminated;

        // First maximum wins ties.
        let mut best_idx = 0;
        for (i, &fitness) in self.fitnesses.iter().enumerate() {
            if fitness > self.fitnesses[best_idx] {
                best_idx = i;
            }
        }
        let best = self.population[best_idx].clone();
        let best_fitness = self.fitnesses[best_idx];

        let elapsed = start_time.elapsed().as_secs_f64();
        log::info!(
            "Evolution finished after {} generations ({:?}), best fitness {:.4}",
            self.generation,
            stop_reason,
            best_fitness
        );

        Ok(EvolutionResult {
            best,
            best_fitness,
            final_population: self
                .population
                .iter()
                .cloned()
                .zip(self.fitnesses.iter().copied())
                .collect(),
            history: self.history.clone(),
            stats: EvolutionStats {
                generations: self.generation,
                total_evaluations: self.evaluations,
                failed_evaluations: self.failed_evaluations,
                elapsed_seconds: elapsed,
                stop_reason,
            },
        })
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> Result<EvolutionResult, EvolutionError> {
        self.run_with_callback(|_| {})
    }
}
