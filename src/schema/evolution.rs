//! Evolution run progress, history and result types.

use serde::{Deserialize, Serialize};

use super::Individual;

/// Best fitness recorded for one generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub best_fitness: f64,
}

/// Append-only convergence history.
///
/// Starts with a `(0, 0.0)` placeholder; generation `g` (0-based) is recorded
/// as `g + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionHistory {
    records: Vec<GenerationRecord>,
}

impl Default for EvolutionHistory {
    fn default() -> Self {
        Self {
            records: vec![GenerationRecord {
                generation: 0,
                best_fitness: 0.0,
            }],
        }
    }
}

impl EvolutionHistory {
    pub fn push(&mut self, generation: usize, best_fitness: f64) {
        self.records.push(GenerationRecord {
            generation,
            best_fitness,
        });
    }

    pub fn records(&self) -> &[GenerationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Best-fitness values in record order.
    pub fn best_fitness(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(|r| r.best_fitness)
    }
}

/// Current phase of evolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EvolutionPhase {
    /// Building the starting population from the seed.
    #[default]
    Initializing,
    /// Evaluating candidates.
    Evaluating,
    /// Keeping the elite.
    Selecting,
    /// Creating offspring.
    Breeding,
    /// Evolution complete.
    Terminated,
}

/// Progress update emitted after each evaluated generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Generation just evaluated (0-based).
    pub generation: usize,
    /// Total generations planned.
    pub total_generations: usize,
    /// Best fitness in this generation.
    pub generation_best: f64,
    /// Best fitness seen so far.
    pub best_fitness: f64,
    /// Mean fitness of this generation.
    pub mean_fitness: f64,
    /// Evaluations in this generation that degraded to the neutral score.
    pub failed_evaluations: usize,
    /// Generations since last improvement.
    pub stagnation_count: usize,
    pub phase: EvolutionPhase,
}

/// Reason evolution stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached the configured number of generations.
    MaxGenerations,
    /// Reached target fitness.
    TargetReached,
    /// Stagnation limit hit.
    Stagnation,
    /// Cancelled through the engine's cancel handle.
    Cancelled,
}

/// Statistics from an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Generations run.
    pub generations: usize,
    /// Simulator round trips performed, including the final re-evaluation.
    pub total_evaluations: u64,
    /// Round trips that produced no usable output.
    pub failed_evaluations: u64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    pub stop_reason: StopReason,
}

/// Final result of an evolution run.
#[derive(Debug, Clone)]
pub struct EvolutionResult {
    /// Best individual of the re-evaluated final population.
    pub best: Individual,
    /// Its fitness.
    pub best_fitness: f64,
    /// Final population and fitnesses, in population order.
    pub final_population: Vec<(Individual, f64)>,
    pub history: EvolutionHistory,
    pub stats: EvolutionStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_starts_with_placeholder() {
        let history = EvolutionHistory::default();
        assert_eq!(history.len(), 1);
        assert_eq!(
            history.records()[0],
            GenerationRecord {
                generation: 0,
                best_fitness: 0.0
            }
        );
    }

    #[test]
    fn test_history_appends() {
        let mut history = EvolutionHistory::default();
        history.push(1, 0.4);
        history.push(2, 0.7);
        assert_eq!(history.best_fitness().collect::<Vec<_>>(), vec![0.0, 0.4, 0.7]);
        assert_eq!(history.records()[2].generation, 2);
    }

    #[test]
    fn test_serialization() {
        let mut history = EvolutionHistory::default();
        history.push(1, 0.5);
        let json = serde_json::to_string(&history).unwrap();
        let parsed: EvolutionHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, history);
    }
}
