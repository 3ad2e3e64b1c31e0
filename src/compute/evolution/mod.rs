//! Evolutionary search over simulator parameters.
//!
//! # Overview
//!
//! The search is a plain generational genetic algorithm:
//!
//! - **Fitness** (`fitness`): correlation between simulated and reference channels
//! - **Genome Operations** (`genome`): mutation and crossover of parameter sets
//! - **Selection** (`selection`): truncation selection with stable ties
//! - **Search** (`search`): the generation loop, history and stop conditions
//!
//! # Example
//!
//! ```rust,no_run
//! use simtune::compute::evolution::EvolutionEngine;
//! use simtune::compute::ProcessGateway;
//! use simtune::schema::{ConfigDocument, Dataset, OptimizerConfig};
//!
//! let config = OptimizerConfig::default();
//! let document = ConfigDocument::load("assets/config.json").unwrap();
//! let seed = document.seed_individual().unwrap();
//! let reference = Dataset::load_csv("reference.csv", &config.fitness.channels).unwrap();
//! let gateway = ProcessGateway::new(
//!     config.simulator.clone(),
//!     document,
//!     config.fitness.channels.clone(),
//! );
//!
//! let mut engine = EvolutionEngine::new(config, gateway, reference, seed).unwrap();
//! let result = engine
//!     .run_with_callback(|progress| {
//!         println!("Generation {}: best fitness = {:.3}",
//!             progress.generation + 1, progress.generation_best);
//!     })
//!     .unwrap();
//!
//! println!("Best fitness: {:.3}", result.best_fitness);
//! ```

mod fitness;
mod genome;
mod search;
mod selection;

pub use fitness::{FitnessError, FitnessEvaluator, NEUTRAL_FITNESS, pearson, spearman};
pub use genome::{GenomeRng, OperatorError, crossover};
pub use search::{EvolutionEngine, EvolutionError};
pub use selection::{SelectionError, rank, select};
