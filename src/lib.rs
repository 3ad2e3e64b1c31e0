//! Simtune - Genetic calibration of black-box simulator parameters.
//!
//! This crate tunes the `simulation` section of a simulator's configuration
//! document so that the simulator's output matches reference measurements.
//! Every candidate parameter set is evaluated by running the simulator and
//! correlating its output CSV with the reference data.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Parameter sets, datasets, documents and optimizer settings
//! - `compute`: The simulator gateway and the evolutionary search
//! - `report`: Best-configuration export, history CSV and convergence plot
//!
//! # Example
//!
//! ```rust,no_run
//! use simtune::{
//!     compute::{EvolutionEngine, ProcessGateway},
//!     schema::{ConfigDocument, Dataset, OptimizerConfig},
//! };
//!
//! let config = OptimizerConfig::default();
//! let document = ConfigDocument::load("assets/config.json")?;
//! let seed = document.seed_individual()?;
//! let reference = Dataset::load_csv("dados_teste.csv", &config.fitness.channels)?;
//!
//! let gateway = ProcessGateway::new(
//!     config.simulator.clone(),
//!     document.clone(),
//!     config.fitness.channels.clone(),
//! );
//! let mut engine = EvolutionEngine::new(config, gateway, reference, seed)?;
//! let result = engine.run()?;
//!
//! println!("Best fitness: {:.4}", result.best_fitness);
//! simtune::report::export_best(&document, &result.best, "assets/configDef.json")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compute;
pub mod report;
pub mod schema;

// Re-export commonly used types
pub use compute::{EvolutionEngine, ProcessGateway, SimulatorGateway};
pub use schema::{ConfigDocument, Dataset, Individual, OptimizerConfig};
