//! Optimization machinery: the simulator boundary and the evolutionary search.

pub mod evolution;
mod gateway;

pub use evolution::{EvolutionEngine, EvolutionError, FitnessEvaluator};
pub use gateway::{EvaluationFailure, ProcessGateway, SimulatorGateway};
