//! Schema module - Parameter sets, datasets and configuration types.

mod config;
mod dataset;
mod document;
mod evolution;
mod individual;

pub use config::*;
pub use dataset::*;
pub use document::*;
pub use evolution::*;
pub use individual::*;
