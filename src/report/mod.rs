//! Run artifacts: the best configuration, the convergence history and its plot.

mod history;
mod plot;

use std::path::{Path, PathBuf};

use crate::schema::{ConfigDocument, DocumentError, Individual};

pub use history::{read_history_csv, write_history_csv};
pub use plot::plot_convergence;

/// Errors while writing run artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to export best configuration: {0}")]
    Export(#[from] DocumentError),
    #[error("Failed to write history {path}: {source}")]
    History { path: PathBuf, source: csv::Error },
    #[error("Failed to render plot {path}: {message}")]
    Plot { path: PathBuf, message: String },
    #[error("Invalid plot range [{0}, {1}]")]
    PlotRange(f64, f64),
}

/// Merge `best` into `document` and write it to `path`.
///
/// Any file already at `path` is removed first and the new file is created
/// fresh, so a failed removal surfaces as an error instead of a stale result.
pub fn export_best<P: AsRef<Path>>(
    document: &ConfigDocument,
    best: &Individual,
    path: P,
) -> Result<(), ReportError> {
    let path = path.as_ref();
    document.export(best, path)?;
    log::info!("Best configuration saved to {}", path.display());
    Ok(())
}
