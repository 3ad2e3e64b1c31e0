//! Convergence history as CSV (`generation,best_fitness`).

use std::path::Path;

use crate::schema::{EvolutionHistory, GenerationRecord};

use super::ReportError;

/// Write every history record, placeholder included, one row per generation.
pub fn write_history_csv<P: AsRef<Path>>(
    history: &EvolutionHistory,
    path: P,
) -> Result<(), ReportError> {
    let path = path.as_ref();
    let to_error = |source: csv::Error| ReportError::History {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(to_error)?;
    for record in history.records() {
        writer.serialize(record).map_err(to_error)?;
    }
    writer.flush().map_err(|e| to_error(e.into()))?;
    Ok(())
}

/// Read records written by [`write_history_csv`].
pub fn read_history_csv<P: AsRef<Path>>(path: P) -> Result<Vec<GenerationRecord>, ReportError> {
    let path = path.as_ref();
    let to_error = |source: csv::Error| ReportError::History {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(to_error)?;
    reader
        .deserialize()
        .collect::<Result<Vec<GenerationRecord>, _>>()
        .map_err(to_error)
}
