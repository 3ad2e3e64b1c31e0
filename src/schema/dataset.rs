//! Tabular sensor datasets (reference measurements and simulator output).

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Default sensor channel names.
pub fn default_channels() -> Vec<String> {
    (1..=15).map(|i| format!("A{i}")).collect()
}

/// Errors loading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing column `{0}`")]
    MissingColumn(String),
    #[error("Invalid value {value:?} in column `{column}` at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },
    #[error("Dataset has no rows")]
    NoRows,
}

/// Named numeric columns, rows aligned by position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl Dataset {
    /// Build from `(name, values)` pairs.
    pub fn from_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let (names, columns) = columns
            .into_iter()
            .map(|(name, values)| (name.into(), values))
            .unzip();
        Self { names, columns }
    }

    /// Load the given channels from a CSV file with a header row.
    ///
    /// An empty `channels` list loads every column.
    pub fn load_csv<P: AsRef<Path>>(path: P, channels: &[String]) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, channels)
    }

    /// Parse CSV from any reader.
    pub fn from_reader<R: Read>(reader: R, channels: &[String]) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader.headers()?.clone();

        let names: Vec<String> = if channels.is_empty() {
            headers.iter().map(str::to_string).collect()
        } else {
            channels.to_vec()
        };
        let indices = names
            .iter()
            .map(|name| {
                headers
                    .iter()
                    .position(|h| h == name)
                    .ok_or_else(|| DatasetError::MissingColumn(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut columns = vec![Vec::new(); names.len()];
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            for (col, &idx) in indices.iter().enumerate() {
                let raw = record.get(idx).unwrap_or("");
                let value = raw.parse::<f64>().map_err(|_| DatasetError::InvalidValue {
                    column: names[col].clone(),
                    row,
                    value: raw.to_string(),
                })?;
                columns[col].push(value);
            }
        }

        if columns.first().is_none_or(Vec::is_empty) {
            return Err(DatasetError::NoRows);
        }

        Ok(Self { names, columns })
    }

    /// Column names in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Values of a column by name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// Number of rows (length of the longest column).
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Iterate `(name, values)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "time, A1, A2, A3\n0, 22.0, 22.1, 22.3\n1, 22.4, 22.2, 22.9\n";

    fn channels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_channels() {
        let c = default_channels();
        assert_eq!(c.len(), 15);
        assert_eq!(c[0], "A1");
        assert_eq!(c[14], "A15");
    }

    #[test]
    fn test_load_selected_channels() {
        let ds = Dataset::from_reader(CSV.as_bytes(), &channels(&["A3", "A1"])).unwrap();
        assert_eq!(ds.names(), &["A3".to_string(), "A1".to_string()]);
        assert_eq!(ds.column("A3"), Some(&[22.3, 22.9][..]));
        assert_eq!(ds.column("A1"), Some(&[22.0, 22.4][..]));
        assert_eq!(ds.column("A2"), None);
        assert_eq!(ds.row_count(), 2);
    }

    #[test]
    fn test_load_all_columns() {
        let ds = Dataset::from_reader(CSV.as_bytes(), &[]).unwrap();
        assert_eq!(ds.names().len(), 4);
        assert_eq!(ds.column("time"), Some(&[0.0, 1.0][..]));
    }

    #[test]
    fn test_missing_column() {
        let err = Dataset::from_reader(CSV.as_bytes(), &channels(&["A4"])).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn(c) if c == "A4"));
    }

    #[test]
    fn test_invalid_value() {
        let csv = "A1\n22.0\nhot\n";
        let err = Dataset::from_reader(csv.as_bytes(), &channels(&["A1"])).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidValue { row: 1, .. }));
    }

    #[test]
    fn test_no_rows() {
        let err = Dataset::from_reader("A1,A2\n".as_bytes(), &[]).unwrap_err();
        assert!(matches!(err, DatasetError::NoRows));
    }

    #[test]
    fn test_load_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experimento.csv");
        std::fs::write(&path, CSV).unwrap();
        let ds = Dataset::load_csv(&path, &channels(&["A2"])).unwrap();
        assert_eq!(ds.column("A2"), Some(&[22.1, 22.2][..]));

        let err = Dataset::load_csv(dir.path().join("missing.csv"), &[]).unwrap_err();
        assert!(matches!(err, DatasetError::Open { .. }));
    }
}
