//! Simulator configuration documents.
//!
//! The simulator reads a structured document (JSON or YAML) whose
//! `simulation` section holds the tunable parameters. The optimizer keeps the
//! rest of the document untouched and only swaps that section.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::Individual;

/// Key of the section holding the tunable parameters.
pub const SIMULATION_KEY: &str = "simulation";

/// Serialization format of a document, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Json,
    Yaml,
}

impl DocumentFormat {
    /// `.yml` / `.yaml` select YAML, everything else JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml") => {
                DocumentFormat::Yaml
            }
            _ => DocumentFormat::Json,
        }
    }
}

/// Errors reading or writing configuration documents.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to remove stale file {path}: {source}")]
    RemoveStale { path: PathBuf, source: io::Error },
    #[error("Invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Document root must be a mapping")]
    NotAMapping,
    #[error("Document has no `simulation` section")]
    MissingSimulation,
    #[error("`simulation` section must be a mapping of parameters")]
    SimulationNotAMapping,
    #[error("`simulation` section has no parameters")]
    EmptySimulation,
}

/// A parsed configuration document.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    root: Map<String, Value>,
}

impl ConfigDocument {
    /// Parse a document from text.
    pub fn parse(text: &str, format: DocumentFormat) -> Result<Self, DocumentError> {
        let value: Value = match format {
            DocumentFormat::Json => serde_json::from_str(text)?,
            DocumentFormat::Yaml => serde_yaml::from_str(text)?,
        };
        let Value::Object(root) = value else {
            return Err(DocumentError::NotAMapping);
        };

        let doc = Self { root };
        doc.simulation_section()?;
        Ok(doc)
    }

    /// Load a document from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, DocumentFormat::from_path(path))
    }

    fn simulation_section(&self) -> Result<&Map<String, Value>, DocumentError> {
        match self.root.get(SIMULATION_KEY) {
            None => Err(DocumentError::MissingSimulation),
            Some(Value::Object(map)) if map.is_empty() => Err(DocumentError::EmptySimulation),
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(DocumentError::SimulationNotAMapping),
        }
    }

    /// The seed individual described by the `simulation` section.
    pub fn seed_individual(&self) -> Result<Individual, DocumentError> {
        self.simulation_section().map(Individual::from_map)
    }

    /// The whole document with `individual` as its `simulation` section.
    pub fn with_individual(&self, individual: &Individual) -> Value {
        let mut root = self.root.clone();
        root.insert(
            SIMULATION_KEY.to_string(),
            Value::Object(individual.to_map()),
        );
        Value::Object(root)
    }

    /// Render the merged document in the given format.
    pub fn render(
        &self,
        individual: &Individual,
        format: DocumentFormat,
    ) -> Result<String, DocumentError> {
        let merged = self.with_individual(individual);
        Ok(match format {
            DocumentFormat::Json => serde_json::to_string_pretty(&merged)?,
            DocumentFormat::Yaml => serde_yaml::to_string(&merged)?,
        })
    }

    /// Write the merged document to `path`, replacing any previous file.
    pub fn write<P: AsRef<Path>>(&self, individual: &Individual, path: P) -> Result<(), DocumentError> {
        let path = path.as_ref();
        let text = self.render(individual, DocumentFormat::from_path(path))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| DocumentError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, text).map_err(|source| DocumentError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the merged document to a path that must not hold a stale file.
    ///
    /// An existing file is removed first; if it cannot be removed the export
    /// fails instead of writing into it. The new file is created exclusively.
    pub fn export<P: AsRef<Path>>(&self, individual: &Individual, path: P) -> Result<(), DocumentError> {
        let path = path.as_ref();
        remove_stale(path)?;

        let text = self.render(individual, DocumentFormat::from_path(path))?;
        let write_err = |source| DocumentError::Write {
            path: path.to_path_buf(),
            source,
        };
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(write_err)?;
        file.write_all(text.as_bytes()).map_err(write_err)?;
        Ok(())
    }
}

/// Remove `path` if it exists. A missing file is not an error.
pub fn remove_stale(path: &Path) -> Result<(), DocumentError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(DocumentError::RemoveStale {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Gene;

    const JSON_DOC: &str = r#"{
        "window": {"width": 800, "height": 600},
        "simulation": {"thermal_conductivity": 0.35, "solver": "sph", "particles": 1200}
    }"#;

    #[test]
    fn test_seed_from_json() {
        let doc = ConfigDocument::parse(JSON_DOC, DocumentFormat::Json).unwrap();
        let seed = doc.seed_individual().unwrap();
        assert_eq!(seed.numeric("thermal_conductivity"), Some(0.35));
        assert_eq!(seed.schema().len(), 3);
    }

    #[test]
    fn test_seed_from_yaml() {
        let yaml = "window:\n  width: 800\nsimulation:\n  thermal_conductivity: 0.35\n  solver: sph\n";
        let doc = ConfigDocument::parse(yaml, DocumentFormat::Yaml).unwrap();
        let seed = doc.seed_individual().unwrap();
        assert_eq!(seed.get("thermal_conductivity"), Some(&Gene::Numeric(0.35)));
        assert_eq!(seed.get("solver"), Some(&Gene::Categorical(Value::from("sph"))));
    }

    #[test]
    fn test_missing_simulation_is_rejected() {
        let err = ConfigDocument::parse(r#"{"window": {}}"#, DocumentFormat::Json).unwrap_err();
        assert!(matches!(err, DocumentError::MissingSimulation));

        let err = ConfigDocument::parse(r#"{"simulation": 3}"#, DocumentFormat::Json).unwrap_err();
        assert!(matches!(err, DocumentError::SimulationNotAMapping));

        let err = ConfigDocument::parse(r#"{"simulation": {}}"#, DocumentFormat::Json).unwrap_err();
        assert!(matches!(err, DocumentError::EmptySimulation));

        let err = ConfigDocument::parse("[1, 2]", DocumentFormat::Json).unwrap_err();
        assert!(matches!(err, DocumentError::NotAMapping));
    }

    #[test]
    fn test_merge_keeps_other_sections() {
        let doc = ConfigDocument::parse(JSON_DOC, DocumentFormat::Json).unwrap();
        let seed = doc.seed_individual().unwrap();
        let merged = doc.with_individual(&seed);
        assert_eq!(merged["window"]["width"], 800);
        assert_eq!(merged["simulation"]["solver"], "sph");
    }

    #[test]
    fn test_write_overwrites_and_export_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let doc = ConfigDocument::parse(JSON_DOC, DocumentFormat::Json).unwrap();
        let seed = doc.seed_individual().unwrap();

        let working = dir.path().join("assets").join("config.json");
        fs::create_dir_all(working.parent().unwrap()).unwrap();
        fs::write(&working, "garbage that is much longer than anything else").unwrap();
        doc.write(&seed, &working).unwrap();
        let reloaded = ConfigDocument::load(&working).unwrap();
        assert_eq!(reloaded.seed_individual().unwrap(), seed);

        let best = dir.path().join("configDef.yml");
        fs::write(&best, "stale").unwrap();
        doc.export(&seed, &best).unwrap();
        let reloaded = ConfigDocument::load(&best).unwrap();
        assert_eq!(reloaded.seed_individual().unwrap(), seed);
    }

    #[test]
    fn test_remove_stale_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(remove_stale(&dir.path().join("absent.csv")).is_ok());
    }
}
