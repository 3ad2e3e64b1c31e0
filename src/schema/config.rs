//! Optimizer settings.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::default_channels;

/// Top-level optimizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OptimizerConfig {
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Mutation rates and intensities.
    #[serde(default)]
    pub variation: VariationConfig,
    /// Fitness channels and metric.
    #[serde(default)]
    pub fitness: FitnessConfig,
    /// External simulator invocation.
    #[serde(default)]
    pub simulator: SimulatorSettings,
    /// Result artifacts.
    #[serde(default)]
    pub output: OutputConfig,
    /// Evaluate a generation on the rayon pool instead of one by one.
    #[serde(default)]
    pub parallel_evaluation: bool,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

/// Population settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals per generation.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Number of generations to run.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Individuals carried unmodified into the next generation.
    #[serde(default = "default_elite_count")]
    pub elite_count: usize,
    /// Stop once the best fitness reaches this value.
    #[serde(default)]
    pub target_fitness: Option<f64>,
    /// Stop after this many generations without improvement.
    #[serde(default)]
    pub stagnation_limit: Option<usize>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            generations: default_generations(),
            elite_count: default_elite_count(),
            target_fitness: None,
            stagnation_limit: None,
        }
    }
}

fn default_population_size() -> usize {
    4
}
fn default_generations() -> usize {
    2
}
fn default_elite_count() -> usize {
    2
}

/// Noise distribution used by mutation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum NoiseDistribution {
    /// Uniform in `[-intensity, intensity]`.
    #[default]
    Uniform,
    /// Normal with standard deviation `intensity / 3`, truncated to `[-intensity, intensity]`.
    Gaussian,
}

/// Mutation settings for the two call sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariationConfig {
    /// Per-gene mutation probability when diversifying the seed.
    #[serde(default = "default_initial_rate")]
    pub initial_rate: f64,
    /// Noise bound when diversifying the seed.
    #[serde(default = "default_initial_intensity")]
    pub initial_intensity: f64,
    /// Per-gene mutation probability for offspring.
    #[serde(default = "default_offspring_rate")]
    pub offspring_rate: f64,
    /// Noise bound for offspring.
    #[serde(default = "default_offspring_intensity")]
    pub offspring_intensity: f64,
    #[serde(default)]
    pub noise: NoiseDistribution,
}

impl Default for VariationConfig {
    fn default() -> Self {
        Self {
            initial_rate: default_initial_rate(),
            initial_intensity: default_initial_intensity(),
            offspring_rate: default_offspring_rate(),
            offspring_intensity: default_offspring_intensity(),
            noise: NoiseDistribution::default(),
        }
    }
}

fn default_initial_rate() -> f64 {
    1.0
}
fn default_initial_intensity() -> f64 {
    0.5
}
fn default_offspring_rate() -> f64 {
    0.5
}
fn default_offspring_intensity() -> f64 {
    0.05
}

/// How simulated and reference channels are reduced to one score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum FitnessMetric {
    /// Pearson correlation of all channels concatenated.
    #[default]
    Pearson,
    /// Mean of the defined per-channel Pearson correlations. Undefined channels are skipped.
    ChannelMean,
    /// Spearman rank correlation of all channels concatenated.
    Spearman,
}

/// Fitness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessConfig {
    /// Sensor channels compared, in concatenation order.
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
    #[serde(default)]
    pub metric: FitnessMetric,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            channels: default_channels(),
            metric: FitnessMetric::default(),
        }
    }
}

/// How to run the external simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorSettings {
    /// Executable to launch.
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments placed before the config argument.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Flag preceding the config path. Empty passes the path positionally.
    #[serde(default = "default_config_arg")]
    pub config_arg: String,
    /// Flag disabling the simulator UI.
    #[serde(default = "default_headless_arg")]
    pub headless_arg: Option<String>,
    /// Working directory of the simulator. Relative paths below resolve here.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Where the merged config document is written.
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,
    /// Where the simulator writes its results.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Maximum run time of one simulation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Polling interval while waiting for the process and its output.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How long to wait for the output file after the process exits.
    #[serde(default = "default_output_grace_secs")]
    pub output_grace_secs: u64,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            config_arg: default_config_arg(),
            headless_arg: default_headless_arg(),
            working_dir: None,
            config_path: default_config_path(),
            output_path: default_output_path(),
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            output_grace_secs: default_output_grace_secs(),
        }
    }
}

impl SimulatorSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn output_grace(&self) -> Duration {
        Duration::from_secs(self.output_grace_secs)
    }

    /// Resolve a path against the working directory, if one is set.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.working_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

fn default_program() -> String {
    "cargo".to_string()
}
fn default_args() -> Vec<String> {
    vec!["run".to_string(), "--release".to_string(), "--".to_string()]
}
fn default_config_arg() -> String {
    "--config".to_string()
}
fn default_headless_arg() -> Option<String> {
    Some("--headless".to_string())
}
fn default_config_path() -> PathBuf {
    PathBuf::from("assets/config.json")
}
fn default_output_path() -> PathBuf {
    PathBuf::from("saida.csv")
}
fn default_timeout_secs() -> u64 {
    1800
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_output_grace_secs() -> u64 {
    5
}

/// Result artifact locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Best individual merged into the base document.
    #[serde(default = "default_best_config_path")]
    pub best_config_path: PathBuf,
    /// Convergence plot (SVG).
    #[serde(default = "default_plot_path")]
    pub plot_path: Option<PathBuf>,
    /// Fixed y-axis range of the convergence plot.
    #[serde(default = "default_plot_y_range")]
    pub plot_y_range: (f64, f64),
    /// Convergence history as CSV.
    #[serde(default = "default_history_path")]
    pub history_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            best_config_path: default_best_config_path(),
            plot_path: default_plot_path(),
            plot_y_range: default_plot_y_range(),
            history_path: default_history_path(),
        }
    }
}

fn default_best_config_path() -> PathBuf {
    PathBuf::from("assets/configDef.json")
}
fn default_plot_path() -> Option<PathBuf> {
    Some(PathBuf::from("convergence.svg"))
}
fn default_plot_y_range() -> (f64, f64) {
    (-1.0, 1.0)
}
fn default_history_path() -> Option<PathBuf> {
    Some(PathBuf::from("convergence.csv"))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Elite count must be between 2 and the population size ({size}), got {elite}")]
    InvalidEliteCount { elite: usize, size: usize },
    #[error("{name} must be a probability in [0, 1], got {value}")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidIntensity { name: &'static str, value: f64 },
    #[error("Target fitness must be finite")]
    InvalidTarget,
    #[error("No fitness channels specified")]
    NoChannels,
    #[error("Duplicate fitness channel `{0}`")]
    DuplicateChannel(String),
    #[error("Simulator program must not be empty")]
    EmptyProgram,
    #[error("Simulator timeout and poll interval must be positive")]
    InvalidTiming,
    #[error("Plot y range must satisfy min < max, got {0:?}")]
    InvalidPlotRange((f64, f64)),
    #[error("Best config path must differ from the working config path")]
    OutputCollision,
}

impl OptimizerConfig {
    /// Load settings from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: OptimizerConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pop = &self.population;
        if pop.size < 2 {
            return Err(ConfigError::PopulationTooSmall);
        }
        if pop.elite_count < 2 || pop.elite_count > pop.size {
            return Err(ConfigError::InvalidEliteCount {
                elite: pop.elite_count,
                size: pop.size,
            });
        }
        if pop.target_fitness.is_some_and(|t| !t.is_finite()) {
            return Err(ConfigError::InvalidTarget);
        }

        let check_rate = |value: f64, name: &'static str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidRate { name, value })
            }
        };
        let check_intensity = |value: f64, name: &'static str| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::InvalidIntensity { name, value })
            }
        };
        let var = &self.variation;
        check_rate(var.initial_rate, "initial_rate")?;
        check_rate(var.offspring_rate, "offspring_rate")?;
        check_intensity(var.initial_intensity, "initial_intensity")?;
        check_intensity(var.offspring_intensity, "offspring_intensity")?;

        if self.fitness.channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        let mut seen = HashSet::new();
        for channel in &self.fitness.channels {
            if !seen.insert(channel.as_str()) {
                return Err(ConfigError::DuplicateChannel(channel.clone()));
            }
        }

        let sim = &self.simulator;
        if sim.program.trim().is_empty() {
            return Err(ConfigError::EmptyProgram);
        }
        if sim.timeout_secs == 0 || sim.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidTiming);
        }

        let (lo, hi) = self.output.plot_y_range;
        if !(lo < hi) {
            return Err(ConfigError::InvalidPlotRange(self.output.plot_y_range));
        }
        // The working config resolves against the simulator's directory, the
        // best config against ours.
        if absolute(&sim.resolve(&sim.config_path)) == absolute(&self.output.best_config_path) {
            return Err(ConfigError::OutputCollision);
        }

        Ok(())
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
