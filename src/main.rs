//! Simtune CLI - Calibrate simulator parameters against reference data.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use simtune::{
    compute::{EvolutionEngine, ProcessGateway},
    report,
    schema::{ConfigDocument, Dataset, EvolutionProgress, OptimizerConfig},
};

/// Tune the `simulation` section of a simulator config against reference data.
#[derive(Debug, Parser)]
#[command(name = "simtune", version, about)]
struct Cli {
    /// Base configuration document (JSON or YAML) with a `simulation` section.
    #[arg(long, default_value = "assets/config.json")]
    config: PathBuf,

    /// Reference measurements (CSV with one column per channel).
    #[arg(long, default_value = "dados_teste.csv")]
    reference: PathBuf,

    /// Optimizer settings (JSON). Defaults are used when omitted.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Individuals per generation.
    #[arg(long)]
    population_size: Option<usize>,

    /// Number of generations.
    #[arg(long)]
    generations: Option<usize>,

    /// Individuals kept unmodified each generation.
    #[arg(long)]
    elite_count: Option<usize>,

    /// Random seed for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Simulator executable, replacing the configured program and its arguments.
    #[arg(long)]
    simulator: Option<String>,

    /// Evaluate each generation in parallel.
    #[arg(long)]
    parallel: bool,

    /// Print the default optimizer settings and exit.
    #[arg(long)]
    print_default_settings: bool,
}

impl Cli {
    fn settings(&self) -> Result<OptimizerConfig, String> {
        let mut settings = match &self.settings {
            Some(path) => OptimizerConfig::load(path).map_err(|e| e.to_string())?,
            None => OptimizerConfig::default(),
        };

        if let Some(size) = self.population_size {
            settings.population.size = size;
        }
        if let Some(generations) = self.generations {
            settings.population.generations = generations;
        }
        if let Some(elite) = self.elite_count {
            settings.population.elite_count = elite;
        }
        if let Some(seed) = self.seed {
            settings.random_seed = Some(seed);
        }
        if let Some(program) = &self.simulator {
            settings.simulator.program = program.clone();
            settings.simulator.args.clear();
        }
        settings.parallel_evaluation |= self.parallel;

        settings.validate().map_err(|e| e.to_string())?;
        Ok(settings)
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    if cli.print_default_settings {
        return match serde_json::to_string_pretty(&OptimizerConfig::default()) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error serializing settings: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let settings = cli.settings()?;

    let document = ConfigDocument::load(&cli.config)
        .map_err(|e| format!("loading {}: {}", cli.config.display(), e))?;
    let seed = document.seed_individual().map_err(|e| e.to_string())?;
    let reference = Dataset::load_csv(&cli.reference, &settings.fitness.channels)
        .map_err(|e| format!("loading {}: {}", cli.reference.display(), e))?;

    println!("Simtune Calibration");
    println!("===================");
    println!("Config: {}", cli.config.display());
    println!(
        "Reference: {} ({} rows, {} channels)",
        cli.reference.display(),
        reference.row_count(),
        settings.fitness.channels.len()
    );
    println!(
        "Parameters: {} ({} numeric)",
        seed.schema().len(),
        seed.schema().numeric_count()
    );
    println!(
        "Population: {}, generations: {}, elite: {}",
        settings.population.size, settings.population.generations, settings.population.elite_count
    );
    println!();

    let gateway = ProcessGateway::new(
        settings.simulator.clone(),
        document.clone(),
        settings.fitness.channels.clone(),
    );
    let output = settings.output.clone();
    let mut engine =
        EvolutionEngine::new(settings, gateway, reference, seed).map_err(|e| e.to_string())?;

    let result = engine
        .run_with_callback(print_progress)
        .map_err(|e| e.to_string())?;

    println!();
    println!(
        "Finished after {} generations ({:?}) in {:.1}s",
        result.stats.generations, result.stats.stop_reason, result.stats.elapsed_seconds
    );
    println!(
        "Evaluations: {} ({} failed)",
        result.stats.total_evaluations, result.stats.failed_evaluations
    );
    println!("Best fitness: {:.6}", result.best_fitness);
    println!("Best parameters:");
    for (name, gene) in result.best.iter() {
        println!("  {} = {}", name, gene);
    }
    println!();

    ensure_parent(&output.best_config_path)?;
    report::export_best(&document, &result.best, &output.best_config_path)
        .map_err(|e| e.to_string())?;
    println!("Best configuration: {}", output.best_config_path.display());

    // Artifacts below are informative; a failure does not discard the result.
    if let Some(path) = &output.history_path {
        match report::write_history_csv(&result.history, path) {
            Ok(()) => println!("History: {}", path.display()),
            Err(e) => log::error!("{}", e),
        }
    }
    if let Some(path) = &output.plot_path {
        match report::plot_convergence(&result.history, path, output.plot_y_range) {
            Ok(()) => println!("Convergence plot: {}", path.display()),
            Err(e) => log::error!("{}", e),
        }
    }

    Ok(())
}

fn print_progress(progress: &EvolutionProgress) {
    println!(
        "  Generation {}/{}: best={:.4}, mean={:.4}, overall={:.4}{}",
        progress.generation + 1,
        progress.total_generations,
        progress.generation_best,
        progress.mean_fitness,
        progress.best_fitness,
        if progress.failed_evaluations > 0 {
            format!(" ({} failed)", progress.failed_evaluations)
        } else {
            String::new()
        }
    );
}

fn ensure_parent(path: &Path) -> Result<(), String> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)
            .map_err(|e| format!("creating {}: {}", dir.display(), e)),
        _ => Ok(()),
    }
}
