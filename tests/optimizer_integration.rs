//! End-to-end optimizer runs against stub simulators.

use std::path::PathBuf;

use serde_json::json;

use simtune::{
    compute::{EvaluationFailure, EvolutionEngine},
    report,
    schema::{
        ConfigDocument, Dataset, DocumentFormat, FitnessConfig, Gene, Individual,
        OptimizerConfig, PopulationConfig, StopReason,
    },
};

const CHANNELS: [&str; 2] = ["A1", "A2"];
const ROWS: usize = 50;

fn settings(size: usize, generations: usize, elite: usize, seed: u64) -> OptimizerConfig {
    OptimizerConfig {
        population: PopulationConfig {
            size,
            generations,
            elite_count: elite,
            ..Default::default()
        },
        fitness: FitnessConfig {
            channels: CHANNELS.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        },
        random_seed: Some(seed),
        ..Default::default()
    }
}

fn document() -> ConfigDocument {
    document_with_rate(0.2)
}

fn document_with_rate(rate: f64) -> ConfigDocument {
    ConfigDocument::parse(
        &format!(r#"{{"window": {{"width": 640}}, "simulation": {{"rate": {rate:?}, "mode": "fast"}}}}"#),
        DocumentFormat::Json,
    )
    .unwrap()
}

fn reference() -> Dataset {
    Dataset::from_columns(CHANNELS.iter().enumerate().map(|(c, name)| {
        let values: Vec<f64> = (0..ROWS).map(|i| 100.0 * (i + c * ROWS) as f64).collect();
        (name.to_string(), values)
    }))
}

/// Target value of `rate` for [`rate_simulator`].
const TARGET_RATE: f64 = 0.2;

/// Reference blended with an alternating signal uncorrelated with it.
///
/// The signal's weight grows with `|rate - TARGET_RATE|`, so the correlation
/// with the reference is 1.0 at the target and falls off away from it.
fn rate_simulator(individual: &Individual) -> Result<Dataset, EvaluationFailure> {
    let rate = individual.numeric("rate").unwrap_or(0.0);
    let amplitude = 20_000.0 * (rate - TARGET_RATE).abs();
    let reference = reference();
    Ok(Dataset::from_columns(reference.iter().map(|(name, values)| {
        let noisy: Vec<f64> = values
            .iter()
            .enumerate()
            .map(|(i, v)| v + if i % 2 == 0 { amplitude } else { -amplitude })
            .collect();
        (name.to_string(), noisy)
    })))
}

fn broken_simulator(_: &Individual) -> Result<Dataset, EvaluationFailure> {
    Err(EvaluationFailure::MissingOutput(PathBuf::from("saida.csv")))
}

#[test]
fn test_short_run_records_history_and_keeps_categoricals() {
    let seed = document().seed_individual().unwrap();
    let mut engine =
        EvolutionEngine::new(settings(4, 2, 2, 7), rate_simulator, reference(), seed).unwrap();
    let result = engine.run().unwrap();

    assert_eq!(result.history.len(), 3);
    let best: Vec<f64> = result.history.best_fitness().collect();
    for pair in best.windows(2) {
        assert!(pair[1] >= pair[0], "history decreased: {best:?}");
    }
    assert!(result.best_fitness >= best[2]);

    assert_eq!(result.best.get("mode"), Some(&Gene::Categorical(json!("fast"))));
    for (individual, _) in &result.final_population {
        assert_eq!(individual.get("mode"), Some(&Gene::Categorical(json!("fast"))));
        assert!(individual.numeric("rate").unwrap() >= 0.0);
    }
    assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
}

#[test]
fn test_rate_converges_to_target() {
    // Start far from the target: every initial rate lies in [0.4, 0.8].
    let seed = document_with_rate(0.6).seed_individual().unwrap();
    let mut config = settings(16, 20, 4, 7);
    config.variation.initial_intensity = 0.2;
    config.variation.offspring_rate = 1.0;
    config.variation.offspring_intensity = 0.1;

    let mut engine = EvolutionEngine::new(config, rate_simulator, reference(), seed).unwrap();
    let result = engine.run().unwrap();

    let best_rate = result.best.numeric("rate").unwrap();
    assert!(
        (best_rate - TARGET_RATE).abs() < 0.05,
        "best rate {best_rate} not near {TARGET_RATE}"
    );

    let first_generation = result.history.records()[1].best_fitness;
    assert!(first_generation < 0.8, "initial best {first_generation}");
    assert!(result.best_fitness > 0.9);
    assert!(result.best_fitness > first_generation + 0.1);
}

#[test]
fn test_broken_simulator_degrades_to_neutral_scores() {
    let seed = document().seed_individual().unwrap();
    let mut engine =
        EvolutionEngine::new(settings(4, 2, 2, 3), broken_simulator, reference(), seed).unwrap();
    let result = engine.run().unwrap();

    assert!(result.history.best_fitness().all(|f| f == 0.0));
    assert!(result.final_population.iter().all(|(_, f)| *f == 0.0));
    assert_eq!(result.best_fitness, 0.0);
    assert_eq!(result.best, result.final_population[0].0);
    assert_eq!(result.stats.failed_evaluations, 12);
    assert_eq!(result.stats.total_evaluations, 12);
}

#[test]
fn test_best_export_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let doc = document();
    let seed = doc.seed_individual().unwrap();
    let mut engine =
        EvolutionEngine::new(settings(6, 3, 2, 11), rate_simulator, reference(), seed).unwrap();
    let result = engine.run().unwrap();

    let best_path = dir.path().join("configDef.json");
    report::export_best(&doc, &result.best, &best_path).unwrap();
    let exported = ConfigDocument::load(&best_path).unwrap();
    assert_eq!(exported.seed_individual().unwrap(), result.best);

    let text = std::fs::read_to_string(&best_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["window"]["width"], json!(640));

    let history_path = dir.path().join("convergence.csv");
    report::write_history_csv(&result.history, &history_path).unwrap();
    assert_eq!(
        report::read_history_csv(&history_path).unwrap(),
        result.history.records()
    );

    let plot_path = dir.path().join("convergence.svg");
    report::plot_convergence(&result.history, &plot_path, (-1.0, 1.0)).unwrap();
    assert!(plot_path.exists());
}

#[cfg(unix)]
#[test]
fn test_process_gateway_run() {
    use simtune::compute::ProcessGateway;
    use simtune::schema::SimulatorSettings;

    let dir = tempfile::tempdir().unwrap();
    let mut csv = String::from("A1,A2\n");
    for i in 0..10 {
        csv.push_str(&format!("{},{}\n", i, 2 * i + 1));
    }
    std::fs::write(dir.path().join("reference.csv"), &csv).unwrap();

    let mut config = settings(3, 1, 2, 5);
    config.simulator = SimulatorSettings {
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            "test -s \"$1\" && cp reference.csv saida.csv".to_string(),
            "sim".to_string(),
        ],
        config_arg: String::new(),
        headless_arg: None,
        working_dir: Some(dir.path().to_path_buf()),
        config_path: PathBuf::from("config.json"),
        output_path: PathBuf::from("saida.csv"),
        timeout_secs: 30,
        poll_interval_ms: 10,
        output_grace_secs: 1,
    };
    config.parallel_evaluation = true;

    let reference = Dataset::load_csv(dir.path().join("reference.csv"), &config.fitness.channels)
        .unwrap();
    let doc = document();
    let gateway = ProcessGateway::new(
        config.simulator.clone(),
        doc.clone(),
        config.fitness.channels.clone(),
    );
    let seed = doc.seed_individual().unwrap();
    let result = EvolutionEngine::new(config, gateway, reference, seed)
        .unwrap()
        .run()
        .unwrap();

    assert!((result.best_fitness - 1.0).abs() < 1e-12);
    assert_eq!(result.stats.failed_evaluations, 0);
    assert_eq!(result.stats.total_evaluations, 6);
    assert!(dir.path().join("config.json").exists());
}
