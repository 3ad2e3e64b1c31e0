//! Simulator gateway: one parameter set in, one output dataset out.
//!
//! The gateway hides how the simulator is driven. [`ProcessGateway`] writes
//! the merged config document, runs the simulator as a child process with a
//! bounded wait, and reads the results CSV the simulator leaves behind.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::schema::{
    ConfigDocument, Dataset, DatasetError, DocumentError, Individual, SimulatorSettings,
    remove_stale,
};

/// Why an evaluation produced no usable dataset.
///
/// These are data conditions: the optimizer scores the individual with the
/// neutral fitness and carries on.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationFailure {
    #[error("Failed to prepare simulator run: {0}")]
    Prepare(#[from] DocumentError),
    #[error("Failed to launch `{program}`: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("Failed while waiting for the simulator: {0}")]
    Wait(#[source] io::Error),
    #[error("Simulator did not finish within {0:?}")]
    Timeout(Duration),
    #[error("Simulator produced no output at {0}")]
    MissingOutput(PathBuf),
    #[error("Simulator output is unusable: {0}")]
    MalformedOutput(#[source] DatasetError),
}

/// Boundary to the external simulator.
pub trait SimulatorGateway: Send + Sync {
    /// Run the simulator for `individual` and return its output dataset.
    fn evaluate(&self, individual: &Individual) -> Result<Dataset, EvaluationFailure>;
}

impl<F> SimulatorGateway for F
where
    F: Fn(&Individual) -> Result<Dataset, EvaluationFailure> + Send + Sync,
{
    fn evaluate(&self, individual: &Individual) -> Result<Dataset, EvaluationFailure> {
        self(individual)
    }
}

/// Drives the simulator as a child process.
///
/// All runs share one config path and one output path, so runs are
/// serialized even when the optimizer evaluates in parallel.
pub struct ProcessGateway {
    settings: SimulatorSettings,
    document: ConfigDocument,
    channels: Vec<String>,
    run_lock: Mutex<()>,
}

impl ProcessGateway {
    pub fn new(settings: SimulatorSettings, document: ConfigDocument, channels: Vec<String>) -> Self {
        Self {
            settings,
            document,
            channels,
            run_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &SimulatorSettings {
        &self.settings
    }

    fn command(&self) -> Command {
        let settings = &self.settings;
        let mut cmd = Command::new(&settings.program);
        cmd.args(&settings.args);
        if !settings.config_arg.is_empty() {
            cmd.arg(&settings.config_arg);
        }
        cmd.arg(&settings.config_path);
        if let Some(flag) = &settings.headless_arg {
            cmd.arg(flag);
        }
        if let Some(dir) = &settings.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd
    }

    fn wait_with_timeout(&self, child: &mut Child) -> Result<ExitStatus, EvaluationFailure> {
        let timeout = self.settings.timeout();
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait().map_err(EvaluationFailure::Wait)? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                if let Err(e) = child.kill() {
                    log::warn!("Failed to kill timed out simulator: {}", e);
                }
                // Reap the child so it does not linger as a zombie.
                if let Err(e) = child.wait() {
                    log::warn!("Failed to reap timed out simulator: {}", e);
                }
                return Err(EvaluationFailure::Timeout(timeout));
            }
            thread::sleep(self.settings.poll_interval());
        }
    }

    /// Poll for `path` until it exists or the grace period runs out.
    fn await_output(&self, path: &Path) -> bool {
        let deadline = Instant::now() + self.settings.output_grace();
        loop {
            if path.exists() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(self.settings.poll_interval());
        }
    }
}

impl SimulatorGateway for ProcessGateway {
    fn evaluate(&self, individual: &Individual) -> Result<Dataset, EvaluationFailure> {
        let _guard = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let output_path = self.settings.resolve(&self.settings.output_path);
        let config_path = self.settings.resolve(&self.settings.config_path);

        remove_stale(&output_path)?;
        self.document.write(individual, &config_path)?;

        let mut child = self
            .command()
            .spawn()
            .map_err(|source| EvaluationFailure::Spawn {
                program: self.settings.program.clone(),
                source,
            })?;
        let started = Instant::now();
        let status = self.wait_with_timeout(&mut child)?;
        log::debug!(
            "Simulator exited with {} after {:.1}s",
            status,
            started.elapsed().as_secs_f64()
        );
        if !status.success() {
            log::warn!("Simulator exited with {}", status);
        }

        if !self.await_output(&output_path) {
            return Err(EvaluationFailure::MissingOutput(output_path));
        }

        Dataset::load_csv(&output_path, &self.channels).map_err(EvaluationFailure::MalformedOutput)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::schema::DocumentFormat;

    const DOC: &str = r#"{"simulation": {"gain": 0.5, "mode": "fast"}}"#;

    fn gateway(dir: &Path, script: &str, timeout_secs: u64) -> ProcessGateway {
        let settings = SimulatorSettings {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "sim".to_string()],
            config_arg: String::new(),
            headless_arg: None,
            working_dir: Some(dir.to_path_buf()),
            config_path: PathBuf::from("config.json"),
            output_path: PathBuf::from("saida.csv"),
            timeout_secs,
            poll_interval_ms: 10,
            output_grace_secs: 0,
        };
        let document = ConfigDocument::parse(DOC, DocumentFormat::Json).unwrap();
        ProcessGateway::new(settings, document, vec!["A1".to_string(), "A2".to_string()])
    }

    fn seed() -> Individual {
        ConfigDocument::parse(DOC, DocumentFormat::Json)
            .unwrap()
            .seed_individual()
            .unwrap()
    }

    #[test]
    fn test_successful_run_reads_output() {
        let dir = tempfile::tempdir().unwrap();
        // $1 is the config path; copy it to prove it was written before the run.
        let script = "cp \"$1\" seen.json && printf 'A1,A2\\n1.0,2.0\\n3.0,4.0\\n' > saida.csv";
        let gw = gateway(dir.path(), script, 10);

        let dataset = gw.evaluate(&seed()).unwrap();
        assert_eq!(dataset.column("A1"), Some(&[1.0, 3.0][..]));
        assert_eq!(dataset.column("A2"), Some(&[2.0, 4.0][..]));

        let seen = ConfigDocument::load(dir.path().join("seen.json")).unwrap();
        assert_eq!(seen.seed_individual().unwrap(), seed());
    }

    #[test]
    fn test_stale_output_is_cleared() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("saida.csv"), "A1,A2\n9.0,9.0\n").unwrap();
        let gw = gateway(dir.path(), "exit 0", 10);

        let err = gw.evaluate(&seed()).unwrap_err();
        assert!(matches!(err, EvaluationFailure::MissingOutput(_)));
        assert!(!dir.path().join("saida.csv").exists());
    }

    #[test]
    fn test_failed_process_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(dir.path(), "exit 3", 10);
        assert!(matches!(
            gw.evaluate(&seed()),
            Err(EvaluationFailure::MissingOutput(_))
        ));
    }

    #[test]
    fn test_malformed_output() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(dir.path(), "printf 'B1\\n1.0\\n' > saida.csv", 10);
        assert!(matches!(
            gw.evaluate(&seed()),
            Err(EvaluationFailure::MalformedOutput(DatasetError::MissingColumn(_)))
        ));
    }

    #[test]
    fn test_timeout_kills_simulator() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(dir.path(), "sleep 30", 1);
        let started = Instant::now();
        assert!(matches!(
            gw.evaluate(&seed()),
            Err(EvaluationFailure::Timeout(_))
        ));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_run_after_timeout_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        // First run hangs, later runs answer immediately.
        let script = "if [ -f started ]; then printf 'A1,A2\\n1.0,2.0\\n' > saida.csv; \
                      else touch started; sleep 30; fi";
        let gw = gateway(dir.path(), script, 1);

        assert!(matches!(
            gw.evaluate(&seed()),
            Err(EvaluationFailure::Timeout(_))
        ));
        let dataset = gw.evaluate(&seed()).unwrap();
        assert_eq!(dataset.column("A1"), Some(&[1.0][..]));
    }

    #[test]
    fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let mut gw = gateway(dir.path(), "", 1);
        gw.settings.program = "definitely-not-a-simulator-binary".to_string();
        assert!(matches!(
            gw.evaluate(&seed()),
            Err(EvaluationFailure::Spawn { .. })
        ));
    }
}
