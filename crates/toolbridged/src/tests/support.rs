//! Test doubles and fixtures shared by the bootstrap suites.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::TempDir;
use toolbridge_config::{CleanupOutcome, Settings};

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::server::{ServeError, ServeStats};

/// Structured health events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed with the given number of tools.
    BootstrapSucceeded(usize),
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// The secret configuration was handled; `true` when it is gone.
    ConfigCleanup(bool),
    /// The request loop started.
    ServeStarted,
    /// The request loop finished with the number of responses written.
    ServeFinished(Option<u64>),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, tools: usize, _output_path: &Path) {
        self.record(HealthEvent::BootstrapSucceeded(tools));
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn config_cleanup(&self, _path: &Path, outcome: &CleanupOutcome) {
        self.record(HealthEvent::ConfigCleanup(outcome.is_gone()));
    }

    fn serve_started(&self) {
        self.record(HealthEvent::ServeStarted);
    }

    fn serve_finished(&self, outcome: Result<&ServeStats, &ServeError>) {
        self.record(HealthEvent::ServeFinished(
            outcome.ok().map(|stats| stats.responses),
        ));
    }
}

/// A temporary directory holding a tool configuration file.
pub struct ConfigDir {
    pub dir: TempDir,
    pub config: PathBuf,
    pub output: PathBuf,
}

impl ConfigDir {
    /// Writes `body` as the configuration file.
    pub fn with_config(body: &str) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let config = dir.path().join("config.json");
        fs::write(&config, body).expect("write config");
        let output = dir.path().join("out").join("outputs.jsonl");
        Self {
            dir,
            config,
            output,
        }
    }

    /// Settings pointing at this directory's configuration and output.
    pub fn settings(&self) -> Settings {
        Settings {
            config_path: self.config.clone(),
            output: Some(self.output.clone()),
            log_filter: String::from("off"),
            ..Settings::default()
        }
    }
}
