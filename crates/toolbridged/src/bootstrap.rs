//! Bridge bootstrap orchestration.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use toolbridge_config::{ConfigError, LoadedConfig, Settings};
use toolbridge_tools::{ToolError, ToolRegistry, ToolRunner};

use crate::dispatch::{ServerInfo, ToolDispatcher};
use crate::health::HealthReporter;
use crate::recorder::{OutputRecorder, Sanitizer};
use crate::server::{self, ServeError, ServeStats};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Errors surfaced during bootstrap. All are fatal: the bridge never starts
/// serving after one of these.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The tool configuration failed to load.
    #[error("failed to load tool configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The output log directory could not be created.
    #[error("failed to prepare output directory {path}: {source}")]
    OutputDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The tool registry could not be built.
    #[error("failed to build tool registry: {source}")]
    Registry {
        /// Underlying registration error.
        #[source]
        source: ToolError,
    },
}

/// A bootstrapped bridge, ready to serve.
pub struct Bridge {
    dispatcher: ToolDispatcher,
    output_path: PathBuf,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Bridge {
    /// Accessor for the dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    /// Path of the durable output log.
    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Serves requests from `reader` to `writer` until EOF.
    ///
    /// # Errors
    ///
    /// Returns a [`ServeError`] when either stream fails.
    pub fn serve<R: Read, W: Write>(
        &self,
        reader: R,
        writer: W,
    ) -> Result<ServeStats, ServeError> {
        self.reporter.serve_started();
        let outcome = server::serve(reader, writer, &self.dispatcher);
        self.reporter.serve_finished(outcome.as_ref());
        outcome
    }

    /// Serves requests over the process's stdin and stdout.
    ///
    /// # Errors
    ///
    /// Returns a [`ServeError`] when either stream fails.
    pub fn serve_stdio(&self) -> Result<ServeStats, ServeError> {
        self.serve(io::stdin().lock(), io::stdout().lock())
    }
}

/// Bootstraps the bridge from `settings` with an unsanitised output log.
///
/// # Errors
///
/// Returns a [`BootstrapError`] describing the first step that failed.
pub fn bootstrap_with(
    settings: &Settings,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Bridge, BootstrapError> {
    bootstrap_with_sanitizer(settings, reporter, None)
}

/// Bootstraps the bridge from `settings`, passing every recorded string
/// value through `sanitizer` when one is given.
///
/// The tool configuration is loaded first. Once it has been read, its file
/// is deleted exactly once, whether or not the remaining steps succeed.
///
/// # Errors
///
/// Returns a [`BootstrapError`] describing the first step that failed.
pub fn bootstrap_with_sanitizer(
    settings: &Settings,
    reporter: Arc<dyn HealthReporter>,
    sanitizer: Option<Arc<dyn Sanitizer>>,
) -> Result<Bridge, BootstrapError> {
    reporter.bootstrap_starting();

    let (loaded, secret) = match toolbridge_config::load(settings.config_path()) {
        Ok(parts) => parts,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let prepared = prepare(settings, &loaded);

    let secret_path = secret.path().to_path_buf();
    let outcome = secret.cleanup();
    reporter.config_cleanup(&secret_path, &outcome);

    let (telemetry, output_path, registry) = match prepared {
        Ok(parts) => parts,
        Err(error) => {
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let plain = OutputRecorder::new(Some(output_path.clone()));
    let recorder = match sanitizer {
        Some(active) => plain.with_sanitizer(active),
        None => plain,
    };
    let dispatcher = ToolDispatcher::new(
        ToolRunner::new(registry),
        recorder,
        ServerInfo::new(loaded.server_name(), loaded.version()),
    );
    reporter.bootstrap_succeeded(dispatcher.runner().registry().len(), &output_path);

    Ok(Bridge {
        dispatcher,
        output_path,
        telemetry,
        reporter,
    })
}

fn prepare(
    settings: &Settings,
    loaded: &LoadedConfig,
) -> Result<(TelemetryHandle, PathBuf, ToolRegistry), BootstrapError> {
    let telemetry = telemetry::initialise(settings, loaded.log_dir())
        .map_err(|source| BootstrapError::Telemetry { source })?;

    let output_path = resolve_output_path(settings, loaded);
    prepare_output_directory(&output_path)?;

    let registry = ToolRegistry::from_config(loaded.tools(), loaded.base_dir(), settings.workspace())
        .map_err(|source| BootstrapError::Registry { source })?;

    Ok((telemetry, output_path, registry))
}

/// `--output`, then the configuration's `outputFile`, then the default.
fn resolve_output_path(settings: &Settings, loaded: &LoadedConfig) -> PathBuf {
    settings
        .output()
        .map_or_else(|| loaded.output_path(), Path::to_path_buf)
}

fn prepare_output_directory(output_path: &Path) -> Result<(), BootstrapError> {
    let Some(parent) = output_path.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(parent).map_err(|source| BootstrapError::OutputDirectory {
        path: parent.to_path_buf(),
        source,
    })
}
