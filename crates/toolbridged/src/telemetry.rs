//! Structured telemetry initialisation for the daemon.
//!
//! Logs always go to stderr; stdout carries protocol responses only. When
//! the tool configuration names a log directory, every line is also appended
//! to `toolbridged.log` inside it.

use std::fs::{self, OpenOptions};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, writer::BoxMakeWriter, writer::MakeWriterExt};

use toolbridge_config::{LogFormat, Settings};

/// File name used inside the configured log directory.
pub const LOG_FILE_NAME: &str = "toolbridged.log";

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to open the log file in the configured directory.
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        /// Path of the log file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Repeated calls are idempotent: only the first installs a subscriber.
pub fn initialise(
    settings: &Settings,
    log_dir: Option<&Path>,
) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(settings, log_dir))
        .map(|_| TelemetryHandle)
}

fn install_subscriber(settings: &Settings, log_dir: Option<&Path>) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(settings.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let (writer, ansi) = match log_dir {
        Some(dir) => {
            let file = open_log_file(dir)?;
            (BoxMakeWriter::new(io::stderr.and(Mutex::new(file))), false)
        }
        None => (BoxMakeWriter::new(io::stderr), io::stderr().is_terminal()),
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match settings.log_format() {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

fn open_log_file(dir: &Path) -> Result<fs::File, TelemetryError> {
    let path = dir.join(LOG_FILE_NAME);
    fs::create_dir_all(dir)
        .and_then(|()| OpenOptions::new().append(true).create(true).open(&path))
        .map_err(|source| TelemetryError::LogFile { path, source })
}
