//! Process-level settings parsed from flags and environment variables.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::defaults::{DEFAULT_CONFIG_PATH, DEFAULT_LOG_FILTER};
use crate::logging::LogFormat;

/// Runtime settings for the toolbridge daemon.
///
/// Every flag falls back to a `TOOLBRIDGE_*` environment variable so that a
/// setup step can prepare the daemon without touching its command line.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "toolbridged", version, about = "Newline-delimited JSON-RPC tool bridge")]
pub struct Settings {
    /// Path of the one-shot tool configuration file. Deleted after loading.
    #[arg(
        long,
        env = "TOOLBRIDGE_CONFIG_PATH",
        value_name = "PATH",
        default_value = DEFAULT_CONFIG_PATH
    )]
    pub config_path: PathBuf,
    /// Durable output log; overrides the configuration's `outputFile`.
    #[arg(long, env = "TOOLBRIDGE_OUTPUT", value_name = "PATH")]
    pub output: Option<PathBuf>,
    /// Working directory for subprocess tool handlers.
    #[arg(long, env = "TOOLBRIDGE_WORKSPACE", value_name = "DIR")]
    pub workspace: Option<PathBuf>,
    /// Tracing filter expression (for example `toolbridged=debug`).
    #[arg(
        long,
        env = "TOOLBRIDGE_LOG_FILTER",
        value_name = "FILTER",
        default_value = DEFAULT_LOG_FILTER
    )]
    pub log_filter: String,
    /// Log line format written to stderr.
    #[arg(
        long,
        env = "TOOLBRIDGE_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Json
    )]
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            output: None,
            workspace: None,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: LogFormat::default(),
        }
    }
}

impl Settings {
    /// Parses settings from an explicit argument iterator.
    ///
    /// # Errors
    ///
    /// Returns the [`clap::Error`] describing the invalid or missing flag.
    pub fn try_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args)
    }

    /// Returns the configured tool configuration path.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        self.config_path.as_path()
    }

    /// Returns the output log override, if any.
    #[must_use]
    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Returns the handler working directory override, if any.
    #[must_use]
    pub fn workspace(&self) -> Option<&Path> {
        self.workspace.as_deref()
    }

    /// Returns the tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
