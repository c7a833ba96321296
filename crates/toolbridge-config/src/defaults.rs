//! Documented fallback values shared by the daemon and its configuration.

use std::path::PathBuf;

/// Location of the tool configuration when neither `--config-path` nor
/// `TOOLBRIDGE_CONFIG_PATH` is supplied.
pub const DEFAULT_CONFIG_PATH: &str = "/tmp/toolbridge/config.json";

/// Location of the durable output log when neither `--output` nor the
/// configuration's `outputFile` is supplied.
pub const DEFAULT_OUTPUT_PATH: &str = "/tmp/toolbridge/outputs.jsonl";

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Per-tool timeout applied when a tool entry omits `timeout`.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default path of the tool configuration file.
#[must_use]
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

/// Default path of the durable output log.
#[must_use]
pub fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

/// Default logging format for the daemon.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

pub(crate) const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
