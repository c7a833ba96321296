//! Configuration for the toolbridge daemon.
//!
//! Two layers of configuration exist. [`Settings`] holds the process-level
//! knobs (log filter, log format, where to find the tool configuration) and is
//! parsed from command-line flags with environment fallbacks. The tool
//! configuration itself is a one-shot JSON document that may embed
//! credentials: [`lifecycle::load`] reads it exactly once and hands back a
//! [`SecretConfigFile`] whose [`SecretConfigFile::cleanup`] consumes the handle
//! so the file cannot be deleted twice.

pub mod defaults;
mod error;
pub mod lifecycle;
mod logging;
mod model;
mod settings;

pub use self::defaults::{
    DEFAULT_CONFIG_PATH, DEFAULT_LOG_FILTER, DEFAULT_OUTPUT_PATH, DEFAULT_TIMEOUT_SECS,
};
pub use self::error::ConfigError;
pub use self::lifecycle::{CleanupOutcome, LoadedConfig, SecretConfigFile, load};
pub use self::logging::{LogFormat, LogFormatParseError};
pub use self::model::{BridgeConfig, ToolConfig};
pub use self::settings::Settings;
