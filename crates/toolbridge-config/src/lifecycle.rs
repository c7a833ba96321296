//! One-shot loading of the secret-bearing tool configuration.
//!
//! [`load`] reads and validates the document, returning the parsed
//! configuration alongside a [`SecretConfigFile`] handle. The handle is the
//! only way to delete the file and [`SecretConfigFile::cleanup`] consumes it,
//! so deletion is attempted at most once.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::defaults::default_output_path;
use crate::error::ConfigError;
use crate::model::{BridgeConfig, ToolConfig};

const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Reads, parses, and validates the tool configuration at `path`.
///
/// The file is left on disk; call [`SecretConfigFile::cleanup`] once the
/// registry has been extracted.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] when the file is absent,
/// [`ConfigError::Parse`] when it is not JSON, and [`ConfigError::Shape`] when
/// the `tools` array is missing, is not an array, contains an invalid entry,
/// repeats a tool name, or declares a zero timeout.
pub fn load(config_path: impl AsRef<Path>) -> Result<(LoadedConfig, SecretConfigFile), ConfigError> {
    let path = config_path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let document: Value =
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let config = parse_document(path, document)?;
    validate_tools(path, &config.tools)?;

    debug!(
        target: LIFECYCLE_TARGET,
        path = %path.display(),
        tools = config.tools.len(),
        "loaded tool configuration"
    );

    Ok((
        LoadedConfig {
            config,
            source_path: path.to_path_buf(),
        },
        SecretConfigFile {
            path: path.to_path_buf(),
        },
    ))
}

fn parse_document(path: &Path, document: Value) -> Result<BridgeConfig, ConfigError> {
    let Some(object) = document.as_object() else {
        return Err(ConfigError::shape(path, "expected a JSON object"));
    };
    match object.get("tools") {
        None => return Err(ConfigError::shape(path, "missing 'tools' field")),
        Some(Value::Array(_)) => {}
        Some(_) => return Err(ConfigError::shape(path, "'tools' must be an array")),
    }
    serde_json::from_value(document)
        .map_err(|err| ConfigError::shape(path, format!("invalid tool entry: {err}")))
}

fn validate_tools(path: &Path, tools: &[ToolConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::with_capacity(tools.len());
    for tool in tools {
        if tool.name.trim().is_empty() {
            return Err(ConfigError::shape(path, "tool name must not be empty"));
        }
        if !seen.insert(tool.name.as_str()) {
            return Err(ConfigError::shape(
                path,
                format!("duplicate tool name '{}'", tool.name),
            ));
        }
        if tool.timeout_secs == 0 {
            return Err(ConfigError::shape(
                path,
                format!("tool '{}' timeout must be positive", tool.name),
            ));
        }
        if !tool.input_schema.is_object() {
            return Err(ConfigError::shape(
                path,
                format!("tool '{}' inputSchema must be an object", tool.name),
            ));
        }
    }
    Ok(())
}

/// A validated configuration together with where it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    config: BridgeConfig,
    source_path: PathBuf,
}

impl LoadedConfig {
    /// Builds a loaded configuration without touching the filesystem.
    #[must_use]
    pub fn from_parts(config: BridgeConfig, source_path: impl Into<PathBuf>) -> Self {
        Self {
            config,
            source_path: source_path.into(),
        }
    }

    /// Returns the parsed document.
    #[must_use]
    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns the declared tools in file order.
    #[must_use]
    pub fn tools(&self) -> &[ToolConfig] {
        &self.config.tools
    }

    /// Resolves the durable output log, falling back to
    /// [`crate::DEFAULT_OUTPUT_PATH`].
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.config
            .output_file
            .clone()
            .unwrap_or_else(default_output_path)
    }

    /// Directory against which relative handler paths are resolved.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        match self.source_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Returns the path the configuration was read from.
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Returns the optional server name.
    #[must_use]
    pub fn server_name(&self) -> Option<&str> {
        self.config.server_name.as_deref()
    }

    /// Returns the optional server version.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.config.version.as_deref()
    }

    /// Returns the optional log directory.
    #[must_use]
    pub fn log_dir(&self) -> Option<&Path> {
        self.config.log_dir.as_deref()
    }
}

/// Result of deleting the secret configuration file.
#[derive(Debug)]
pub enum CleanupOutcome {
    /// The file was deleted.
    Removed,
    /// The file had already disappeared.
    AlreadyAbsent,
    /// Deletion failed; the file remains on disk.
    Failed(io::Error),
}

impl CleanupOutcome {
    /// Returns `true` when the file is no longer on disk.
    #[must_use]
    pub const fn is_gone(&self) -> bool {
        matches!(self, Self::Removed | Self::AlreadyAbsent)
    }
}

/// Handle to the on-disk configuration that may embed credentials.
#[derive(Debug)]
#[must_use = "the secret configuration file must be cleaned up"]
pub struct SecretConfigFile {
    path: PathBuf,
}

impl SecretConfigFile {
    /// Returns the path of the secret file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the file. Failures are logged and reported, never retried.
    pub fn cleanup(self) -> CleanupOutcome {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(
                    target: LIFECYCLE_TARGET,
                    path = %self.path.display(),
                    "removed tool configuration"
                );
                CleanupOutcome::Removed
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                CleanupOutcome::AlreadyAbsent
            }
            Err(error) => {
                warn!(
                    target: LIFECYCLE_TARGET,
                    path = %self.path.display(),
                    error = %error,
                    "failed to remove tool configuration; continuing"
                );
                CleanupOutcome::Failed(error)
            }
        }
    }
}
