//! Errors raised while loading the tool configuration.
//!
//! Every variant is fatal at startup: the daemon must not begin serving with a
//! configuration it could not read or validate.

use std::path::PathBuf;

use thiserror::Error;

/// Failures produced by [`crate::load`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("tool configuration not found at {path}")]
    NotFound {
        /// Path that was checked.
        path: PathBuf,
    },

    /// The configuration file exists but could not be read.
    #[error("failed to read tool configuration {path}: {source}")]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON.
    #[error("tool configuration {path} is not valid JSON: {source}")]
    Parse {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The configuration parsed but does not describe a usable registry.
    #[error("tool configuration {path} is malformed: {message}")]
    Shape {
        /// Path of the configuration file.
        path: PathBuf,
        /// Description of the structural problem.
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn shape(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Shape {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns the path of the configuration file the error refers to.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotFound { path }
            | Self::Read { path, .. }
            | Self::Parse { path, .. }
            | Self::Shape { path, .. } => path,
        }
    }
}
