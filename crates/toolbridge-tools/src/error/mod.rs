//! Domain errors raised while registering or invoking tools.
//!
//! I/O errors are wrapped in `Arc` to keep the enum small and cloneable.

use std::sync::Arc;

use thiserror::Error;

/// Errors arising from tool registration and invocation.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// The handler process could not be started.
    #[error("tool '{name}' failed to start: {message}")]
    SpawnFailed {
        /// Tool name.
        name: String,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying I/O error.
        #[source]
        source: Option<Arc<std::io::Error>>,
    },

    /// The handler did not finish within the tool's timeout.
    #[error("tool '{name}' timed out after {timeout_secs}s")]
    Timeout {
        /// Tool name.
        name: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },

    /// The handler process exited unsuccessfully.
    #[error("tool '{name}' exited with status {status}: {stderr}")]
    NonZeroExit {
        /// Tool name.
        name: String,
        /// Exit code, or `-1` when terminated by a signal.
        status: i32,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// Communication with the handler process failed.
    #[error("I/O error running tool '{name}': {source}")]
    Io {
        /// Tool name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The handler produced output that could not be interpreted.
    #[error("tool '{name}' produced invalid output: {message}")]
    InvalidOutput {
        /// Tool name.
        name: String,
        /// Description of the problem.
        message: String,
    },

    /// An in-process handler reported a failure.
    #[error("tool '{name}' failed: {message}")]
    Handler {
        /// Tool name.
        name: String,
        /// Failure reported by the handler.
        message: String,
    },

    /// A tool could not be added to the registry.
    #[error("cannot register tool: {message}")]
    Registration {
        /// Description of the rejection.
        message: String,
    },
}

impl ToolError {
    pub(crate) fn io(name: &str, source: std::io::Error) -> Self {
        Self::Io {
            name: name.to_owned(),
            source: Arc::new(source),
        }
    }

    /// Returns `true` for [`ToolError::Timeout`].
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
