//! The handler capability bound to every registered tool.
//!
//! A [`ToolHandler`] turns a [`ToolRequest`] into a JSON result. Variants
//! differ only in execution strategy: [`EchoHandler`] and [`InProcessHandler`]
//! run in the daemon, while the subprocess variants live in
//! [`crate::process`].

use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::error::ToolError;

/// A single invocation of a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    name: String,
    arguments: Value,
    timeout: Duration,
}

impl ToolRequest {
    /// Creates a request for `name` with the given arguments and deadline.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Value, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            arguments,
            timeout,
        }
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the call arguments.
    #[must_use]
    pub const fn arguments(&self) -> &Value {
        &self.arguments
    }

    /// Returns the time the handler is allowed to run.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Execution strategy for a tool.
///
/// Implementations are shared across worker threads, hence the `Send + Sync`
/// bound. Subprocess-backed handlers are expected to honour
/// [`ToolRequest::timeout`] themselves so that no child outlives its budget.
pub trait ToolHandler: Send + Sync + fmt::Debug {
    /// Runs the tool and returns its structured result.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if the tool fails, times out, or produces
    /// output that cannot be interpreted.
    fn invoke(&self, request: &ToolRequest) -> Result<Value, ToolError>;

    /// Short label used in logs.
    fn kind(&self) -> &'static str;
}

/// Handler for tools without an executable: the arguments are the result.
///
/// This is the behaviour of pure "record this output" tools, whose only
/// effect is the entry written to the output log.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

impl ToolHandler for EchoHandler {
    fn invoke(&self, request: &ToolRequest) -> Result<Value, ToolError> {
        Ok(request.arguments().clone())
    }

    fn kind(&self) -> &'static str {
        "echo"
    }
}

type Callback = dyn Fn(&Value) -> Result<Value, String> + Send + Sync;

/// Handler backed by a Rust closure supplied by an embedder.
pub struct InProcessHandler {
    callback: Box<Callback>,
}

impl InProcessHandler {
    /// Wraps `callback`. An `Err` message becomes [`ToolError::Handler`].
    #[must_use]
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl fmt::Debug for InProcessHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcessHandler").finish_non_exhaustive()
    }
}

impl ToolHandler for InProcessHandler {
    fn invoke(&self, request: &ToolRequest) -> Result<Value, ToolError> {
        (self.callback)(request.arguments()).map_err(|message| ToolError::Handler {
            name: request.name().to_owned(),
            message,
        })
    }

    fn kind(&self) -> &'static str {
        "in_process"
    }
}
