//! Timeout-enforcing execution of registered tools.
//!
//! [`ToolRunner`] owns the [`ToolRegistry`]. [`ToolRunner::run_tool`] runs a
//! resolved tool's handler on a dedicated worker thread and waits at most the
//! tool's configured timeout; a handler still running past the deadline is
//! abandoned and the call reports [`ToolError::Timeout`]. Subprocess handlers kill their
//! child at the same deadline, so abandoned work does not linger.

use std::sync::mpsc;
use std::thread;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::handler::ToolRequest;
use crate::registry::{RegisteredTool, ToolRegistry};

const RUNNER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::runner");

/// Runs tools from an owned registry.
#[derive(Debug, Clone, Default)]
pub struct ToolRunner {
    registry: ToolRegistry,
}

impl ToolRunner {
    /// Creates a runner that owns `registry`.
    #[must_use]
    pub const fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Returns the registry.
    #[must_use]
    pub const fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Invokes `tool` with `arguments` on a worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Timeout`] when the handler overruns, or any error
    /// the handler reports.
    pub fn run_tool(tool: &RegisteredTool, arguments: Value) -> Result<Value, ToolError> {
        let request = ToolRequest::new(tool.name(), arguments, tool.timeout());
        let timeout = request.timeout();
        let handler = tool.handler();
        let (sender, receiver) = mpsc::channel();

        debug!(
            target: RUNNER_TARGET,
            tool = tool.name(),
            handler = handler.kind(),
            timeout_secs = timeout.as_secs(),
            "invoking tool"
        );

        let worker_request = request.clone();
        thread::Builder::new()
            .name(format!("tool-{}", tool.name()))
            .spawn(move || {
                let outcome = handler.invoke(&worker_request);
                // The receiver is gone once the caller has given up.
                drop(sender.send(outcome));
            })
            .map_err(|err| ToolError::SpawnFailed {
                name: tool.name().to_owned(),
                message: format!("cannot start worker thread: {err}"),
                source: Some(std::sync::Arc::new(err)),
            })?;

        match receiver.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    target: RUNNER_TARGET,
                    tool = tool.name(),
                    timeout_secs = timeout.as_secs(),
                    "tool exceeded its timeout"
                );
                Err(ToolError::Timeout {
                    name: request.name().to_owned(),
                    timeout_secs: timeout.as_secs(),
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ToolError::Handler {
                name: request.name().to_owned(),
                message: String::from("handler panicked"),
            }),
        }
    }
}
