//! Request dispatch for the tool bridge.
//!
//! [`ToolDispatcher`] owns the tool registry and the output recorder for the
//! lifetime of the process. Each decoded message passes through
//! [`ToolDispatcher::dispatch`], which yields at most one response: requests
//! always get exactly one. Notifications are executed like requests, records
//! included, but their response is discarded.

mod call;
pub mod errors;
pub mod request;
pub mod response;

use serde_json::{Value, json};
use tracing::{debug, warn};

use toolbridge_tools::ToolRunner;

use crate::framing::FrameDecodeError;
use crate::recorder::OutputRecorder;

pub use self::errors::DispatchError;
pub use self::request::RpcRequest;
pub use self::response::{ResponseWriteError, ResponseWriter, RpcErrorObject, RpcResponse};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Protocol version reported when the client does not propose one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Identity reported in the `initialize` handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl ServerInfo {
    /// Creates server identity, falling back to the crate defaults.
    pub fn new(name: Option<&str>, version: Option<&str>) -> Self {
        Self {
            name: name.unwrap_or("toolbridge").to_owned(),
            version: version.unwrap_or(env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Routes requests to tools and records their outcomes.
#[derive(Debug)]
pub struct ToolDispatcher {
    runner: ToolRunner,
    recorder: OutputRecorder,
    server: ServerInfo,
}

impl ToolDispatcher {
    /// Creates a dispatcher owning `runner` and `recorder`.
    pub fn new(runner: ToolRunner, recorder: OutputRecorder, server: ServerInfo) -> Self {
        Self {
            runner,
            recorder,
            server,
        }
    }

    /// Returns the tool runner.
    pub fn runner(&self) -> &ToolRunner {
        &self.runner
    }

    /// Returns the output recorder.
    pub fn recorder(&self) -> &OutputRecorder {
        &self.recorder
    }

    /// Handles one decoded message.
    ///
    /// Notifications are routed like requests, so a `tools/call` without an
    /// `id` still runs and is recorded. Returns `None` for notifications and
    /// `Some` for everything else, including malformed messages.
    pub fn dispatch(&self, message: Value) -> Option<RpcResponse> {
        let fallback_id = request::request_id(&message);
        let request = match RpcRequest::from_value(message) {
            Ok(request) => request,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "rejected malformed request");
                return Some(RpcResponse::failure(fallback_id, &error));
            }
        };

        let id = request.id().cloned().unwrap_or(Value::Null);
        debug!(
            target: DISPATCH_TARGET,
            method = request.method(),
            id = %id,
            notification = request.is_notification(),
            "dispatching request"
        );

        let outcome = self.route(&request, &id);
        if let Err(error) = &outcome {
            warn!(
                target: DISPATCH_TARGET,
                method = request.method(),
                code = error.code(),
                %error,
                "request failed"
            );
        }
        if request.is_notification() {
            return None;
        }

        Some(match outcome {
            Ok(result) => RpcResponse::success(id, result),
            Err(error) => RpcResponse::failure(id, &error),
        })
    }

    /// Builds the parse-error response for a line that was not JSON.
    pub fn decode_failure(&self, error: &FrameDecodeError) -> RpcResponse {
        warn!(target: DISPATCH_TARGET, %error, "discarding undecodable line");
        RpcResponse::error(
            Value::Null,
            RpcErrorObject {
                code: errors::PARSE_ERROR,
                message: format!("Parse error: {}", error.message),
                data: None,
            },
        )
    }

    fn route(&self, request: &RpcRequest, id: &Value) -> Result<Value, DispatchError> {
        match request.method() {
            "initialize" => Ok(self.initialize(request.params())),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.list_tools()),
            "tools/call" => self.call_tool(id, request.params()),
            method if method.starts_with("notifications/") => Ok(json!({})),
            method => Err(DispatchError::method_not_found(method)),
        }
    }

    fn initialize(&self, params: &Value) -> Value {
        let protocol_version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);
        json!({
            "protocolVersion": protocol_version,
            "serverInfo": {
                "name": self.server.name,
                "version": self.server.version,
            },
            "capabilities": { "tools": {} },
        })
    }

    fn list_tools(&self) -> Value {
        let tools: Vec<Value> = self
            .runner
            .registry()
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect();
        json!({ "tools": tools })
    }
}

#[cfg(test)]
mod tests;
