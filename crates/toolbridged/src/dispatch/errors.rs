//! Error types for per-request dispatch failures.
//!
//! Every variant is local to one request: it becomes a JSON-RPC error
//! response and the stream keeps flowing.

use serde_json::{Value, json};
use thiserror::Error;

use toolbridge_tools::ToolError;

use crate::recorder::RecordError;

/// JSON-RPC code for a line that is not valid JSON.
pub const PARSE_ERROR: i64 = -32700;
/// JSON-RPC code for a message that is not a valid request.
pub const INVALID_REQUEST: i64 = -32600;
/// JSON-RPC code for an unknown method.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC code for bad `params`.
pub const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC code for an internal failure.
pub const INTERNAL_ERROR: i64 = -32603;
/// Server-defined code for a failing tool handler.
pub const HANDLER_FAILED: i64 = -32000;
/// Server-defined code for a tool that exceeded its timeout.
pub const TOOL_TIMEOUT: i64 = -32001;

/// Errors surfaced while dispatching a single request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The message is not a well-formed request.
    #[error("invalid request: {message}")]
    RequestShape {
        /// Description of the problem.
        message: String,
        /// Whether the problem lies in `params` rather than the envelope.
        in_params: bool,
    },

    /// No handler exists for the method.
    #[error("method not found: {method}")]
    MethodNotFound {
        /// Requested method.
        method: String,
    },

    /// The addressed tool is not registered.
    #[error("tool '{name}' not found")]
    ToolNotFound {
        /// Requested tool name.
        name: String,
    },

    /// Required arguments are missing or empty.
    #[error("Invalid arguments: missing or empty {}", quoted(.missing))]
    InvalidArguments {
        /// Names of the missing arguments, in schema order.
        missing: Vec<String>,
    },

    /// The tool did not finish within its timeout.
    #[error("tool '{name}' timed out after {timeout_secs}s")]
    Timeout {
        /// Tool name.
        name: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },

    /// The tool handler failed.
    #[error("tool '{name}' failed: {source}")]
    HandlerFailed {
        /// Tool name.
        name: String,
        /// Handler failure.
        #[source]
        source: ToolError,
    },

    /// The outcome could not be written to the output log.
    #[error("failed to record output: {source}")]
    Record {
        /// Recorder failure.
        #[source]
        source: RecordError,
    },
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl DispatchError {
    /// Returns the JSON-RPC error code for this error.
    pub fn code(&self) -> i64 {
        match self {
            Self::RequestShape {
                in_params: false, ..
            } => INVALID_REQUEST,
            Self::RequestShape { in_params: true, .. }
            | Self::ToolNotFound { .. }
            | Self::InvalidArguments { .. } => INVALID_PARAMS,
            Self::MethodNotFound { .. } => METHOD_NOT_FOUND,
            Self::Timeout { .. } => TOOL_TIMEOUT,
            Self::HandlerFailed { .. } => HANDLER_FAILED,
            Self::Record { .. } => INTERNAL_ERROR,
        }
    }

    /// Returns the structured `data` member of the error response, if any.
    pub fn data(&self) -> Option<Value> {
        match self {
            Self::Timeout { timeout_secs, .. } => {
                Some(json!({ "reason": "timeout", "timeoutSeconds": timeout_secs }))
            }
            Self::HandlerFailed { .. } => Some(json!({ "reason": "handler_failed" })),
            Self::Record { .. } => Some(json!({ "reason": "record_failed" })),
            Self::InvalidArguments { missing } => Some(json!({ "missing": missing })),
            Self::RequestShape { .. } | Self::MethodNotFound { .. } | Self::ToolNotFound { .. } => {
                None
            }
        }
    }

    /// Creates an envelope-level shape error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::RequestShape {
            message: message.into(),
            in_params: false,
        }
    }

    /// Creates a `params`-level shape error.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::RequestShape {
            message: message.into(),
            in_params: true,
        }
    }

    /// Creates a method-not-found error.
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    /// Creates a tool-not-found error.
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(DispatchError::invalid_request("x"), INVALID_REQUEST)]
    #[case(DispatchError::invalid_params("x"), INVALID_PARAMS)]
    #[case(DispatchError::method_not_found("nope"), METHOD_NOT_FOUND)]
    #[case(DispatchError::tool_not_found("nope"), INVALID_PARAMS)]
    #[case(DispatchError::InvalidArguments { missing: vec!["a".into()] }, INVALID_PARAMS)]
    #[case(DispatchError::Timeout { name: "t".into(), timeout_secs: 1 }, TOOL_TIMEOUT)]
    #[case(
        DispatchError::Record { source: RecordError::NoOutputConfigured },
        INTERNAL_ERROR
    )]
    fn maps_errors_to_codes(#[case] error: DispatchError, #[case] expected: i64) {
        assert_eq!(error.code(), expected);
    }

    #[test]
    fn missing_arguments_are_quoted() {
        let error = DispatchError::InvalidArguments {
            missing: vec!["title".into(), "body".into()],
        };
        assert_eq!(
            error.to_string(),
            "Invalid arguments: missing or empty 'title', 'body'"
        );
    }

    #[test]
    fn not_found_message_names_tool() {
        let message = DispatchError::tool_not_found("ghost").to_string();
        assert!(message.contains("ghost") && message.contains("not found"));
    }

    #[test]
    fn timeout_data_carries_reason() {
        let error = DispatchError::Timeout {
            name: "slow".into(),
            timeout_secs: 2,
        };
        assert_eq!(
            error.data(),
            Some(json!({ "reason": "timeout", "timeoutSeconds": 2 }))
        );
    }
}
