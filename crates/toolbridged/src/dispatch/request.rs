//! Validation of inbound JSON-RPC messages.

use serde_json::{Map, Value};

use super::errors::DispatchError;

/// A structurally valid JSON-RPC message.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    id: Option<Value>,
    method: String,
    params: Value,
}

impl RpcRequest {
    /// Validates the envelope of `message`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::RequestShape`] when the message is not an
    /// object, declares a `jsonrpc` version other than `"2.0"`, or lacks a
    /// non-empty string `method`.
    pub fn from_value(message: Value) -> Result<Self, DispatchError> {
        let Value::Object(mut fields) = message else {
            return Err(DispatchError::invalid_request(
                "request must be a JSON object",
            ));
        };

        match fields.get("jsonrpc") {
            None => {}
            Some(Value::String(version)) if version == "2.0" => {}
            Some(_) => {
                return Err(DispatchError::invalid_request(
                    "unsupported jsonrpc version",
                ));
            }
        }

        let method = match fields.remove("method") {
            Some(Value::String(method)) if !method.trim().is_empty() => method,
            _ => {
                return Err(DispatchError::invalid_request(
                    "missing or empty 'method'",
                ));
            }
        };

        Ok(Self {
            id: fields.remove("id"),
            method,
            params: fields.remove("params").unwrap_or(Value::Null),
        })
    }

    /// Returns the request identifier. `None` marks a notification.
    pub fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    /// Returns the method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the raw `params` member (`null` when absent).
    pub fn params(&self) -> &Value {
        &self.params
    }

    /// Returns `true` when no response is expected.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Returns the `id` of an arbitrary message, or `null`.
pub fn request_id(message: &Value) -> Value {
    message.get("id").cloned().unwrap_or(Value::Null)
}

/// The `params` of a `tools/call` request.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallParams {
    /// Name of the tool to invoke.
    pub name: String,
    /// Arguments for the tool; an empty object when omitted.
    pub arguments: Map<String, Value>,
}

impl ToolCallParams {
    /// Extracts the tool name and arguments.
    ///
    /// # Errors
    ///
    /// Returns a `params`-level [`DispatchError::RequestShape`] when `params`
    /// is not an object, `name` is missing or empty, or `arguments` is present
    /// but not an object.
    pub fn from_params(params: &Value) -> Result<Self, DispatchError> {
        let Some(fields) = params.as_object() else {
            return Err(DispatchError::invalid_params("params must be an object"));
        };
        let name = match fields.get("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
            _ => return Err(DispatchError::invalid_params("missing or empty 'name'")),
        };
        let arguments = match fields.get("arguments") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(arguments)) => arguments.clone(),
            Some(_) => {
                return Err(DispatchError::invalid_params(
                    "'arguments' must be an object",
                ));
            }
        };
        Ok(Self { name, arguments })
    }
}
