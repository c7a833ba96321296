//! JSON-RPC response construction and line-oriented output.

use std::io::Write;

use serde::Serialize;
use serde_json::Value;

use super::errors::DispatchError;

/// The `error` member of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcErrorObject {
    /// JSON-RPC error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A single JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcErrorObject>,
}

impl RpcResponse {
    /// Creates a success response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Creates an error response from a dispatch failure.
    pub fn failure(id: Value, error: &DispatchError) -> Self {
        Self::error(
            id,
            RpcErrorObject {
                code: error.code(),
                message: error.to_string(),
                data: error.data(),
            },
        )
    }

    /// Creates an error response from raw parts.
    pub fn error(id: Value, error: RpcErrorObject) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Returns the response identifier.
    pub fn id(&self) -> &Value {
        &self.id
    }

    /// Returns the result, if this is a success response.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Returns the error, if this is an error response.
    pub fn error_object(&self) -> Option<&RpcErrorObject> {
        self.error.as_ref()
    }
}

/// Writer that serializes responses as one JSON line each.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Wraps an output stream.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a response line and flushes.
    ///
    /// # Errors
    ///
    /// Returns the serialization or I/O failure.
    pub fn write_response(&mut self, response: &RpcResponse) -> Result<(), ResponseWriteError> {
        let mut line = serde_json::to_vec(response).map_err(ResponseWriteError::Encode)?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .and_then(|()| self.writer.flush())
            .map_err(ResponseWriteError::Io)
    }

    /// Returns the wrapped stream.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Failure while writing a response.
#[derive(Debug, thiserror::Error)]
pub enum ResponseWriteError {
    /// The response could not be serialized.
    #[error("failed to serialize response: {0}")]
    Encode(#[source] serde_json::Error),
    /// The output stream failed.
    #[error("failed to write response: {0}")]
    Io(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn writes_success_as_single_line() {
        let mut writer = ResponseWriter::new(Vec::new());
        writer
            .write_response(&RpcResponse::success(json!(1), json!({ "a": "x\ny" })))
            .expect("write");
        let output = String::from_utf8(writer.into_inner()).expect("utf8");
        assert_eq!(output, "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"a\":\"x\\ny\"}}\n");
    }

    #[test]
    fn error_response_omits_result() {
        let response = RpcResponse::failure(Value::Null, &DispatchError::method_not_found("x"));
        let encoded = serde_json::to_value(&response).expect("encode");
        assert_eq!(encoded["error"]["code"], -32601);
        assert!(encoded.get("result").is_none());
        assert!(encoded["error"].get("data").is_none());
        assert_eq!(encoded["id"], Value::Null);
    }
}
