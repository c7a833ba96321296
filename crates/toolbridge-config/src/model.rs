//! Serde model of the one-shot tool configuration document.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::defaults::default_timeout_secs;

/// Parsed contents of the tool configuration file.
///
/// ```json
/// {
///   "serverName": "bridge",
///   "version": "1.0.0",
///   "outputFile": "/tmp/toolbridge/outputs.jsonl",
///   "tools": [
///     {"name": "add-comment", "description": "...", "inputSchema": {"type": "object"}}
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Tools exposed by the bridge, in registration order.
    pub tools: Vec<ToolConfig>,
    /// Name reported in the `initialize` handshake.
    #[serde(default)]
    pub server_name: Option<String>,
    /// Version reported in the `initialize` handshake.
    #[serde(default)]
    pub version: Option<String>,
    /// Directory that receives a copy of the daemon log.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Destination of the durable output log.
    #[serde(default)]
    pub output_file: Option<PathBuf>,
}

/// Declaration of a single tool.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    /// Unique tool name used in `tools/call`.
    pub name: String,
    /// Human-readable description surfaced by `tools/list`.
    #[serde(default)]
    pub description: String,
    /// JSON Schema describing the tool arguments.
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
    /// Script or executable implementing the tool. Absent for tools whose
    /// call is simply recorded.
    #[serde(default)]
    pub handler: Option<PathBuf>,
    /// Timeout in whole seconds.
    #[serde(default = "default_timeout_secs", rename = "timeout")]
    pub timeout_secs: u64,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ToolConfig {
    /// Creates a tool declaration with the default schema and timeout.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: empty_object_schema(),
            handler: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Replaces the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Sets the handler reference.
    #[must_use]
    pub fn with_handler(mut self, handler: impl Into<PathBuf>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    /// Overrides the timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Names listed in the schema's `required` array.
    #[must_use]
    pub fn required_arguments(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}
