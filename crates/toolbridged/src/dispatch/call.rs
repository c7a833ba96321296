//! The `tools/call` path: validate, invoke, record, respond.

use serde_json::{Map, Value, json};
use tracing::{info, warn};

use toolbridge_tools::{RegisteredTool, ToolError, ToolRunner};

use super::errors::DispatchError;
use super::request::ToolCallParams;
use super::{DISPATCH_TARGET, ToolDispatcher};

impl ToolDispatcher {
    pub(super) fn call_tool(&self, id: &Value, params: &Value) -> Result<Value, DispatchError> {
        let call = ToolCallParams::from_params(params)?;
        let tool = self
            .runner
            .registry()
            .get(&call.name)
            .ok_or_else(|| DispatchError::tool_not_found(&call.name))?;
        check_required(tool, &call.arguments)?;

        let arguments = Value::Object(call.arguments);
        match ToolRunner::run_tool(tool, arguments.clone()) {
            Ok(result) => {
                let text = result.to_string();
                self.recorder
                    .record(json!({
                        "type": tool.name(),
                        "status": "success",
                        "requestId": id,
                        "arguments": arguments,
                        "result": result,
                    }))
                    .map_err(|source| DispatchError::Record { source })?;
                info!(target: DISPATCH_TARGET, tool = tool.name(), "tool call recorded");
                Ok(json!({
                    "content": [{ "type": "text", "text": text }],
                    "isError": false,
                }))
            }
            Err(ToolError::Timeout { timeout_secs, .. }) => {
                self.record_failure(json!({
                    "type": tool.name(),
                    "status": "timeout",
                    "timedOut": true,
                    "timeoutSeconds": timeout_secs,
                    "requestId": id,
                    "arguments": arguments,
                }));
                Err(DispatchError::Timeout {
                    name: tool.name().to_owned(),
                    timeout_secs,
                })
            }
            Err(source) => {
                self.record_failure(json!({
                    "type": tool.name(),
                    "status": "failed",
                    "error": source.to_string(),
                    "requestId": id,
                    "arguments": arguments,
                }));
                Err(DispatchError::HandlerFailed {
                    name: tool.name().to_owned(),
                    source,
                })
            }
        }
    }

    /// Records a timeout or failure entry. The caller still reports the
    /// original failure if this write fails.
    fn record_failure(&self, entry: Value) {
        if let Err(error) = self.recorder.record(entry) {
            warn!(
                target: DISPATCH_TARGET,
                %error,
                "failed to record unsuccessful tool call"
            );
        }
    }
}

/// Rejects calls whose schema-required arguments are absent, null, or blank.
fn check_required(
    tool: &RegisteredTool,
    arguments: &Map<String, Value>,
) -> Result<(), DispatchError> {
    let missing: Vec<String> = tool
        .required_arguments()
        .into_iter()
        .filter(|field| match arguments.get(*field) {
            None | Some(Value::Null) => true,
            Some(Value::String(text)) => text.trim().is_empty(),
            Some(_) => false,
        })
        .map(str::to_owned)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DispatchError::InvalidArguments { missing })
    }
}
