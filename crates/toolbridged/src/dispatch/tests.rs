//! Unit tests for the dispatcher state machine.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tempfile::TempDir;

use toolbridge_config::ToolConfig;
use toolbridge_tools::{InProcessHandler, RegisteredTool, ToolRegistry, ToolRunner};

use super::errors::{
    HANDLER_FAILED, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
    PARSE_ERROR, TOOL_TIMEOUT,
};
use super::*;
use crate::framing::MessageFramer;

struct Harness {
    _dir: TempDir,
    log: PathBuf,
    dispatcher: ToolDispatcher,
}

impl Harness {
    fn call(&self, id: i64, name: &str, arguments: Value) -> RpcResponse {
        self.dispatcher
            .dispatch(json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": "tools/call",
                "params": { "name": name, "arguments": arguments },
            }))
            .expect("requests always get a response")
    }

    fn records(&self) -> Vec<Value> {
        match fs::read_to_string(&self.log) {
            Ok(contents) => contents
                .lines()
                .map(|line| serde_json::from_str(line).expect("record is JSON"))
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn in_process<F>(config: ToolConfig, callback: F) -> RegisteredTool
where
    F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
{
    RegisteredTool::new(config, Arc::new(InProcessHandler::new(callback)))
}

fn registry() -> ToolRegistry {
    let declared = [
        ToolConfig::new("add-comment", "Add a comment").with_input_schema(json!({
            "type": "object",
            "properties": { "body": { "type": "string" } },
            "required": ["body"]
        })),
        ToolConfig::new("noop", "Nothing to do"),
    ];
    let mut registry =
        ToolRegistry::from_config(&declared, Path::new("."), None).expect("build registry");
    registry
        .register(in_process(
            ToolConfig::new("sum", "Adds numbers"),
            |args| {
                let total: i64 = args["values"]
                    .as_array()
                    .ok_or("values must be an array")?
                    .iter()
                    .filter_map(Value::as_i64)
                    .sum();
                Ok(json!({ "total": total }))
            },
        ))
        .expect("register sum");
    registry
        .register(in_process(
            ToolConfig::new("slow", "Sleeps").with_timeout_secs(1),
            |_| {
                std::thread::sleep(Duration::from_secs(3));
                Ok(json!({ "late": true }))
            },
        ))
        .expect("register slow");
    registry
}

#[fixture]
fn harness() -> Harness {
    let dir = TempDir::new().expect("tempdir");
    let log = dir.path().join("outputs.jsonl");
    let dispatcher = ToolDispatcher::new(
        ToolRunner::new(registry()),
        OutputRecorder::new(Some(log.clone())),
        ServerInfo::new(Some("bridge"), Some("1.2.3")),
    );
    Harness {
        _dir: dir,
        log,
        dispatcher,
    }
}

fn error_code(response: &RpcResponse) -> i64 {
    response.error_object().expect("error response").code
}

#[rstest]
fn initialize_reports_server_identity(harness: Harness) {
    let response = harness
        .dispatcher
        .dispatch(json!({ "jsonrpc": "2.0", "id": 0, "method": "initialize", "params": {} }))
        .expect("response");
    let result = response.result().expect("result");
    assert_eq!(result["protocolVersion"], DEFAULT_PROTOCOL_VERSION);
    assert_eq!(result["serverInfo"], json!({ "name": "bridge", "version": "1.2.3" }));
    assert_eq!(result["capabilities"], json!({ "tools": {} }));
}

#[rstest]
fn initialize_echoes_client_protocol(harness: Harness) {
    let response = harness
        .dispatcher
        .dispatch(json!({
            "id": 0, "method": "initialize", "params": { "protocolVersion": "2025-03-26" }
        }))
        .expect("response");
    assert_eq!(
        response.result().expect("result")["protocolVersion"],
        "2025-03-26"
    );
}

#[rstest]
fn lists_tools_in_declaration_order(harness: Harness) {
    let response = harness
        .dispatcher
        .dispatch(json!({ "id": 1, "method": "tools/list" }))
        .expect("response");
    let tools = response.result().expect("result")["tools"]
        .as_array()
        .expect("tools array")
        .clone();
    let names: Vec<_> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
    assert_eq!(names, ["add-comment", "noop", "sum", "slow"]);
    assert_eq!(tools[0]["inputSchema"]["required"], json!(["body"]));
}

#[rstest]
fn ping_returns_empty_object(harness: Harness) {
    let response = harness
        .dispatcher
        .dispatch(json!({ "id": "p", "method": "ping" }))
        .expect("response");
    assert_eq!(response.result(), Some(&json!({})));
    assert_eq!(response.id(), &json!("p"));
}

#[rstest]
fn notifications_get_no_response(harness: Harness) {
    assert!(
        harness
            .dispatcher
            .dispatch(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
            .is_none()
    );
}

#[rstest]
fn tool_call_without_id_still_runs_and_records(harness: Harness) {
    let response = harness.dispatcher.dispatch(json!({
        "jsonrpc": "2.0",
        "method": "tools/call",
        "params": { "name": "add-comment", "arguments": { "body": "queued" } },
    }));

    assert!(response.is_none());
    let records = harness.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["type"], "add_comment");
    assert_eq!(records[0]["status"], "success");
    assert_eq!(records[0]["requestId"], Value::Null);
}

#[rstest]
fn failing_notification_stays_silent(harness: Harness) {
    assert!(
        harness
            .dispatcher
            .dispatch(json!({ "method": "resources/list" }))
            .is_none()
    );
}

#[rstest]
fn unknown_method_is_rejected(harness: Harness) {
    let response = harness
        .dispatcher
        .dispatch(json!({ "id": 2, "method": "resources/list" }))
        .expect("response");
    assert_eq!(error_code(&response), METHOD_NOT_FOUND);
}

#[rstest]
#[case(json!({ "id": 5, "params": {} }), json!(5))]
#[case(json!({ "id": 6, "jsonrpc": "1.0", "method": "ping" }), json!(6))]
#[case(json!([1, 2, 3]), Value::Null)]
fn malformed_requests_echo_id(
    harness: Harness,
    #[case] message: Value,
    #[case] expected_id: Value,
) {
    let response = harness.dispatcher.dispatch(message).expect("response");
    assert_eq!(error_code(&response), INVALID_REQUEST);
    assert_eq!(response.id(), &expected_id);
}

#[rstest]
fn successful_call_is_recorded_before_response(harness: Harness) {
    let response = harness.call(3, "sum", json!({ "values": [1, 2, 3] }));
    let result = response.result().expect("success");
    assert_eq!(result["isError"], false);
    assert_eq!(result["content"][0]["type"], "text");
    assert_eq!(result["content"][0]["text"], r#"{"total":6}"#);

    assert_eq!(
        harness.records(),
        vec![json!({
            "type": "sum",
            "status": "success",
            "requestId": 3,
            "arguments": { "values": [1, 2, 3] },
            "result": { "total": 6 },
        })]
    );
}

#[rstest]
fn echo_tool_records_canonical_type(harness: Harness) {
    let response = harness.call(4, "add-comment", json!({ "body": "LGTM" }));
    assert!(response.result().is_some());
    let records = harness.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["type"], "add_comment");
    assert_eq!(records[0]["result"], json!({ "body": "LGTM" }));
}

#[rstest]
fn unknown_tool_is_not_recorded(harness: Harness) {
    let response = harness.call(7, "ghost", json!({}));
    assert_eq!(error_code(&response), INVALID_PARAMS);
    assert!(
        response
            .error_object()
            .expect("error")
            .message
            .contains("not found")
    );
    assert!(harness.records().is_empty());
}

#[rstest]
#[case(json!({}))]
#[case(json!({ "body": "   " }))]
#[case(json!({ "body": null }))]
fn missing_required_arguments_are_rejected(harness: Harness, #[case] arguments: Value) {
    let response = harness.call(8, "add-comment", arguments);
    let error = response.error_object().expect("error");
    assert_eq!(error.code, INVALID_PARAMS);
    assert!(error.message.contains("missing or empty 'body'"), "{}", error.message);
    assert!(harness.records().is_empty());
}

#[rstest]
fn non_object_arguments_are_rejected(harness: Harness) {
    let response = harness.call(9, "noop", json!("text"));
    assert_eq!(error_code(&response), INVALID_PARAMS);
    assert!(harness.records().is_empty());
}

#[rstest]
fn timeout_is_recorded_and_reported_as_error(harness: Harness) {
    let response = harness.call(10, "slow", json!({}));
    assert!(response.result().is_none(), "timeout must never succeed");
    let error = response.error_object().expect("error");
    assert_eq!(error.code, TOOL_TIMEOUT);
    assert_eq!(error.data.as_ref().expect("data")["reason"], "timeout");

    assert_eq!(
        harness.records(),
        vec![json!({
            "type": "slow",
            "status": "timeout",
            "timedOut": true,
            "timeoutSeconds": 1,
            "requestId": 10,
            "arguments": {},
        })]
    );
}

#[rstest]
fn handler_failure_is_recorded(harness: Harness) {
    let response = harness.call(11, "sum", json!({ "values": "nope" }));
    let error = response.error_object().expect("error");
    assert_eq!(error.code, HANDLER_FAILED);
    assert_eq!(error.data, Some(json!({ "reason": "handler_failed" })));

    let records = harness.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "failed");
    assert!(
        records[0]["error"]
            .as_str()
            .expect("error text")
            .contains("values must be an array")
    );
}

#[test]
fn record_failure_is_internal_error() {
    let dispatcher = ToolDispatcher::new(
        ToolRunner::new(registry()),
        OutputRecorder::new(None),
        ServerInfo::default(),
    );
    let response = dispatcher
        .dispatch(json!({
            "id": 12, "method": "tools/call",
            "params": { "name": "noop", "arguments": {} }
        }))
        .expect("response");
    let error = response.error_object().expect("error");
    assert_eq!(error.code, INTERNAL_ERROR);
    assert_eq!(error.data, Some(json!({ "reason": "record_failed" })));
}

#[rstest]
fn decode_failure_is_parse_error(harness: Harness) {
    let mut framer = MessageFramer::new();
    framer.append(b"{oops\n");
    let error = framer.read_message().expect_err("decode error");
    let response = harness.dispatcher.decode_failure(&error);
    assert_eq!(error_code(&response), PARSE_ERROR);
    assert_eq!(response.id(), &Value::Null);
}
