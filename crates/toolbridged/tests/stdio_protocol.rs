//! End-to-end protocol checks over in-memory streams.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tempfile::TempDir;

use toolbridge_config::{ToolConfig, load};
use toolbridge_tools::{InProcessHandler, RegisteredTool, ToolRegistry, ToolRunner};
use toolbridged::{OutputRecorder, ServerInfo, ToolDispatcher, serve};

struct Bench {
    dir: TempDir,
    log: PathBuf,
}

impl Bench {
    fn dispatcher(&self, registry: ToolRegistry) -> ToolDispatcher {
        ToolDispatcher::new(
            ToolRunner::new(registry),
            OutputRecorder::new(Some(self.log.clone())),
            ServerInfo::default(),
        )
    }

    fn records(&self) -> Vec<Value> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(|line| serde_json::from_str(line).expect("record JSON"))
            .collect()
    }
}

#[fixture]
fn bench() -> Bench {
    let dir = TempDir::new().expect("tempdir");
    let log = dir.path().join("outputs.jsonl");
    Bench { dir, log }
}

fn run(dispatcher: &ToolDispatcher, input: &str) -> Vec<Value> {
    let mut output = Vec::new();
    serve(Cursor::new(input.to_owned()), &mut output, dispatcher).expect("serve");
    String::from_utf8(output)
        .expect("utf8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("response JSON"))
        .collect()
}

fn call_line(id: u64, name: &str, arguments: &Value) -> String {
    let mut line = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments },
    })
    .to_string();
    line.push('\n');
    line
}

#[rstest]
fn recording_tools_write_canonical_records(bench: Bench) {
    let registry = ToolRegistry::from_config(
        &[ToolConfig::new("add-comment", ""), ToolConfig::new("add_label", "")],
        Path::new("."),
        None,
    )
    .expect("registry");
    let dispatcher = bench.dispatcher(registry);
    let input = call_line(1, "add-comment", &json!({ "body": "x" }))
        + &call_line(2, "add_label", &json!({}));

    let responses = run(&dispatcher, &input);

    assert_eq!(responses.len(), 2);
    let types: Vec<_> = bench
        .records()
        .iter()
        .map(|record| record["type"].clone())
        .collect();
    assert_eq!(types, vec![json!("add_comment"), json!("add_label")]);
}

#[rstest]
fn tool_call_without_id_is_recorded_silently(bench: Bench) {
    let registry =
        ToolRegistry::from_config(&[ToolConfig::new("add-comment", "")], Path::new("."), None)
            .expect("registry");
    let dispatcher = bench.dispatcher(registry);
    let input = concat!(
        r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"add-comment","arguments":{"body":"x"}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
        "\n",
    );

    let responses = run(&dispatcher, input);

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], 2);
    let records = bench.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["type"], "add_comment");
}

#[rstest]
fn unknown_tool_gets_error_and_no_record(bench: Bench) {
    let dispatcher = bench.dispatcher(ToolRegistry::new());
    let responses = run(&dispatcher, &call_line(1, "missing", &json!({})));
    assert_eq!(responses[0]["error"]["code"], -32602);
    assert!(bench.records().is_empty());
}

#[rstest]
fn timeout_yields_timeout_record_never_success(bench: Bench) {
    let mut registry = ToolRegistry::new();
    registry
        .register(RegisteredTool::new(
            ToolConfig::new("stall", "").with_timeout_secs(1),
            Arc::new(InProcessHandler::new(|_| {
                std::thread::sleep(Duration::from_secs(4));
                Ok(json!({ "done": true }))
            })),
        ))
        .expect("register");
    let dispatcher = bench.dispatcher(registry);
    let input = call_line(9, "stall", &json!({ "n": 1 }))
        + "{\"jsonrpc\":\"2.0\",\"id\":10,\"method\":\"ping\"}\n";

    let responses = run(&dispatcher, &input);

    assert_eq!(responses.len(), 2);
    assert!(responses[0].get("result").is_none());
    assert_eq!(responses[0]["error"]["code"], -32001);
    assert_eq!(responses[1]["result"], json!({}));
    let records = bench.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["timedOut"], true);
    assert_eq!(records[0]["requestId"], 9);
}

#[rstest]
fn chunk_boundaries_do_not_change_responses(bench: Bench) {
    let dispatcher = bench.dispatcher(ToolRegistry::new());
    let input = "{\"id\":1,\"method\":\"ping\"}\r\n\n{\"id\":2,\"method\":\"tools/list\"}\n";
    let whole = run(&dispatcher, input);

    struct Trickle<'a> {
        bytes: &'a [u8],
    }
    impl std::io::Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let Some((first, rest)) = self.bytes.split_first() else {
                return Ok(0);
            };
            match buf.first_mut() {
                Some(slot) => {
                    *slot = *first;
                    self.bytes = rest;
                    Ok(1)
                }
                None => Ok(0),
            }
        }
    }

    let mut output = Vec::new();
    serve(
        Trickle {
            bytes: input.as_bytes(),
        },
        &mut output,
        &dispatcher,
    )
    .expect("serve");
    let trickled: Vec<Value> = String::from_utf8(output)
        .expect("utf8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("json"))
        .collect();
    assert_eq!(trickled, whole);
}

#[rstest]
fn config_without_tools_is_rejected_before_dispatch(bench: Bench) {
    let path = bench.dir.path().join("config.json");
    fs::write(&path, r#"{"serverName": "x"}"#).expect("write");
    assert!(matches!(
        load(&path),
        Err(toolbridge_config::ConfigError::Shape { .. })
    ));
}

#[cfg(unix)]
mod subprocess {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    fn script(dir: &Path, name: &str, body: &str) {
        let path = dir.join(name);
        fs::write(&path, body).expect("write script");
        let mut permissions = fs::metadata(&path).expect("metadata").permissions();
        permissions.set_mode(0o755);
        fs::set_permissions(&path, permissions).expect("chmod");
    }

    #[rstest]
    fn configured_handlers_run_relative_to_config(bench: Bench) {
        let handlers = bench.dir.path().join("handlers");
        fs::create_dir(&handlers).expect("mkdir");
        script(
            &handlers,
            "label.sh",
            "#!/bin/sh\necho \"label=$INPUT_NAME\" >> \"$TOOLBRIDGE_OUTPUT_FILE\"\n",
        );
        script(
            &handlers,
            "count",
            "#!/bin/sh\nread input\necho \"{\\\"received\\\": $input}\"\n",
        );
        script(&handlers, "crash", "#!/bin/sh\necho nope >&2\nexit 4\n");

        let tools = [
            ToolConfig::new("label", "").with_handler("handlers/label.sh"),
            ToolConfig::new("count", "").with_handler("handlers/count"),
            ToolConfig::new("crash", "").with_handler("handlers/crash"),
        ];
        let registry =
            ToolRegistry::from_config(&tools, bench.dir.path(), None).expect("registry");
        let dispatcher = bench.dispatcher(registry);
        let input = call_line(1, "label", &json!({ "name": "bug" }))
            + &call_line(2, "count", &json!({ "n": 3 }))
            + &call_line(3, "crash", &json!({}));

        let responses = run(&dispatcher, &input);

        let label: Value = serde_json::from_str(
            responses[0]["result"]["content"][0]["text"]
                .as_str()
                .expect("text"),
        )
        .expect("json text");
        assert_eq!(label["outputs"], json!({ "label": "bug" }));

        let count: Value = serde_json::from_str(
            responses[1]["result"]["content"][0]["text"]
                .as_str()
                .expect("text"),
        )
        .expect("json text");
        assert_eq!(count, json!({ "received": { "n": 3 } }));

        assert_eq!(responses[2]["error"]["code"], -32000);
        let statuses: Vec<_> = bench
            .records()
            .iter()
            .map(|record| record["status"].clone())
            .collect();
        assert_eq!(statuses, vec![json!("success"), json!("success"), json!("failed")]);
    }

    #[rstest]
    fn timed_out_handler_with_unread_input_is_killed(bench: Bench) {
        let marker = bench.dir.path().join("late-marker");
        script(
            bench.dir.path(),
            "stall",
            &format!("#!/bin/sh\nsleep 3\ntouch '{}'\n", marker.display()),
        );
        let tools = [ToolConfig::new("stall", "")
            .with_handler("stall")
            .with_timeout_secs(1)];
        let registry =
            ToolRegistry::from_config(&tools, bench.dir.path(), None).expect("registry");
        let dispatcher = bench.dispatcher(registry);
        let blob = "x".repeat(512 * 1024);

        let responses = run(&dispatcher, &call_line(1, "stall", &json!({ "blob": blob })));

        assert_eq!(responses[0]["error"]["code"], -32001);
        std::thread::sleep(Duration::from_secs(4));
        assert!(!marker.exists(), "handler outlived its timeout");
    }

    #[rstest]
    fn oversized_output_is_a_failed_call(bench: Bench) {
        script(
            bench.dir.path(),
            "flood",
            "#!/bin/sh\nhead -c 11000000 /dev/zero | tr '\\000' a\n",
        );
        let tools = [ToolConfig::new("flood", "").with_handler("flood")];
        let registry =
            ToolRegistry::from_config(&tools, bench.dir.path(), None).expect("registry");
        let dispatcher = bench.dispatcher(registry);

        let responses = run(&dispatcher, &call_line(1, "flood", &json!({})));

        assert_eq!(responses[0]["error"]["code"], -32000);
        let records = bench.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["status"], "failed");
    }
}
