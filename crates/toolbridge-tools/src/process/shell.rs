//! Handler for shell scripts using `INPUT_*` variables and an outputs file.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::{PROCESS_TARGET, apply_working_dir, run_to_completion};
use crate::error::ToolError;
use crate::handler::{ToolHandler, ToolRequest};

/// Environment variable naming the file a script writes `key=value` outputs to.
pub const OUTPUT_FILE_ENV: &str = "TOOLBRIDGE_OUTPUT_FILE";

/// Executes a shell script directly.
///
/// Each argument `foo-bar` is exported as `INPUT_FOO_BAR`; strings are passed
/// verbatim and other values as compact JSON. The result is
/// `{"stdout": .., "stderr": .., "outputs": {..}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellHandler {
    script: PathBuf,
    working_dir: Option<PathBuf>,
}

impl ShellHandler {
    /// Creates a handler for `script`.
    #[must_use]
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            working_dir: None,
        }
    }

    /// Sets the directory the script runs in.
    #[must_use]
    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    /// Returns the script path.
    #[must_use]
    pub fn script(&self) -> &Path {
        &self.script
    }
}

impl ToolHandler for ShellHandler {
    fn invoke(&self, request: &ToolRequest) -> Result<Value, ToolError> {
        let name = request.name();
        let outputs_file = tempfile::Builder::new()
            .prefix("toolbridge-shell-output-")
            .suffix(".txt")
            .tempfile()
            .map_err(|err| ToolError::io(name, err))?;

        let mut command = Command::new(&self.script);
        command.env(OUTPUT_FILE_ENV, outputs_file.path());
        for (key, value) in input_variables(request.arguments()) {
            command.env(key, value);
        }
        apply_working_dir(&mut command, self.working_dir.as_deref());

        let captured = run_to_completion(name, command, None, request.timeout())?;
        let outputs = read_outputs(name, outputs_file.path());
        debug!(
            target: PROCESS_TARGET,
            tool = name,
            outputs = outputs.len(),
            "shell handler completed"
        );

        Ok(json!({
            "stdout": captured.stdout,
            "stderr": captured.stderr,
            "outputs": outputs,
        }))
    }

    fn kind(&self) -> &'static str {
        "shell"
    }
}

/// Maps call arguments to `INPUT_*` environment variables.
pub(crate) fn input_variables(arguments: &Value) -> Vec<(String, String)> {
    let Some(object) = arguments.as_object() else {
        return Vec::new();
    };
    object
        .iter()
        .map(|(key, value)| {
            let env_key = format!("INPUT_{}", key.to_uppercase().replace('-', "_"));
            let env_value = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            (env_key, env_value)
        })
        .collect()
}

/// Parses `key=value` lines. Lines without `=` are ignored.
pub(crate) fn parse_outputs(contents: &str) -> Map<String, Value> {
    contents
        .lines()
        .map(str::trim)
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.to_owned(), Value::String(value.to_owned())))
        .collect()
}

fn read_outputs(name: &str, path: &Path) -> Map<String, Value> {
    match fs::read_to_string(path) {
        Ok(contents) => parse_outputs(&contents),
        Err(error) => {
            warn!(
                target: PROCESS_TARGET,
                tool = name,
                error = %error,
                "failed to read shell outputs file"
            );
            Map::new()
        }
    }
}
