//! Handlers that exchange JSON with a child over stdin and stdout.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::{Value, json};
use tracing::debug;

use super::{PROCESS_TARGET, apply_working_dir, run_to_completion};
use crate::error::ToolError;
use crate::handler::{ToolHandler, ToolRequest};

/// Runs a program with the arguments serialized to its stdin.
///
/// Trimmed stdout is parsed as JSON and becomes the result. Empty or non-JSON
/// stdout yields `{"stdout": .., "stderr": ..}` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptHandler {
    program: OsString,
    args: Vec<OsString>,
    working_dir: Option<PathBuf>,
}

impl ScriptHandler {
    /// Runs `program` with `args` verbatim.
    #[must_use]
    pub fn new(program: impl Into<OsString>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    /// Executes `path` directly.
    #[must_use]
    pub fn executable(path: &Path) -> Self {
        Self::new(path.as_os_str(), Vec::new())
    }

    /// Runs a Python script with `python3`.
    #[must_use]
    pub fn python(script: &Path) -> Self {
        Self::new("python3", vec![script.as_os_str().to_owned()])
    }

    /// Runs a JavaScript module with `node`.
    #[must_use]
    pub fn node(script: &Path) -> Self {
        Self::new("node", vec![script.as_os_str().to_owned()])
    }

    /// Runs a Go source file with `go run`.
    #[must_use]
    pub fn go(script: &Path) -> Self {
        Self::new("go", vec![OsString::from("run"), script.as_os_str().to_owned()])
    }

    /// Sets the directory the child runs in.
    #[must_use]
    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    /// Returns the program that will be spawned.
    #[must_use]
    pub fn program(&self) -> &OsString {
        &self.program
    }

    /// Returns the arguments passed to the program.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }
}

impl ToolHandler for ScriptHandler {
    fn invoke(&self, request: &ToolRequest) -> Result<Value, ToolError> {
        let payload =
            serde_json::to_vec(request.arguments()).map_err(|err| ToolError::InvalidOutput {
                name: request.name().to_owned(),
                message: format!("cannot serialise arguments: {err}"),
            })?;

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        apply_working_dir(&mut command, self.working_dir.as_deref());

        let captured = run_to_completion(
            request.name(),
            command,
            Some(payload.as_slice()),
            request.timeout(),
        )?;

        Ok(interpret_stdout(request.name(), captured.stdout, captured.stderr))
    }

    fn kind(&self) -> &'static str {
        "script"
    }
}

fn interpret_stdout(name: &str, stdout: String, stderr: String) -> Value {
    let trimmed = stdout.trim();
    if !trimmed.is_empty() {
        if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
            return parsed;
        }
        debug!(
            target: PROCESS_TARGET,
            tool = name,
            "tool output is not JSON, returning as text"
        );
    }
    json!({ "stdout": stdout, "stderr": stderr })
}
