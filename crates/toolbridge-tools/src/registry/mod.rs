//! Registry of configured tools and their bound handlers.
//!
//! The registry is built once from the loaded configuration and is read-only
//! afterwards. Tools keep their configuration order so that `tools/list`
//! reports them as declared.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use toolbridge_config::ToolConfig;
use tracing::debug;

use crate::error::ToolError;
use crate::handler::{EchoHandler, ToolHandler};
use crate::process::{ScriptHandler, ShellHandler, resolve_script};

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// A tool declaration bound to its execution strategy.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    config: ToolConfig,
    handler: Arc<dyn ToolHandler>,
}

impl RegisteredTool {
    /// Binds `config` to `handler`.
    #[must_use]
    pub fn new(config: ToolConfig, handler: Arc<dyn ToolHandler>) -> Self {
        Self { config, handler }
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the tool description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.config.description
    }

    /// Returns the JSON Schema for the tool arguments.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.config.input_schema
    }

    /// Returns the per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    /// Returns argument names the schema marks as required.
    #[must_use]
    pub fn required_arguments(&self) -> Vec<&str> {
        self.config.required_arguments()
    }

    /// Returns a shared handle to the handler.
    #[must_use]
    pub fn handler(&self) -> Arc<dyn ToolHandler> {
        Arc::clone(&self.handler)
    }
}

/// Ordered, name-indexed collection of tools.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from configuration, choosing each handler by the
    /// extension of its reference.
    ///
    /// Relative handler paths resolve against `base_dir`; subprocesses run in
    /// `working_dir` when given, else in the daemon's current directory.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Registration`] if two tools share a name.
    pub fn from_config(
        tools: &[ToolConfig],
        base_dir: &Path,
        working_dir: Option<&Path>,
    ) -> Result<Self, ToolError> {
        let mut registry = Self::new();
        for config in tools {
            let handler = handler_for(config, base_dir, working_dir);
            debug!(
                target: REGISTRY_TARGET,
                tool = %config.name,
                handler = handler.kind(),
                timeout_secs = config.timeout_secs,
                "registering tool"
            );
            registry.register(RegisteredTool::new(config.clone(), handler))?;
        }
        Ok(registry)
    }

    /// Adds a tool.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Registration`] if the name is already taken.
    pub fn register(&mut self, tool: RegisteredTool) -> Result<(), ToolError> {
        let name = tool.name().to_owned();
        if self.index.contains_key(&name) {
            return Err(ToolError::Registration {
                message: format!("tool '{name}' is already registered"),
            });
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).and_then(|&slot| self.tools.get(slot))
    }

    /// Iterates tools in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTool> {
        self.tools.iter()
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` when no tools are registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Selects the execution strategy for a tool declaration.
#[must_use]
pub fn handler_for(
    config: &ToolConfig,
    base_dir: &Path,
    working_dir: Option<&Path>,
) -> Arc<dyn ToolHandler> {
    let Some(reference) = config.handler.as_deref() else {
        return Arc::new(EchoHandler);
    };
    let script = resolve_script(base_dir, reference);
    let cwd = working_dir.map(Path::to_path_buf);
    let extension = script
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("sh") => Arc::new(ShellHandler::new(script).with_working_dir(cwd)),
        Some("py") => Arc::new(ScriptHandler::python(&script).with_working_dir(cwd)),
        Some("js" | "cjs" | "mjs") => {
            Arc::new(ScriptHandler::node(&script).with_working_dir(cwd))
        }
        Some("go") => Arc::new(ScriptHandler::go(&script).with_working_dir(cwd)),
        _ => Arc::new(ScriptHandler::executable(&script).with_working_dir(cwd)),
    }
}
