//! Tool handlers and the registry that owns them.
//!
//! Each configured tool is bound to a [`ToolHandler`] when the registry is
//! built. The handler variant is chosen from the handler reference's file
//! extension, so nothing is resolved at call time:
//!
//! | handler reference | variant |
//! |-------------------|---------|
//! | absent            | [`EchoHandler`] (the arguments are the result) |
//! | `*.sh`            | [`ShellHandler`] (`INPUT_*` environment variables) |
//! | `*.py`            | [`ScriptHandler`] run by `python3` |
//! | `*.js`, `*.cjs`, `*.mjs` | [`ScriptHandler`] run by `node` |
//! | `*.go`            | [`ScriptHandler`] run by `go run` |
//! | anything else     | [`ScriptHandler`] executing the file directly |
//!
//! [`ToolRunner`] executes a handler on a worker thread and enforces the
//! tool's timeout, so a slow tool never stalls the caller beyond its budget.

pub mod error;
pub mod handler;
pub mod process;
pub mod registry;
pub mod runner;

pub use self::error::ToolError;
pub use self::handler::{EchoHandler, InProcessHandler, ToolHandler, ToolRequest};
pub use self::process::{ScriptHandler, ShellHandler};
pub use self::registry::{RegisteredTool, ToolRegistry};
pub use self::runner::ToolRunner;
