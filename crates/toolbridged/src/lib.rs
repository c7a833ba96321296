//! Newline-delimited JSON-RPC tool bridge.
//!
//! The daemon reads requests from stdin, dispatches each `tools/call` to a
//! registered tool, and appends the outcome to a durable JSON Lines log
//! before replying on stdout. The moving parts, leaves first:
//!
//! - [`framing`] splits the byte stream into JSON messages.
//! - [`recorder`] appends one canonicalised record per call.
//! - [`dispatch`] validates requests, invokes tools, records, and responds.
//! - [`server`] drives the loop over any reader and writer.
//!
//! Bootstrap loads the one-shot tool configuration, installs telemetry,
//! builds the registry, and deletes the configuration file before the first
//! request is read.

mod bootstrap;
pub mod dispatch;
pub mod framing;
mod health;
pub mod recorder;
pub mod server;
mod telemetry;

pub use bootstrap::{BootstrapError, Bridge, bootstrap_with, bootstrap_with_sanitizer};
pub use dispatch::{DispatchError, RpcResponse, ServerInfo, ToolDispatcher};
pub use framing::{FrameDecodeError, MessageFramer};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use recorder::{OutputRecorder, RecordError, SanitizationError, Sanitizer};
pub use server::{ServeError, ServeStats, serve};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
