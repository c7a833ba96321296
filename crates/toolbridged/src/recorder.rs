//! Append-only JSON Lines output log.
//!
//! Each [`OutputRecorder::record`] call writes exactly one line with a single
//! `write` on a file opened in append mode. An in-process mutex serialises
//! callers; `O_APPEND` keeps separate processes from interleaving within a
//! record. The recorder never truncates, rewrites, or rotates the file.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

const RECORDER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::recorder");

/// Failure reported by a [`Sanitizer`].
#[derive(Debug, Error)]
#[error("sanitization failed: {message}")]
pub struct SanitizationError {
    /// Description of the malformed input.
    pub message: String,
}

impl SanitizationError {
    /// Creates a sanitization error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Text transformation applied to every string value before it is recorded.
pub trait Sanitizer: Send + Sync {
    /// Returns the sanitized form of `input`.
    ///
    /// # Errors
    ///
    /// Returns a [`SanitizationError`] when `input` cannot be sanitized.
    fn sanitize(&self, input: &str) -> Result<String, SanitizationError>;
}

/// Errors raised while recording an entry.
#[derive(Debug, Error)]
pub enum RecordError {
    /// No output destination was configured.
    #[error("no output file configured")]
    NoOutputConfigured,

    /// The entry is not an object with a non-empty string `type`.
    #[error("invalid output entry: {message}")]
    InvalidEntry {
        /// Description of the problem.
        message: String,
    },

    /// A string value was rejected by the sanitizer.
    #[error("failed to sanitize field '{field}': {source}")]
    Sanitization {
        /// Top-level field containing the rejected value.
        field: String,
        /// Sanitizer failure.
        #[source]
        source: SanitizationError,
    },

    /// Appending to the log failed.
    #[error("failed to append to {path}: {source}")]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Appends structured records to the durable output log.
pub struct OutputRecorder {
    path: Option<PathBuf>,
    sanitizer: Option<Arc<dyn Sanitizer>>,
    lock: Mutex<()>,
}

impl std::fmt::Debug for OutputRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputRecorder")
            .field("path", &self.path)
            .field("sanitized", &self.sanitizer.is_some())
            .finish_non_exhaustive()
    }
}

impl OutputRecorder {
    /// Creates a recorder writing to `path`, or one that rejects every record
    /// when `path` is `None`.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            sanitizer: None,
            lock: Mutex::new(()),
        }
    }

    /// Installs a sanitizer for string values.
    #[must_use]
    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    /// Returns the destination path, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Appends `entry` as one JSON line.
    ///
    /// `type` is canonicalised by replacing `-` with `_`.
    ///
    /// # Errors
    ///
    /// See [`RecordError`]. Nothing is written when an error is returned,
    /// except after a short write: the partial fragment stays in the log,
    /// terminated by a newline so later records remain one per line.
    pub fn record(&self, entry: Value) -> Result<(), RecordError> {
        let path = self.path.as_deref().ok_or(RecordError::NoOutputConfigured)?;
        let fields = self.prepare(entry)?;
        let kind = fields
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();

        let mut line = serde_json::to_vec(&Value::Object(fields)).map_err(|err| {
            RecordError::InvalidEntry {
                message: err.to_string(),
            }
        })?;
        line.push(b'\n');

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        append_line(path, &line).map_err(|source| RecordError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(
            target: RECORDER_TARGET,
            path = %path.display(),
            entry_type = %kind,
            bytes = line.len(),
            "recorded output entry"
        );
        Ok(())
    }

    fn prepare(&self, entry: Value) -> Result<Map<String, Value>, RecordError> {
        let Value::Object(mut fields) = entry else {
            return Err(RecordError::InvalidEntry {
                message: String::from("entry must be a JSON object"),
            });
        };
        let canonical = match fields.get("type") {
            Some(Value::String(kind)) if !kind.is_empty() => kind.replace('-', "_"),
            _ => {
                return Err(RecordError::InvalidEntry {
                    message: String::from("'type' must be a non-empty string"),
                });
            }
        };

        if let Some(sanitizer) = &self.sanitizer {
            for (field, value) in fields.iter_mut().filter(|(key, _)| *key != "type") {
                sanitize_value(sanitizer.as_ref(), value).map_err(|source| {
                    RecordError::Sanitization {
                        field: field.clone(),
                        source,
                    }
                })?;
            }
        }

        fields.insert(String::from("type"), Value::String(canonical));
        Ok(fields)
    }
}

fn sanitize_value(sanitizer: &dyn Sanitizer, value: &mut Value) -> Result<(), SanitizationError> {
    match value {
        Value::String(text) => {
            *text = sanitizer.sanitize(text)?;
        }
        Value::Array(items) => {
            for item in items {
                sanitize_value(sanitizer, item)?;
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                sanitize_value(sanitizer, item)?;
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}

fn append_line(path: &Path, line: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    write_line(&mut file, line)
}

/// Writes `line` with a single `write` call.
///
/// After a short write a lone `\n` is appended so the fragment ends its own
/// physical line and the next record starts cleanly.
fn write_line(writer: &mut impl Write, line: &[u8]) -> io::Result<()> {
    let written = writer.write(line)?;
    if written == line.len() {
        return Ok(());
    }
    if written > 0 {
        if let Err(error) = writer.write_all(b"\n") {
            warn!(
                target: RECORDER_TARGET,
                %error,
                "could not terminate partial record line"
            );
        }
    }
    Err(io::Error::new(
        io::ErrorKind::WriteZero,
        format!("short write: {written} of {} bytes", line.len()),
    ))
}
