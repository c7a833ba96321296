//! Subprocess-backed tool handlers.
//!
//! [`ScriptHandler`] writes the call arguments to the child's stdin as one
//! JSON document and interprets stdout as the result. [`ShellHandler`] follows
//! the shell convention instead: arguments arrive as `INPUT_*` environment
//! variables and named outputs are written to the file named by
//! `TOOLBRIDGE_OUTPUT_FILE`.
//!
//! Both share the machinery below: stdin is fed and stdout and stderr are
//! drained on helper threads while the parent polls for exit. A child still
//! running at the deadline is killed. Output beyond [`OUTPUT_LIMIT`] bytes on
//! either stream fails the call with [`ToolError::InvalidOutput`].

mod script;
mod shell;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::ToolError;

pub use self::script::ScriptHandler;
pub use self::shell::ShellHandler;

/// Tracing target for subprocess operations.
const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Maximum number of bytes accepted on each of stdout and stderr.
pub const OUTPUT_LIMIT: u64 = 10 * 1024 * 1024;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Output captured from a child that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Captured {
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

type ReaderHandle = JoinHandle<io::Result<Vec<u8>>>;
type WriterHandle = JoinHandle<io::Result<()>>;

/// Spawns `command`, feeds it `stdin_payload`, and waits up to `timeout`.
pub(crate) fn run_to_completion(
    name: &str,
    mut command: Command,
    stdin_payload: Option<&[u8]>,
    timeout: Duration,
) -> Result<Captured, ToolError> {
    command
        .stdin(if stdin_payload.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(
        target: PROCESS_TARGET,
        tool = name,
        program = ?command.get_program(),
        "spawning tool process"
    );

    let mut child = command.spawn().map_err(|err| ToolError::SpawnFailed {
        name: name.to_owned(),
        message: err.to_string(),
        source: Some(std::sync::Arc::new(err)),
    })?;

    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);
    let stdin_writer = stdin_payload.and_then(|payload| spawn_writer(&mut child, payload));

    let status = wait_for_exit(name, &mut child, timeout)?;
    join_writer(name, stdin_writer)?;
    let stdout = join_reader(name, "stdout", stdout_reader)?;
    let stderr = join_reader(name, "stderr", stderr_reader)?;

    debug!(
        target: PROCESS_TARGET,
        tool = name,
        ?status,
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        "tool process exited"
    );

    if !status.success() {
        return Err(ToolError::NonZeroExit {
            name: name.to_owned(),
            status: status.code().unwrap_or(-1),
            stderr: stderr.trim().to_owned(),
        });
    }

    Ok(Captured { stdout, stderr })
}

/// Feeds the payload to the child's stdin on its own thread, then closes it.
///
/// The deadline poll starts straight away, so a child that never reads its
/// input is still killed on time. A child that exits without reading is not
/// an error.
fn spawn_writer(child: &mut Child, payload: &[u8]) -> Option<WriterHandle> {
    let mut stdin = child.stdin.take()?;
    let payload = payload.to_vec();
    Some(thread::spawn(move || {
        match stdin.write_all(&payload).and_then(|()| stdin.flush()) {
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            other => other,
        }
    }))
}

fn join_writer(name: &str, handle: Option<WriterHandle>) -> Result<(), ToolError> {
    let Some(writer) = handle else {
        return Ok(());
    };
    writer
        .join()
        .map_err(|_| ToolError::io(name, io::Error::other("input writer panicked")))?
        .map_err(|err| ToolError::io(name, err))
}

/// Captures up to one byte past [`OUTPUT_LIMIT`] so overflow is detectable,
/// then drains the rest so the child never blocks on a full pipe.
fn spawn_reader(source: impl Read + Send + 'static) -> ReaderHandle {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let mut limited = source.take(OUTPUT_LIMIT + 1);
        limited.read_to_end(&mut buffer)?;
        io::copy(&mut limited.into_inner(), &mut io::sink())?;
        Ok(buffer)
    })
}

fn join_reader(
    name: &str,
    stream: &str,
    handle: Option<ReaderHandle>,
) -> Result<String, ToolError> {
    let Some(reader) = handle else {
        return Ok(String::new());
    };
    let bytes = reader
        .join()
        .map_err(|_| ToolError::io(name, io::Error::other("output reader panicked")))?
        .map_err(|err| ToolError::io(name, err))?;
    if !u64::try_from(bytes.len()).is_ok_and(|len| len <= OUTPUT_LIMIT) {
        return Err(ToolError::InvalidOutput {
            name: name.to_owned(),
            message: format!("{stream} exceeded {OUTPUT_LIMIT} bytes"),
        });
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Polls the child until it exits, killing it once `timeout` elapses.
fn wait_for_exit(name: &str, child: &mut Child, timeout: Duration) -> Result<ExitStatus, ToolError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    warn!(
                        target: PROCESS_TARGET,
                        tool = name,
                        timeout_secs = timeout.as_secs(),
                        "tool timed out, killing process"
                    );
                    terminate(child);
                    return Err(ToolError::Timeout {
                        name: name.to_owned(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => return Err(ToolError::io(name, err)),
        }
    }
}

fn terminate(child: &mut Child) {
    drop(child.kill());
    drop(child.wait());
}

/// Resolves a handler reference against the configuration directory.
pub(crate) fn resolve_script(base_dir: &Path, reference: &Path) -> PathBuf {
    if reference.is_absolute() {
        reference.to_path_buf()
    } else {
        base_dir.join(reference)
    }
}

fn apply_working_dir(command: &mut Command, working_dir: Option<&Path>) {
    if let Some(dir) = working_dir {
        command.current_dir(dir);
    }
}
