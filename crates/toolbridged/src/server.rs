//! The stream loop tying framing, dispatch and response output together.

use std::io::{self, Read, Write};

use thiserror::Error;
use tracing::debug;

use crate::dispatch::{ResponseWriteError, ResponseWriter, RpcResponse, ToolDispatcher};
use crate::framing::{FrameDecodeError, MessageFramer};

const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

/// Size of each read from the input stream.
pub const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Counters describing a completed serve loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    /// Messages decoded from the input.
    pub requests: u64,
    /// Responses written.
    pub responses: u64,
    /// Lines that failed to decode.
    pub decode_errors: u64,
    /// Notifications, which receive no response.
    pub notifications: u64,
}

/// Failure of the process streams. Ends the loop.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Reading the input stream failed.
    #[error("failed to read request stream: {0}")]
    Read(#[source] io::Error),
    /// Writing the output stream failed.
    #[error("failed to write response stream: {0}")]
    Write(#[source] io::Error),
    /// A response could not be encoded.
    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),
}

impl From<ResponseWriteError> for ServeError {
    fn from(error: ResponseWriteError) -> Self {
        match error {
            ResponseWriteError::Encode(source) => Self::Encode(source),
            ResponseWriteError::Io(source) => Self::Write(source),
        }
    }
}

/// Reads requests from `reader` until EOF, answering each on `writer`.
///
/// Messages are dispatched one at a time in arrival order, so responses keep
/// request order.
///
/// # Errors
///
/// Returns a [`ServeError`] when either stream fails.
pub fn serve<R, W>(
    mut reader: R,
    writer: W,
    dispatcher: &ToolDispatcher,
) -> Result<ServeStats, ServeError>
where
    R: Read,
    W: Write,
{
    let mut session = Session {
        framer: MessageFramer::new(),
        writer: ResponseWriter::new(writer),
        dispatcher,
        stats: ServeStats::default(),
    };
    let mut chunk = vec![0_u8; READ_CHUNK_BYTES];

    loop {
        let bytes_read = read_with_retry(&mut reader, &mut chunk).map_err(ServeError::Read)?;
        if bytes_read == 0 {
            break;
        }
        session
            .framer
            .append(chunk.get(..bytes_read).unwrap_or_default());
        session.drain(MessageFramer::read_message)?;
    }

    session.drain(MessageFramer::finish)?;
    debug!(
        target: SERVER_TARGET,
        requests = session.stats.requests,
        responses = session.stats.responses,
        "input stream closed"
    );
    Ok(session.stats)
}

struct Session<'a, W> {
    framer: MessageFramer,
    writer: ResponseWriter<W>,
    dispatcher: &'a ToolDispatcher,
    stats: ServeStats,
}

impl<W: Write> Session<'_, W> {
    fn drain(
        &mut self,
        next: fn(&mut MessageFramer) -> Result<Option<serde_json::Value>, FrameDecodeError>,
    ) -> Result<(), ServeError> {
        loop {
            let response = match next(&mut self.framer) {
                Ok(None) => return Ok(()),
                Ok(Some(message)) => {
                    self.stats.requests += 1;
                    match self.dispatcher.dispatch(message) {
                        Some(response) => response,
                        None => {
                            self.stats.notifications += 1;
                            continue;
                        }
                    }
                }
                Err(error) => {
                    self.stats.decode_errors += 1;
                    self.dispatcher.decode_failure(&error)
                }
            };
            self.respond(&response)?;
        }
    }

    fn respond(&mut self, response: &RpcResponse) -> Result<(), ServeError> {
        self.writer.write_response(response)?;
        self.stats.responses += 1;
        Ok(())
    }
}

/// Reads from the stream, retrying on interrupts.
fn read_with_retry(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
