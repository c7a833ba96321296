//! Incremental newline-delimited JSON framing.
//!
//! [`MessageFramer`] accumulates bytes from a stream and yields one JSON value
//! per line. Both `\n` and `\r\n` terminators are accepted, blank lines are
//! absorbed, and a line that fails to parse is reported without disturbing
//! the lines after it.

use serde_json::Value;
use thiserror::Error;

/// A line that could not be decoded as JSON.
#[derive(Debug, Error)]
#[error("invalid JSON message: {message}")]
pub struct FrameDecodeError {
    /// The offending line, lossily decoded as UTF-8.
    pub line: String,
    /// Parser diagnostic.
    pub message: String,
    /// Underlying parser error.
    #[source]
    pub source: serde_json::Error,
}

/// Byte accumulator that splits a stream into JSON messages.
///
/// Bytes before `consumed` belong to lines already returned. Bytes between
/// `consumed` and `scanned` are known to contain no newline, so they are
/// never searched twice.
#[derive(Debug, Default)]
pub struct MessageFramer {
    buffer: Vec<u8>,
    consumed: usize,
    scanned: usize,
}

impl MessageFramer {
    /// Creates an empty framer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds bytes to the buffer. No upper bound is enforced.
    pub fn append(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Returns the next complete message.
    ///
    /// `Ok(None)` means no complete line is buffered yet. Call repeatedly to
    /// drain every buffered line.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameDecodeError`] when the next line is not valid JSON.
    /// The line is consumed either way.
    pub fn read_message(&mut self) -> Result<Option<Value>, FrameDecodeError> {
        loop {
            let pending = self.buffer.get(self.scanned..).unwrap_or_default();
            let Some(offset) = pending.iter().position(|byte| *byte == b'\n') else {
                self.scanned = self.buffer.len();
                return Ok(None);
            };

            let end = self.scanned + offset;
            let start = self.consumed;
            self.consumed = end + 1;
            self.scanned = self.consumed;

            let decoded = decode_line(self.buffer.get(start..end).unwrap_or_default());
            self.compact();
            if let Some(outcome) = decoded {
                return outcome.map(Some);
            }
        }
    }

    /// Like [`MessageFramer::read_message`], but treats unterminated trailing
    /// bytes as a final line. Call at end of stream until it returns
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameDecodeError`] when a remaining line is not valid JSON.
    pub fn finish(&mut self) -> Result<Option<Value>, FrameDecodeError> {
        if let Some(message) = self.read_message()? {
            return Ok(Some(message));
        }
        let trailing = self.buffer.get(self.consumed..).unwrap_or_default();
        let decoded = decode_line(trailing);
        self.buffer.clear();
        self.consumed = 0;
        self.scanned = 0;
        decoded.transpose()
    }

    /// Number of buffered bytes not yet returned as messages.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() - self.consumed
    }

    fn compact(&mut self) {
        if self.consumed > 0 && self.consumed.saturating_mul(2) >= self.buffer.len() {
            self.buffer.drain(..self.consumed);
            self.scanned -= self.consumed;
            self.consumed = 0;
        }
    }
}

/// Decodes one line. `None` means the line was blank.
fn decode_line(raw: &[u8]) -> Option<Result<Value, FrameDecodeError>> {
    let line = raw.strip_suffix(b"\r").unwrap_or(raw);
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    Some(
        serde_json::from_slice(line).map_err(|source| FrameDecodeError {
            line: String::from_utf8_lossy(line).into_owned(),
            message: source.to_string(),
            source,
        }),
    )
}
