//! Incremental framing of the pipe byte stream.
//!
//! Read completions may split a message across several deliveries or pack
//! several messages into one. The framer accumulates bytes and extracts one
//! message at a time, keeping anything after it buffered for the next call.
//!
//! Two shapes are recognised:
//!
//! - the literal control tokens `ping` and `quit`, checked first;
//! - a single JSON object. A document cut off mid-value is reported as
//!   [`Frame::Incomplete`]; any other parse failure is a [`FrameError`].

use serde_json::Value;

use super::errors::FrameError;
use super::request::Request;

const PING_TOKEN: &[u8] = b"ping";
const QUIT_TOKEN: &[u8] = b"quit";

/// A complete message extracted from the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Liveness probe, answered with `pong`.
    Ping,
    /// Client asks to close the connection.
    Quit,
    /// Structured request.
    Request(Request),
}

/// Result of a framing attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// No full message is buffered yet.
    Incomplete,
    /// One message was extracted and its bytes consumed.
    Complete(Message),
}

enum TokenMatch {
    Complete(Message, usize),
    Partial,
    NoMatch,
}

/// Byte accumulator for one connection.
#[derive(Debug)]
pub struct MessageFramer {
    buffer: Vec<u8>,
    max_message_bytes: usize,
}

impl MessageFramer {
    /// Creates an empty framer that rejects buffers larger than the limit.
    pub fn new(max_message_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_message_bytes,
        }
    }

    /// Appends bytes and tries to extract the next message.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] when the buffered bytes can never form a valid
    /// message. The buffer is discarded in that case.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Frame, FrameError> {
        self.buffer.extend_from_slice(bytes);
        self.next_frame()
    }

    /// Tries to extract the next message from bytes already buffered.
    ///
    /// # Errors
    ///
    /// See [`MessageFramer::feed`].
    pub fn next_frame(&mut self) -> Result<Frame, FrameError> {
        let result = self.extract();
        if result.is_err() {
            self.buffer.clear();
        }
        result
    }

    /// Number of bytes waiting to be framed.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn extract(&mut self) -> Result<Frame, FrameError> {
        let start = self
            .buffer
            .iter()
            .position(|byte| !byte.is_ascii_whitespace())
            .unwrap_or(self.buffer.len());
        let pending = self.buffer.get(start..).unwrap_or_default();
        if pending.is_empty() {
            self.buffer.clear();
            return Ok(Frame::Incomplete);
        }

        match match_control_token(pending) {
            TokenMatch::Complete(message, len) => {
                self.consume(start + len);
                return Ok(Frame::Complete(message));
            }
            TokenMatch::Partial => return self.incomplete(),
            TokenMatch::NoMatch => {}
        }

        let mut stream = serde_json::Deserializer::from_slice(pending).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value)) => {
                let consumed = stream.byte_offset();
                let request = Request::from_value(value)?;
                self.consume(start + consumed);
                Ok(Frame::Complete(Message::Request(request)))
            }
            Some(Err(error)) if error.is_eof() => self.incomplete(),
            Some(Err(error)) => Err(FrameError::from_json_error(error)),
            None => self.incomplete(),
        }
    }

    fn incomplete(&self) -> Result<Frame, FrameError> {
        if self.buffer.len() > self.max_message_bytes {
            return Err(FrameError::too_large(
                self.buffer.len(),
                self.max_message_bytes,
            ));
        }
        Ok(Frame::Incomplete)
    }

    fn consume(&mut self, len: usize) {
        self.buffer.drain(..len.min(self.buffer.len()));
    }
}

fn match_control_token(pending: &[u8]) -> TokenMatch {
    for (token, message) in [(PING_TOKEN, Message::Ping), (QUIT_TOKEN, Message::Quit)] {
        if let Some(rest) = pending.strip_prefix(token) {
            if ends_token(rest) {
                return TokenMatch::Complete(message, token.len());
            }
        } else if token.starts_with(pending) {
            return TokenMatch::Partial;
        }
    }
    TokenMatch::NoMatch
}

/// A token ends at the buffer end, at whitespace, or where the next pipelined
/// message begins.
fn ends_token(rest: &[u8]) -> bool {
    match rest.first() {
        None => true,
        Some(byte) => byte.is_ascii_whitespace() || matches!(byte, b'{' | b'p' | b'q'),
    }
}
