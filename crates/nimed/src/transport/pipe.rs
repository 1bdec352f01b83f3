//! Blocking I/O loop that drives a [`SessionDispatcher`] over a socket.
//!
//! The loop plays the part of the pipe completion machinery: every read or
//! write result is translated into a [`CompletionStatus`] and fed to the
//! dispatcher, whose [`Action`] decides the next operation. After each
//! completed write the loop drains pipelined messages with a `MoreData` event
//! carrying no bytes before it reads again.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use nime_types::{Action, CompletionStatus};
use tracing::{debug, warn};

use crate::dispatch::{
    ConnectionId, Directive, DispatcherOptions, Reply, ServiceRegistry, SessionDispatcher,
};
use crate::health::HealthReporter;

use super::{ConnectionError, ConnectionHandler, ConnectionStream, LISTENER_TARGET};

/// Size of a single read request.
pub(crate) const READ_CHUNK_BYTES: usize = 4096;

/// Connection handler that runs one dispatcher per accepted connection.
pub struct PipeConnectionHandler {
    registry: Arc<dyn ServiceRegistry>,
    options: DispatcherOptions,
    reporter: Arc<dyn HealthReporter>,
    next_id: AtomicU64,
}

impl PipeConnectionHandler {
    /// Creates a handler sharing `registry` across all connections.
    pub fn new(
        registry: Arc<dyn ServiceRegistry>,
        options: DispatcherOptions,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            registry,
            options,
            reporter,
            next_id: AtomicU64::new(1),
        }
    }

    /// Serves one connection over any byte stream until it closes.
    pub fn serve<S: Read + Write>(&self, stream: &mut S) {
        let id: ConnectionId = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.reporter.connection_opened(id);
        let mut dispatcher =
            SessionDispatcher::new(id, Arc::clone(&self.registry), self.options);
        let result = drive(&mut dispatcher, stream);
        if let Err(error) = &result {
            warn!(target: LISTENER_TARGET, connection = id, %error, "connection aborted");
        }
        self.reporter
            .connection_closed(id, dispatcher.session().dispatched());
    }
}

impl ConnectionHandler for PipeConnectionHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        self.serve(&mut stream);
    }
}

/// Runs the event loop until the dispatcher answers `CloseSocket`.
///
/// # Errors
///
/// Returns [`ConnectionError`] when a reply cannot be produced. Transport
/// failures are reported to the dispatcher instead.
pub fn drive<S: Read + Write>(
    dispatcher: &mut SessionDispatcher,
    stream: &mut S,
) -> Result<(), ConnectionError> {
    let mut chunk = vec![0_u8; READ_CHUNK_BYTES];
    let mut directive = read_event(dispatcher, stream, &mut chunk);
    loop {
        if directive.action.is_terminal() {
            return Ok(());
        }
        directive = match directive.action {
            Action::NextWrite => {
                let reply = directive.reply.ok_or(ConnectionError::MissingReply)?;
                let status = write_reply(stream, &reply)?;
                match dispatcher.handle_write(status) {
                    Action::NextRead => dispatcher.handle_event(CompletionStatus::MoreData, &[]),
                    action => Directive {
                        action,
                        reply: None,
                    },
                }
            }
            _ => read_event(dispatcher, stream, &mut chunk),
        };
    }
}

fn read_event<S: Read>(
    dispatcher: &mut SessionDispatcher,
    stream: &mut S,
    chunk: &mut [u8],
) -> Directive {
    let (status, len) = read_completion(stream, chunk);
    let bytes = chunk.get(..len).unwrap_or_default();
    dispatcher.handle_event(status, bytes)
}

/// Maps a blocking read onto a completion event.
fn read_completion<S: Read>(stream: &mut S, chunk: &mut [u8]) -> (CompletionStatus, usize) {
    loop {
        match stream.read(chunk) {
            // Peer closed the pipe.
            Ok(0) => return (CompletionStatus::Failure, 0),
            Ok(len) if len == chunk.len() => return (CompletionStatus::MoreData, len),
            Ok(len) => return (CompletionStatus::Success, len),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                return (CompletionStatus::IoPending, 0);
            }
            Err(error) => {
                debug!(target: LISTENER_TARGET, %error, "read failed");
                return (CompletionStatus::Failure, 0);
            }
        }
    }
}

fn write_reply<S: Write>(stream: &mut S, reply: &Reply) -> Result<CompletionStatus, ConnectionError> {
    let bytes = reply.to_bytes()?;
    let status = match stream.write_all(&bytes).and_then(|()| stream.flush()) {
        Ok(()) => CompletionStatus::Success,
        Err(error) => {
            debug!(target: LISTENER_TARGET, %error, "write failed");
            CompletionStatus::Failure
        }
    };
    Ok(status)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    use super::*;
    use crate::dispatch::{Env, Request, Response, ServiceHandler, StaticRegistry};

    /// In-memory duplex stream: reads come from `input`, writes land in `output`.
    struct ScriptedStream {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl ScriptedStream {
        fn new(input: &[u8]) -> Self {
            Self {
                input: Cursor::new(input.to_vec()),
                output: Vec::new(),
            }
        }

        fn replies(&self) -> Vec<Value> {
            serde_json::Deserializer::from_slice(&self.output)
                .into_iter::<Value>()
                .map(|value| value.expect("reply json"))
                .collect()
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[fixture]
    fn dispatcher() -> SessionDispatcher {
        let handler: Arc<dyn ServiceHandler> = Arc::new(|request: &Request, env: &mut Env| {
            Response::success(request.seq_num()).with_field("env", Value::Object(env.clone()))
        });
        let registry = StaticRegistry::default().with_service("svc", handler);
        SessionDispatcher::new(1, Arc::new(registry), DispatcherOptions::default())
    }

    #[rstest]
    fn answers_pipelined_requests_in_order(mut dispatcher: SessionDispatcher) {
        let mut stream = ScriptedStream::new(
            br#"{"id":"svc","method":"init","seqNum":1}{"a":true,"method":"onActivate","seqNum":2}quit"#,
        );

        drive(&mut dispatcher, &mut stream).expect("drive");

        let replies = stream.replies();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["seqNum"], json!(1));
        assert_eq!(replies[1]["seqNum"], json!(2));
        assert_eq!(replies[1]["env"], json!({"id": "svc", "a": true}));
    }

    #[rstest]
    fn ping_writes_pong_then_eof_closes(mut dispatcher: SessionDispatcher) {
        let mut stream = ScriptedStream::new(b"ping");
        drive(&mut dispatcher, &mut stream).expect("drive");
        assert_eq!(stream.output, b"pong");
    }

    #[rstest]
    fn malformed_stream_closes_without_reply(mut dispatcher: SessionDispatcher) {
        let mut stream = ScriptedStream::new(b"bogus ping");
        drive(&mut dispatcher, &mut stream).expect("drive");
        assert!(stream.output.is_empty());
    }

    #[test]
    fn full_read_buffer_reports_more_data() {
        let mut stream = Cursor::new(vec![b' '; 8]);
        let mut chunk = [0_u8; 8];
        assert_eq!(
            read_completion(&mut stream, &mut chunk),
            (CompletionStatus::MoreData, 8)
        );
        assert_eq!(
            read_completion(&mut stream, &mut chunk),
            (CompletionStatus::Failure, 0)
        );
    }
}
