//! Session dispatcher: the per-connection state machine.
//!
//! The dispatcher is a pure reaction to completion events. The I/O loop
//! delivers `(status, bytes)`, the dispatcher frames the bytes, runs the
//! matching protocol or service logic, and answers with a [`Directive`]
//! holding exactly one [`Action`] plus the reply to write, if any. All waiting
//! happens in the I/O loop; nothing here blocks.
//!
//! One message is dispatched per call. When a delivery holds several
//! pipelined messages the rest stay buffered, and the loop drains them by
//! calling [`SessionDispatcher::handle_event`] with [`CompletionStatus::MoreData`]
//! and an empty slice until the answer is [`Action::NextRead`].

use std::sync::Arc;

use nime_config::{Config, DEFAULT_MAX_MESSAGE_BYTES};
use nime_types::{Action, CompletionStatus};
use tracing::{debug, warn};

use super::framer::{Frame, Message, MessageFramer};
use super::registry::ServiceRegistry;
use super::request::Request;
use super::response::{Reply, Response};
use super::session::Session;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Identifier assigned to a connection by the I/O loop.
pub type ConnectionId = u64;

/// Where the connection stands between events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for bytes from a read completion.
    AwaitingRead,
    /// A reply was handed out and its write has not completed yet.
    AwaitingWrite,
    /// The connection is closed. No further events may be delivered.
    Closed,
}

/// The dispatcher's answer to one completion event.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// What the I/O loop must do next.
    pub action: Action,
    /// Payload to write when `action` is [`Action::NextWrite`].
    pub reply: Option<Reply>,
}

impl Directive {
    const fn bare(action: Action) -> Self {
        Self {
            action,
            reply: None,
        }
    }

    fn write(reply: Reply) -> Self {
        Self {
            action: Action::NextWrite,
            reply: Some(reply),
        }
    }

    /// Splits the directive into its action and reply.
    pub fn into_parts(self) -> (Action, Option<Reply>) {
        (self.action, self.reply)
    }
}

/// Tunables fixed when a dispatcher is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherOptions {
    /// Largest partial message the framer buffers before closing.
    pub max_message_bytes: usize,
}

impl DispatcherOptions {
    /// Derives options from the daemon configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_message_bytes: config.max_message_bytes(),
        }
    }
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

/// Per-connection dispatcher owning the framer and the session.
pub struct SessionDispatcher {
    connection_id: ConnectionId,
    registry: Arc<dyn ServiceRegistry>,
    framer: MessageFramer,
    session: Session,
    state: SessionState,
}

impl SessionDispatcher {
    /// Creates a dispatcher for a freshly accepted connection.
    pub fn new(
        connection_id: ConnectionId,
        registry: Arc<dyn ServiceRegistry>,
        options: DispatcherOptions,
    ) -> Self {
        Self {
            connection_id,
            registry,
            framer: MessageFramer::new(options.max_message_bytes),
            session: Session::new(),
            state: SessionState::AwaitingRead,
        }
    }

    /// Handles a read completion event.
    pub fn handle_event(&mut self, status: CompletionStatus, bytes: &[u8]) -> Directive {
        if self.state == SessionState::Closed {
            warn!(
                target: DISPATCH_TARGET,
                connection = self.connection_id,
                ?status,
                "event delivered after close"
            );
            return Directive::bare(Action::CloseSocket);
        }

        match status {
            status if status.carries_data() => self.frame(bytes),
            CompletionStatus::IoPending => Directive::bare(Action::NoAction),
            _ => {
                debug!(
                    target: DISPATCH_TARGET,
                    connection = self.connection_id,
                    "transport reported failure"
                );
                self.close()
            }
        }
    }

    /// Handles a write completion event.
    ///
    /// A finished write puts the connection back into [`SessionState::AwaitingRead`].
    /// Buffered pipelined messages are then drained through
    /// [`SessionDispatcher::handle_event`].
    pub fn handle_write(&mut self, status: CompletionStatus) -> Action {
        if self.state == SessionState::Closed {
            return Action::CloseSocket;
        }
        match status {
            CompletionStatus::Success | CompletionStatus::MoreData => {
                self.state = SessionState::AwaitingRead;
                Action::NextRead
            }
            CompletionStatus::IoPending => Action::NoAction,
            CompletionStatus::Failure => self.close().action,
        }
    }

    /// Connection identifier assigned at construction.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session state accumulated so far.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns `true` when bytes are waiting in the framer.
    pub fn has_buffered_input(&self) -> bool {
        !self.framer.is_empty()
    }

    fn frame(&mut self, bytes: &[u8]) -> Directive {
        match self.framer.feed(bytes) {
            Ok(Frame::Incomplete) => Directive::bare(Action::NextRead),
            Ok(Frame::Complete(message)) => self.dispatch(message),
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    connection = self.connection_id,
                    %error,
                    "malformed request stream"
                );
                self.close()
            }
        }
    }

    fn dispatch(&mut self, message: Message) -> Directive {
        match message {
            Message::Ping => self.reply(Reply::Pong),
            Message::Quit => {
                debug!(
                    target: DISPATCH_TARGET,
                    connection = self.connection_id,
                    "client requested close"
                );
                self.close()
            }
            Message::Request(request) => {
                let response = self.dispatch_request(&request);
                self.reply(Reply::Message(response))
            }
        }
    }

    fn dispatch_request(&mut self, request: &Request) -> Response {
        let resolved = self.registry.resolve(request);
        let service = match (&resolved, request.id()) {
            (Some(service), _) => Some(Arc::clone(service)),
            // Requests that name a service must resolve on their own.
            (None, Some(_)) => None,
            (None, None) => self.session.service(),
        };

        self.session.merge(request);
        if self.session.service().is_none()
            && let Some(service) = resolved
        {
            self.session.bind(service);
        }

        debug!(
            target: DISPATCH_TARGET,
            connection = self.connection_id,
            method = request.method(),
            seq_num = request.seq_num(),
            resolved = service.is_some(),
            "dispatching request"
        );

        match service {
            Some(service) => service.respond(request, self.session.env_mut()),
            None => Response::failure(request.seq_num()),
        }
    }

    fn reply(&mut self, reply: Reply) -> Directive {
        self.state = SessionState::AwaitingWrite;
        Directive::write(reply)
    }

    fn close(&mut self) -> Directive {
        self.state = SessionState::Closed;
        Directive::bare(Action::CloseSocket)
    }
}
