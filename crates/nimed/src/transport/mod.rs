//! Socket transport for the daemon.
//!
//! The listener binds the configured endpoint and accepts connections on a
//! background thread. Each connection is handed to a [`ConnectionHandler`];
//! the daemon uses [`PipeConnectionHandler`], which feeds read and write
//! completions to a [`crate::dispatch::SessionDispatcher`].

mod errors;
mod handler;
mod listener;
mod pipe;
#[cfg(test)]
mod test_utils;

pub use self::errors::{ConnectionError, ListenerError};
pub use self::handler::{ConnectionHandler, ConnectionStream};
pub use self::listener::{ListenerHandle, SocketListener};
pub use self::pipe::{PipeConnectionHandler, drive};
#[cfg(test)]
pub(crate) use self::test_utils::CountingHandler;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
