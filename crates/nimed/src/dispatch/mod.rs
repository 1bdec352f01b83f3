//! Pipe request dispatch.
//!
//! This module turns the raw byte stream of one pipe connection into
//! requests, routes them, and tells the I/O loop what to do next. It never
//! touches the transport itself; see [`SessionDispatcher`] for the event
//! contract.
//!
//! ## Protocol
//!
//! Clients send either a bare control token or a JSON object:
//!
//! ```text
//! ping
//! quit
//! {"id":"{GUID}","isConsole":false,"method":"init","seqNum":233}
//! {"isKeyboardOpen":true,"method":"onActivate","seqNum":0}
//! ```
//!
//! `ping` is answered with `pong`, `quit` closes the connection, and every
//! JSON request receives a JSON response echoing its `seqNum`:
//!
//! ```text
//! {"success":true,"seqNum":233}
//! ```
//!
//! ## Service routing
//!
//! Requests are routed through a [`ServiceRegistry`]. The first request that
//! resolves to a handler binds it to the session; later requests on the same
//! connection go to that handler. Requests that resolve to nothing receive
//! `{"success":false,"seqNum":N}` and the connection stays open.

mod dispatcher;
mod errors;
mod framer;
mod registry;
mod request;
mod response;
mod session;

pub use self::dispatcher::{
    ConnectionId, Directive, DispatcherOptions, SessionDispatcher, SessionState,
};
pub use self::errors::FrameError;
pub use self::framer::{Frame, Message, MessageFramer};
pub use self::registry::{
    ResolverRegistry, ServiceEntry, ServiceHandler, ServiceRegistry, StaticRegistry,
};
pub use self::request::{ID_FIELD, METHOD_FIELD, Request, SEQ_NUM_FIELD};
pub use self::response::{PONG, Reply, Response};
pub use self::session::{Env, Session};
