//! Connection handler doubles for listener tests.

use std::sync::{Arc, Mutex};

use super::{ConnectionHandler, ConnectionStream};

/// Kind of stream the listener handed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamKind {
    Tcp,
    #[cfg(unix)]
    Unix,
}

/// Records the kind of every accepted stream, then drops it.
#[derive(Debug, Default)]
pub(crate) struct CountingHandler {
    accepted: Mutex<Vec<StreamKind>>,
}

impl CountingHandler {
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn accepted(&self) -> Vec<StreamKind> {
        self.accepted.lock().expect("accepted mutex poisoned").clone()
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, stream: ConnectionStream) {
        let kind = match stream {
            ConnectionStream::Tcp(_) => StreamKind::Tcp,
            #[cfg(unix)]
            ConnectionStream::Unix(_) => StreamKind::Unix,
        };
        self.accepted
            .lock()
            .expect("accepted mutex poisoned")
            .push(kind);
    }
}
