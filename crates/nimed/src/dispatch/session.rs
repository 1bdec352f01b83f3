//! Per-connection session state.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::registry::ServiceHandler;
use super::request::{ID_FIELD, Request};

/// Accumulated session fields, keyed by request field name.
pub type Env = Map<String, Value>;

/// State threaded through every request on one connection.
///
/// The `env` map grows as requests arrive: each request's fields other than
/// `method` and `seqNum` are merged in, last write wins. `id` is the exception
/// once a handler is bound: the identity that resolved stays fixed for the rest
/// of the connection. Nothing is ever removed.
#[derive(Default)]
pub struct Session {
    env: Env,
    service: Option<Arc<dyn ServiceHandler>>,
    dispatched: u64,
}

impl Session {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a request's session fields into `env`.
    ///
    /// Before a handler is bound, an `id` that failed to resolve may still be
    /// replaced by a later request.
    pub fn merge(&mut self, request: &Request) {
        let identity_fixed = self.service.is_some();
        for (key, value) in request.session_fields() {
            if identity_fixed && key == ID_FIELD {
                continue;
            }
            self.env.insert(key.clone(), value.clone());
        }
        self.dispatched += 1;
    }

    /// Accumulated fields.
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Exclusive access to the accumulated fields for a handler call.
    pub fn env_mut(&mut self) -> &mut Env {
        &mut self.env
    }

    /// Session identity, once established.
    pub fn id(&self) -> Option<&str> {
        self.env.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Handler bound to this session, if resolution has succeeded.
    pub fn service(&self) -> Option<Arc<dyn ServiceHandler>> {
        self.service.clone()
    }

    /// Binds the handler that serves requests without an `id` of their own,
    /// and fixes the session identity.
    pub fn bind(&mut self, service: Arc<dyn ServiceHandler>) {
        self.service = Some(service);
    }

    /// Number of structured requests merged so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("env", &self.env)
            .field("bound", &self.service.is_some())
            .field("dispatched", &self.dispatched)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dispatch::response::Response;

    fn request(json: &str) -> Request {
        Request::parse(json.as_bytes()).expect("test request")
    }

    #[test]
    fn merge_skips_method_and_seq_num() {
        let mut session = Session::new();
        session.merge(&request(
            r#"{"id":"123","isConsole":false,"method":"init","seqNum":233}"#,
        ));
        assert_eq!(
            Value::Object(session.env().clone()),
            json!({"id": "123", "isConsole": false})
        );
        assert_eq!(session.dispatched(), 1);
    }

    #[test]
    fn later_fields_overwrite_earlier_ones() {
        let mut session = Session::new();
        session.merge(&request(r#"{"isKeyboardOpen":false,"method":"a","seqNum":1}"#));
        session.merge(&request(r#"{"isKeyboardOpen":true,"method":"b","seqNum":2}"#));
        assert_eq!(session.env().get("isKeyboardOpen"), Some(&Value::Bool(true)));
    }

    fn bound() -> Arc<dyn ServiceHandler> {
        Arc::new(|request: &Request, _env: &mut Env| Response::success(request.seq_num()))
    }

    #[test]
    fn identity_is_fixed_once_bound() {
        let mut session = Session::new();
        session.merge(&request(r#"{"id":"first","method":"init","seqNum":1}"#));
        session.bind(bound());
        session.merge(&request(r#"{"id":"second","method":"init","seqNum":2}"#));
        assert_eq!(session.id(), Some("first"));
    }

    #[test]
    fn unbound_identity_can_be_replaced() {
        let mut session = Session::new();
        session.merge(&request(r#"{"id":"unknown","method":"init","seqNum":1}"#));
        session.merge(&request(r#"{"id":"known","method":"init","seqNum":2}"#));
        assert_eq!(session.id(), Some("known"));
    }

    #[test]
    fn fields_are_never_removed() {
        let mut session = Session::new();
        session.merge(&request(r#"{"a":1,"method":"x","seqNum":1}"#));
        session.merge(&request(r#"{"b":2,"method":"y","seqNum":2}"#));
        assert_eq!(
            Value::Object(session.env().clone()),
            json!({"a": 1, "b": 2})
        );
    }
}
