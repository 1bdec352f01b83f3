//! Services shipped with the daemon binary.

use std::sync::Arc;

use serde_json::Value;

use crate::dispatch::{Env, Request, Response, ServiceEntry, ServiceHandler, StaticRegistry};

/// Env key holding the most recent method seen by [`AcknowledgeService`].
pub const LAST_METHOD_FIELD: &str = "lastMethod";

/// Answers every request with success and the method it acknowledged.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcknowledgeService;

impl ServiceHandler for AcknowledgeService {
    fn respond(&self, request: &Request, env: &mut Env) -> Response {
        let method = request.method();
        env.insert(LAST_METHOD_FIELD.to_owned(), Value::from(method));
        Response::success(request.seq_num()).with_field("method", method)
    }
}

/// Builds a registry answering each identifier with an [`AcknowledgeService`].
pub fn acknowledge_registry<I, S>(ids: I) -> StaticRegistry
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let handler: Arc<dyn ServiceHandler> = Arc::new(AcknowledgeService);
    StaticRegistry::new(
        ids.into_iter()
            .map(|id| ServiceEntry::new(id, Arc::clone(&handler)))
            .collect(),
    )
}
