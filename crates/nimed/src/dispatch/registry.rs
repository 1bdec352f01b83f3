//! Service resolution.
//!
//! A [`ServiceRegistry`] maps a request onto the [`ServiceHandler`] that
//! should answer it. Two registries are provided: [`StaticRegistry`], an
//! ordered table matched on the request `id`, and [`ResolverRegistry`], which
//! defers to a caller-supplied function. The dispatcher only sees the trait.
//!
//! Registries are shared read-only between connections. Handlers mutate the
//! per-connection `env` they are handed and nothing else.

use std::fmt;
use std::sync::Arc;

use super::request::Request;
use super::response::Response;
use super::session::Env;

/// Logic bound to one service identity.
pub trait ServiceHandler: Send + Sync {
    /// Answers a request. The handler may update `env`, but must not keep
    /// references to the request or the env beyond the call.
    fn respond(&self, request: &Request, env: &mut Env) -> Response;
}

impl<F> ServiceHandler for F
where
    F: Fn(&Request, &mut Env) -> Response + Send + Sync,
{
    fn respond(&self, request: &Request, env: &mut Env) -> Response {
        self(request, env)
    }
}

/// Resolves requests to handlers.
pub trait ServiceRegistry: Send + Sync {
    /// Returns the handler for the request, or `None` if no service matches.
    fn resolve(&self, request: &Request) -> Option<Arc<dyn ServiceHandler>>;
}

impl<T> ServiceRegistry for Arc<T>
where
    T: ServiceRegistry + ?Sized,
{
    fn resolve(&self, request: &Request) -> Option<Arc<dyn ServiceHandler>> {
        (**self).resolve(request)
    }
}

/// One row of a [`StaticRegistry`].
#[derive(Clone)]
pub struct ServiceEntry {
    id: String,
    handler: Arc<dyn ServiceHandler>,
}

impl ServiceEntry {
    /// Associates a service identifier with its handler.
    pub fn new(id: impl Into<String>, handler: Arc<dyn ServiceHandler>) -> Self {
        Self {
            id: id.into(),
            handler,
        }
    }

    /// Service identifier.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEntry").field("id", &self.id).finish()
    }
}

/// Ordered table of services matched on the request `id`.
///
/// Matching ignores ASCII case and the first matching entry wins.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    entries: Vec<ServiceEntry>,
}

impl StaticRegistry {
    /// Creates a registry from its entries, preserving their order.
    pub fn new(entries: Vec<ServiceEntry>) -> Self {
        Self { entries }
    }

    /// Appends an entry.
    #[must_use]
    pub fn with_service(mut self, id: impl Into<String>, handler: Arc<dyn ServiceHandler>) -> Self {
        self.entries.push(ServiceEntry::new(id, handler));
        self
    }

    /// Registered entries in match order.
    pub fn entries(&self) -> &[ServiceEntry] {
        &self.entries
    }
}

impl ServiceRegistry for StaticRegistry {
    fn resolve(&self, request: &Request) -> Option<Arc<dyn ServiceHandler>> {
        let id = request.id()?;
        self.entries
            .iter()
            .find(|entry| entry.id.eq_ignore_ascii_case(id))
            .map(|entry| Arc::clone(&entry.handler))
    }
}

/// Registry backed by a caller-supplied resolver function.
///
/// The function sees the whole request and may key on any field.
pub struct ResolverRegistry<F> {
    resolver: F,
}

impl<F> ResolverRegistry<F>
where
    F: Fn(&Request) -> Option<Arc<dyn ServiceHandler>> + Send + Sync,
{
    /// Wraps a resolver function.
    pub fn new(resolver: F) -> Self {
        Self { resolver }
    }
}

impl<F> ServiceRegistry for ResolverRegistry<F>
where
    F: Fn(&Request) -> Option<Arc<dyn ServiceHandler>> + Send + Sync,
{
    fn resolve(&self, request: &Request) -> Option<Arc<dyn ServiceHandler>> {
        (self.resolver)(request)
    }
}

impl<F> fmt::Debug for ResolverRegistry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistry").finish_non_exhaustive()
    }
}
