//! Structured health reporting for daemon lifecycle events.

use std::sync::Arc;

use nime_config::{Config, SocketEndpoint};

use crate::bootstrap::BootstrapError;
use crate::dispatch::ConnectionId;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the listener accepts connections.
    fn listener_started(&self, endpoint: &SocketEndpoint);

    /// Invoked when a connection is handed to a dispatcher.
    fn connection_opened(&self, id: ConnectionId);

    /// Invoked when a connection closes, with the number of structured
    /// requests it carried.
    fn connection_closed(&self, id: ConnectionId, requests: u64);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn listener_started(&self, endpoint: &SocketEndpoint) {
        (**self).listener_started(endpoint);
    }

    fn connection_opened(&self, id: ConnectionId) {
        (**self).connection_opened(id);
    }

    fn connection_closed(&self, id: ConnectionId, requests: u64) {
        (**self).connection_closed(id, requests);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            socket = %config.daemon_socket(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            max_message_bytes = config.max_message_bytes(),
            services = ?config.services(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn listener_started(&self, endpoint: &SocketEndpoint) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_started",
            endpoint = %endpoint,
            "accepting connections"
        );
    }

    fn connection_opened(&self, id: ConnectionId) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "connection_opened",
            connection = id,
            "connection opened"
        );
    }

    fn connection_closed(&self, id: ConnectionId, requests: u64) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "connection_closed",
            connection = id,
            requests,
            "connection closed"
        );
    }
}
