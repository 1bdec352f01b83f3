//! Health reporter double that records lifecycle events for assertions.

use std::sync::Mutex;

use nime_config::{Config, SocketEndpoint};

use crate::bootstrap::BootstrapError;
use crate::dispatch::ConnectionId;
use crate::health::HealthReporter;

/// Lifecycle events observed during a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ListenerStarted(String),
    ConnectionOpened(ConnectionId),
    ConnectionClosed { id: ConnectionId, requests: u64 },
}

#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_started(&self, endpoint: &SocketEndpoint) {
        self.record(HealthEvent::ListenerStarted(endpoint.to_string()));
    }

    fn connection_opened(&self, id: ConnectionId) {
        self.record(HealthEvent::ConnectionOpened(id));
    }

    fn connection_closed(&self, id: ConnectionId, requests: u64) {
        self.record(HealthEvent::ConnectionClosed { id, requests });
    }
}
