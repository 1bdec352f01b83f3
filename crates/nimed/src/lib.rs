//! NIME pipe daemon.
//!
//! Input method clients talk to the daemon over a byte stream carrying bare
//! `ping`/`quit` tokens and concatenated JSON requests. The [`dispatch`]
//! module is a sans-IO state machine: it is fed completion events and answers
//! with the next I/O action. The [`transport`] module provides a blocking
//! socket loop that drives it, and [`bootstrap_with`] wires configuration,
//! telemetry and the listener into a runnable [`Daemon`].
//!
//! Service behaviour is pluggable through [`dispatch::ServiceRegistry`]. The
//! binary registers an [`AcknowledgeService`] for each configured identifier.

mod bootstrap;
pub mod dispatch;
mod health;
mod services;
mod shutdown;
mod telemetry;
pub mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use services::{AcknowledgeService, LAST_METHOD_FIELD, acknowledge_registry};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
