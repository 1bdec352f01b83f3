//! Daemon bootstrap and the serving lifecycle.

use std::sync::Arc;

use thiserror::Error;

use nime_config::{Config, ConfigError, SocketPreparationError};

use crate::dispatch::{DispatcherOptions, ServiceRegistry};
use crate::health::HealthReporter;
use crate::shutdown::{ShutdownError, ShutdownSignal};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{ListenerError, PipeConnectionHandler, SocketListener};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Loader that reads the process arguments and environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load()
    }
}

/// Loader that hands out a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps a configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced while starting or running the daemon.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare daemon socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
    /// The listener could not be bound or stopped cleanly.
    #[error("socket listener failed: {source}")]
    Listener {
        /// Listener error.
        #[source]
        source: ListenerError,
    },
    /// Waiting for shutdown failed.
    #[error("failed to wait for shutdown: {source}")]
    Shutdown {
        /// Signal error.
        #[source]
        source: ShutdownError,
    },
}

/// A bootstrapped daemon, ready to serve.
pub struct Daemon {
    config: Config,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Serves connections until `shutdown` fires.
    ///
    /// Every connection gets its own dispatcher resolving services through
    /// `registry`. The listener is stopped and joined before returning;
    /// connections already in flight finish on their own threads.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Listener`] when the endpoint cannot be bound
    /// and [`BootstrapError::Shutdown`] when the shutdown wait fails.
    pub fn serve(
        &self,
        registry: Arc<dyn ServiceRegistry>,
        shutdown: &dyn ShutdownSignal,
    ) -> Result<(), BootstrapError> {
        let listener = SocketListener::bind(self.config.daemon_socket())
            .map_err(|source| BootstrapError::Listener { source })?;
        let handler = PipeConnectionHandler::new(
            registry,
            DispatcherOptions::from_config(&self.config),
            Arc::clone(&self.reporter),
        );
        let handle = listener
            .start(Arc::new(handler))
            .map_err(|source| BootstrapError::Listener { source })?;
        self.reporter.listener_started(self.config.daemon_socket());

        let waited = shutdown
            .wait()
            .map_err(|source| BootstrapError::Shutdown { source });
        handle.shutdown();
        handle
            .join()
            .map_err(|source| BootstrapError::Listener { source })?;
        waited
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Returns the first stage failure. Each failure is also reported through
/// `reporter`.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    match bootstrap_stages(loader) {
        Ok((config, telemetry)) => {
            reporter.bootstrap_succeeded(&config);
            Ok(Daemon {
                config,
                telemetry,
                reporter,
            })
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn bootstrap_stages(loader: &dyn ConfigLoader) -> Result<(Config, TelemetryHandle), BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    config
        .daemon_socket()
        .prepare_filesystem()
        .map_err(|source| BootstrapError::Socket { source })?;
    Ok((config, telemetry))
}
