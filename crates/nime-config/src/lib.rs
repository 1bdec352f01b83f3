//! Shared configuration for the NIME pipe daemon.
//!
//! Values resolve in the order command line, environment, built-in default.
//! Every field can be supplied through a `--flag` or the matching `NIME_*`
//! environment variable, which keeps service managers and interactive use on
//! the same code path.

mod defaults;
mod logging;
mod socket;

use std::ffi::OsString;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_MAX_MESSAGE_BYTES, DEFAULT_TCP_PORT, default_log_filter_string,
    default_log_format, default_max_message_bytes, default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Parser)]
#[command(name = "nimed", version, about = "NIME pipe protocol daemon")]
pub struct Config {
    /// Socket endpoint the daemon listens on (`unix:///path` or `tcp://host:port`).
    #[arg(long, env = "NIME_DAEMON_SOCKET", default_value_t = default_socket_endpoint())]
    pub daemon_socket: SocketEndpoint,
    /// Tracing filter expression, for example `info,nimed::dispatch=debug`.
    #[arg(long, env = "NIME_LOG_FILTER", default_value = DEFAULT_LOG_FILTER)]
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[arg(long, env = "NIME_LOG_FORMAT", default_value_t = default_log_format())]
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Largest request a connection may buffer before it is closed.
    #[arg(long, env = "NIME_MAX_MESSAGE_BYTES", default_value_t = DEFAULT_MAX_MESSAGE_BYTES)]
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
    /// Service identifiers answered by the daemon. Repeat the flag or
    /// separate values with commas.
    #[arg(long = "service", env = "NIME_SERVICES", value_delimiter = ',')]
    #[serde(default)]
    pub services: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_socket: default_socket_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            services: Vec::new(),
        }
    }
}

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Arguments or environment values failed to parse. Also carries the
    /// help and version requests raised by `clap`.
    #[error(transparent)]
    Parse(#[from] clap::Error),
    /// A value parsed but is not usable.
    #[error("invalid configuration: {message}")]
    Invalid {
        /// Description of the rejected value.
        message: String,
    },
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value fails to parse or validate.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration from an explicit argument list. The first element
    /// is the program name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value fails to parse or validate.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let config = Self::try_parse_from(args)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that parse but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero message limit or a blank
    /// service identifier.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_bytes == 0 {
            return Err(ConfigError::Invalid {
                message: "max_message_bytes must be greater than zero".to_owned(),
            });
        }
        if self.services.iter().any(|id| id.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                message: "service identifiers must not be blank".to_owned(),
            });
        }
        Ok(())
    }

    /// Socket endpoint the daemon listens on.
    #[must_use]
    pub fn daemon_socket(&self) -> &SocketEndpoint {
        &self.daemon_socket
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Per-connection message size limit in bytes.
    #[must_use]
    pub fn max_message_bytes(&self) -> usize {
        self.max_message_bytes
    }

    /// Configured service identifiers.
    #[must_use]
    pub fn services(&self) -> &[String] {
        &self.services
    }
}
