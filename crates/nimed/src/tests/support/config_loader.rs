//! Configuration loaders covering success and failure paths.

use std::ffi::OsString;

use tempfile::TempDir;

use nime_config::{Config, ConfigError, SocketEndpoint};

use crate::bootstrap::ConfigLoader;

/// Loader that places the daemon socket under a private temporary directory.
pub struct TestConfigLoader {
    socket_dir: TempDir,
    services: Vec<String>,
}

impl TestConfigLoader {
    pub fn new() -> Self {
        Self {
            socket_dir: TempDir::new().expect("temporary socket directory"),
            services: Vec::new(),
        }
    }

    pub fn with_service(mut self, id: &str) -> Self {
        self.services.push(id.to_owned());
        self
    }

    pub fn socket_path(&self) -> String {
        self.socket_dir
            .path()
            .join("run")
            .join("nimed.sock")
            .to_str()
            .expect("temporary socket path was not valid UTF-8")
            .to_owned()
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(Config {
            daemon_socket: SocketEndpoint::unix(self.socket_path()),
            services: self.services.clone(),
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an unparsable socket URL.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load_from_iter([
            OsString::from("nimed"),
            OsString::from("--daemon-socket"),
            OsString::from("carrier-pigeon://socket"),
        ])
    }
}
