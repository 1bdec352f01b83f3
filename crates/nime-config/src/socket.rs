//! Where the daemon listens.
//!
//! An endpoint is written as a URL, `unix:///run/user/1000/nime/nimed.sock`
//! or `tcp://127.0.0.1:9780`, on the command line, in the environment and in
//! serialised configuration alike.

use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Listening endpoint of the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum SocketEndpoint {
    /// Unix domain socket at an absolute path.
    Unix { path: Utf8PathBuf },
    /// TCP socket bound to `host:port`.
    Tcp { host: String, port: u16 },
}

impl SocketEndpoint {
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Socket file path, for Unix endpoints only.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path.as_path()),
            Self::Tcp { .. } => None,
        }
    }

    /// Creates the directory that will hold a Unix socket, readable by the
    /// owner only. An existing directory is left as it is.
    ///
    /// # Errors
    ///
    /// Returns [`SocketPreparationError`] when the path has no directory
    /// component or the directory cannot be created.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        let Some(path) = self.unix_path() else {
            return Ok(());
        };
        let directory = path
            .parent()
            .filter(|dir| !dir.as_str().is_empty())
            .ok_or_else(|| SocketPreparationError::NoDirectory {
                path: path.to_owned(),
            })?;
        if directory.is_dir() {
            return Ok(());
        }
        create_private_dir(directory).map_err(|source| SocketPreparationError::Directory {
            directory: directory.to_owned(),
            source,
        })
    }
}

#[cfg(unix)]
fn create_private_dir(directory: &Utf8Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(directory)
}

#[cfg(not(unix))]
fn create_private_dir(directory: &Utf8Path) -> std::io::Result<()> {
    std::fs::create_dir_all(directory)
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(formatter, "unix://{path}"),
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
        }
    }
}

impl FromStr for SocketEndpoint {
    type Err = SocketParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |problem: &'static str| SocketParseError {
            input: input.to_owned(),
            problem,
        };
        let url = Url::parse(input).map_err(|_| invalid("not a URL"))?;
        match url.scheme() {
            "unix" => unix_from_url(&url).ok_or_else(|| invalid("expected unix:///absolute/path")),
            "tcp" => tcp_from_url(&url).ok_or_else(|| invalid("expected tcp://host:port")),
            _ => Err(invalid("scheme must be unix or tcp")),
        }
    }
}

fn unix_from_url(url: &Url) -> Option<SocketEndpoint> {
    // `unix://run/nimed.sock` would put `run` in the host slot.
    if url.host_str().is_some_and(|host| !host.is_empty()) {
        return None;
    }
    let path = Utf8Path::new(url.path());
    (path.is_absolute() && path.file_name().is_some()).then(|| SocketEndpoint::unix(path))
}

fn tcp_from_url(url: &Url) -> Option<SocketEndpoint> {
    let host = url.host_str().filter(|host| !host.is_empty())?;
    let port = url.port()?;
    matches!(url.path(), "" | "/").then(|| SocketEndpoint::tcp(host, port))
}

impl TryFrom<String> for SocketEndpoint {
    type Error = SocketParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SocketEndpoint> for String {
    fn from(endpoint: SocketEndpoint) -> Self {
        endpoint.to_string()
    }
}

/// A socket URL that does not describe a usable endpoint.
#[derive(Debug, Error)]
#[error("invalid daemon socket '{input}': {problem}")]
pub struct SocketParseError {
    input: String,
    problem: &'static str,
}

impl SocketParseError {
    /// Text that failed to parse.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Errors raised while creating the socket directory.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    /// The socket path is a bare file name.
    #[error("socket path '{path}' has no directory component")]
    NoDirectory { path: Utf8PathBuf },
    /// The directory could not be created.
    #[error("cannot create socket directory '{directory}'")]
    Directory {
        directory: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}
