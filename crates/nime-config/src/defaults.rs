use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// TCP port used on platforms without Unix domain sockets.
pub const DEFAULT_TCP_PORT: u16 = 9780;

/// Tracing filter applied when none is configured.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Largest request the framer buffers before declaring the stream corrupt.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// Directory name shared by every NIME socket location.
#[cfg(unix)]
const SOCKET_DIR: &str = "nime";

#[cfg(unix)]
const SOCKET_FILE: &str = "nimed.sock";

/// Owned copy of [`DEFAULT_LOG_FILTER`] for serde defaults.
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

#[must_use]
pub const fn default_max_message_bytes() -> usize {
    DEFAULT_MAX_MESSAGE_BYTES
}

/// Socket the daemon listens on when none is configured.
///
/// Unix hosts use `$XDG_RUNTIME_DIR/nime/nimed.sock`. Without a runtime
/// directory the socket lives in `nime-<uid>` under the system temp dir.
#[cfg(unix)]
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    SocketEndpoint::unix(socket_directory().join(SOCKET_FILE))
}

#[cfg(not(unix))]
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}

#[cfg(unix)]
fn socket_directory() -> camino::Utf8PathBuf {
    dirs::runtime_dir()
        .and_then(|dir| camino::Utf8PathBuf::from_path_buf(dir).ok())
        .map_or_else(per_user_temp_directory, |dir| dir.join(SOCKET_DIR))
}

/// The temp dir is shared between users, so the directory carries the uid.
#[cfg(unix)]
fn per_user_temp_directory() -> camino::Utf8PathBuf {
    // SAFETY: `getuid` has no preconditions and cannot fail.
    let uid = unsafe { libc::getuid() };
    let temp = camino::Utf8PathBuf::from_path_buf(std::env::temp_dir())
        .unwrap_or_else(|_| camino::Utf8PathBuf::from("/tmp"));
    temp.join(format!("{SOCKET_DIR}-{uid}"))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn default_socket_is_an_absolute_unix_path() {
        let endpoint = default_socket_endpoint();
        let path = endpoint.unix_path().expect("unix endpoint");
        assert!(path.is_absolute());
        assert_eq!(path.file_name(), Some(SOCKET_FILE));
        let parent = path.parent().and_then(|dir| dir.file_name()).expect("socket dir");
        assert!(parent.starts_with(SOCKET_DIR));
    }

    #[test]
    fn temp_fallback_is_keyed_by_uid() {
        let dir = per_user_temp_directory();
        // SAFETY: `getuid` has no preconditions and cannot fail.
        let uid = unsafe { libc::getuid() };
        assert_eq!(dir.file_name(), Some(format!("nime-{uid}").as_str()));
    }
}
