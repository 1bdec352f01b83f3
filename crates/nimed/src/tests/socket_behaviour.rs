//! Listener start-up failures surfaced through the serving lifecycle.

use std::net::TcpListener;
use std::sync::Arc;

use rstest::rstest;

use nime_config::{Config, SocketEndpoint};

use crate::dispatch::StaticRegistry;
use crate::{BootstrapError, StaticConfigLoader, bootstrap_with};

use super::support::{HealthEvent, ManualShutdown, RecordingHealthReporter};

#[rstest]
fn serve_reports_occupied_port() {
    let reserved = TcpListener::bind(("127.0.0.1", 0)).expect("reserve port");
    let port = reserved.local_addr().expect("reserved address").port();
    let loader = StaticConfigLoader::new(Config {
        daemon_socket: SocketEndpoint::tcp("127.0.0.1", port),
        ..Config::default()
    });
    let reporter = Arc::new(RecordingHealthReporter::default());
    let daemon = bootstrap_with(&loader, reporter.clone()).expect("bootstrap should succeed");
    let (shutdown, _trigger) = ManualShutdown::new();

    let error = daemon
        .serve(Arc::new(StaticRegistry::default()), &shutdown)
        .expect_err("port is taken");

    assert!(matches!(error, BootstrapError::Listener { .. }));
    assert!(
        !reporter
            .events()
            .iter()
            .any(|event| matches!(event, HealthEvent::ListenerStarted(_)))
    );
}
