//! End-to-end dispatch over a TCP connection.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};
use serde_json::{Value, json};

use nime_config::SocketEndpoint;

use crate::dispatch::{DispatcherOptions, Env, Request, Response, StaticRegistry};
use crate::transport::{ListenerHandle, PipeConnectionHandler, SocketListener};

use super::support::{HealthEvent, RecordingHealthReporter};

/// Reports the env it was handed, so tests can follow session merging.
fn env_echo(request: &Request, env: &mut Env) -> Response {
    Response::success(request.seq_num()).with_field("env", Value::Object(env.clone()))
}

struct DispatchWorld {
    address: SocketAddr,
    reporter: Arc<RecordingHealthReporter>,
    listener: Option<ListenerHandle>,
}

impl DispatchWorld {
    fn start(options: DispatcherOptions) -> Self {
        let reporter = Arc::new(RecordingHealthReporter::default());
        let registry = StaticRegistry::default().with_service("{SVC}", Arc::new(env_echo));
        let handler = PipeConnectionHandler::new(Arc::new(registry), options, reporter.clone());
        let listener =
            SocketListener::bind(&SocketEndpoint::tcp("127.0.0.1", 0)).expect("bind listener");
        let address = listener.local_addr().expect("tcp address");
        let handle = listener.start(Arc::new(handler)).expect("start listener");
        Self {
            address,
            reporter,
            listener: Some(handle),
        }
    }

    /// Sends `input`, half-closes, and collects everything until the daemon
    /// closes its side.
    fn exchange(&self, input: &[u8]) -> Vec<u8> {
        let mut stream = TcpStream::connect(self.address).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("read timeout");
        stream.write_all(input).expect("write input");
        stream.shutdown(Shutdown::Write).expect("half close");
        let mut output = Vec::new();
        stream.read_to_end(&mut output).expect("read replies");
        output
    }

    fn wait_for_event(&self, expected: &HealthEvent) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if self.reporter.events().contains(expected) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }
}

impl Drop for DispatchWorld {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.shutdown();
            let _ = handle.join();
        }
    }
}

#[fixture]
fn world() -> DispatchWorld {
    DispatchWorld::start(DispatcherOptions::default())
}

fn replies(output: &[u8]) -> Vec<Value> {
    serde_json::Deserializer::from_slice(output)
        .into_iter::<Value>()
        .collect::<Result<_, _>>()
        .expect("replies are JSON")
}

#[rstest]
fn ping_is_answered_with_pong(world: DispatchWorld) {
    assert_eq!(world.exchange(b"ping"), b"pong");
}

#[rstest]
fn session_env_accumulates_across_requests(world: DispatchWorld) {
    let output = world.exchange(
        br#"{"id":"{svc}","isConsole":false,"method":"init","seqNum":233}
{"isKeyboardOpen":true,"method":"onActivate","seqNum":0}
quit"#,
    );

    let replies = replies(&output);
    assert_eq!(replies.len(), 2);
    assert_eq!(
        replies[0],
        json!({"success": true, "seqNum": 233, "env": {"id": "{svc}", "isConsole": false}})
    );
    assert_eq!(
        replies[1]["env"],
        json!({"id": "{svc}", "isConsole": false, "isKeyboardOpen": true})
    );
}

#[rstest]
fn unknown_service_is_refused_without_closing(world: DispatchWorld) {
    let output = world.exchange(br#"{"id":"{OTHER}","method":"init","seqNum":4}ping"#);

    let (json, pong) = output.split_at(output.len() - 4);
    assert_eq!(replies(json), [json!({"success": false, "seqNum": 4})]);
    assert_eq!(pong, b"pong");
}

#[rstest]
fn malformed_input_closes_silently(world: DispatchWorld) {
    assert!(world.exchange(b"{\"method\": oops}").is_empty());
}

#[test]
fn oversized_request_closes_connection() {
    let world = DispatchWorld::start(DispatcherOptions {
        max_message_bytes: 32,
    });
    let mut input = br#"{"id":"{SVC}","method":"init","padding":""#.to_vec();
    input.extend(std::iter::repeat_n(b'x', 64));

    assert!(world.exchange(&input).is_empty());
}

#[rstest]
fn connection_lifecycle_is_reported(world: DispatchWorld) {
    world.exchange(br#"{"id":"{SVC}","method":"init","seqNum":1}quit"#);

    assert!(world.wait_for_event(&HealthEvent::ConnectionOpened(1)));
    assert!(world.wait_for_event(&HealthEvent::ConnectionClosed { id: 1, requests: 1 }));
}
