#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use runnerd::config::SweepConfig;
use runnerd::proc::ProcessTable;
use runnerd::server::Server;

pub use runnerd_test_utils::{init_tracing, with_timeout};

/// Bind a daemon on an ephemeral loopback port and run it in the background.
///
/// Returns the bound address plus the shared process table so tests can
/// inspect daemon state from outside.
pub async fn spawn_daemon() -> (SocketAddr, Arc<ProcessTable>) {
    spawn_daemon_with_sweep(SweepConfig {
        interval_secs: 3600,
        orphan_ttl_secs: 3600,
    })
    .await
}

/// Same as [`spawn_daemon`] but with explicit sweep settings, for tests that
/// exercise orphan collection.
pub async fn spawn_daemon_with_sweep(sweep: SweepConfig) -> (SocketAddr, Arc<ProcessTable>) {
    let server = Server::bind("127.0.0.1", "0", sweep)
        .await
        .expect("bind daemon on ephemeral port");
    let addr = server.local_addr().expect("local addr");
    let table = server.table();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    (addr, table)
}

/// A minimal line-oriented JSON client for the daemon.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect to daemon");
        let (read, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer,
        }
    }

    /// Send one request line without reading the response.
    pub async fn send(&mut self, request: &serde_json::Value) {
        let mut line = serde_json::to_vec(request).unwrap();
        line.push(b'\n');
        self.writer.write_all(&line).await.expect("send request");
        self.writer.flush().await.expect("flush request");
    }

    /// Read one response line.
    pub async fn read_response(&mut self) -> serde_json::Value {
        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .await
            .expect("read response");
        assert_ne!(n, 0, "daemon closed the connection before responding");
        serde_json::from_str(line.trim_end()).expect("response is valid JSON")
    }

    /// Assert the daemon has dropped this connection: the next read must
    /// return EOF, not another response line.
    pub async fn expect_closed(&mut self) {
        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .await
            .expect("read after teardown");
        assert_eq!(n, 0, "connection still open; daemon sent: {line}");
    }

    /// Send one request and read its single response.
    pub async fn request(&mut self, request: &serde_json::Value) -> serde_json::Value {
        self.send(request).await;
        self.read_response().await
    }

    /// Issue a `run` and return the handle, asserting OK status.
    pub async fn run_ok(&mut self, argv: &[&str], detach: bool) -> u64 {
        let response = self
            .request(&serde_json::json!({ "op": "run", "argv": argv, "detach": detach }))
            .await;
        assert_eq!(response["code"], 0, "run failed: {response}");
        response["handle"].as_u64().expect("run response has handle")
    }

    /// Issue a `wait` and return the full response.
    pub async fn wait(&mut self, handle: u64) -> serde_json::Value {
        self.request(&serde_json::json!({ "op": "wait", "handle": handle }))
            .await
    }
}
