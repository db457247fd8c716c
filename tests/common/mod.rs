//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;

use policyd::lifecycle::Shutdown;
use policyd::net::Listener;
use policyd::server::{PolicyServer, ServeStats, ServerError};
use policyd::PolicyDocument;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

pub const CROSS_DOMAIN_POLICY: &[u8] =
    br#"<cross-domain-policy><allow-access-from domain="*"/></cross-domain-policy>"#;

/// Write `contents` to a fresh temporary file.
pub fn policy_file(contents: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}

/// A server running on an ephemeral loopback port.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<ServeStats, ServerError>>,
}

impl RunningServer {
    /// Request shutdown and wait for the loop to return.
    pub async fn stop(self) -> Result<ServeStats, ServerError> {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop")
            .expect("server task panicked")
    }
}

/// Start a policy server for `document` in the background.
pub fn start_server(document: PolicyDocument) -> RunningServer {
    let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), 5)
        .unwrap()
        .into_async()
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = PolicyServer::new(listener, document, shutdown.subscribe());
    let handle = tokio::spawn(server.run());

    RunningServer {
        addr,
        shutdown,
        handle,
    }
}

/// Connect, read until the server closes, return what arrived.
pub async fn fetch(addr: SocketAddr) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut received))
        .await
        .expect("server never closed the connection")
        .unwrap();
    received
}

/// Pick a port that is free right now.
pub fn free_port() -> u16 {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    probe.local_addr().unwrap().port()
}
