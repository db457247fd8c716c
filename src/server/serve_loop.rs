//! The accept → write → close loop.
//!
//! # Responsibilities
//! - Accept one client at a time
//! - Deliver the whole policy document, then close
//! - Retry transient accept errors, stop on fatal ones
//! - Stop accepting once shutdown is requested
//!
//! # Design Decisions
//! - A pending accept is cancelled by the shutdown notification; a
//!   connection already accepted is always served to the end
//! - Per-connection failures are logged and contained
//! - Connections come through the `Accept` trait so the error paths can be
//!   driven without a real socket

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::lifecycle::ShutdownSignal;
use crate::net::{send_document, Accept, AsyncListener, ConnectionId, ListenerError};
use crate::observability::metrics;
use crate::policy::PolicyDocument;
use crate::resilience::Backoff;

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Errors that end the loop abnormally.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("accept failed, no longer serving: {0}")]
    FatalAccept(#[source] ListenerError),
}

/// Connection counts accumulated over the loop's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    /// Clients that received the whole document.
    pub served: u64,
    /// Clients dropped after a write error or zero-byte write.
    pub abandoned: u64,
}

/// Serves one policy document to every client, sequentially.
pub struct PolicyServer<L = AsyncListener> {
    listener: L,
    document: PolicyDocument,
    shutdown: ShutdownSignal,
    stats: ServeStats,
    backoff: Backoff,
}

impl<L: Accept> PolicyServer<L> {
    pub fn new(listener: L, document: PolicyDocument, shutdown: ShutdownSignal) -> Self {
        Self {
            listener,
            document,
            shutdown,
            stats: ServeStats::default(),
            backoff: Backoff::new(ACCEPT_BACKOFF_BASE, ACCEPT_BACKOFF_MAX),
        }
    }

    /// Run until shutdown or a fatal accept error.
    ///
    /// `Ok` means the shutdown flag stopped the loop. The listening socket
    /// is closed when this returns.
    pub async fn run(mut self) -> Result<ServeStats, ServerError> {
        tracing::info!(
            address = ?self.listener.local_addr().ok(),
            policy_bytes = self.document.len(),
            "Serving policy"
        );

        loop {
            if self.shutdown.is_triggered() {
                break;
            }

            let accepted = tokio::select! {
                biased;
                _ = self.shutdown.recv() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    self.backoff.reset();
                    self.serve(stream, peer).await;
                }
                Err(e) if e.is_transient() => {
                    metrics::record_accept_error("transient");
                    if self.shutdown.is_triggered() {
                        break;
                    }
                    let delay = self.backoff.next_delay();
                    tracing::warn!(
                        error = %e,
                        attempt = self.backoff.attempt(),
                        delay = ?delay,
                        "Transient accept error, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = self.shutdown.recv() => {}
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    metrics::record_accept_error("fatal");
                    tracing::error!(
                        error = %e,
                        served = self.stats.served,
                        abandoned = self.stats.abandoned,
                        "Accept failed, stopping"
                    );
                    return Err(ServerError::FatalAccept(e));
                }
            }
        }

        tracing::info!(
            served = self.stats.served,
            abandoned = self.stats.abandoned,
            "Shutdown flag observed, no longer accepting"
        );
        Ok(self.stats)
    }

    async fn serve(&mut self, mut stream: L::Stream, peer: SocketAddr) {
        let id = ConnectionId::new();
        tracing::info!(
            connection_id = %id,
            client = %peer.ip(),
            port = peer.port(),
            "Client connected"
        );

        match send_document(&mut stream, self.document.bytes()).await {
            Ok(sent) => {
                self.stats.served += 1;
                metrics::record_served(sent);
                tracing::debug!(connection_id = %id, bytes = sent, "Policy sent");
            }
            Err(e) => {
                self.stats.abandoned += 1;
                metrics::record_abandoned(e.reason());
                tracing::warn!(
                    connection_id = %id,
                    client = %peer.ip(),
                    bytes_sent = e.bytes_sent(),
                    error = %e,
                    "Abandoning connection"
                );
            }
        }

        // The socket is closed on drop whatever happened above.
        if let Err(e) = stream.shutdown().await {
            tracing::trace!(connection_id = %id, error = %e, "Shutdown after write failed");
        }
    }
}
