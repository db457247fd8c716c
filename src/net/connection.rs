//! Per-connection identity and the full-drain write helper.
//!
//! # Responsibilities
//! - Generate unique connection IDs for log correlation
//! - Push a whole buffer through a writer despite short writes
//! - Tell retryable interruptions apart from real failures

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Interrupted writes tolerated per document before giving up.
pub const MAX_INTERRUPTED_WRITES: u32 = 8;

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Why a document could not be delivered in full.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The writer reported an error.
    #[error("write failed after {sent} bytes: {source}")]
    Io {
        sent: usize,
        #[source]
        source: io::Error,
    },

    /// The writer accepted nothing while bytes were still pending.
    #[error("wrote 0 bytes after {sent} of {total}")]
    ZeroWrite { sent: usize, total: usize },
}

impl WriteError {
    /// Bytes delivered before the failure.
    pub fn bytes_sent(&self) -> usize {
        match self {
            WriteError::Io { sent, .. } | WriteError::ZeroWrite { sent, .. } => *sent,
        }
    }

    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            WriteError::Io { .. } => "io",
            WriteError::ZeroWrite { .. } => "zero_write",
        }
    }
}

/// Write all of `document` to `writer`, returning the number of bytes sent.
///
/// Short writes continue with the unsent suffix. A zero-byte write aborts
/// rather than spinning. Interrupted writes are retried up to
/// [`MAX_INTERRUPTED_WRITES`] times.
pub async fn send_document<W>(writer: &mut W, document: &[u8]) -> Result<usize, WriteError>
where
    W: AsyncWrite + Unpin,
{
    let total = document.len();
    let mut sent = 0;
    let mut interrupted = 0;

    while sent < total {
        match writer.write(&document[sent..]).await {
            Ok(0) => return Err(WriteError::ZeroWrite { sent, total }),
            Ok(n) => sent += n,
            Err(e)
                if e.kind() == io::ErrorKind::Interrupted && interrupted < MAX_INTERRUPTED_WRITES =>
            {
                interrupted += 1;
                tracing::trace!(sent, interrupted, "Write interrupted, retrying");
            }
            Err(source) => return Err(WriteError::Io { sent, source }),
        }
    }

    writer
        .flush()
        .await
        .map_err(|source| WriteError::Io { sent, source })?;

    Ok(sent)
}
