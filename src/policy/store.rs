//! Bounded, load-once policy buffer.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

/// Default upper bound on the number of bytes kept from the policy file.
pub const MAX_POLICY_LEN: usize = 65536;

/// Errors raised while loading the policy file.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The file could not be opened (missing, permission denied, ...).
    #[error("cannot open policy file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file was opened but reading it failed.
    #[error("cannot read policy file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The document served verbatim to every client.
///
/// Cloning is cheap: clones share the same immutable buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    bytes: Arc<[u8]>,
}

impl PolicyDocument {
    /// Read `path` in full, keeping at most `max_len` bytes.
    ///
    /// Bytes past `max_len` are dropped without error.
    pub fn load(path: &Path, max_len: usize) -> Result<Self, PolicyError> {
        let file = File::open(path).map_err(|source| PolicyError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut buf = Vec::new();
        let mut reader = file.take(max_len as u64);
        reader
            .read_to_end(&mut buf)
            .map_err(|source| PolicyError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut rest = reader.into_inner();
        let truncated = rest.read(&mut [0u8; 1]).map(|n| n > 0).unwrap_or(false);
        if truncated {
            tracing::debug!(
                path = %path.display(),
                max_len,
                "Policy file exceeds maximum length, truncated"
            );
        }

        tracing::info!(path = %path.display(), bytes = buf.len(), "Policy document loaded");

        Ok(Self::from_bytes(buf))
    }

    /// Wrap an in-memory buffer.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
