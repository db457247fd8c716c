//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the daemon.
//! All types derive Serde traits for deserialization from config files.

use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::policy::MAX_POLICY_LEN;

/// Port used when neither the config file nor the command line names one.
pub const DEFAULT_PORT: u16 = 843;

/// Root configuration for the policy daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DaemonConfig {
    /// Where the policy document comes from.
    pub policy: PolicyConfig,

    /// Listener configuration (address, port, backlog).
    pub listener: ListenerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Process detachment.
    pub daemon: DetachConfig,
}

/// Policy document source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Path to the policy file. Required, usually given with `-f`.
    pub path: Option<PathBuf>,

    /// Bytes kept from the file; the rest is dropped.
    pub max_len: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_len: MAX_POLICY_LEN,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address to bind (e.g., "0.0.0.0").
    pub address: String,

    /// TCP port.
    pub port: u16,

    /// Pending-connection queue depth handed to listen(2).
    pub backlog: u32,
}

impl ListenerConfig {
    /// Combine address and port into a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        let ip: IpAddr = self.address.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            backlog: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    pub log_level: String,

    /// Append log lines here instead of standard output.
    pub log_file: Option<PathBuf>,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9843".to_string(),
        }
    }
}

/// Daemonizing configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DetachConfig {
    /// Fork into the background once the listener is bound.
    pub detach: bool,
}
