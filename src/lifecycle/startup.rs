//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the policy document
//! - Bind the listener once the document is ready
//! - Roll every setup failure into one error type for `main`
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, exit code 1
//! - The listener is bound last, so nothing is accepted before the
//!   document exists

use thiserror::Error;

use crate::config::validation::ValidationError;
use crate::config::{ConfigError, DaemonConfig};
use crate::lifecycle::daemon::DaemonError;
use crate::net::{Listener, ListenerError};
use crate::observability::logging::LoggingError;
use crate::policy::{PolicyDocument, PolicyError};

/// Anything that stops the daemon before it serves its first client.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Daemon(#[from] DaemonError),

    #[error("cannot start runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("cannot install signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    #[error("invalid metrics address: {0}")]
    MetricsAddress(#[from] std::net::AddrParseError),

    #[error("cannot start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

impl StartupError {
    /// True when the user should be shown the usage line.
    pub fn is_usage(&self) -> bool {
        matches!(self, StartupError::Config(e) if e.is_missing_policy())
    }
}

/// Everything the server loop needs, prepared in order.
#[derive(Debug)]
pub struct Prepared {
    pub document: PolicyDocument,
    pub listener: Listener,
}

/// Load the document, then bind the listener.
pub fn prepare(config: &DaemonConfig) -> Result<Prepared, StartupError> {
    let path = config
        .policy
        .path
        .as_deref()
        .ok_or_else(|| ConfigError::Validation(vec![ValidationError::MissingPolicyPath]))?;

    let document = PolicyDocument::load(path, config.policy.max_len)?;
    let listener = Listener::from_config(&config.listener)?;

    Ok(Prepared { document, listener })
}
