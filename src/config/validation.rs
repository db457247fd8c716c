//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that a policy path was supplied
//! - Validate value ranges (port non-zero, backlog and max_len positive)
//! - Check that addresses parse
//! - Check that the backlog is one `listen` accepts
//! - Check that the log level is a usable filter
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DaemonConfig → Result<(), Vec<ValidationError>>
//! - Runs after command-line overrides are applied

use std::net::SocketAddr;

use nix::sys::socket::Backlog;
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::schema::DaemonConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required policy file argument -f")]
    MissingPolicyPath,

    #[error("policy max_len must be greater than zero")]
    ZeroMaxLen,

    #[error("invalid port 0")]
    ZeroPort,

    #[error("invalid listen address {0:?}")]
    InvalidListenAddress(String),

    #[error("invalid backlog {0}, must be between 1 and the system limit (SOMAXCONN)")]
    InvalidBacklog(u32),

    #[error("invalid log level {0:?}")]
    InvalidLogLevel(String),

    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),
}

/// Check `config` for every semantic error.
pub fn validate_config(config: &DaemonConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.policy.path.is_none() {
        errors.push(ValidationError::MissingPolicyPath);
    }
    if config.policy.max_len == 0 {
        errors.push(ValidationError::ZeroMaxLen);
    }

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if config.listener.socket_addr().is_err() {
        errors.push(ValidationError::InvalidListenAddress(config.listener.address.clone()));
    }
    if !valid_backlog(config.listener.backlog) {
        errors.push(ValidationError::InvalidBacklog(config.listener.backlog));
    }

    let obs = &config.observability;
    if !valid_log_level(&obs.log_level) {
        errors.push(ValidationError::InvalidLogLevel(obs.log_level.clone()));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(obs.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn valid_backlog(backlog: u32) -> bool {
    backlog > 0
        && i32::try_from(backlog)
            .ok()
            .and_then(|b| Backlog::new(b).ok())
            .is_some()
}

/// A level, or `EnvFilter` directives. Every directive must name a level, so
/// a misspelt level is not taken for a target. Span directives are left to
/// `EnvFilter`.
fn valid_log_level(level: &str) -> bool {
    EnvFilter::try_new(level).is_ok()
        && level
            .split(',')
            .filter(|directive| !directive.contains('['))
            .all(|directive| {
                let level = directive.rsplit_once('=').map_or(directive, |(_, level)| level);
                level.trim().parse::<LevelFilter>().is_ok()
            })
}
