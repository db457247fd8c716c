//! Metrics collection and exposition.
//!
//! # Metrics
//! - `policyd_connections_served_total` (counter): documents delivered in full
//! - `policyd_bytes_sent_total` (counter): policy bytes written
//! - `policyd_connections_abandoned_total` (counter): by `reason`
//! - `policyd_accept_errors_total` (counter): by `kind` (transient, fatal)
//!
//! Updates are no-ops until [`init_metrics`] installs a recorder.

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_served(bytes: usize) {
    counter!("policyd_connections_served_total").increment(1);
    counter!("policyd_bytes_sent_total").increment(bytes as u64);
}

pub fn record_abandoned(reason: &'static str) {
    counter!("policyd_connections_abandoned_total", "reason" => reason).increment(1);
}

pub fn record_accept_error(kind: &'static str) {
    counter!("policyd_accept_errors_total", "kind" => kind).increment(1);
}
