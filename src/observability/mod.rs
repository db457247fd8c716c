//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Listener and server loop produce:
//!     → logging.rs (timestamped log lines)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → stdout, stderr when detaching, or the -l log file
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
