//! Resilience subsystem.
//!
//! # Responsibilities
//! - Space out retries of transient accept failures
//!
//! # Design Decisions
//! - Exponential backoff with jitter avoids a hot loop when the OS keeps
//!   refusing (e.g. descriptor exhaustion reported as EAGAIN)

pub mod backoff;

pub use backoff::Backoff;
