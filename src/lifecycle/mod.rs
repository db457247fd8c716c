//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Resolve config → Load policy → Bind listener
//!
//! Detach (daemon.rs, optional):
//!     fork → parent prints child PID and exits → child serves
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Logged, ignored
//!
//! Shutdown (shutdown.rs):
//!     Flag set → pending accept cancelled → loop exits
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then policy, then listener
//! - A connection already accepted is served before the loop stops

pub mod daemon;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{prepare, Prepared, StartupError};
