//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, transient/fatal error split)
//!     → connection.rs (connection id, full-drain write)
//!     → close
//! ```
//!
//! # Design Decisions
//! - One connection at a time; no per-client state outlives its write
//! - The listening socket exists before the async runtime does

pub mod connection;
pub mod listener;

pub use connection::{send_document, ConnectionId, WriteError};
pub use listener::{Accept, AsyncListener, Listener, ListenerError};
