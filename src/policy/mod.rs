//! Policy document subsystem.
//!
//! # Data Flow
//! ```text
//! policy file on disk
//!     → store.rs (read once, capped at max_len)
//!     → PolicyDocument (immutable, shared handle)
//!     → server loop (resent in full to every client)
//! ```
//!
//! # Design Decisions
//! - Loaded before the listener is bound; never reloaded
//! - Oversized files are truncated, not rejected
//! - Contents are opaque bytes; nothing is parsed

pub mod store;

pub use store::{PolicyDocument, PolicyError, MAX_POLICY_LEN};
