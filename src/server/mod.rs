//! Policy server subsystem.
//!
//! ```text
//!            ┌──────────── RUNNING ◀──────────────┐
//!            │                                     │
//!  accept ───┼─▶ ok ─▶ write document ─▶ close ────┘
//!            ├─▶ EINTR/EAGAIN ─▶ flag set? ─ no ───┘
//!            │                        └─ yes ─▶ STOPPED
//!            ├─▶ other error ───────────────────▶ STOPPED (Err)
//!            └─▶ shutdown signal ───────────────▶ STOPPED (Ok)
//! ```

pub mod serve_loop;

pub use serve_loop::{PolicyServer, ServeStats, ServerError};
