//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - Translate termination requests into the shutdown flag
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP is logged and otherwise ignored
//! - SIGPIPE is already ignored by the Rust runtime, so a vanished peer
//!   shows up as a write error

use tokio::signal::unix::{signal, SignalKind};

use crate::lifecycle::Shutdown;

/// Install the handlers and spawn the task that services them.
///
/// Must be called from within a Tokio runtime.
pub fn install(shutdown: Shutdown) -> std::io::Result<()> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(()) = interrupt.recv() => {
                    tracing::info!(signal = "SIGINT", "Shutdown requested");
                    shutdown.trigger();
                }
                Some(()) = terminate.recv() => {
                    tracing::info!(signal = "SIGTERM", "Shutdown requested");
                    shutdown.trigger();
                }
                Some(()) = hangup.recv() => {
                    tracing::info!(signal = "SIGHUP", "Hangup received, ignoring");
                }
                else => break,
            }
        }
    });

    Ok(())
}
