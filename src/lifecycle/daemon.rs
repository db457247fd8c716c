//! Detaching from the controlling terminal.
//!
//! The fork happens after the policy is loaded and the listener bound, and
//! before any runtime or worker thread exists; the child inherits both.

use std::fs::OpenOptions;
use std::io;
use std::os::fd::AsRawFd;

use nix::unistd::{dup2, fork, setsid, ForkResult, Pid};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),

    #[error("setsid failed: {0}")]
    Session(#[source] nix::Error),

    #[error("cannot open /dev/null: {0}")]
    DevNull(#[source] io::Error),

    #[error("cannot redirect standard descriptors: {0}")]
    Redirect(#[source] nix::Error),
}

/// Which side of the fork we are on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detached {
    /// The launching process; it should report the child's PID and exit.
    Parent(Pid),
    /// The background process; it carries on serving.
    Child,
}

/// Fork into the background.
///
/// The child starts a new session and points stdin, stdout and stderr at
/// `/dev/null`. Call only while the process is single-threaded.
pub fn detach() -> Result<Detached, DaemonError> {
    // SAFETY: callers run this before starting the Tokio runtime or any
    // other thread, so the child has no locks held by vanished threads.
    match unsafe { fork() }.map_err(DaemonError::Fork)? {
        ForkResult::Parent { child } => Ok(Detached::Parent(child)),
        ForkResult::Child => {
            setsid().map_err(DaemonError::Session)?;
            redirect_stdio()?;
            Ok(Detached::Child)
        }
    }
}

fn redirect_stdio() -> Result<(), DaemonError> {
    let devnull = OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/null")
        .map_err(DaemonError::DevNull)?;

    for target in [
        io::stdin().as_raw_fd(),
        io::stdout().as_raw_fd(),
        io::stderr().as_raw_fd(),
    ] {
        dup2(devnull.as_raw_fd(), target).map_err(DaemonError::Redirect)?;
    }

    Ok(())
}
