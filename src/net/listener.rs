//! TCP listener implementation.
//!
//! # Responsibilities
//! - Create the listening socket with SO_REUSEADDR and a small backlog
//! - Keep the socket usable across a daemonizing fork
//! - Accept incoming TCP connections
//! - Classify accept errors as transient or fatal
//!
//! # Design Decisions
//! - The socket is built with plain system calls, before the runtime
//!   exists, and handed to Tokio afterwards
//! - SO_REUSEADDR is set before bind so a restart can rebind at once

use std::future::Future;
use std::io;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::os::fd::{AsRawFd, OwnedFd};

use nix::sys::socket::{
    self, sockopt, AddressFamily, Backlog, SockFlag, SockType, SockaddrIn, SockaddrIn6,
};
use thiserror::Error;
use tokio::io::AsyncWrite;
use tokio::net::{TcpListener, TcpStream};

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to create, bind or listen on the socket.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Failed to hand the socket over to the async runtime.
    #[error("failed to register listener: {0}")]
    Register(#[source] io::Error),

    /// Failed to accept connection.
    #[error("failed to accept: {0}")]
    Accept(#[source] io::Error),
}

impl ListenerError {
    /// True for accept failures expected to clear up on retry
    /// (interrupted call, resource temporarily unavailable).
    pub fn is_transient(&self) -> bool {
        match self {
            ListenerError::Accept(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }

    fn bind(address: impl ToString, source: impl Into<io::Error>) -> Self {
        ListenerError::Bind {
            address: address.to_string(),
            source: source.into(),
        }
    }
}

/// A bound, listening socket not yet attached to a runtime.
#[derive(Debug)]
pub struct Listener {
    inner: StdTcpListener,
}

impl Listener {
    /// Bind using the configured address, port and backlog.
    pub fn from_config(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr = config.socket_addr().map_err(|e| {
            ListenerError::bind(
                &config.address,
                io::Error::new(io::ErrorKind::InvalidInput, e),
            )
        })?;
        let backlog = i32::try_from(config.backlog).map_err(|e| {
            ListenerError::bind(addr, io::Error::new(io::ErrorKind::InvalidInput, e))
        })?;
        Self::bind(addr, backlog)
    }

    /// Create a stream socket on `addr` with address reuse and `backlog`.
    pub fn bind(addr: SocketAddr, backlog: i32) -> Result<Self, ListenerError> {
        let family = match addr {
            SocketAddr::V4(_) => AddressFamily::Inet,
            SocketAddr::V6(_) => AddressFamily::Inet6,
        };

        let fd: OwnedFd = socket::socket(family, SockType::Stream, SockFlag::empty(), None)
            .map_err(|e| ListenerError::bind(addr, e))?;

        socket::setsockopt(&fd, sockopt::ReuseAddr, &true)
            .map_err(|e| ListenerError::bind(addr, e))?;

        let bound = match addr {
            SocketAddr::V4(v4) => socket::bind(fd.as_raw_fd(), &SockaddrIn::from(v4)),
            SocketAddr::V6(v6) => socket::bind(fd.as_raw_fd(), &SockaddrIn6::from(v6)),
        };
        bound.map_err(|e| ListenerError::bind(addr, e))?;

        let queue = Backlog::new(backlog).map_err(|e| ListenerError::bind(addr, e))?;
        socket::listen(&fd, queue).map_err(|e| ListenerError::bind(addr, e))?;

        let inner = StdTcpListener::from(fd);
        let local_addr = inner.local_addr().map_err(|e| ListenerError::bind(addr, e))?;

        tracing::info!(address = %local_addr, backlog, "Listener bound");

        Ok(Self { inner })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, io::Error> {
        self.inner.local_addr()
    }

    /// Register the socket with the current Tokio runtime.
    ///
    /// Must be called from within a runtime.
    pub fn into_async(self) -> Result<AsyncListener, ListenerError> {
        self.inner
            .set_nonblocking(true)
            .map_err(ListenerError::Register)?;
        let inner = TcpListener::from_std(self.inner).map_err(ListenerError::Register)?;
        Ok(AsyncListener { inner })
    }
}

/// Source of client connections for the server loop.
///
/// `accept` must be cancel-safe: the loop drops a pending accept when
/// shutdown is requested.
pub trait Accept {
    type Stream: AsyncWrite + Unpin + Send;

    fn accept(
        &self,
    ) -> impl Future<Output = Result<(Self::Stream, SocketAddr), ListenerError>> + Send;

    fn local_addr(&self) -> Result<SocketAddr, io::Error>;
}

impl Accept for AsyncListener {
    type Stream = TcpStream;

    fn accept(
        &self,
    ) -> impl Future<Output = Result<(TcpStream, SocketAddr), ListenerError>> + Send {
        AsyncListener::accept(self)
    }

    fn local_addr(&self) -> Result<SocketAddr, io::Error> {
        AsyncListener::local_addr(self)
    }
}

/// A listening socket driven by the Tokio reactor.
#[derive(Debug)]
pub struct AsyncListener {
    inner: TcpListener,
}

impl AsyncListener {
    /// Wait for the next client.
    ///
    /// Cancel-safe: dropping the future before it completes loses no
    /// connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ListenerError> {
        self.inner.accept().await.map_err(ListenerError::Accept)
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, io::Error> {
        self.inner.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[test]
    fn binds_ephemeral_port() {
        let listener = Listener::bind(loopback(), 5).unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[test]
    fn fails_when_port_is_taken() {
        let taken = StdTcpListener::bind(loopback()).unwrap();
        let addr = taken.local_addr().unwrap();

        let err = Listener::bind(addr, 5).unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
        assert!(err.to_string().contains(&addr.to_string()));
    }

    #[test]
    fn from_config_rejects_bad_address() {
        let config = ListenerConfig {
            address: "example.org".into(),
            port: 843,
            backlog: 5,
        };
        assert!(matches!(
            Listener::from_config(&config),
            Err(ListenerError::Bind { .. })
        ));
    }

    #[test]
    fn transient_accept_errors() {
        let interrupted = ListenerError::Accept(io::ErrorKind::Interrupted.into());
        let would_block = ListenerError::Accept(io::ErrorKind::WouldBlock.into());
        let fatal = ListenerError::Accept(io::Error::from_raw_os_error(nix::libc::EBADF));
        let bind = ListenerError::bind(loopback(), io::Error::from(io::ErrorKind::AddrInUse));

        assert!(interrupted.is_transient());
        assert!(would_block.is_transient());
        assert!(!fatal.is_transient());
        assert!(!bind.is_transient());
    }

    #[tokio::test]
    async fn accepts_after_registration() {
        let listener = Listener::bind(loopback(), 5).unwrap().into_async().unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (_stream, peer) = listener.accept().await.unwrap();
        let client = client.await.unwrap();

        assert_eq!(peer, client.local_addr().unwrap());
    }
}
