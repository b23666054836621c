use std::io;

use thiserror::Error;

/// Errors surfaced by a single connection attempt.
///
/// Every failure is scoped to the attempt that produced it: after any error
/// the owning connector is back in the absent state and `connect()` may be
/// called again. Nothing here is retried internally.
#[derive(Debug, Error)]
pub enum NetError {
    /// `connect()` was called while a connection is already pending or
    /// established. No socket was opened and no timer was armed.
    #[error("still connected")]
    IllegalState,

    /// Name resolution or the direct TCP dial failed.
    #[error("dial failed")]
    Dial(#[source] io::Error),

    /// The SOCKS tunnel could not be established. Carries the proxy
    /// collaborator's error untouched.
    #[error("SOCKS tunnel failed")]
    Proxy(#[source] tokio_socks::Error),

    /// A proxied connector was built from a config with no proxy section.
    #[error("proxy required")]
    ProxyRequired,

    /// BoringSSL rejected the TLS configuration before any I/O happened.
    #[error("TLS configuration rejected")]
    Ssl(#[from] boring::error::ErrorStack),

    /// The TLS layer signaled a handshake failure.
    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    /// The transport reached EOF before the handshake completed.
    #[error("stream closed before TLS handshake")]
    PrematureClose,

    /// The handshake deadline elapsed. The underlying stream has already
    /// been destroyed by the time this error is observed.
    #[error("TLS handshake timeout")]
    HandshakeTimeout,
}

impl NetError {
    /// True for failures originating in the dial phase (direct or proxied),
    /// before any handshake timer was armed.
    pub fn is_dial_error(&self) -> bool {
        matches!(self, NetError::Dial(_) | NetError::Proxy(_) | NetError::ProxyRequired)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, NetError::HandshakeTimeout)
    }
}

impl From<tokio_socks::Error> for NetError {
    fn from(err: tokio_socks::Error) -> Self {
        NetError::Proxy(err)
    }
}
