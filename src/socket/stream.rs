//! Socket abstraction for polymorphic transport handling.
//!
//! This module provides a `StreamSocket` trait that allows uniform handling
//! of the transports a connector may produce: plain TCP, a SOCKS tunnel, and
//! TLS layered over either.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_boring::SslStream;
use tokio_socks::tcp::{Socks4Stream, Socks5Stream};

/// A trait for any socket that supports async read/write operations.
/// Enables TLS wrapping of any transport type (direct TCP or a SOCKS
/// tunnel).
pub trait StreamSocket: AsyncRead + AsyncWrite + Unpin + Send + Sync + fmt::Debug + 'static {}

impl StreamSocket for TcpStream {}

impl<S: StreamSocket> StreamSocket for SslStream<S> {}

// Tunnel sockets returned by the SOCKS collaborator.
impl<S: StreamSocket> StreamSocket for Socks5Stream<S> {}
impl<S: StreamSocket> StreamSocket for Socks4Stream<S> {}

/// A wrapper type for boxed dynamic StreamSocket that is object-safe.
/// Erases the difference between "TLS over TCP" and "TLS over tunnel" so
/// that one connection type can own either.
pub struct BoxedSocket {
    inner: Pin<Box<dyn StreamSocket>>,
}

impl BoxedSocket {
    /// Create a new BoxedSocket from any StreamSocket.
    pub fn new<S: StreamSocket>(socket: S) -> Self {
        Self {
            inner: Box::pin(socket),
        }
    }
}

impl AsyncRead for BoxedSocket {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        self.inner.as_mut().poll_read(cx, buf)
    }
}

impl AsyncWrite for BoxedSocket {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.inner.as_mut().poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        self.inner.as_mut().poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        self.inner.as_mut().poll_shutdown(cx)
    }
}

impl Unpin for BoxedSocket {}

impl std::fmt::Debug for BoxedSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedSocket").finish_non_exhaustive()
    }
}
