//! Outbound connection establishment.
//!
//! Two connectors implement one [`Connector`] interface:
//! - [`plain::PlainConnector`]: TCP dial straight to the destination
//! - [`proxied::ProxiedConnector`]: SOCKS tunnel to the destination first
//!
//! Both feed the raw transport into the same handshake-timeout race and end
//! up holding the same [`Connection`] type. A connector moves through
//! `absent → pending → established`, back to `absent` on any failure or on
//! [`Connector::reset`]. Establishing a second connection always requires an
//! intervening reset.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::base::neterror::NetError;
use crate::socket::proxy::ProxyConfig;
use crate::socket::stream::{BoxedSocket, StreamSocket};
use crate::socket::tls::TlsConfig;

mod handshake;
pub mod plain;
pub mod proxied;

/// Default deadline for the TLS handshake race.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Configuration for one connector instance. Immutable once constructed.
///
/// All fields are pass-through: the connectors do not validate them beyond
/// presence, the collaborators they are handed to do.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Destination host (name or IP literal).
    pub host: String,
    /// Destination port.
    pub port: u16,
    /// Proxy to tunnel through. Ignored by the plain connector, required by
    /// the proxied one.
    pub proxy: Option<ProxyConfig>,
    /// TLS options applied to the handshake.
    pub tls: TlsConfig,
    /// Deadline for the handshake race.
    pub handshake_timeout: Duration,
}

impl ConnectorConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            proxy: None,
            tls: TlsConfig::default(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

/// One live duplex stream produced by a successful `connect()`.
///
/// The owning connector keeps lifecycle control: callers borrow this for
/// read/write I/O, only [`Connector::reset`] releases the underlying socket.
pub struct Connection {
    socket: BoxedSocket,
}

impl Connection {
    pub(crate) fn new<S: StreamSocket>(socket: S) -> Self {
        Self {
            socket: BoxedSocket::new(socket),
        }
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.socket).poll_read(cx, buf)
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.socket).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.socket).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.socket).poll_shutdown(cx)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Lifecycle slot shared by both connector implementations.
///
/// `Pending` is only ever observed after a `connect()` future was dropped
/// mid-flight; a live `connect()` holds `&mut self`, so no second call can
/// overlap it.
#[derive(Debug, Default)]
pub(crate) enum ConnectionState {
    #[default]
    Absent,
    Pending,
    Established(Connection),
}

impl ConnectionState {
    pub(crate) fn connection(&mut self) -> Option<&mut Connection> {
        match self {
            ConnectionState::Established(conn) => Some(conn),
            _ => None,
        }
    }

    pub(crate) fn is_established(&self) -> bool {
        matches!(self, ConnectionState::Established(_))
    }

    pub(crate) fn is_absent(&self) -> bool {
        matches!(self, ConnectionState::Absent)
    }
}

/// Interface shared by [`plain::PlainConnector`] and
/// [`proxied::ProxiedConnector`].
#[async_trait]
pub trait Connector {
    /// Establish the connection.
    ///
    /// Fails immediately with [`NetError::IllegalState`] while a connection
    /// is pending or established, without opening a socket. On any failure
    /// the connector returns to the absent state and may be retried by the
    /// caller; nothing is retried internally.
    async fn connect(&mut self) -> Result<(), NetError>;

    /// Drop any current stream and return to the absent state.
    ///
    /// Idempotent. Safe to call at any time, including before any connect.
    /// Dropping the stream aborts in-flight I/O and releases the socket.
    fn reset(&mut self);

    /// Mutable access to the established stream for I/O, if any.
    fn connection(&mut self) -> Option<&mut Connection>;

    /// True while an established stream is held.
    fn is_established(&self) -> bool;
}
