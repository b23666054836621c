//! Direct connector: TCP dial to the destination, then TLS.

use std::io;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::base::neterror::NetError;
use crate::connector::{handshake, Connection, ConnectionState, Connector, ConnectorConfig};

/// Connects straight to `host:port` and upgrades the socket to TLS.
pub struct PlainConnector {
    config: ConnectorConfig,
    state: ConnectionState,
}

impl PlainConnector {
    pub fn new(config: ConnectorConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Absent,
        }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Resolve the destination and dial each address in order; first
    /// success wins.
    async fn dial(&self) -> Result<TcpStream, NetError> {
        let addr_str = format!("{}:{}", self.config.host, self.config.port);
        tracing::debug!(addr = %addr_str, "dialing direct");
        let addrs = tokio::net::lookup_host(&addr_str).await.map_err(NetError::Dial)?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }

        let err = last_err
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses resolved"));
        tracing::debug!(addr = %addr_str, error = %err, "direct dial failed");
        Err(NetError::Dial(err))
    }

    async fn establish(&self) -> Result<Connection, NetError> {
        let stream = self.dial().await?;
        let tls_stream = handshake::secure_upgrade(
            stream,
            &self.config.host,
            &self.config.tls,
            self.config.handshake_timeout,
        )
        .await?;
        Ok(Connection::new(tls_stream))
    }
}

#[async_trait]
impl Connector for PlainConnector {
    async fn connect(&mut self) -> Result<(), NetError> {
        if !self.state.is_absent() {
            return Err(NetError::IllegalState);
        }

        self.state = ConnectionState::Pending;
        match self.establish().await {
            Ok(conn) => {
                self.state = ConnectionState::Established(conn);
                Ok(())
            }
            Err(err) => {
                self.state = ConnectionState::Absent;
                Err(err)
            }
        }
    }

    fn reset(&mut self) {
        self.state = ConnectionState::Absent;
    }

    fn connection(&mut self) -> Option<&mut Connection> {
        self.state.connection()
    }

    fn is_established(&self) -> bool {
        self.state.is_established()
    }
}
