//! Proxied connector: SOCKS tunnel to the destination, then TLS.

use async_trait::async_trait;
use tokio_socks::tcp::{Socks4Stream, Socks5Stream};

use crate::base::neterror::NetError;
use crate::connector::{handshake, Connection, ConnectionState, Connector, ConnectorConfig};
use crate::socket::proxy::SocksVersion;

/// Tunnels through the configured SOCKS proxy to `host:port`, then upgrades
/// the tunnel to TLS.
///
/// The tunnel dial carries no timeout of its own; the proxy collaborator's
/// error and timeout behavior applies and its failures surface untouched.
/// The handshake deadline only starts once the tunnel exists.
pub struct ProxiedConnector {
    config: ConnectorConfig,
    state: ConnectionState,
}

impl ProxiedConnector {
    pub fn new(config: ConnectorConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Absent,
        }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    async fn establish(&self) -> Result<Connection, NetError> {
        let proxy = self.config.proxy.as_ref().ok_or(NetError::ProxyRequired)?;
        let dest = (self.config.host.as_str(), self.config.port);

        tracing::debug!(
            proxy_host = %proxy.host,
            proxy_port = proxy.port,
            host = %self.config.host,
            port = self.config.port,
            "dialing through SOCKS proxy"
        );

        match proxy.version {
            SocksVersion::V5 => {
                let tunnel = match proxy.socks5_auth() {
                    Some((user, pass)) => {
                        Socks5Stream::connect_with_password(proxy.host_port(), dest, user, pass)
                            .await?
                    }
                    None => Socks5Stream::connect(proxy.host_port(), dest).await?,
                };
                let tls_stream = handshake::secure_upgrade(
                    tunnel,
                    &self.config.host,
                    &self.config.tls,
                    self.config.handshake_timeout,
                )
                .await?;
                Ok(Connection::new(tls_stream))
            }
            SocksVersion::V4 => {
                let tunnel = match &proxy.username {
                    Some(user) => {
                        Socks4Stream::connect_with_userid(proxy.host_port(), dest, user).await?
                    }
                    None => Socks4Stream::connect(proxy.host_port(), dest).await?,
                };
                let tls_stream = handshake::secure_upgrade(
                    tunnel,
                    &self.config.host,
                    &self.config.tls,
                    self.config.handshake_timeout,
                )
                .await?;
                Ok(Connection::new(tls_stream))
            }
        }
    }
}

#[async_trait]
impl Connector for ProxiedConnector {
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
