use boring::ssl::{SslConnectorBuilder, SslVerifyMode, SslVersion};

use crate::base::neterror::NetError;

/// TLS configuration applied to an outbound handshake.
///
/// Pass-through only: everything here is handed to BoringSSL unchanged and
/// validated by it, not by the connectors.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub min_version: Option<SslVersion>,
    pub max_version: Option<SslVersion>,
    /// Cipher suite configuration string, if overriding the library default.
    pub cipher_list: Option<String>,
    pub alpn_protos: Vec<String>,
    /// Verify the peer certificate chain. Disable only for tests against
    /// self-signed endpoints.
    pub verify_peer: bool,
    /// Send SNI. Suppressed automatically for IP-literal hosts.
    pub sni: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            min_version: Some(SslVersion::TLS1_2),
            max_version: Some(SslVersion::TLS1_3),
            cipher_list: None,
            alpn_protos: Vec::new(),
            verify_peer: true,
            sni: true,
        }
    }
}

impl TlsConfig {
    /// Apply this configuration to an SSL connector builder.
    pub fn apply_to_builder(&self, builder: &mut SslConnectorBuilder) -> Result<(), NetError> {
        if let Some(min) = self.min_version {
            builder.set_min_proto_version(Some(min))?;
        }
        if let Some(max) = self.max_version {
            builder.set_max_proto_version(Some(max))?;
        }

        if let Some(ciphers) = &self.cipher_list {
            builder.set_cipher_list(ciphers)?;
        }

        // ALPN wire format: length-prefixed protocol names.
        if !self.alpn_protos.is_empty() {
            let mut alpn_wire = Vec::new();
            for proto in &self.alpn_protos {
                if proto.len() > 255 {
                    return Err(NetError::Handshake(format!(
                        "ALPN protocol name too long: {} bytes",
                        proto.len()
                    )));
                }
                alpn_wire.push(proto.len() as u8);
                alpn_wire.extend_from_slice(proto.as_bytes());
            }
            builder.set_alpn_protos(&alpn_wire)?;
        }

        builder.set_verify(if self.verify_peer {
            SslVerifyMode::PEER
        } else {
            SslVerifyMode::NONE
        });

        Ok(())
    }

    /// Check if SNI (Server Name Indication) should be set for this host.
    /// Per RFC 6066, SNI MUST NOT be set for raw IP addresses.
    pub fn should_set_sni(host: &str) -> bool {
        host.parse::<std::net::IpAddr>().is_err()
    }
}
