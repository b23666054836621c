use url::Url;
use zeroize::Zeroizing;

/// SOCKS protocol version spoken to the proxy.
///
/// Opaque to the connectors; dispatched to the proxy-dial collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocksVersion {
    /// SOCKS4 (user-id only, no password authentication)
    V4,
    /// SOCKS5 (optional username/password authentication)
    V5,
}

/// Proxy configuration for tunneled connections.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Proxy host (name or IP literal).
    pub host: String,
    /// Proxy port.
    pub port: u16,
    /// Username for authentication (SOCKS5) or user-id (SOCKS4).
    pub username: Option<String>,
    /// Password for SOCKS5 authentication (zeroized on drop).
    pub password: Option<Zeroizing<String>>,
    /// Protocol version.
    pub version: SocksVersion,
}

impl ProxyConfig {
    /// Create a SOCKS5 proxy config for `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
            version: SocksVersion::V5,
        }
    }

    /// Create proxy config from a URL string.
    ///
    /// Accepts `socks5://`, `socks5h://`, `socks4://` and `socks4a://`
    /// schemes. Credentials embedded in the URL are picked up.
    pub fn from_url(url_str: &str) -> Option<Self> {
        let url = Url::parse(url_str).ok()?;
        let version = match url.scheme() {
            "socks5" | "socks5h" => SocksVersion::V5,
            "socks4" | "socks4a" => SocksVersion::V4,
            _ => return None,
        };

        let host = url.host_str()?.to_string();
        let port = url.port().unwrap_or(1080);

        let username = match url.username() {
            "" => None,
            user => Some(user.to_string()),
        };
        let password = url.password().map(|p| Zeroizing::new(p.to_string()));

        Some(Self {
            host,
            port,
            username,
            password,
            version,
        })
    }

    /// Add authentication credentials.
    pub fn with_auth(mut self, user: &str, pass: &str) -> Self {
        self.username = Some(user.to_string());
        self.password = Some(Zeroizing::new(pass.to_string()));
        self
    }

    /// Select the protocol version.
    pub fn with_version(mut self, version: SocksVersion) -> Self {
        self.version = version;
        self
    }

    /// Get proxy host and port as a dial target.
    pub fn host_port(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }

    /// Get username/password for SOCKS5 authentication.
    pub fn socks5_auth(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }

    /// Check if this proxy carries credentials.
    pub fn requires_auth(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

/// Builder for ProxyConfig.
#[derive(Default)]
pub struct ProxyBuilder {
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    version: Option<SocksVersion>,
}

impl ProxyBuilder {
    /// Create new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set proxy address.
    pub fn address(mut self, host: &str, port: u16) -> Self {
        self.host = Some(host.to_string());
        self.port = Some(port);
        self
    }

    /// Set SOCKS5 as the protocol version.
    pub fn socks5(mut self) -> Self {
        self.version = Some(SocksVersion::V5);
        self
    }

    /// Set SOCKS4 as the protocol version.
    pub fn socks4(mut self) -> Self {
        self.version = Some(SocksVersion::V4);
        self
    }

    /// Set authentication.
    pub fn auth(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    /// Build ProxyConfig. Returns None if no address was set.
    pub fn build(self) -> Option<ProxyConfig> {
        Some(ProxyConfig {
            host: self.host?,
            port: self.port?,
            username: self.username,
            password: self.password.map(Zeroizing::new),
            version: self.version.unwrap_or(SocksVersion::V5),
        })
    }
}
