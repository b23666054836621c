//! Socket-layer types shared by the connectors.
//!
//! - [`stream`]: transport polymorphism (TCP, SOCKS tunnel, TLS over either)
//! - [`proxy`]: SOCKS proxy configuration
//! - [`tls`]: TLS configuration applied onto BoringSSL

pub mod proxy;
pub mod stream;
pub mod tls;
