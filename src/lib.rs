//! # tunnelnet
//!
//! An async library for establishing outbound TLS connections, either
//! directly or through a SOCKS proxy, with a bounded handshake timeout.
//!
//! `tunnelnet` is a thin composition of two collaborators: a SOCKS dial
//! library (`tokio-socks`) and an async TLS library (`tokio-boring`). Its
//! own contribution is the connection-establishment state machine: dial
//! (optionally via proxy) → upgrade to TLS → await handshake completion or
//! timeout → expose a duplex byte stream, or fail cleanly.
//!
//! ## Features
//!
//! - **Two connectors, one interface**: direct TCP or SOCKS4/SOCKS5 tunnel
//! - **Bounded handshakes**: a 10 second deadline races every handshake
//! - **Single-owner lifecycle**: `absent → pending → established`, with an
//!   explicit reset and a duplicate-connect guard
//! - **Verbatim errors**: collaborator failures surface unwrapped and are
//!   never retried internally
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tunnelnet::connector::plain::PlainConnector;
//! use tunnelnet::connector::{Connector, ConnectorConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ConnectorConfig::new("example.com", 443);
//!     let mut connector = PlainConnector::new(config);
//!     connector.connect().await.unwrap();
//!     let stream = connector.connection().unwrap();
//!     // read/write on `stream`, then:
//!     connector.reset();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Core error definitions
//! - [`connector`] - Connection establishment and lifecycle
//! - [`socket`] - Transport polymorphism, proxy and TLS configuration

pub mod base;
pub mod connector;
pub mod socket;
