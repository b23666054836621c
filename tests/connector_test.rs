//! Connector state machine and handshake race tests.
//!
//! Covers:
//! - `PlainConnector` happy path, duplicate-connect guard, reset
//! - `ProxiedConnector` through a local SOCKS5 CONNECT server
//! - Handshake timeout, premature close, proxy dial failure

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use boring::asn1::Asn1Time;
use boring::bn::BigNum;
use boring::hash::MessageDigest;
use boring::pkey::{PKey, Private};
use boring::rsa::Rsa;
use boring::ssl::{SslAcceptor, SslMethod};
use boring::x509::{X509NameBuilder, X509};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tunnelnet::base::neterror::NetError;
use tunnelnet::connector::plain::PlainConnector;
use tunnelnet::connector::proxied::ProxiedConnector;
use tunnelnet::connector::{Connector, ConnectorConfig, DEFAULT_HANDSHAKE_TIMEOUT};
use tunnelnet::socket::proxy::ProxyConfig;
use tunnelnet::socket::tls::TlsConfig;

fn self_signed_identity() -> (X509, PKey<Private>) {
    let rsa = Rsa::generate(2048).unwrap();
    let key = PKey::from_rsa(rsa).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "localhost").unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::days_from_now(1).unwrap()).unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    (builder.build(), key)
}

/// TLS echo server on an ephemeral loopback port. Returns the address and a
/// counter of accepted TCP connections.
async fn spawn_tls_echo_server() -> (SocketAddr, Arc<AtomicUsize>) {
    let (cert, key) = self_signed_identity();
    let mut builder = SslAcceptor::mozilla_intermediate(SslMethod::tls()).unwrap();
    builder.set_private_key(&key).unwrap();
    builder.set_certificate(&cert).unwrap();
    builder.check_private_key().unwrap();
    let acceptor = builder.build();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                let Ok(mut tls) = tokio_boring::accept(&acceptor, stream).await else {
                    return;
                };
                let mut buf = [0u8; 1024];
                loop {
                    match tls.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if tls.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    (addr, accepted)
}

/// Server that accepts TCP and reads the ClientHello but never answers it.
async fn spawn_silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
            });
        }
    });
    addr
}

/// Server that accepts TCP, drains the first flight and closes gracefully.
async fn spawn_closing_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
            });
        }
    });
    addr
}

async fn handle_socks5(mut client: TcpStream) -> std::io::Result<()> {
    // Method negotiation: offer comes in, no-auth goes out.
    let mut head = [0u8; 2];
    client.read_exact(&mut head).await?;
    let mut methods = vec![0u8; head[1] as usize];
    client.read_exact(&mut methods).await?;
    client.write_all(&[0x05, 0x00]).await?;

    // CONNECT request: VER CMD RSV ATYP.
    let mut req = [0u8; 4];
    client.read_exact(&mut req).await?;
    let dest = match req[3] {
        0x01 => {
            let mut addr = [0u8; 4];
            client.read_exact(&mut addr).await?;
            let mut port = [0u8; 2];
            client.read_exact(&mut port).await?;
            format!(
                "{}.{}.{}.{}:{}",
                addr[0],
                addr[1],
                addr[2],
                addr[3],
                u16::from_be_bytes(port)
            )
        }
        0x03 => {
            let mut len = [0u8; 1];
            client.read_exact(&mut len).await?;
            let mut name = vec![0u8; len[0] as usize];
            client.read_exact(&mut name).await?;
            let mut port = [0u8; 2];
            client.read_exact(&mut port).await?;
            format!(
                "{}:{}",
                String::from_utf8_lossy(&name),
                u16::from_be_bytes(port)
            )
        }
        _ => return Ok(()),
    };

    let mut upstream = TcpStream::connect(&dest).await?;
    client
        .write_all(&[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0])
        .await?;
    let _ = tokio::io::copy_bidirectional(&mut client, &mut upstream).await;
    Ok(())
}

/// Minimal SOCKS5 CONNECT server (no-auth) on an ephemeral loopback port.
async fn spawn_socks5_proxy() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((client, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let _ = handle_socks5(client).await;
            });
        }
    });
    addr
}

fn insecure_tls() -> TlsConfig {
    TlsConfig {
        verify_peer: false,
        ..TlsConfig::default()
    }
}

/// Port with nothing listening on it.
async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[test]
fn test_default_handshake_deadline() {
    assert_eq!(DEFAULT_HANDSHAKE_TIMEOUT, Duration::from_millis(10_000));
    let config = ConnectorConfig::new("example.com", 443);
    assert_eq!(config.handshake_timeout, DEFAULT_HANDSHAKE_TIMEOUT);
}

#[tokio::test]
async fn test_reset_is_idempotent_without_connection() {
    let mut plain = PlainConnector::new(ConnectorConfig::new("example.com", 443));
    plain.reset();
    plain.reset();
    assert!(!plain.is_established());
    assert!(plain.connection().is_none());

    let mut proxied = ProxiedConnector::new(
        ConnectorConfig::new("example.com", 443).with_proxy(ProxyConfig::new("127.0.0.1", 1080)),
    );
    proxied.reset();
    proxied.reset();
    assert!(!proxied.is_established());
    assert!(proxied.connection().is_none());
}

#[tokio::test]
async fn test_plain_connect_establishes_duplex_stream() {
    let (addr, accepted) = spawn_tls_echo_server().await;

    let config = ConnectorConfig::new(addr.ip().to_string(), addr.port()).with_tls(insecure_tls());
    let mut connector = PlainConnector::new(config);

    connector.connect().await.unwrap();
    assert!(connector.is_established());
    assert_eq!(accepted.load(Ordering::SeqCst), 1);

    let stream = connector.connection().unwrap();
    stream.write_all(b"ping").await.unwrap();
    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");
}

#[tokio::test]
async fn test_connect_twice_without_reset_is_illegal() {
    let (addr, accepted) = spawn_tls_echo_server().await;

    let config = ConnectorConfig::new(addr.ip().to_string(), addr.port()).with_tls(insecure_tls());
    let mut connector = PlainConnector::new(config);

    connector.connect().await.unwrap();
    let err = connector.connect().await.unwrap_err();
    assert!(matches!(err, NetError::IllegalState));

    // The guard fired before any dial: still exactly one accepted socket.
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    assert!(connector.is_established());
}

#[tokio::test]
async fn test_reset_allows_reconnect() {
    let (addr, accepted) = spawn_tls_echo_server().await;

    let config = ConnectorConfig::new(addr.ip().to_string(), addr.port()).with_tls(insecure_tls());
    let mut connector = PlainConnector::new(config);

    connector.connect().await.unwrap();
    connector.reset();
    assert!(!connector.is_established());

    connector.connect().await.unwrap();
    assert!(connector.is_established());
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_handshake_timeout_destroys_stream_and_recovers() {
    let addr = spawn_silent_server().await;

    let config = ConnectorConfig::new(addr.ip().to_string(), addr.port())
        .with_tls(insecure_tls())
        .with_handshake_timeout(Duration::from_millis(200));
    let mut connector = PlainConnector::new(config);

    let started = Instant::now();
    let err = connector.connect().await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, NetError::HandshakeTimeout), "got {err:?}");
    assert!(elapsed >= Duration::from_millis(150), "returned too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "deadline not enforced: {elapsed:?}");
    assert!(!connector.is_established());

    // Back to absent: the next attempt runs (and times out again) instead
    // of reporting IllegalState.
    let err = connector.connect().await.unwrap_err();
    assert!(matches!(err, NetError::HandshakeTimeout), "got {err:?}");
}

#[tokio::test]
async fn test_close_before_handshake_is_premature_close() {
    let addr = spawn_closing_server().await;

    let config = ConnectorConfig::new(addr.ip().to_string(), addr.port()).with_tls(insecure_tls());
    let mut connector = PlainConnector::new(config);

    let err = connector.connect().await.unwrap_err();
    assert!(matches!(err, NetError::PrematureClose), "got {err:?}");
    assert!(!connector.is_established());
}

#[tokio::test]
async fn test_dial_refused_surfaces_io_error() {
    let port = unused_port().await;

    let config = ConnectorConfig::new("127.0.0.1", port).with_tls(insecure_tls());
    let mut connector = PlainConnector::new(config);

    let err = connector.connect().await.unwrap_err();
    assert!(matches!(err, NetError::Dial(_)), "got {err:?}");
    assert!(err.is_dial_error());
    assert!(!connector.is_established());
}

#[tokio::test]
async fn test_proxied_connect_through_socks5() {
    let (dest, accepted) = spawn_tls_echo_server().await;
    let proxy_addr = spawn_socks5_proxy().await;

    let config = ConnectorConfig::new(dest.ip().to_string(), dest.port())
        .with_tls(insecure_tls())
        .with_proxy(ProxyConfig::new(proxy_addr.ip().to_string(), proxy_addr.port()));
    let mut connector = ProxiedConnector::new(config);

    connector.connect().await.unwrap();
    assert!(connector.is_established());
    assert_eq!(accepted.load(Ordering::SeqCst), 1);

    let stream = connector.connection().unwrap();
    stream.write_all(b"tunneled").await.unwrap();
    let mut buf = [0u8; 8];
    stream.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"tunneled");

    connector.reset();
    assert!(!connector.is_established());
    assert!(connector.connection().is_none());
}

#[tokio::test]
async fn test_proxy_dial_failure_propagates_immediately() {
    let port = unused_port().await;

    let config = ConnectorConfig::new("example.com", 443)
        .with_tls(insecure_tls())
        .with_proxy(ProxyConfig::new("127.0.0.1", port));
    let mut connector = ProxiedConnector::new(config);

    let started = Instant::now();
    let err = connector.connect().await.unwrap_err();

    assert!(matches!(err, NetError::Proxy(_)), "got {err:?}");
    assert!(err.is_dial_error());
    // The handshake deadline never started: the failure arrives well under it.
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!connector.is_established());
}

#[tokio::test]
async fn test_proxied_connector_requires_proxy_config() {
    let mut connector = ProxiedConnector::new(ConnectorConfig::new("example.com", 443));
    let err = connector.connect().await.unwrap_err();
    assert!(matches!(err, NetError::ProxyRequired), "got {err:?}");
}
