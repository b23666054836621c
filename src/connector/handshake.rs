//! Shared TLS handshake race.
//!
//! First of {handshake success, handshake error, premature close, timeout}
//! settles the attempt, exactly once. The losing branch is dropped, so a
//! timed-out handshake takes its socket down with it and the timer never
//! outlives the attempt.

use std::io;
use std::time::Duration;

use boring::ssl::{ErrorCode, SslConnector, SslMethod};
use tokio::time;
use tokio_boring::{HandshakeError, SslStream};

use crate::base::neterror::NetError;
use crate::socket::stream::StreamSocket;
use crate::socket::tls::TlsConfig;

/// Upgrade `socket` to TLS against `host`, bounded by `timeout`.
pub(crate) async fn secure_upgrade<S: StreamSocket>(
    socket: S,
    host: &str,
    tls: &TlsConfig,
    timeout: Duration,
) -> Result<SslStream<S>, NetError> {
    let mut builder = SslConnector::builder(SslMethod::tls())?;
    tls.apply_to_builder(&mut builder)?;
    let connector = builder.build();
    let mut config = connector.configure()?;

    if !tls.sni || !TlsConfig::should_set_sni(host) {
        config.set_use_server_name_indication(false);
    }
    if !tls.verify_peer {
        config.set_verify_hostname(false);
    }

    tracing::debug!(host = %host, timeout_ms = timeout.as_millis() as u64, "starting TLS handshake");

    match time::timeout(timeout, tokio_boring::connect(config, host, socket)).await {
        Ok(Ok(stream)) => {
            tracing::debug!(host = %host, "TLS handshake complete");
            Ok(stream)
        }
        Ok(Err(err)) => {
            let err = classify_handshake_error(err);
            tracing::debug!(host = %host, error = %err, "TLS handshake failed");
            Err(err)
        }
        Err(_) => {
            // The elapsed timeout dropped the handshake future, destroying
            // the socket it owned.
            tracing::debug!(host = %host, "TLS handshake timed out");
            Err(NetError::HandshakeTimeout)
        }
    }
}

/// Separate EOF-before-completion from genuine protocol failures.
///
/// A peer that goes away mid-handshake surfaces as an `UnexpectedEof` I/O
/// error, as a syscall error with no underlying I/O error (raw EOF), or as
/// a clean TLS shutdown (`ZERO_RETURN`).
fn classify_handshake_error<S>(err: HandshakeError<S>) -> NetError {
    if let Some(io_err) = err.as_io_error() {
        if io_err.kind() == io::ErrorKind::UnexpectedEof {
            return NetError::PrematureClose;
        }
    } else if matches!(err.code(), Some(ErrorCode::SYSCALL) | Some(ErrorCode::ZERO_RETURN)) {
        return NetError::PrematureClose;
    }
    NetError::Handshake(err.to_string())
}
