use crate::error::ProbeError;
use anyhow::{Context, Result};
use native_tls::Protocol;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{self, Instant};

/// Handshakes slower than this are rejected whatever the caller's timeout is.
pub const LATENCY_CEILING_MS: f64 = 1000.0;

/// Performs the protocol step on top of an established TCP connection.
///
/// The stream is handed over by value; dropping it closes the connection.
pub trait Handshaker: Send + Sync + 'static {
    fn handshake(
        &self,
        host: &str,
        stream: TcpStream,
    ) -> impl Future<Output = Result<(), ProbeError>> + Send;
}

/// TLS client that accepts any certificate and any protocol version from TLS 1.0 up.
///
/// Only handshake viability and latency are measured, never trust.
#[derive(Clone)]
pub struct TlsHandshaker {
    connector: tokio_native_tls::TlsConnector,
}

impl TlsHandshaker {
    pub fn new() -> Result<Self> {
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .min_protocol_version(Some(Protocol::Tlsv10))
            .max_protocol_version(None)
            .build()
            .context("failed to build TLS connector")?;
        Ok(Self {
            connector: connector.into(),
        })
    }
}

impl Handshaker for TlsHandshaker {
    async fn handshake(&self, host: &str, stream: TcpStream) -> Result<(), ProbeError> {
        let tls = self
            .connector
            .connect(host, stream)
            .await
            .map_err(|e| ProbeError::Handshake(Box::new(e)))?;
        drop(tls);
        Ok(())
    }
}

/// Measure connect + handshake latency to `address:port` in milliseconds.
///
/// - Connect is bounded by `timeout`.
/// - The handshake gets its own absolute deadline of `timeout` after connect, so
///   total wall time may exceed `timeout` but neither stage can hang.
/// - A handshake that succeeds above [`LATENCY_CEILING_MS`] counts as a failure.
pub async fn probe<H: Handshaker>(
    handshaker: &H,
    address: &str,
    port: u16,
    timeout: Duration,
) -> Result<f64, ProbeError> {
    let start = Instant::now();
    let host = strip_brackets(address);

    let stream = match time::timeout(timeout, connect(host, port)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(ProbeError::Connect(e)),
        Err(_) => return Err(ProbeError::ConnectTimeout),
    };

    let deadline = Instant::now() + timeout;
    match time::timeout_at(deadline, handshaker.handshake(host, stream)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(e),
        Err(_) => return Err(ProbeError::HandshakeTimeout),
    }

    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    if latency_ms > LATENCY_CEILING_MS {
        return Err(ProbeError::Slow { latency_ms });
    }
    Ok(latency_ms)
}

async fn connect(host: &str, port: u16) -> std::io::Result<TcpStream> {
    match host.parse::<IpAddr>() {
        Ok(ip) => TcpStream::connect(SocketAddr::new(ip, port)).await,
        // Not a literal: let the resolver decide what the string means.
        Err(_) => TcpStream::connect((host, port)).await,
    }
}

fn strip_brackets(address: &str) -> &str {
    address
        .strip_prefix('[')
        .and_then(|a| a.strip_suffix(']'))
        .unwrap_or(address)
}
