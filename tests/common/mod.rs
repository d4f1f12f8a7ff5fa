#![allow(dead_code)]

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tls_latency_rank::error::ProbeError;
use tls_latency_rank::prober::Handshaker;
use tokio::net::{TcpListener, TcpStream};

/// Stand-in peer: waits a configurable time, then accepts or rejects by host.
pub struct FakeHandshaker {
    delays: Vec<Duration>,
    reject: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeHandshaker {
    pub fn accepting(delay: Duration) -> Self {
        Self::with_delays(vec![delay])
    }

    /// Each call uses the next delay, cycling.
    pub fn with_delays(delays: Vec<Duration>) -> Self {
        Self {
            delays,
            reject: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn rejecting(hosts: &[&str]) -> Self {
        Self {
            delays: vec![Duration::ZERO],
            reject: hosts.iter().map(|h| h.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Handshaker for FakeHandshaker {
    async fn handshake(&self, host: &str, _stream: TcpStream) -> Result<(), ProbeError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delays[n % self.delays.len()]).await;
        if self.reject.contains(host) {
            return Err(ProbeError::Handshake("rejected by fake peer".into()));
        }
        Ok(())
    }
}

/// Listen on 127.0.0.1 and keep every accepted socket open without writing.
pub async fn spawn_silent_listener() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    port
}

/// Listen on 127.0.0.1 and close every accepted socket immediately.
pub async fn spawn_closing_listener() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            drop(stream);
        }
    });
    port
}

/// Listen on 127.0.0.1 and complete a real TLS handshake with a self-signed
/// certificate issued to `unrelated.invalid`.
pub async fn spawn_tls_listener() -> u16 {
    let cert = include_bytes!("../fixtures/self_signed.crt");
    let key = include_bytes!("../fixtures/self_signed.key");
    let identity = native_tls::Identity::from_pkcs8(cert, key).unwrap();
    let acceptor: tokio_native_tls::TlsAcceptor =
        native_tls::TlsAcceptor::new(identity).unwrap().into();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                if let Ok(tls) = acceptor.accept(stream).await {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    drop(tls);
                }
            });
        }
    });
    port
}

pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("tls-latency-rank-{}-{name}", std::process::id()))
}
