use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a single candidate did not produce an outcome.
///
/// These never reach the operator individually; the scheduler logs them at
/// debug level and tallies them by [`FailureKind`].
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),
    #[error("connect timed out")]
    ConnectTimeout,
    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("TLS handshake did not finish before the deadline")]
    HandshakeTimeout,
    #[error("handshake completed in {latency_ms:.1}ms, above the latency ceiling")]
    Slow { latency_ms: f64 },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Connect,
    Handshake,
    Slow,
}

impl ProbeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ProbeError::Connect(_) | ProbeError::ConnectTimeout => FailureKind::Connect,
            ProbeError::Handshake(_) | ProbeError::HandshakeTimeout => FailureKind::Handshake,
            ProbeError::Slow { .. } => FailureKind::Slow,
        }
    }
}
