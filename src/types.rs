use ::time::{format_description::well_known, OffsetDateTime};
use serde::{Deserialize, Serialize};

/// One successful handshake measurement for a candidate address.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub address: String,
    pub latency_ms: f64,
    pub measured_at: String,
}

impl ProbeOutcome {
    pub fn new(address: String, latency_ms: f64) -> Self {
        Self {
            address,
            latency_ms,
            measured_at: now_rfc3339(),
        }
    }
}

/// Successful outcomes ordered by ascending latency.
///
/// Only [`ResultSet::ranked`] builds one, so the ordering always holds.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct ResultSet(Vec<ProbeOutcome>);

impl ResultSet {
    /// Stable sort by latency; equal latencies keep their arrival order.
    pub fn ranked(mut outcomes: Vec<ProbeOutcome>) -> Self {
        outcomes.sort_by(|a, b| a.latency_ms.total_cmp(&b.latency_ms));
        Self(outcomes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProbeOutcome> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ProbeOutcome] {
        &self.0
    }

    /// The `n` fastest outcomes, or all of them if there are fewer.
    pub fn top(&self, n: usize) -> &[ProbeOutcome] {
        &self.0[..n.min(self.0.len())]
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ProbeOutcome;
    type IntoIter = std::slice::Iter<'a, ProbeOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Failed candidates grouped by the stage that rejected them.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureBreakdown {
    pub connect: u64,
    pub handshake: u64,
    pub slow: u64,
}

impl FailureBreakdown {
    pub fn total(&self) -> u64 {
        self.connect + self.handshake + self.slow
    }
}

/// Everything one probing run produced: final counters plus the ranked results.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ProbeSummary {
    pub total: u64,
    pub completed: u64,
    pub succeeded: u64,
    pub peak_in_flight: usize,
    /// Most spawned tasks not yet reaped at any point during the launch loop.
    pub peak_pending_tasks: usize,
    pub failures: FailureBreakdown,
    pub results: ResultSet,
}

fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
