use crate::limiter::ConcurrencyLimiter;
use crate::progress::{FailureCounts, Progress};
use crate::prober::{self, Handshaker, TlsHandshaker};
use crate::types::{ProbeOutcome, ProbeSummary, ResultSet};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_CONCURRENCY: usize = 2000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Knobs for one probing run. `Default` is port 443, 2000 in flight, 1s timeout.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub port: u16,
    pub timeout: Duration,
    pub concurrency: usize,
    pub show_progress: bool,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            show_progress: true,
        }
    }
}

/// Fans out one probe task per candidate behind a [`ConcurrencyLimiter`].
pub struct Scheduler<H> {
    settings: ProbeSettings,
    handshaker: Arc<H>,
}

impl<H: Handshaker> Scheduler<H> {
    pub fn new(settings: ProbeSettings, handshaker: H) -> Self {
        Self {
            settings,
            handshaker: Arc::new(handshaker),
        }
    }

    /// Probe every candidate and return the ranked successes with final counters.
    ///
    /// - A token is taken before each task is spawned, so submission slows down
    ///   to the completion rate once the limiter is full.
    /// - Successful outcomes travel over a channel; the scheduler drops its own
    ///   sender after the launch loop so the channel closes when the last task ends.
    /// - Finished tasks are reaped while launching, so retained task state is
    ///   bounded by the concurrency ceiling rather than the candidate count.
    /// - Per-candidate failures are logged and counted, never returned.
    pub async fn run(&self, candidates: Vec<String>) -> Result<ProbeSummary> {
        let total = candidates.len() as u64;
        let limiter = ConcurrencyLimiter::new(self.settings.concurrency);
        let progress = Arc::new(Progress::new(total, self.settings.show_progress));
        let failures = Arc::new(FailureCounts::default());
        let (tx, mut rx) = mpsc::unbounded_channel::<ProbeOutcome>();
        let mut set = JoinSet::new();
        let mut peak_pending = 0usize;

        info!(
            total,
            port = self.settings.port,
            concurrency = limiter.capacity(),
            timeout_ms = self.settings.timeout.as_millis() as u64,
            "starting probe run"
        );

        for address in candidates {
            while let Some(res) = set.try_join_next() {
                log_join_error(res);
            }
            let token = limiter.acquire().await?;
            let handshaker = self.handshaker.clone();
            let progress = progress.clone();
            let failures = failures.clone();
            let tx = tx.clone();
            let port = self.settings.port;
            let timeout = self.settings.timeout;

            set.spawn(async move {
                let _token = token; // keep the slot until the task completes

                match prober::probe(&*handshaker, &address, port, timeout).await {
                    Ok(latency_ms) => {
                        debug!(%address, latency_ms, "handshake ok");
                        let sent = tx.send(ProbeOutcome::new(address, latency_ms)).is_ok();
                        progress.record(sent);
                    }
                    Err(e) => {
                        debug!(%address, error = %e, "probe failed");
                        failures.record(e.kind());
                        progress.record(false);
                    }
                }
            });
            peak_pending = peak_pending.max(set.len());
        }
        drop(tx);

        let mut outcomes = Vec::new();
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }

        while let Some(res) = set.join_next().await {
            log_join_error(res);
        }

        let results = ResultSet::ranked(outcomes);
        let summary = ProbeSummary {
            total,
            completed: progress.completed(),
            succeeded: progress.succeeded(),
            peak_in_flight: limiter.peak(),
            peak_pending_tasks: peak_pending,
            failures: failures.snapshot(),
            results,
        };
        info!(
            completed = summary.completed,
            succeeded = summary.succeeded,
            peak_in_flight = summary.peak_in_flight,
            "probe run finished"
        );
        Ok(summary)
    }
}

fn log_join_error(res: Result<(), JoinError>) {
    if let Err(e) = res {
        warn!(error = %e, "probe task did not finish cleanly");
    }
}

/// Probe `candidates` with the real TLS client.
pub async fn probe_candidates(
    candidates: Vec<String>,
    settings: ProbeSettings,
) -> Result<ProbeSummary> {
    let scheduler = Scheduler::new(settings, TlsHandshaker::new()?);
    scheduler.run(candidates).await
}
