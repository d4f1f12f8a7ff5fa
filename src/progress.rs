use crate::error::FailureKind;
use crate::types::FailureBreakdown;
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Minimum wall-clock gap between two printed status lines.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Run-wide counters shared by every probe task.
#[derive(Debug)]
pub struct Progress {
    total: u64,
    completed: AtomicU64,
    succeeded: AtomicU64,
    throttle: Mutex<Throttle>,
    enabled: bool,
}

#[derive(Debug)]
struct Throttle {
    last_at: Instant,
    last_completed: u64,
}

/// One rendered rolling status line.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub percent: f64,
    pub completed: u64,
    pub total: u64,
    pub succeeded: u64,
    pub rate: f64,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "progress: {:.1}% ({}/{}) available: {} rate: {:.1} IP/s",
            self.percent, self.completed, self.total, self.succeeded, self.rate
        )
    }
}

impl Progress {
    pub fn new(total: u64, enabled: bool) -> Self {
        Self::started_at(total, enabled, Instant::now())
    }

    /// Same as [`Progress::new`] with an explicit start for the first rate window.
    pub fn started_at(total: u64, enabled: bool, start: Instant) -> Self {
        Self {
            total,
            completed: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            throttle: Mutex::new(Throttle {
                last_at: start,
                last_completed: 0,
            }),
            enabled,
        }
    }

    /// Count one finished task and maybe print the status line.
    pub fn record(&self, success: bool) {
        if success {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        }
        self.completed.fetch_add(1, Ordering::Relaxed);
        if self.enabled {
            if let Some(line) = self.tick(Instant::now()) {
                let mut out = std::io::stdout().lock();
                let _ = write!(out, "\r{line}");
                let _ = out.flush();
            }
        }
    }

    /// Produce a status line if at least [`REFRESH_INTERVAL`] passed since the last one.
    ///
    /// Best effort: when another task holds the snapshot this call is skipped.
    pub fn tick(&self, now: Instant) -> Option<StatusLine> {
        let mut throttle = self.throttle.try_lock().ok()?;
        let delta = now.saturating_duration_since(throttle.last_at);
        if delta < REFRESH_INTERVAL {
            return None;
        }

        let completed = self.completed();
        let rate = completed.saturating_sub(throttle.last_completed) as f64 / delta.as_secs_f64();
        throttle.last_at = now;
        throttle.last_completed = completed;

        let percent = if self.total == 0 {
            100.0
        } else {
            completed as f64 / self.total as f64 * 100.0
        };
        Some(StatusLine {
            percent,
            completed,
            total: self.total,
            succeeded: self.succeeded(),
            rate,
        })
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }
}

/// Atomic tally of why candidates were dropped.
#[derive(Debug, Default)]
pub struct FailureCounts {
    connect: AtomicU64,
    handshake: AtomicU64,
    slow: AtomicU64,
}

impl FailureCounts {
    pub fn record(&self, kind: FailureKind) {
        let counter = match kind {
            FailureKind::Connect => &self.connect,
            FailureKind::Handshake => &self.handshake,
            FailureKind::Slow => &self.slow,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FailureBreakdown {
        FailureBreakdown {
            connect: self.connect.load(Ordering::Relaxed),
            handshake: self.handshake.load(Ordering::Relaxed),
            slow: self.slow.load(Ordering::Relaxed),
        }
    }
}
