use anyhow::{Context, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting semaphore that caps how many probes run at once.
///
/// Also records how many tokens are held right now and the highest number
/// ever held together, so the ceiling can be checked after a run.
#[derive(Clone, Debug)]
pub struct ConcurrencyLimiter {
    sem: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

/// Held for the lifetime of one probe task. Dropping it frees the slot.
#[derive(Debug)]
pub struct Token {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for Token {
    fn drop(&mut self) {
        // Runs before the permit field is dropped, so in_flight never exceeds capacity.
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyLimiter {
    pub fn new(capacity: usize) -> Self {
        let capacity = Self::effective_capacity(capacity);
        Self {
            sem: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The capacity a limiter built from `requested` actually enforces.
    pub fn effective_capacity(requested: usize) -> usize {
        requested.clamp(1, Semaphore::MAX_PERMITS)
    }

    /// Wait for a free slot. Blocks the caller while all slots are taken.
    pub async fn acquire(&self) -> Result<Token> {
        let permit = self
            .sem
            .clone()
            .acquire_owned()
            .await
            .context("concurrency limiter closed")?;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(Token {
            _permit: permit,
            in_flight: self.in_flight.clone(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}
