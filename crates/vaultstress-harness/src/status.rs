//! Worker liveness tracking
//!
//! A [`WorkerStatus`] is written only by its own worker thread and read by
//! the monitor. Timestamps are milliseconds on the run's [`HarnessClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use vaultstress_core::Partition;

/// Monotonic millisecond clock anchored at the start of a run
#[derive(Debug, Clone, Copy)]
pub struct HarnessClock {
    epoch: Instant,
}

impl Default for HarnessClock {
    fn default() -> Self {
        Self::start()
    }
}

impl HarnessClock {
    /// Anchor a clock at the current instant
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Milliseconds since the clock started
    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// The instant the clock started
    pub fn epoch(&self) -> Instant {
        self.epoch
    }
}

/// Per-worker descriptor: partition bounds, iteration count, last activity
#[derive(Debug)]
pub struct WorkerStatus {
    name: String,
    partition: Partition,
    iterations: AtomicU64,
    aborted: AtomicU64,
    last_seen_ms: AtomicU64,
}

impl WorkerStatus {
    /// Create a status for the worker owning `partition`, seen at `now_ms`
    pub fn new(partition: Partition, now_ms: u64) -> Self {
        Self {
            name: format!("Containers_{}-{}", partition.min(), partition.max()),
            partition,
            iterations: AtomicU64::new(0),
            aborted: AtomicU64::new(0),
            last_seen_ms: AtomicU64::new(now_ms),
        }
    }

    /// Worker name, also used as its thread name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// Iterations run so far (aborted ones included)
    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    /// Iterations cut short by a create/open/close failure
    pub fn aborted(&self) -> u64 {
        self.aborted.load(Ordering::Relaxed)
    }

    /// Last activity timestamp
    pub fn last_seen_ms(&self) -> u64 {
        self.last_seen_ms.load(Ordering::Relaxed)
    }

    /// Record one finished iteration at `now_ms`
    pub fn record_iteration(&self, now_ms: u64, aborted: bool) -> u64 {
        if aborted {
            self.aborted.fetch_add(1, Ordering::Relaxed);
        }
        self.touch(now_ms);
        self.iterations.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Refresh the last activity timestamp
    pub fn touch(&self, now_ms: u64) {
        self.last_seen_ms.store(now_ms, Ordering::Relaxed);
    }

    /// Time since the worker last reported activity
    pub fn idle_for(&self, now_ms: u64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.last_seen_ms()))
    }
}
