//! Periodic read-only observer of a longevity run
//!
//! The monitor never writes shared state. Registry values are read slot by
//! slot, so a scan may mix values from slightly different moments.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use vaultstress_core::{EntityRegistry, MonitorConfig};

use crate::status::{HarnessClock, WorkerStatus};

/// Upper bound on how long the monitor sleeps before rechecking the stop flag
const STOP_POLL: Duration = Duration::from_millis(50);

/// One scan's view of the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorReport {
    /// Containers never created (negative counter)
    pub not_created: usize,
    /// `regular[k]` = containers whose counter is exactly `k`
    pub regular: Vec<usize>,
    /// Containers above the expected maximum
    pub irregular: usize,
    /// Sum of all workers' iteration counters
    pub iterations: u64,
    /// `(worker name, iterations)` in partition order
    pub per_worker: Vec<(String, u64)>,
    /// Workers idle for longer than the staleness threshold
    pub stale: Vec<String>,
}

impl MonitorReport {
    /// Number of containers the report covers
    pub fn total(&self) -> usize {
        self.not_created + self.irregular + self.regular.iter().sum::<usize>()
    }
}

/// Periodic histogram and staleness reporter
#[derive(Clone)]
pub struct Monitor {
    registry: Arc<EntityRegistry>,
    workers: Vec<Arc<WorkerStatus>>,
    max_expected: i64,
    interval: Duration,
    stale_after: Duration,
    clock: HarnessClock,
}

impl Monitor {
    pub fn new(
        registry: Arc<EntityRegistry>,
        workers: Vec<Arc<WorkerStatus>>,
        max_expected: i64,
        config: &MonitorConfig,
        clock: HarnessClock,
    ) -> Self {
        Self {
            registry,
            workers,
            max_expected,
            interval: config.interval,
            stale_after: config.stale_after,
            clock,
        }
    }

    /// Classify counters and check worker liveness at `now_ms`
    pub fn scan_at(&self, now_ms: u64) -> MonitorReport {
        let buckets = usize::try_from(self.max_expected.max(0)).unwrap_or(0) + 1;
        let mut report = MonitorReport {
            not_created: 0,
            regular: vec![0; buckets],
            irregular: 0,
            iterations: 0,
            per_worker: Vec::with_capacity(self.workers.len()),
            stale: Vec::new(),
        };

        for value in self.registry.snapshot() {
            if value < 0 {
                report.not_created += 1;
            } else if value > self.max_expected {
                report.irregular += 1;
            } else {
                report.regular[value as usize] += 1;
            }
        }

        for worker in &self.workers {
            let iterations = worker.iterations();
            report.iterations += iterations;
            report
                .per_worker
                .push((worker.name().to_string(), iterations));
            let idle = worker.idle_for(now_ms);
            if idle > self.stale_after {
                warn!(
                    worker = %worker.name(),
                    idle_ms = idle.as_millis() as u64,
                    "Worker has not reported activity"
                );
                report.stale.push(worker.name().to_string());
            }
        }

        report
    }

    /// Scan at the current clock reading
    pub fn scan(&self) -> MonitorReport {
        self.scan_at(self.clock.now_ms())
    }

    /// Scan every interval until `stop` is raised; returns the number of scans
    pub fn run(self, stop: Arc<AtomicBool>) -> u64 {
        debug!(interval = ?self.interval, stale_after = ?self.stale_after, "Monitor starting");
        let mut scans = 0;

        loop {
            let next = Instant::now() + self.interval;
            while !stop.load(Ordering::Acquire) {
                let now = Instant::now();
                if now >= next {
                    break;
                }
                std::thread::sleep(STOP_POLL.min(next - now));
            }
            if stop.load(Ordering::Acquire) {
                break;
            }

            let report = self.scan();
            scans += 1;
            info!(
                not_created = report.not_created,
                regular = ?report.regular,
                irregular = report.irregular,
                iterations = report.iterations,
                per_worker = ?report.per_worker,
                stale = report.stale.len(),
                "Container histogram"
            );
        }

        debug!(scans, "Monitor stopped");
        scans
    }
}
