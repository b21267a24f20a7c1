//! Longevity run orchestration
//!
//! Purges leftovers, splits the container space across workers, runs every
//! worker on its own named thread until the deadline while a monitor thread
//! reports progress, then stops the monitor and deletes what the run created.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vaultstress_core::model::container_name;
use vaultstress_core::partition::split;
use vaultstress_core::{BackendConfig, EntityRegistry, LongevityConfig, Partition, SeedSource};
use vaultstress_store::StorageBackend;

use crate::error::{panic_message, HarnessError, Result};
use crate::lifecycle::LifecycleWorker;
use crate::monitor::{Monitor, MonitorReport};
use crate::status::HarnessClock;

/// Final numbers for one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSummary {
    pub name: String,
    pub partition: Partition,
    pub iterations: u64,
    pub aborted: u64,
}

/// Outcome of a completed longevity run
#[derive(Debug, Clone)]
pub struct LongevityReport {
    pub run_id: Uuid,
    pub workers: Vec<WorkerSummary>,
    /// Registry contents after every worker finished
    pub counters: Vec<i64>,
    /// Histogram of `counters`
    pub histogram: MonitorReport,
    /// Periodic scans the monitor completed
    pub monitor_scans: u64,
    /// Time from first worker start to last worker join
    pub elapsed: Duration,
}

impl LongevityReport {
    /// Iterations across all workers
    pub fn total_iterations(&self) -> u64 {
        self.workers.iter().map(|w| w.iterations).sum()
    }
}

/// A configured longevity run
pub struct LongevityRun {
    backend: Arc<dyn StorageBackend>,
    backend_config: Arc<BackendConfig>,
    config: LongevityConfig,
    seeds: SeedSource,
}

impl LongevityRun {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        backend_config: BackendConfig,
        config: LongevityConfig,
        seeds: SeedSource,
    ) -> Self {
        Self {
            backend,
            backend_config: Arc::new(backend_config),
            config,
            seeds,
        }
    }

    /// Run to completion
    ///
    /// Fails before any thread starts if the configuration is invalid or
    /// leftover containers cannot be removed.
    pub fn run(&self) -> Result<LongevityReport> {
        self.config.validate()?;
        let partitions = split(self.config.total_containers, self.config.workers)?;
        self.purge()?;

        let run_id = Uuid::new_v4();
        let registry = Arc::new(EntityRegistry::new(self.config.total_containers));
        let clock = HarnessClock::start();
        let run_length = self.config.run_length(Utc::now());
        let deadline = clock.epoch() + run_length;

        info!(
            %run_id,
            containers = self.config.total_containers,
            workers = self.config.workers,
            run_length = ?run_length,
            seed = self.seeds.master(),
            "Starting longevity run"
        );

        let mut workers = Vec::with_capacity(partitions.len());
        for partition in &partitions {
            let worker = LifecycleWorker::new(
                Arc::clone(&self.backend),
                Arc::clone(&self.backend_config),
                registry.owned(*partition)?,
                self.config.policy,
                clock,
                self.seeds.rng_for(partition.index() as u64),
            )
            .with_status_every(self.config.status_every);
            workers.push(worker);
        }
        let statuses: Vec<_> = workers.iter().map(LifecycleWorker::status).collect();

        let monitor = Monitor::new(
            Arc::clone(&registry),
            statuses.clone(),
            self.config.max_items_per_container,
            &self.config.monitor,
            clock,
        );
        let final_scan = monitor.clone();
        let stop = Arc::new(AtomicBool::new(false));
        let monitor_handle = {
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("monitor".to_string())
                .spawn(move || monitor.run(stop))?
        };

        let mut handles: Vec<(String, JoinHandle<u64>)> = Vec::with_capacity(workers.len());
        let mut spawn_error = None;
        for worker in workers {
            let name = worker.status().name().to_string();
            match thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker.run(deadline))
            {
                Ok(handle) => handles.push((name, handle)),
                Err(e) => {
                    error!(worker = %name, error = %e, "Failed to start worker");
                    spawn_error = Some(HarnessError::Spawn(format!("{}: {}", name, e)));
                    break;
                }
            }
        }

        let mut failure = spawn_error;
        for (name, handle) in handles {
            match handle.join() {
                Ok(iterations) => debug!(worker = %name, iterations, "Worker joined"),
                Err(payload) => {
                    let message = panic_message(payload);
                    error!(worker = %name, panic = %message, "Worker panicked");
                    failure.get_or_insert(HarnessError::WorkerPanicked(format!(
                        "{}: {}",
                        name, message
                    )));
                }
            }
        }
        let elapsed = clock.epoch().elapsed();

        stop.store(true, Ordering::Release);
        let monitor_scans = match monitor_handle.join() {
            Ok(scans) => scans,
            Err(payload) => {
                let message = panic_message(payload);
                error!(panic = %message, "Monitor panicked");
                failure.get_or_insert(HarnessError::WorkerPanicked(format!(
                    "monitor: {}",
                    message
                )));
                0
            }
        };

        if failure.is_none() && Instant::now() < deadline {
            warn!(elapsed = ?elapsed, "Workers finished before the deadline");
        }
        info!(%run_id, elapsed = ?elapsed, "Longevity run finished");

        let histogram = final_scan.scan();
        let counters = registry.snapshot();
        self.cleanup();

        if let Some(err) = failure {
            return Err(err);
        }

        let workers = statuses
            .iter()
            .map(|s| WorkerSummary {
                name: s.name().to_string(),
                partition: s.partition(),
                iterations: s.iterations(),
                aborted: s.aborted(),
            })
            .collect();

        Ok(LongevityReport {
            run_id,
            workers,
            counters,
            histogram,
            monitor_scans,
            elapsed,
        })
    }

    /// Delete every container the run may touch; "not found" is expected
    fn purge(&self) -> Result<()> {
        for index in 0..self.config.total_containers {
            let name = container_name(&self.backend_config.container_prefix, index);
            match self
                .backend
                .delete_container(&name, &self.backend_config.credentials)
            {
                Ok(()) => debug!(container = %name, "Removed leftover container"),
                Err(e) if e.is_not_found() => {}
                Err(source) => return Err(HarnessError::Cleanup { name, source }),
            }
        }
        Ok(())
    }

    /// Best-effort removal of the run's containers
    fn cleanup(&self) {
        let mut removed = 0usize;
        for index in 0..self.config.total_containers {
            let name = container_name(&self.backend_config.container_prefix, index);
            match self
                .backend
                .delete_container(&name, &self.backend_config.credentials)
            {
                Ok(()) => removed += 1,
                Err(e) if e.is_not_found() => {}
                Err(e) => debug!(container = %name, error = %e, "Cleanup skipped container"),
            }
        }
        debug!(removed, "Cleanup finished");
    }
}
