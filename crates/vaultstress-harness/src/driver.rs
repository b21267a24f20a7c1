//! Load-test driver
//!
//! Runs one action kind over every container of every partition, one OS
//! thread per partition, and times each container's action span. Each thread
//! keeps its own duration list and hands it back through its join handle.

use chrono::Utc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use vaultstress_core::model::container_name;
use vaultstress_core::partition::split;
use vaultstress_core::rng::random_alphanumeric;
use vaultstress_core::{ActionKind, BackendConfig, Partition, SeedSource};
use vaultstress_store::StorageBackend;

use crate::actions::{handler, ActionContext, ActionOutcome, ActionPayload, ActionTarget};
use crate::error::{panic_message, HarnessError, Result};
use crate::stats::RunSummary;

/// Length of the value written by add and update actions
const VALUE_LEN: usize = 20;

type ThreadResult = (Vec<Duration>, ActionOutcome);

/// Multi-threaded single-action benchmark
pub struct LoadDriver {
    backend: Arc<dyn StorageBackend>,
    backend_config: Arc<BackendConfig>,
    seeds: SeedSource,
}

impl LoadDriver {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        backend_config: BackendConfig,
        seeds: SeedSource,
    ) -> Self {
        Self {
            backend,
            backend_config: Arc::new(backend_config),
            seeds,
        }
    }

    /// Run `action` on `total` containers split across `threads`
    ///
    /// Containers are numbered from 1; thread `k` gets numbers
    /// `k * total / threads + 1 ..= (k + 1) * total / threads`.
    pub fn run(
        &self,
        threads: usize,
        total: usize,
        items_per_container: usize,
        payload: &str,
        action: ActionKind,
    ) -> Result<RunSummary> {
        let partitions = split(total, threads)?;
        let payload = Arc::new(ActionPayload::parse(action, payload)?);

        info!(
            %action,
            threads,
            containers = total,
            items = items_per_container,
            "Starting load run"
        );
        let started_at = Utc::now();
        let start = Instant::now();

        let mut handles: Vec<(String, JoinHandle<ThreadResult>)> = Vec::with_capacity(threads);
        let mut failure = None;
        for partition in partitions {
            let name = format!("load_{}", partition);
            match self.spawn(&name, partition, items_per_container, Arc::clone(&payload), action) {
                Ok(handle) => handles.push((name, handle)),
                Err(e) => {
                    error!(thread = %name, error = %e, "Failed to start load thread");
                    failure = Some(HarnessError::Spawn(format!("{}: {}", name, e)));
                    break;
                }
            }
        }

        let mut per_thread = Vec::with_capacity(handles.len());
        let mut totals = ActionOutcome::default();
        for (name, handle) in handles {
            match handle.join() {
                Ok((durations, outcome)) => {
                    debug!(
                        thread = %name,
                        spans = durations.len(),
                        failures = outcome.failures,
                        "Load thread joined"
                    );
                    totals.merge(outcome);
                    per_thread.push(durations);
                }
                Err(payload) => {
                    let message = panic_message(payload);
                    error!(thread = %name, panic = %message, "Load thread panicked");
                    failure.get_or_insert(HarnessError::WorkerPanicked(format!(
                        "{}: {}",
                        name, message
                    )));
                }
            }
        }
        let wall_clock = start.elapsed();

        if let Some(err) = failure {
            return Err(err);
        }

        let summary = RunSummary::aggregate(
            action.as_str(),
            started_at,
            &per_thread,
            wall_clock,
            total,
            items_per_container,
            totals.operations,
            totals.failures,
        );
        info!(
            %action,
            operations = summary.operations,
            spans = summary.spans,
            max = ?summary.max,
            sum = ?summary.sum,
            wall_clock = ?summary.wall_clock,
            approx_tps = summary.approx_tps,
            failures = summary.failures,
            "Load run finished"
        );
        Ok(summary)
    }

    fn spawn(
        &self,
        name: &str,
        partition: Partition,
        items_per_container: usize,
        payload: Arc<ActionPayload>,
        action: ActionKind,
    ) -> std::io::Result<JoinHandle<ThreadResult>> {
        let backend = Arc::clone(&self.backend);
        let backend_config = Arc::clone(&self.backend_config);
        let mut rng = self.seeds.rng_for(partition.index() as u64);

        thread::Builder::new().name(name.to_string()).spawn(move || {
            let value = random_alphanumeric(&mut rng, VALUE_LEN);
            let ctx = ActionContext {
                backend: backend.as_ref(),
                backend_config: &backend_config,
                payload: &payload,
                items_per_container,
                value: &value,
            };
            run_partition(&ctx, partition, action)
        })
    }
}

/// Execute `action` on every container of `partition`
fn run_partition(
    ctx: &ActionContext<'_>,
    partition: Partition,
    action: ActionKind,
) -> ThreadResult {
    let action_impl = handler(action);
    let mut durations = Vec::with_capacity(partition.len());
    let mut totals = ActionOutcome::default();

    for index in partition.ids() {
        let number = index + 1;
        let name = container_name(&ctx.backend_config.container_prefix, number);

        let handle = if action.works_on_open_container() {
            match ctx
                .backend
                .open_container(&name, &ctx.backend_config.credentials)
            {
                Ok(handle) => Some(handle),
                Err(e) => {
                    error!(container = %name, error = %e, "Container not opened, skipping");
                    totals.failures += 1;
                    continue;
                }
            }
        } else {
            None
        };

        let target = ActionTarget {
            number,
            name,
            handle,
        };
        let started = Instant::now();
        let outcome = action_impl.execute(ctx, &target);
        durations.push(started.elapsed());
        totals.merge(outcome);

        if let Some(handle) = handle {
            if let Err(e) = ctx.backend.close_container(handle) {
                error!(container = %target.name, error = %e, "Container not closed");
                totals.failures += 1;
            }
        }
    }

    (durations, totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultstress_store::MemoryBackend;

    #[test]
    fn test_rejects_uneven_split() {
        let driver = LoadDriver::new(
            Arc::new(MemoryBackend::new()),
            BackendConfig::default(),
            SeedSource::new(1),
        );
        let err = driver
            .run(3, 10, 1, "", ActionKind::AddContainer)
            .unwrap_err();
        assert!(matches!(err, HarnessError::Core(_)));
    }

    #[test]
    fn test_rejects_bad_payload() {
        let driver = LoadDriver::new(
            Arc::new(MemoryBackend::new()),
            BackendConfig::default(),
            SeedSource::new(1),
        );
        assert!(driver.run(1, 1, 1, "{oops", ActionKind::AddItem).is_err());
    }

    #[test]
    fn test_one_span_per_container() {
        let backend = Arc::new(MemoryBackend::new());
        let driver = LoadDriver::new(backend.clone(), BackendConfig::default(), SeedSource::new(2));

        let summary = driver.run(2, 8, 0, "", ActionKind::AddContainer).unwrap();
        assert_eq!(summary.spans, 8);
        assert_eq!(summary.operations, 8);
        assert_eq!(summary.failures, 0);
        assert_eq!(backend.container_count(), 8);
        assert!(backend.contains_container("wallet_1"));
        assert!(backend.contains_container("wallet_8"));
        assert!(!backend.contains_container("wallet_0"));
    }
}
