//! Lifecycle worker
//!
//! Each worker owns one partition of the container space and, until its
//! deadline passes, repeatedly picks a random container from that partition
//! and walks it through create -> open -> add/delete -> get/update -> search
//! -> close. Backend failures are logged and the iteration abandoned; the
//! next iteration is the retry.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, trace, warn};

use vaultstress_core::model::{container_name, lifecycle_item_id};
use vaultstress_core::rng::random_alphanumeric;
use vaultstress_core::{Attributes, BackendConfig, Mutation, MutationPolicy, OwnedSlots};
use vaultstress_store::{ContainerHandle, ItemOptions, SearchOptions, SearchPage, StorageBackend};

use crate::error::Result;
use crate::status::{HarnessClock, WorkerStatus};

/// Results fetched per consistency search
const SEARCH_PAGE_SIZE: usize = 20;

/// Length of generated item values
const ITEM_VALUE_LEN: usize = 20;

/// What happened in one worker iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Every step ran; `reported` is the backend's total count, if it answered
    Completed {
        container: usize,
        before: i64,
        after: i64,
        reported: Option<u64>,
    },
    /// Container creation failed; nothing else was attempted
    CreateFailed { container: usize },
    /// Opening failed; nothing else was attempted
    OpenFailed { container: usize },
    /// Mutations ran but the container could not be closed
    CloseFailed {
        container: usize,
        before: i64,
        after: i64,
    },
}

impl IterationOutcome {
    /// Whether the iteration stopped early
    pub fn is_aborted(&self) -> bool {
        !matches!(self, IterationOutcome::Completed { .. })
    }

    /// The container the iteration picked
    pub fn container(&self) -> usize {
        match *self {
            IterationOutcome::Completed { container, .. }
            | IterationOutcome::CreateFailed { container }
            | IterationOutcome::OpenFailed { container }
            | IterationOutcome::CloseFailed { container, .. } => container,
        }
    }
}

/// A worker driving one partition of containers
pub struct LifecycleWorker {
    backend: Arc<dyn StorageBackend>,
    backend_config: Arc<BackendConfig>,
    slots: OwnedSlots,
    policy: MutationPolicy,
    status: Arc<WorkerStatus>,
    clock: HarnessClock,
    rng: StdRng,
    status_every: u64,
}

impl LifecycleWorker {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        backend_config: Arc<BackendConfig>,
        slots: OwnedSlots,
        policy: MutationPolicy,
        clock: HarnessClock,
        rng: StdRng,
    ) -> Self {
        let status = Arc::new(WorkerStatus::new(slots.partition(), clock.now_ms()));
        Self {
            backend,
            backend_config,
            slots,
            policy,
            status,
            clock,
            rng,
            status_every: 0,
        }
    }

    /// Emit an "alive" debug line every `every` iterations (0 disables)
    pub fn with_status_every(mut self, every: u64) -> Self {
        self.status_every = every;
        self
    }

    /// Shared liveness descriptor, read by the monitor
    pub fn status(&self) -> Arc<WorkerStatus> {
        Arc::clone(&self.status)
    }

    /// Run iterations until `deadline`; returns the iteration count
    pub fn run(mut self, deadline: Instant) -> u64 {
        let name = self.status.name().to_string();
        debug!(worker = %name, "Starting");

        while Instant::now() < deadline {
            let aborted = match self.run_iteration() {
                Ok(outcome) => outcome.is_aborted(),
                Err(e) => {
                    error!(worker = %name, error = %e, "Iteration failed");
                    true
                }
            };

            let n = self.status.record_iteration(self.clock.now_ms(), aborted);
            if self.status_every > 0 && n % self.status_every == 0 {
                debug!(worker = %name, iteration = n, "I'm alive");
            }
        }

        let iterations = self.status.iterations();
        debug!(worker = %name, iterations, "Finishing");
        iterations
    }

    /// Run one iteration against a randomly picked owned container
    pub fn run_iteration(&mut self) -> Result<IterationOutcome> {
        let partition = self.slots.partition();
        let container = self.rng.gen_range(partition.min()..=partition.max());
        let name = container_name(&self.backend_config.container_prefix, container);
        trace!(worker = %self.status.name(), container = %name, "Picked container");

        let mut counter = self.slots.get(container)?;
        if counter < 0 {
            let cfg = &self.backend_config;
            if let Err(e) = self.backend.create_container(
                &name,
                &cfg.storage_type,
                &cfg.storage_config,
                &cfg.credentials,
            ) {
                error!(
                    worker = %self.status.name(),
                    container = %name,
                    error = %e,
                    "Container not created"
                );
                return Ok(IterationOutcome::CreateFailed { container });
            }
            self.slots.set(container, 0)?;
            counter = 0;
        }

        let handle = match self
            .backend
            .open_container(&name, &self.backend_config.credentials)
        {
            Ok(handle) => handle,
            Err(e) => {
                error!(
                    worker = %self.status.name(),
                    container = %name,
                    error = %e,
                    "Container not opened"
                );
                return Ok(IterationOutcome::OpenFailed { container });
            }
        };

        let before = counter;
        let after = match self.policy.choose(counter, &mut self.rng) {
            Mutation::Add => self.add_item(handle, &name, counter),
            Mutation::Delete => self.delete_item(handle, &name, counter),
        };
        self.slots.set(container, after)?;

        self.get_and_update(handle, &name, after);
        let reported = self.verify_count(handle, &name, after);

        if let Err(e) = self.backend.close_container(handle) {
            error!(
                worker = %self.status.name(),
                container = %name,
                error = %e,
                "Container not closed"
            );
            return Ok(IterationOutcome::CloseFailed {
                container,
                before,
                after,
            });
        }

        Ok(IterationOutcome::Completed {
            container,
            before,
            after,
            reported,
        })
    }

    /// Add item `counter + 1`; returns the new counter
    fn add_item(&mut self, handle: ContainerHandle, name: &str, counter: i64) -> i64 {
        let id = lifecycle_item_id(&self.backend_config.item_id_prefix, counter + 1);
        let value = random_alphanumeric(&mut self.rng, ITEM_VALUE_LEN);
        let attributes: Attributes = [("container".to_string(), name.to_string())].into();

        match self.backend.add_item(
            handle,
            &self.backend_config.item_type,
            &id,
            &value,
            &attributes,
        ) {
            Ok(()) => {
                trace!(container = %name, item = %id, counter = counter + 1, "Added item");
                counter + 1
            }
            Err(e) => {
                error!(
                    worker = %self.status.name(),
                    container = %name,
                    item = %id,
                    error = %e,
                    "Adding item failed"
                );
                counter
            }
        }
    }

    /// Delete item `counter`; returns the new counter
    fn delete_item(&mut self, handle: ContainerHandle, name: &str, counter: i64) -> i64 {
        if counter < 1 {
            warn!(worker = %self.status.name(), container = %name, counter, "Nothing to delete");
            return counter;
        }

        let id = lifecycle_item_id(&self.backend_config.item_id_prefix, counter);
        match self
            .backend
            .delete_item(handle, &self.backend_config.item_type, &id)
        {
            Ok(()) => {
                trace!(container = %name, item = %id, counter = counter - 1, "Deleted item");
                counter - 1
            }
            Err(e) => {
                error!(
                    worker = %self.status.name(),
                    container = %name,
                    item = %id,
                    error = %e,
                    "Deleting item failed"
                );
                counter
            }
        }
    }

    /// Read and rewrite one random existing item
    fn get_and_update(&mut self, handle: ContainerHandle, name: &str, counter: i64) {
        if counter < 1 {
            warn!(
                worker = %self.status.name(),
                container = %name,
                counter,
                "Container has no items to get or update"
            );
            return;
        }

        let id = lifecycle_item_id(
            &self.backend_config.item_id_prefix,
            self.rng.gen_range(1..=counter),
        );
        let item_type = &self.backend_config.item_type;

        if let Err(e) = self
            .backend
            .get_item(handle, item_type, &id, &ItemOptions::all())
        {
            error!(
                worker = %self.status.name(),
                container = %name,
                item = %id,
                error = %e,
                "Getting item failed"
            );
        }

        let value = Utc::now().timestamp_millis().to_string();
        if let Err(e) = self.backend.update_item_value(handle, item_type, &id, &value) {
            error!(
                worker = %self.status.name(),
                container = %name,
                item = %id,
                error = %e,
                "Updating item failed"
            );
        }
    }

    /// Compare the backend's total count against the local counter
    fn verify_count(&self, handle: ContainerHandle, name: &str, expected: i64) -> Option<u64> {
        let backend = &self.backend;
        let search = match backend.open_search(
            handle,
            &self.backend_config.item_type,
            "{}",
            &SearchOptions::all(),
        ) {
            Ok(search) => search,
            Err(e) => {
                error!(
                    worker = %self.status.name(),
                    container = %name,
                    error = %e,
                    "Search failed"
                );
                return None;
            }
        };

        let page = backend.fetch_next_results(search, SEARCH_PAGE_SIZE);
        if let Err(e) = backend.close_search(search) {
            debug!(container = %name, error = %e, "Closing search failed");
        }

        let page = match page {
            Ok(json) => SearchPage::from_json(&json),
            Err(e) => {
                error!(
                    worker = %self.status.name(),
                    container = %name,
                    error = %e,
                    "Fetching search results failed"
                );
                return None;
            }
        };

        match page {
            Ok(SearchPage {
                total_count: Some(actual),
                ..
            }) => {
                if actual as i64 != expected {
                    warn!(
                        worker = %self.status.name(),
                        container = %name,
                        expected,
                        actual,
                        "Backend item count does not match local counter"
                    );
                }
                Some(actual)
            }
            Ok(_) => {
                warn!(container = %name, "Search results carried no total count");
                None
            }
            Err(e) => {
                warn!(container = %name, error = %e, "Could not parse search results");
                None
            }
        }
    }
}
