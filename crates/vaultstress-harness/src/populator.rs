//! Bulk populator
//!
//! Creates containers and fills them with items, fanned out over one thread
//! per partition. The first `items * percent / 100` items of every container
//! carry the attribute template verbatim; the rest carry the same keys with
//! random values, so exact-match searches hit a known share of items.

use rand::Rng;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use vaultstress_core::model::{bulk_item_id, container_name};
use vaultstress_core::partition::split;
use vaultstress_core::rng::random_alphanumeric;
use vaultstress_core::{Attributes, BackendConfig, Partition, PopulateConfig, SeedSource};
use vaultstress_store::StorageBackend;

use crate::error::{panic_message, HarnessError, Result};

/// Items per container that receive the template values
pub fn custom_item_count(items_per_container: usize, percent: u32) -> usize {
    items_per_container * percent as usize / 100
}

/// Attributes for the `item`-th (1-based) item of a container
pub fn attributes_for_item<R: Rng + ?Sized>(
    template: &Attributes,
    item: usize,
    custom_items: usize,
    random_len: usize,
    rng: &mut R,
) -> Attributes {
    if item <= custom_items {
        return template.clone();
    }
    template
        .keys()
        .map(|key| (key.clone(), random_alphanumeric(rng, random_len)))
        .collect()
}

/// Totals of a populate run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateReport {
    pub containers_created: usize,
    pub items_added: usize,
    pub failures: usize,
    pub elapsed: Duration,
}

impl PopulateReport {
    fn merge(&mut self, other: PopulateReport) {
        self.containers_created += other.containers_created;
        self.items_added += other.items_added;
        self.failures += other.failures;
    }
}

/// One-shot parallel container and item creation
pub struct Populator {
    backend: Arc<dyn StorageBackend>,
    backend_config: Arc<BackendConfig>,
    config: Arc<PopulateConfig>,
    seeds: SeedSource,
}

impl Populator {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        backend_config: BackendConfig,
        config: PopulateConfig,
        seeds: SeedSource,
    ) -> Self {
        Self {
            backend,
            backend_config: Arc::new(backend_config),
            config: Arc::new(config),
            seeds,
        }
    }

    /// Populate every container; containers are numbered from 1
    pub fn run(&self) -> Result<PopulateReport> {
        self.config.validate()?;
        let partitions = split(self.config.total_containers, self.config.threads)?;

        info!(
            threads = self.config.threads,
            containers = self.config.total_containers,
            items = self.config.items_per_container,
            percent = self.config.custom_attribute_percent,
            "Populating"
        );
        let start = Instant::now();

        let mut handles: Vec<(String, JoinHandle<PopulateReport>)> = Vec::new();
        let mut failure = None;
        for partition in partitions {
            let name = format!("populate_{}", partition);
            match self.spawn(&name, partition) {
                Ok(handle) => handles.push((name, handle)),
                Err(e) => {
                    error!(thread = %name, error = %e, "Failed to start populator thread");
                    failure = Some(HarnessError::Spawn(format!("{}: {}", name, e)));
                    break;
                }
            }
        }

        let mut report = PopulateReport::default();
        for (name, handle) in handles {
            match handle.join() {
                Ok(part) => report.merge(part),
                Err(payload) => {
                    let message = panic_message(payload);
                    error!(thread = %name, panic = %message, "Populator thread panicked");
                    failure.get_or_insert(HarnessError::WorkerPanicked(format!(
                        "{}: {}",
                        name, message
                    )));
                }
            }
        }
        report.elapsed = start.elapsed();

        if let Some(err) = failure {
            return Err(err);
        }
        info!(
            containers = report.containers_created,
            items = report.items_added,
            failures = report.failures,
            elapsed = ?report.elapsed,
            "Population finished"
        );
        Ok(report)
    }

    fn spawn(
        &self,
        name: &str,
        partition: Partition,
    ) -> std::io::Result<JoinHandle<PopulateReport>> {
        let worker = PartitionFiller {
            backend: Arc::clone(&self.backend),
            backend_config: Arc::clone(&self.backend_config),
            config: Arc::clone(&self.config),
        };
        let rng = self.seeds.rng_for(partition.index() as u64);
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker.fill(partition, rng))
    }
}

struct PartitionFiller {
    backend: Arc<dyn StorageBackend>,
    backend_config: Arc<BackendConfig>,
    config: Arc<PopulateConfig>,
}

impl PartitionFiller {
    fn fill<R: Rng>(&self, partition: Partition, mut rng: R) -> PopulateReport {
        let mut report = PopulateReport::default();
        for index in partition.ids() {
            self.fill_container(index + 1, &mut rng, &mut report);
        }
        debug!(partition = %partition, items = report.items_added, "Partition populated");
        report
    }

    fn fill_container<R: Rng>(&self, number: usize, rng: &mut R, report: &mut PopulateReport) {
        let cfg = &self.backend_config;
        let name = container_name(&cfg.container_prefix, number);

        if let Err(e) = self.backend.create_container(
            &name,
            &cfg.storage_type,
            &cfg.storage_config,
            &cfg.credentials,
        ) {
            error!(container = %name, error = %e, "Container not created");
            report.failures += 1;
            return;
        }
        report.containers_created += 1;

        let handle = match self.backend.open_container(&name, &cfg.credentials) {
            Ok(handle) => handle,
            Err(e) => {
                error!(container = %name, error = %e, "Container not opened");
                report.failures += 1;
                return;
            }
        };

        let items = self.config.items_per_container;
        let custom = custom_item_count(items, self.config.custom_attribute_percent);
        let value = random_alphanumeric(rng, self.config.value_len);
        for item in 1..=items {
            let attributes = attributes_for_item(
                &self.config.attribute_template,
                item,
                custom,
                self.config.random_attribute_len,
                rng,
            );
            let id = bulk_item_id(number, item);
            match self
                .backend
                .add_item(handle, &cfg.item_type, &id, &value, &attributes)
            {
                Ok(()) => report.items_added += 1,
                Err(e) => {
                    error!(container = %name, item = %id, error = %e, "Item not added");
                    report.failures += 1;
                }
            }
        }

        if let Err(e) = self.backend.close_container(handle) {
            error!(container = %name, error = %e, "Container not closed");
            report.failures += 1;
        }
    }
}
