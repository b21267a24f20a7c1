//! Chained per-operation benchmark
//!
//! Thirteen stages run one after another, each benchmarked on its own. Every
//! stage leaves behind exactly the data the next one needs: stage one creates
//! `chain_<thread>_<op>` containers and the last one deletes them again.

use chrono::Utc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use vaultstress_core::{Attributes, BackendConfig, ChainedConfig};
use vaultstress_store::{ItemOptions, SearchOptions, StorageBackend, StoreError};

use crate::error::{panic_message, HarnessError, Result};
use crate::stats::RunSummary;

const METADATA: &str = "chained benchmark metadata";
const ITEM_VALUE: &str = "chained benchmark value";
const UPDATED_VALUE: &str = "chained benchmark value, updated";

fn attributes(pairs: &[(&str, &str)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// One benchmarked operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainedStage {
    CreateContainer,
    SetMetadata,
    GetMetadata,
    AddItem,
    GetItem,
    UpdateItemValue,
    AddAttributes,
    UpdateAttributes,
    SearchItems,
    SearchAll,
    DeleteAttributes,
    DeleteItem,
    DeleteContainer,
}

impl ChainedStage {
    /// Stages in execution order
    pub const ALL: [ChainedStage; 13] = [
        ChainedStage::CreateContainer,
        ChainedStage::SetMetadata,
        ChainedStage::GetMetadata,
        ChainedStage::AddItem,
        ChainedStage::GetItem,
        ChainedStage::UpdateItemValue,
        ChainedStage::AddAttributes,
        ChainedStage::UpdateAttributes,
        ChainedStage::SearchItems,
        ChainedStage::SearchAll,
        ChainedStage::DeleteAttributes,
        ChainedStage::DeleteItem,
        ChainedStage::DeleteContainer,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ChainedStage::CreateContainer => "Create Container",
            ChainedStage::SetMetadata => "Set Metadata",
            ChainedStage::GetMetadata => "Get Metadata",
            ChainedStage::AddItem => "Add Item",
            ChainedStage::GetItem => "Get Item",
            ChainedStage::UpdateItemValue => "Update Item Value",
            ChainedStage::AddAttributes => "Add Attributes",
            ChainedStage::UpdateAttributes => "Update Attributes",
            ChainedStage::SearchItems => "Search Items",
            ChainedStage::SearchAll => "Search All Items",
            ChainedStage::DeleteAttributes => "Delete Attributes",
            ChainedStage::DeleteItem => "Delete Item",
            ChainedStage::DeleteContainer => "Delete Container",
        }
    }

    /// Run this stage once for `(thread, op)`
    pub fn execute(
        &self,
        backend: &dyn StorageBackend,
        cfg: &BackendConfig,
        thread: usize,
        op: usize,
    ) -> std::result::Result<(), StoreError> {
        let name = chain_container_name(thread, op);
        match self {
            ChainedStage::CreateContainer => {
                return backend.create_container(
                    &name,
                    &cfg.storage_type,
                    &cfg.storage_config,
                    &cfg.credentials,
                )
            }
            ChainedStage::DeleteContainer => {
                return backend.delete_container(&name, &cfg.credentials)
            }
            _ => {}
        }

        let handle = backend.open_container(&name, &cfg.credentials)?;
        let id = chain_item_id(thread, op);
        let item_type = cfg.item_type.as_str();

        let result = match self {
            ChainedStage::SetMetadata => backend.set_metadata(handle, METADATA),
            ChainedStage::GetMetadata => backend.get_metadata(handle).map(|_| ()),
            ChainedStage::AddItem => backend.add_item(
                handle,
                item_type,
                &id,
                ITEM_VALUE,
                &attributes(&[("color", "blue"), ("size", "large"), ("~origin", "chained")]),
            ),
            ChainedStage::GetItem => backend
                .get_item(handle, item_type, &id, &ItemOptions::all())
                .map(|_| ()),
            ChainedStage::UpdateItemValue => {
                backend.update_item_value(handle, item_type, &id, UPDATED_VALUE)
            }
            ChainedStage::AddAttributes => backend.add_attributes(
                handle,
                item_type,
                &id,
                &attributes(&[("color", "green"), ("~note", "added")]),
            ),
            ChainedStage::UpdateAttributes => backend.update_attributes(
                handle,
                item_type,
                &id,
                &attributes(&[("color", "red"), ("~note", "updated")]),
            ),
            ChainedStage::SearchItems => search_once(
                backend,
                handle,
                item_type,
                r#"{"color": {"$in": ["red", "crimson"]}, "~note": "updated"}"#,
            ),
            ChainedStage::SearchAll => search_once(backend, handle, item_type, "{}"),
            ChainedStage::DeleteAttributes => {
                backend.delete_attributes(handle, item_type, &id, &["~note".to_string()])
            }
            ChainedStage::DeleteItem => backend.delete_item(handle, item_type, &id),
            ChainedStage::CreateContainer | ChainedStage::DeleteContainer => Ok(()),
        };

        let closed = backend.close_container(handle);
        result.and(closed)
    }
}

impl std::fmt::Display for ChainedStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

fn search_once(
    backend: &dyn StorageBackend,
    handle: vaultstress_store::ContainerHandle,
    item_type: &str,
    query: &str,
) -> std::result::Result<(), StoreError> {
    let search = backend.open_search(handle, item_type, query, &SearchOptions::all())?;
    let fetched = backend.fetch_next_results(search, 1).map(|_| ());
    fetched.and(backend.close_search(search))
}

/// Container used by `(thread, op)`
pub fn chain_container_name(thread: usize, op: usize) -> String {
    format!("chain_{}_{}", thread, op)
}

/// Item used by `(thread, op)`
pub fn chain_item_id(thread: usize, op: usize) -> String {
    format!("item_{}_{}", thread, op)
}

/// Runs every [`ChainedStage`] in order
pub struct ChainedBench {
    backend: Arc<dyn StorageBackend>,
    backend_config: Arc<BackendConfig>,
    config: ChainedConfig,
}

impl ChainedBench {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        backend_config: BackendConfig,
        config: ChainedConfig,
    ) -> Self {
        Self {
            backend,
            backend_config: Arc::new(backend_config),
            config,
        }
    }

    /// Run all stages; one summary per stage
    pub fn run(&self) -> Result<Vec<RunSummary>> {
        self.config.validate()?;
        ChainedStage::ALL
            .iter()
            .map(|stage| self.run_stage(*stage))
            .collect()
    }

    /// Benchmark a single stage across all threads
    pub fn run_stage(&self, stage: ChainedStage) -> Result<RunSummary> {
        let threads = self.config.threads;
        let ops = self.config.operations_per_thread;
        info!(%stage, threads, operations = ops, "Benchmarking");

        let started_at = Utc::now();
        let start = Instant::now();

        let mut handles: Vec<JoinHandle<(Vec<Duration>, u64)>> = Vec::with_capacity(threads);
        let mut failure = None;
        for thread_id in 0..threads {
            let backend = Arc::clone(&self.backend);
            let cfg = Arc::clone(&self.backend_config);
            let spawned = thread::Builder::new()
                .name(format!("chained_{}", thread_id))
                .spawn(move || {
                    let mut durations = Vec::with_capacity(ops);
                    let mut failures = 0u64;
                    for op in 0..ops {
                        let started = Instant::now();
                        let result = stage.execute(backend.as_ref(), &cfg, thread_id, op);
                        durations.push(started.elapsed());
                        if let Err(e) = result {
                            failures += 1;
                            error!(
                                %stage,
                                thread = thread_id,
                                op,
                                error = %e,
                                "Stage operation failed"
                            );
                        }
                    }
                    (durations, failures)
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    failure = Some(HarnessError::Spawn(e.to_string()));
                    break;
                }
            }
        }

        let mut per_thread = Vec::with_capacity(handles.len());
        let mut failures = 0;
        for handle in handles {
            match handle.join() {
                Ok((durations, failed)) => {
                    per_thread.push(durations);
                    failures += failed;
                }
                Err(payload) => {
                    failure.get_or_insert(HarnessError::WorkerPanicked(panic_message(payload)));
                }
            }
        }
        let wall_clock = start.elapsed();

        if let Some(err) = failure {
            return Err(err);
        }

        // One backend operation per span
        let operations = per_thread.iter().map(Vec::len).sum::<usize>() as u64;
        let summary = RunSummary::aggregate(
            stage.label(),
            started_at,
            &per_thread,
            wall_clock,
            threads,
            ops,
            operations,
            failures,
        );
        debug!(%stage, failures, wall_clock = ?wall_clock, "Stage finished");
        Ok(summary)
    }
}
