//! Vaultstress - load generation and lifecycle verification for container stores
//!
//! Subcommands:
//! - `longevity`: lifecycle workers plus monitor until a deadline
//! - `load`: one action kind over every container, with a timing summary
//! - `populate`: bulk container and item creation
//! - `chained`: per-operation benchmark stages
//! - `show-config`: print the effective configuration as JSON
//!
//! Runs are executed against the in-process backend.

mod logging;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use vaultstress_core::{ActionKind, HarnessConfig, SeedSource};
use vaultstress_harness::{ChainedBench, LoadDriver, LongevityRun, Populator};
use vaultstress_store::{MemoryBackend, StorageBackend};

#[derive(Parser, Debug)]
#[command(name = "vaultstress")]
#[command(about = "Load and longevity harness for container/item storage backends")]
struct Args {
    /// JSON configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Master RNG seed (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run lifecycle workers until the deadline
    Longevity {
        /// Total containers
        #[arg(long)]
        containers: Option<usize>,
        /// Worker threads
        #[arg(long)]
        workers: Option<usize>,
        /// Run length, e.g. "30s" or "2h"
        #[arg(long)]
        duration: Option<humantime::Duration>,
        /// Highest counter the monitor treats as regular
        #[arg(long)]
        max_items: Option<i64>,
        /// Time between monitor scans
        #[arg(long)]
        log_interval: Option<humantime::Duration>,
        /// Inactivity before a worker is reported as stale
        #[arg(long)]
        stale_after: Option<humantime::Duration>,
    },

    /// Run one action kind across all containers
    Load {
        /// Action, e.g. add_item or search-items
        #[arg(long)]
        action: Option<ActionKind>,
        #[arg(long)]
        threads: Option<usize>,
        #[arg(long)]
        containers: Option<usize>,
        /// Items per container
        #[arg(long)]
        items: Option<usize>,
        /// Attribute JSON or search query JSON
        #[arg(long)]
        payload: Option<String>,
    },

    /// Create containers and items
    Populate {
        #[arg(long)]
        threads: Option<usize>,
        #[arg(long)]
        containers: Option<usize>,
        /// Items per container
        #[arg(long)]
        items: Option<usize>,
        /// Attribute template as a JSON object
        #[arg(long)]
        template: Option<String>,
        /// Share of items carrying the template values
        #[arg(long)]
        percent: Option<u32>,
    },

    /// Benchmark each storage operation in sequence
    Chained {
        #[arg(long)]
        threads: Option<usize>,
        /// Operations per thread per stage
        #[arg(long)]
        operations: Option<usize>,
    },

    /// Print the effective configuration and exit
    ShowConfig,
}

/// Fold command-line flags into the loaded configuration
fn apply_overrides(config: &mut HarnessConfig, args: &Args) -> anyhow::Result<()> {
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    match &args.command {
        Command::Longevity {
            containers,
            workers,
            duration,
            max_items,
            log_interval,
            stale_after,
        } => {
            let longevity = &mut config.longevity;
            if let Some(v) = containers {
                longevity.total_containers = *v;
            }
            if let Some(v) = workers {
                longevity.workers = *v;
            }
            if let Some(v) = duration {
                longevity.duration = (*v).into();
                longevity.deadline = None;
            }
            if let Some(v) = max_items {
                longevity.max_items_per_container = *v;
            }
            if let Some(v) = log_interval {
                longevity.monitor.interval = (*v).into();
            }
            if let Some(v) = stale_after {
                longevity.monitor.stale_after = (*v).into();
            }
        }
        Command::Load {
            action,
            threads,
            containers,
            items,
            payload,
        } => {
            let load = &mut config.load;
            if let Some(v) = action {
                load.action = *v;
            }
            if let Some(v) = threads {
                load.threads = *v;
            }
            if let Some(v) = containers {
                load.total_containers = *v;
            }
            if let Some(v) = items {
                load.items_per_container = *v;
            }
            if let Some(v) = payload {
                load.payload = v.clone();
            }
        }
        Command::Populate {
            threads,
            containers,
            items,
            template,
            percent,
        } => {
            let populate = &mut config.populate;
            if let Some(v) = threads {
                populate.threads = *v;
            }
            if let Some(v) = containers {
                populate.total_containers = *v;
            }
            if let Some(v) = items {
                populate.items_per_container = *v;
            }
            if let Some(v) = template {
                populate.attribute_template = vaultstress_core::model::parse_attributes(v)?;
            }
            if let Some(v) = percent {
                populate.custom_attribute_percent = *v;
            }
        }
        Command::Chained {
            threads,
            operations,
        } => {
            if let Some(v) = threads {
                config.chained.threads = *v;
            }
            if let Some(v) = operations {
                config.chained.operations_per_thread = *v;
            }
        }
        Command::ShowConfig => {}
    }
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<HarnessConfig> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::from_json_file(path)?,
        None => HarnessConfig::default(),
    };
    apply_overrides(&mut config, args)?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    if let Command::ShowConfig = args.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    logging::init(&config.logging, args.verbose)?;

    let seeds = SeedSource::from_option(config.seed);
    info!(seed = seeds.master(), "Starting vaultstress");

    let memory = Arc::new(MemoryBackend::new());
    let backend: Arc<dyn StorageBackend> = memory.clone();

    match args.command {
        Command::Longevity { .. } => {
            let run = LongevityRun::new(
                backend,
                config.backend.clone(),
                config.longevity.clone(),
                seeds,
            );
            let report = run.run()?;
            println!("Longevity run {} finished in {:?}", report.run_id, report.elapsed);
            for worker in &report.workers {
                println!(
                    "  {:<24} iterations: {:>8}  aborted: {:>6}",
                    worker.name, worker.iterations, worker.aborted
                );
            }
            println!(
                "  not created: {}  irregular: {}  histogram: {:?}",
                report.histogram.not_created, report.histogram.irregular, report.histogram.regular
            );
        }
        Command::Load { .. } => {
            let load = &config.load;
            load.validate()?;
            let action = load.action;

            if action.needs_existing_containers() {
                let mut prep = config.populate.clone();
                prep.threads = load.threads;
                prep.total_containers = load.total_containers;
                prep.items_per_container = if action.needs_existing_items() {
                    load.items_per_container
                } else {
                    0
                };
                let report =
                    Populator::new(Arc::clone(&backend), config.backend.clone(), prep, seeds)
                        .run()?;
                info!(
                    containers = report.containers_created,
                    items = report.items_added,
                    "Prepared data"
                );
            }

            let driver = LoadDriver::new(backend, config.backend.clone(), seeds);
            let summary = driver.run(
                load.threads,
                load.total_containers,
                load.items_per_container,
                &load.payload,
                action,
            )?;
            println!("{}", summary);
        }
        Command::Populate { .. } => {
            let report = Populator::new(
                backend,
                config.backend.clone(),
                config.populate.clone(),
                seeds,
            )
            .run()?;
            println!(
                "Populated {} containers with {} items in {:?} ({} failures)",
                report.containers_created, report.items_added, report.elapsed, report.failures
            );
        }
        Command::Chained { .. } => {
            let bench = ChainedBench::new(backend, config.backend.clone(), config.chained.clone());
            for summary in bench.run()? {
                println!("{}", summary);
            }
        }
        Command::ShowConfig => {}
    }

    info!(containers_left = memory.container_count(), "Done");
    Ok(())
}
