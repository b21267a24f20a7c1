//! Vaultstress Harness - Load generation and lifecycle verification
//!
//! Everything in this crate runs on plain OS threads and blocks on backend
//! calls. Backend failures inside a run are logged and counted; only setup
//! problems (bad configuration, failed pre-run cleanup, a panicked thread)
//! surface as [`HarnessError`].
//!
//! ## Components
//!
//! - **lifecycle**: [`LifecycleWorker`], one per partition, drives random
//!   containers through create/open/mutate/search/close until a deadline
//! - **monitor**: [`Monitor`], periodic counter histogram and stale-worker
//!   warnings
//! - **longevity**: [`LongevityRun`], wires workers and monitor together
//! - **actions**: one [`ContainerAction`] per [`ActionKind`](vaultstress_core::ActionKind)
//! - **driver**: [`LoadDriver`], single-action throughput runs
//! - **populator**: [`Populator`], bulk container and item creation
//! - **chained**: [`ChainedBench`], per-operation benchmark stages
//! - **stats**: [`RunSummary`]
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use vaultstress_core::{ActionKind, BackendConfig, SeedSource};
//! use vaultstress_harness::LoadDriver;
//! use vaultstress_store::MemoryBackend;
//!
//! let driver = LoadDriver::new(
//!     Arc::new(MemoryBackend::new()),
//!     BackendConfig::default(),
//!     SeedSource::new(7),
//! );
//! let summary = driver.run(2, 10, 0, "", ActionKind::AddContainer).unwrap();
//! assert_eq!(summary.operations, 10);
//! ```

pub mod actions;
pub mod chained;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod longevity;
pub mod monitor;
pub mod populator;
pub mod stats;
pub mod status;

// Re-exports for convenience
pub use actions::{
    handler, ActionContext, ActionOutcome, ActionPayload, ActionTarget, ContainerAction,
};
pub use chained::{ChainedBench, ChainedStage};
pub use driver::LoadDriver;
pub use error::{HarnessError, Result};
pub use lifecycle::{IterationOutcome, LifecycleWorker};
pub use longevity::{LongevityReport, LongevityRun, WorkerSummary};
pub use monitor::{Monitor, MonitorReport};
pub use populator::{PopulateReport, Populator};
pub use stats::{approx_tps, RunSummary};
pub use status::{HarnessClock, WorkerStatus};
