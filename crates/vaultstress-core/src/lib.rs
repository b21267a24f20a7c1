//! Vaultstress Core - Shared types for the load and longevity harness
//!
//! This crate holds everything the harness needs before it touches a backend:
//! configuration, container/item naming, static partitioning of the container
//! space, the shared lifecycle-counter registry, the add/delete policy, and
//! seedable randomness.
//!
//! # Modules
//!
//! - [`config`] - Configuration types
//! - [`partition`] - Static, disjoint partitioning of container indices
//! - [`registry`] - Lifecycle counter per container
//! - [`policy`] - Three-band add/delete policy
//! - [`action`] - Operation kinds for the load driver
//! - [`model`] - Container and item naming, attributes
//! - [`rng`] - Seedable per-thread randomness
//! - [`error`] - Setup-time error types
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vaultstress_core::{partition::split, registry::EntityRegistry};
//!
//! let registry = Arc::new(EntityRegistry::new(20));
//! for part in split(20, 4).unwrap() {
//!     let slots = registry.owned(part).unwrap();
//!     slots.set(part.min(), 0).unwrap();
//! }
//! assert_eq!(registry.get(5).unwrap(), 0);
//! ```

pub mod action;
pub mod config;
pub mod error;
pub mod model;
pub mod partition;
pub mod policy;
pub mod registry;
pub mod rng;

// Re-exports for convenience
pub use action::ActionKind;
pub use config::{
    BackendConfig, ChainedConfig, HarnessConfig, LoadConfig, LogFormat, LogLevel, LoggingConfig,
    LongevityConfig, MonitorConfig, PopulateConfig,
};
pub use error::{CoreError, Result};
pub use model::Attributes;
pub use partition::Partition;
pub use policy::{Mutation, MutationPolicy};
pub use registry::{EntityRegistry, OwnedSlots, NOT_CREATED};
pub use rng::SeedSource;
