//! Vaultstress Store - Backend client facade
//!
//! This crate defines the blocking RPC surface the harness drives and ships an
//! in-memory implementation of it.
//!
//! ## Components
//!
//! - **backend**: the [`StorageBackend`] trait, handles, request options, and
//!   search page decoding
//! - **memory**: [`MemoryBackend`], a thread-safe in-process backend used by
//!   tests and dry runs
//! - **query**: attribute query evaluation for the in-memory backend
//! - **error**: typed backend failures
//!
//! ## Example
//!
//! ```
//! use vaultstress_store::{MemoryBackend, SearchOptions, SearchPage, StorageBackend};
//! use vaultstress_core::Attributes;
//!
//! let backend = MemoryBackend::new();
//! backend.create_container("wallet_0", "default", "{}", "{}").unwrap();
//! let handle = backend.open_container("wallet_0", "{}").unwrap();
//! backend.add_item(handle, "TestType", "record_1", "value", &Attributes::new()).unwrap();
//!
//! let search = backend.open_search(handle, "TestType", "{}", &SearchOptions::all()).unwrap();
//! let page = SearchPage::from_json(&backend.fetch_next_results(search, 20).unwrap()).unwrap();
//! assert_eq!(page.total_count, Some(1));
//! ```

pub mod backend;
pub mod error;
pub mod memory;
pub mod query;

// Re-exports for convenience
pub use backend::{
    ContainerHandle, ItemOptions, ItemRecord, SearchHandle, SearchOptions, SearchPage,
    StorageBackend,
};
pub use error::{Result, StoreError};
pub use memory::MemoryBackend;
pub use query::Query;
