//! Setup-time error types
//!
//! Everything here is raised before any worker thread starts. Per-operation
//! backend failures live in `vaultstress-store` and are never fatal.

use thiserror::Error;

/// Errors raised while validating configuration or building shared state
#[derive(Error, Debug)]
pub enum CoreError {
    /// Container count does not divide evenly across workers
    #[error("{total} containers cannot be split evenly across {workers} workers")]
    InvalidPartition { total: usize, workers: usize },

    /// Worker or thread count of zero
    #[error("Worker count must be at least 1")]
    ZeroWorkers,

    /// Registry index outside the configured container space
    #[error("Container index {index} out of range (registry size {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Write attempted on a slot owned by another worker
    #[error("Container index {index} is not owned by partition [{min}, {max}]")]
    NotOwned { index: usize, min: usize, max: usize },

    /// Percentage outside 0..=100
    #[error("Invalid percentage: {0} (expected 0..=100)")]
    InvalidPercentage(u32),

    /// Mutation policy bands are inconsistent
    #[error("Invalid mutation policy: {0}")]
    InvalidPolicy(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error while reading configuration
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
