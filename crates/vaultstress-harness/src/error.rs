//! Harness error types

use thiserror::Error;
use vaultstress_core::CoreError;
use vaultstress_store::StoreError;

/// Errors that abort a whole harness run
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Configuration or precondition violation
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Backend failure outside the per-operation error path
    #[error("Backend error: {0}")]
    Store(#[from] StoreError),

    /// A worker thread panicked
    #[error("Worker thread panicked: {0}")]
    WorkerPanicked(String),

    /// A worker thread could not be started
    #[error("Failed to spawn thread: {0}")]
    Spawn(String),

    /// Pre-run cleanup hit an unexpected backend error
    #[error("Failed to clean up container {name}: {source}")]
    Cleanup {
        name: String,
        #[source]
        source: StoreError,
    },
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::Spawn(err.to_string())
    }
}

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Turn a thread's panic payload into a readable message
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
