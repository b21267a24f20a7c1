//! Error types for backend operations

use thiserror::Error;

/// Errors a backend call can fail with
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Container does not exist
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    /// Container name already taken
    #[error("Container already exists: {0}")]
    ContainerAlreadyExists(String),

    /// Container is already open
    #[error("Container already open: {0}")]
    ContainerAlreadyOpen(String),

    /// Item does not exist
    #[error("Item not found: {item_type}/{id}")]
    ItemNotFound { item_type: String, id: String },

    /// Item id already used within its type
    #[error("Item already exists: {item_type}/{id}")]
    ItemAlreadyExists { item_type: String, id: String },

    /// Unknown container or search handle
    #[error("Invalid handle: {0}")]
    InvalidHandle(i64),

    /// Malformed request payload
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    /// Malformed search query
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Transport or storage failure
    #[error("IO error: {0}")]
    Io(String),
}

impl StoreError {
    /// Numeric code reported by the storage plugin for this error
    pub fn code(&self) -> i32 {
        match self {
            StoreError::InvalidHandle(_) => 112,
            StoreError::InvalidStructure(_) => 113,
            StoreError::Io(_) => 114,
            StoreError::ContainerAlreadyExists(_) => 203,
            StoreError::ContainerNotFound(_) => 204,
            StoreError::ContainerAlreadyOpen(_) => 206,
            StoreError::ItemNotFound { .. } => 212,
            StoreError::ItemAlreadyExists { .. } => 213,
            StoreError::InvalidQuery(_) => 300,
        }
    }

    /// Whether the error means "the container is not there"
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::ContainerNotFound(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::InvalidStructure(err.to_string())
    }
}

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, StoreError>;
