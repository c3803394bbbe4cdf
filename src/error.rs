//! Error types for the collection store.

use thiserror::Error;

/// Main error type for store operations.
///
/// Lookups that miss are not errors: they come back as
/// [`Lookup::NotFound`](crate::types::Lookup), `false` or `None`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load collection {collection}: {reason}")]
    Load { collection: String, reason: String },

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Invalid document format: {0}")]
    InvalidFormat(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Storage quota exceeded writing {key}: {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    #[error("Storage is locked by another process")]
    Locked,
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl StoreError {
    pub(crate) fn load(collection: &str, reason: impl Into<String>) -> Self {
        StoreError::Load {
            collection: collection.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
