//! Error types for the storage layer.

use thiserror::Error;
use trellis_types::ValidationError;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The connection mutex was poisoned by a panicking holder.
    #[error("connection lock poisoned")]
    Poisoned,

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Errors returned by `PageRegistry::register_page`.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
