//! Error types for the database layer.

use enclave_tenancy::TenancyError;
use enclave_types::TypesError;
use thiserror::Error;

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Write gate or schema routing failure.
    #[error(transparent)]
    Tenancy(#[from] TenancyError),

    /// Invalid namespace name or access level.
    #[error(transparent)]
    Types(#[from] TypesError),

    /// The namespace has not been provisioned.
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    /// A plugin could not be granted access to its namespace.
    #[error("namespace access error: {0}")]
    NamespaceAccess(String),

    /// Stored data could not be decoded.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A connection mutex was poisoned by a panicking holder.
    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),
}
