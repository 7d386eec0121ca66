//! Error types for custom attributes.

use enclave_db::DbError;
use enclave_tenancy::TenancyError;
use thiserror::Error;

/// Result type for attribute operations.
pub type AttributeResult<T> = Result<T, AttributeError>;

#[derive(Debug, Error)]
pub enum AttributeError {
    /// The owner's entity type is registered without attribute support.
    #[error("entity type '{entity_type}' does not support custom attributes")]
    AttributeBindingMissing { entity_type: String },

    /// The owner's entity type is not registered.
    #[error("entity type '{entity_type}' is not registered")]
    OwnerNotFound { entity_type: String },

    /// A value cannot be represented, or a stored value cannot be decoded.
    #[error("invalid attribute value: {0}")]
    InvalidValue(String),

    #[error(transparent)]
    Tenancy(#[from] TenancyError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AttributeError {
    /// True if the write gate rejected the operation.
    pub fn is_write_denied(&self) -> bool {
        match self {
            Self::Tenancy(err) | Self::Db(DbError::Tenancy(err)) => err.is_write_denied(),
            _ => false,
        }
    }
}
