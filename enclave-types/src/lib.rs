//! Core type definitions for Enclave.
//!
//! This crate defines the small, storage-agnostic types shared by every
//! other Enclave crate:
//! - [`NamespaceName`]: a validated tenant/plugin schema name
//! - [`AccessLevel`]: read or read_write
//! - [`NamespaceContext`]: the namespace + access level of one logical operation
//! - [`EntityTypeId`]: the stable identifier of a registered entity type
//!
//! Nothing here touches a database or the ambient context; see
//! `enclave-tenancy` for that.

mod access;
mod ids;
mod namespace;

pub use access::{AccessLevel, NamespaceContext};
pub use ids::EntityTypeId;
pub use namespace::{NamespaceName, RESERVED_SCHEMAS, RESERVED_SCHEMA_PREFIXES};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, TypesError>;

/// Errors that can occur when constructing core types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    #[error("invalid namespace name '{name}': {reason}")]
    InvalidNamespace { name: String, reason: String },

    #[error("invalid access level '{0}': expected 'read' or 'read_write'")]
    InvalidAccessLevel(String),
}
