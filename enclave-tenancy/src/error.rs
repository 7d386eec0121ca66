//! Error types for namespace routing and write gating.

use enclave_types::AccessLevel;
use thiserror::Error;

/// Result type for tenancy operations.
pub type TenancyResult<T> = Result<T, TenancyError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenancyError {
    /// A mutation was attempted inside a namespace context without write access.
    #[error(
        "cannot write{entity} in namespace '{namespace}'{by_plugin}: the namespace is read-only \
         for this operation, '{required}' access is required",
        entity = describe_entity(.entity_type),
        by_plugin = describe_plugin(.plugin)
    )]
    WritePermissionDenied {
        namespace: String,
        required: AccessLevel,
        entity_type: Option<String>,
        plugin: Option<String>,
    },

    /// A context was installed inside an async runtime outside any task scope,
    /// where the fallback slot would be shared by every task on the thread.
    #[error(
        "namespace context must be installed inside a task scope when running on an \
         async runtime; use context::scope or SchemaRouter::scoped"
    )]
    UnscopedAsyncContext,

    /// The backend refused to switch (or restore) the active schema.
    #[error("failed to switch active schema to '{namespace}': {reason}")]
    SchemaSwitchFailed { namespace: String, reason: String },
}

impl TenancyError {
    pub fn is_write_denied(&self) -> bool {
        matches!(self, Self::WritePermissionDenied { .. })
    }
}

fn describe_plugin(plugin: &Option<String>) -> String {
    match plugin {
        Some(name) => format!(" (plugin '{name}')"),
        None => String::new(),
    }
}

fn describe_entity(entity_type: &Option<String>) -> String {
    match entity_type {
        Some(name) => format!(" {name}"),
        None => String::new(),
    }
}
