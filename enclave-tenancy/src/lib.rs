//! Operation-scoped tenancy for Enclave.
//!
//! Every plugin invocation runs inside a namespace context. This crate owns
//! the three pieces that make that safe:
//!
//! - [`context`]: the per-operation slot holding the active
//!   [`NamespaceContext`]. Task-local inside [`context::scope`], thread-local
//!   otherwise; never a shared global.
//! - [`SchemaRouter`]: switches the backing store's active schema for the
//!   duration of an operation and restores the enclosing one on every exit
//!   path through [`NamespaceGuard`].
//! - [`gate`]: the write-permission precondition every mutation runs first,
//!   wired into entity persistence through [`WriteGuarded`].
//!
//! Storage is reached only through the [`SchemaBackend`] trait; see
//! `enclave-db` for the SQLite implementation.

pub mod context;
mod error;
pub mod gate;
mod lifecycle;
mod router;

pub use enclave_types::{AccessLevel, NamespaceContext, NamespaceName};
pub use error::{TenancyError, TenancyResult};
pub use gate::{check_write_permission, check_write_permission_for, is_write_allowed};
pub use lifecycle::WriteGuarded;
pub use router::{NamespaceGuard, SchemaBackend, SchemaRouter};

/// Namespace of the current operation, if any.
pub fn current_namespace() -> Option<NamespaceName> {
    context::get().and_then(|ctx| ctx.namespace)
}

/// Plugin the current operation is attributed to, if any.
pub fn current_plugin() -> Option<String> {
    context::get().and_then(|ctx| ctx.plugin)
}

/// Access level of the current operation, or `None` for host-owned code.
pub fn current_access_level() -> Option<AccessLevel> {
    context::get().map(|ctx| ctx.access_level)
}
