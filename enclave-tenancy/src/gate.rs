//! Write-permission gate.
//!
//! Host-owned code (no context installed) may always write. Inside a
//! namespace context, only `read_write` access may write.

use crate::context;
use crate::error::{TenancyError, TenancyResult};
use enclave_types::AccessLevel;
use tracing::warn;

/// Fails with `WritePermissionDenied` if the current context is read-only.
pub fn check_write_permission() -> TenancyResult<()> {
    check(None)
}

/// Same as [`check_write_permission`], naming `entity_type` in the error.
pub fn check_write_permission_for(entity_type: &str) -> TenancyResult<()> {
    check(Some(entity_type))
}

/// Non-failing form of the gate for callers that only need to branch.
pub fn is_write_allowed() -> bool {
    context::get().is_none_or(|ctx| ctx.access_level.allows_write())
}

fn check(entity_type: Option<&str>) -> TenancyResult<()> {
    let Some(ctx) = context::get() else {
        return Ok(());
    };
    if ctx.access_level.allows_write() {
        return Ok(());
    }

    warn!(
        namespace = ctx.namespace_label(),
        entity_type = entity_type.unwrap_or("-"),
        plugin = ctx.plugin_label(),
        "Write denied: namespace context is read-only"
    );
    Err(TenancyError::WritePermissionDenied {
        namespace: ctx.namespace_label().to_string(),
        required: AccessLevel::ReadWrite,
        entity_type: entity_type.map(str::to_string),
        plugin: ctx.plugin,
    })
}
