//! The per-operation namespace context slot.
//!
//! Inside [`scope`] (or [`scope_with`] / [`sync_scope`]) the slot is a tokio
//! task-local, so two tasks multiplexed onto the same worker thread never see
//! each other's context. Outside any scope it falls back to a thread-local,
//! which is the right granularity for plain OS-thread workers.
//!
//! On a thread driven by a tokio runtime the thread-local would be shared by
//! every task scheduled there, so installing a context without a task scope
//! fails with [`TenancyError::UnscopedAsyncContext`]. Blocking work on such a
//! thread wraps itself in [`sync_scope`].
//!
//! There is no implicit default: a fresh scope or thread reads `None`.

use crate::error::{TenancyError, TenancyResult};
use enclave_types::{AccessLevel, NamespaceContext, NamespaceName};
use std::cell::RefCell;
use std::future::Future;

type Slot = RefCell<Option<NamespaceContext>>;

tokio::task_local! {
    static TASK_CONTEXT: Slot;
}

thread_local! {
    static THREAD_CONTEXT: Slot = const { RefCell::new(None) };
}

fn in_task_scope() -> bool {
    TASK_CONTEXT.try_with(|_| ()).is_ok()
}

fn on_runtime_thread() -> bool {
    tokio::runtime::Handle::try_current().is_ok()
}

fn with_slot<R>(f: impl FnOnce(&Slot) -> R) -> R {
    if in_task_scope() {
        TASK_CONTEXT.with(f)
    } else {
        THREAD_CONTEXT.with(f)
    }
}

/// Fails if installing a context here would leak it to other tasks.
pub fn ensure_isolated() -> TenancyResult<()> {
    if !in_task_scope() && on_runtime_thread() {
        return Err(TenancyError::UnscopedAsyncContext);
    }
    Ok(())
}

/// Installs a context for the current operation, replacing any existing one.
pub fn set(namespace: Option<NamespaceName>, access_level: AccessLevel) -> TenancyResult<()> {
    replace(Some(NamespaceContext::new(namespace, access_level)))?;
    Ok(())
}

/// Returns the current operation's context, if one is installed.
pub fn get() -> Option<NamespaceContext> {
    with_slot(|slot| slot.borrow().clone())
}

/// Removes the current operation's context.
pub fn clear() {
    restore(None);
}

/// Swaps the slot contents, returning what was there before.
pub fn replace(context: Option<NamespaceContext>) -> TenancyResult<Option<NamespaceContext>> {
    if context.is_some() {
        ensure_isolated()?;
    }
    Ok(restore(context))
}

/// Puts back a context captured earlier from this same slot.
pub(crate) fn restore(context: Option<NamespaceContext>) -> Option<NamespaceContext> {
    with_slot(|slot| slot.replace(context))
}

/// Runs `future` with its own, initially empty, context slot.
pub async fn scope<F: Future>(future: F) -> F::Output {
    TASK_CONTEXT.scope(RefCell::new(None), future).await
}

/// Runs `future` with its own context slot seeded with `context`.
pub async fn scope_with<F: Future>(context: Option<NamespaceContext>, future: F) -> F::Output {
    TASK_CONTEXT.scope(RefCell::new(context), future).await
}

/// Synchronous counterpart of [`scope`].
pub fn sync_scope<R>(f: impl FnOnce() -> R) -> R {
    TASK_CONTEXT.sync_scope(RefCell::new(None), f)
}
