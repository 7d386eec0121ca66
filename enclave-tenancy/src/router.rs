//! Scoped schema routing.
//!
//! [`SchemaRouter::enter`] switches the backend's active schema and installs
//! the matching [`NamespaceContext`]; the returned [`NamespaceGuard`] puts
//! both back when it is exited or dropped. Because restoration lives in
//! `Drop`, it also runs on early returns, panics, and when an async operation
//! holding the guard is cancelled.

use crate::context;
use crate::error::{TenancyError, TenancyResult};
use enclave_types::{AccessLevel, NamespaceContext, NamespaceName};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error};

/// The one mutable piece of shared state the router controls: the backing
/// connection's active schema (its "search path").
pub trait SchemaBackend: Send + Sync {
    /// Makes `namespace` the active schema. Must fail rather than leave an
    /// unknown schema active.
    fn set_search_path(&self, namespace: &NamespaceName) -> TenancyResult<()>;

    /// Returns to the default (host) schema.
    fn reset_search_path(&self) -> TenancyResult<()>;
}

fn apply(backend: &dyn SchemaBackend, namespace: Option<&NamespaceName>) -> TenancyResult<()> {
    match namespace {
        Some(ns) => backend.set_search_path(ns),
        None => backend.reset_search_path(),
    }
}

/// Switches the active namespace for the duration of an operation.
#[derive(Clone)]
pub struct SchemaRouter {
    backend: Arc<dyn SchemaBackend>,
}

impl SchemaRouter {
    pub fn new(backend: Arc<dyn SchemaBackend>) -> Self {
        Self { backend }
    }

    /// Enters `namespace` with `access_level`.
    ///
    /// On backend failure the current context is left untouched, the enclosing
    /// schema is re-applied best-effort, and `SchemaSwitchFailed` is returned.
    /// On a runtime thread outside any task scope nothing is switched and
    /// `UnscopedAsyncContext` is returned; use [`scoped`](Self::scoped) there.
    pub fn enter(
        &self,
        namespace: Option<NamespaceName>,
        access_level: AccessLevel,
    ) -> TenancyResult<NamespaceGuard> {
        self.enter_context(NamespaceContext::new(namespace, access_level))
    }

    /// Enters a prepared context, e.g. one returned by plugin authorization,
    /// keeping its plugin attribution.
    pub fn enter_context(&self, entered: NamespaceContext) -> TenancyResult<NamespaceGuard> {
        context::ensure_isolated()?;
        let previous = context::get();

        if let Err(err) = apply(self.backend.as_ref(), entered.namespace.as_ref()) {
            let enclosing = previous.as_ref().and_then(|ctx| ctx.namespace.as_ref());
            if let Err(restore_err) = apply(self.backend.as_ref(), enclosing) {
                error!(
                    namespace = entered.namespace_label(),
                    plugin = entered.plugin_label(),
                    error = %restore_err,
                    "Failed to re-apply enclosing schema after a failed switch"
                );
            }
            return Err(err);
        }

        context::restore(Some(entered.clone()));
        debug!(
            namespace = entered.namespace_label(),
            access_level = %entered.access_level,
            plugin = entered.plugin_label(),
            "Entered namespace"
        );

        Ok(NamespaceGuard {
            backend: Arc::clone(&self.backend),
            previous,
            entered,
            active: true,
        })
    }

    /// Runs `f` inside `namespace`, exiting afterwards whatever `f` returns.
    ///
    /// A restore failure is reported only when `f` itself succeeded; otherwise
    /// `f`'s error wins and the restore failure is logged.
    pub fn with_namespace<T, E, F>(
        &self,
        namespace: Option<NamespaceName>,
        access_level: AccessLevel,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<TenancyError>,
    {
        let guard = self.enter(namespace, access_level)?;
        match f() {
            Ok(value) => {
                guard.exit()?;
                Ok(value)
            }
            Err(err) => {
                drop(guard);
                Err(err)
            }
        }
    }

    /// Async counterpart of [`with_namespace`](Self::with_namespace).
    ///
    /// The future runs in its own task-scoped context slot seeded with the
    /// caller's context, so the guard stays valid across `.await` points even
    /// when the runtime moves the task between threads. Dropping the returned
    /// future mid-flight restores the enclosing schema.
    pub async fn scoped<T, E, Fut>(
        &self,
        namespace: Option<NamespaceName>,
        access_level: AccessLevel,
        future: Fut,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: From<TenancyError>,
    {
        self.scoped_context(NamespaceContext::new(namespace, access_level), future)
            .await
    }

    /// [`scoped`](Self::scoped) for a prepared context.
    pub async fn scoped_context<T, E, Fut>(
        &self,
        entered: NamespaceContext,
        future: Fut,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: From<TenancyError>,
    {
        let router = self.clone();
        context::scope_with(context::get(), async move {
            let guard = router.enter_context(entered).map_err(E::from)?;
            match future.await {
                Ok(value) => {
                    guard.exit().map_err(E::from)?;
                    Ok::<T, E>(value)
                }
                Err(err) => {
                    drop(guard);
                    Err(err)
                }
            }
        })
        .await
    }
}

impl std::fmt::Debug for SchemaRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRouter").finish_non_exhaustive()
    }
}

/// Restores the enclosing namespace when exited or dropped.
///
/// Guards must be released in reverse order of creation; keeping them as
/// lexically nested locals does that automatically.
#[must_use = "dropping the guard immediately exits the namespace"]
pub struct NamespaceGuard {
    backend: Arc<dyn SchemaBackend>,
    previous: Option<NamespaceContext>,
    entered: NamespaceContext,
    active: bool,
}

impl NamespaceGuard {
    /// The context installed by this guard.
    pub fn context(&self) -> &NamespaceContext {
        &self.entered
    }

    /// The context that will be reinstalled on exit.
    pub fn previous(&self) -> Option<&NamespaceContext> {
        self.previous.as_ref()
    }

    /// Exits the namespace, surfacing a failed schema restore to the caller.
    pub fn exit(mut self) -> TenancyResult<()> {
        self.restore()
    }

    fn restore(&mut self) -> TenancyResult<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        // Context first: even if the backend fails below, this operation must
        // not keep running under the inner namespace's permissions.
        context::restore(self.previous.clone());

        let enclosing = self.previous.as_ref().and_then(|ctx| ctx.namespace.as_ref());
        apply(self.backend.as_ref(), enclosing)?;

        debug!(
            namespace = self.entered.namespace_label(),
            plugin = self.entered.plugin_label(),
            restored = enclosing.map(NamespaceName::as_str).unwrap_or("<host>"),
            "Exited namespace"
        );
        Ok(())
    }
}

impl Drop for NamespaceGuard {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            error!(
                namespace = self.entered.namespace_label(),
                plugin = self.entered.plugin_label(),
                error = %err,
                "Failed to restore schema on namespace exit"
            );
        }
    }
}

impl std::fmt::Debug for NamespaceGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceGuard")
            .field("entered", &self.entered)
            .field("previous", &self.previous)
            .field("active", &self.active)
            .finish()
    }
}
