//! Per-operation sessions.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::lock;
use enclave_tenancy::{SchemaBackend, SchemaRouter, TenancyError, TenancyResult};
use enclave_types::NamespaceName;
use rusqlite::{Connection, params};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// One connection owned by one logical operation.
///
/// Clones share the connection. The active schema is either the host
/// (`main`) or the single attached namespace database.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    state: Mutex<SessionState>,
    database: Database,
}

struct SessionState {
    conn: Connection,
    active: Option<NamespaceName>,
}

impl Session {
    pub(crate) fn new(conn: Connection, database: Database) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                state: Mutex::new(SessionState { conn, active: None }),
                database,
            }),
        }
    }

    pub fn database(&self) -> &Database {
        &self.inner.database
    }

    /// A router that switches this session's active schema.
    pub fn router(&self) -> SchemaRouter {
        SchemaRouter::new(Arc::new(self.clone()))
    }

    /// The attached namespace, or `None` on the host schema.
    pub fn active_namespace(&self) -> DbResult<Option<NamespaceName>> {
        Ok(lock(&self.inner.state, "session")?.active.clone())
    }

    /// SQL identifier of the active schema: `main` or the quoted namespace.
    pub fn active_schema(&self) -> DbResult<String> {
        let state = lock(&self.inner.state, "session")?;
        Ok(schema_ident(state.active.as_ref()))
    }

    /// Runs `f` with the connection and the active schema identifier.
    ///
    /// The session stays locked for the duration of `f`, so the schema
    /// cannot change underneath it.
    pub fn with_connection<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection, &str) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut state = lock(&self.inner.state, "session")?;
        let schema = schema_ident(state.active.as_ref());
        f(&mut state.conn, &schema)
    }

    fn attach(&self, namespace: &NamespaceName) -> DbResult<()> {
        let mut state = lock(&self.inner.state, "session")?;
        if state.active.as_ref() == Some(namespace) {
            return Ok(());
        }

        let path = self.inner.database.namespace_path(namespace);
        if !path.is_file() {
            return Err(DbError::NamespaceNotFound(namespace.to_string()));
        }

        if let Some(previous) = state.active.take() {
            detach(&state.conn, &previous)?;
        }
        state.conn.execute(
            "ATTACH DATABASE ?1 AS ?2",
            params![path.to_string_lossy().into_owned(), namespace.as_str()],
        )?;
        state.active = Some(namespace.clone());
        debug!(namespace = %namespace, "Attached namespace database");
        Ok(())
    }

    fn detach_active(&self) -> DbResult<()> {
        let mut state = lock(&self.inner.state, "session")?;
        if let Some(previous) = state.active.take() {
            detach(&state.conn, &previous)?;
            debug!(namespace = %previous, "Detached namespace database");
        }
        Ok(())
    }
}

fn detach(conn: &Connection, namespace: &NamespaceName) -> DbResult<()> {
    conn.execute("DETACH DATABASE ?1", params![namespace.as_str()])?;
    Ok(())
}

fn schema_ident(active: Option<&NamespaceName>) -> String {
    active.map_or_else(|| "main".to_string(), NamespaceName::quoted)
}

fn switch_failed(namespace: &str, err: DbError) -> TenancyError {
    TenancyError::SchemaSwitchFailed {
        namespace: namespace.to_string(),
        reason: err.to_string(),
    }
}

impl SchemaBackend for Session {
    fn set_search_path(&self, namespace: &NamespaceName) -> TenancyResult<()> {
        self.attach(namespace)
            .map_err(|e| switch_failed(namespace.as_str(), e))
    }

    fn reset_search_path(&self) -> TenancyResult<()> {
        self.detach_active().map_err(|e| switch_failed("main", e))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("database", &self.inner.database)
            .finish_non_exhaustive()
    }
}
