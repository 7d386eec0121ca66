//! The database handle shared by every session.

use crate::config::DatabaseConfig;
use crate::error::DbResult;
use crate::registry::EntityTypeRegistry;
use crate::session::Session;
use crate::{open_connection, schema};
use enclave_types::NamespaceName;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Handle to an Enclave data directory. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

struct DatabaseInner {
    config: DatabaseConfig,
    registry: EntityTypeRegistry,
}

impl Database {
    /// Opens (or creates) the data directory and the host database.
    pub fn open(config: DatabaseConfig) -> DbResult<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let conn = open_connection(&config.main_path(), &config)?;
        schema::init_host(&conn)?;
        debug!(data_dir = %config.data_dir.display(), "Opened host database");

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                registry: EntityTypeRegistry::new(conn),
                config,
            }),
        })
    }

    /// Opens a data directory with default settings.
    pub fn open_in_dir(data_dir: impl Into<PathBuf>) -> DbResult<Self> {
        Self::open(DatabaseConfig::in_dir(data_dir))
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.inner.config.data_dir
    }

    pub fn registry(&self) -> &EntityTypeRegistry {
        &self.inner.registry
    }

    /// Checks out a new session on the host schema.
    pub fn session(&self) -> DbResult<Session> {
        let conn = open_connection(&self.inner.config.main_path(), &self.inner.config)?;
        Ok(Session::new(conn, self.clone()))
    }

    pub fn namespace_path(&self, namespace: &NamespaceName) -> PathBuf {
        self.inner.config.namespace_path(namespace)
    }

    /// True if the namespace has been provisioned.
    pub fn namespace_exists(&self, namespace: &NamespaceName) -> bool {
        self.namespace_path(namespace).is_file()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("data_dir", &self.inner.config.data_dir)
            .finish_non_exhaustive()
    }
}
