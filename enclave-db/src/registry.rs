//! Entity type registry.
//!
//! Maps `(app_label, model)` to the stable [`EntityTypeId`] used as the owner
//! type of custom attributes. Lives in the host database only.

use crate::error::{DbError, DbResult};
use crate::lock;
use crate::schema::ENTITY_TYPE_TABLE;
use enclave_tenancy::check_write_permission_for;
use enclave_types::EntityTypeId;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTypeRecord {
    pub id: EntityTypeId,
    pub app_label: String,
    pub model: String,
    /// Whether instances of this type may own custom attributes.
    pub attributes_enabled: bool,
}

impl EntityTypeRecord {
    /// `app_label.model`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.app_label, self.model)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: EntityTypeId::new(row.get(0)?),
            app_label: row.get(1)?,
            model: row.get(2)?,
            attributes_enabled: row.get(3)?,
        })
    }
}

type CacheKey = (String, String);

/// Registry of entity types, cached in process after first lookup.
pub struct EntityTypeRegistry {
    conn: Arc<Mutex<Connection>>,
    cache: RwLock<HashMap<CacheKey, EntityTypeRecord>>,
}

impl EntityTypeRegistry {
    pub(crate) fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Registers an entity type, or updates `attributes_enabled` if it is
    /// already registered. Subject to the write gate.
    pub fn register(
        &self,
        app_label: &str,
        model: &str,
        attributes_enabled: bool,
    ) -> DbResult<EntityTypeRecord> {
        check_write_permission_for("EntityType")?;

        let record = {
            let conn = lock(&self.conn, "registry")?;
            conn.query_row(
                &format!(
                    "INSERT INTO main.{ENTITY_TYPE_TABLE} (app_label, model, attributes_enabled)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(app_label, model) DO UPDATE SET
                        attributes_enabled = excluded.attributes_enabled
                     RETURNING id, app_label, model, attributes_enabled"
                ),
                params![app_label, model, attributes_enabled],
                EntityTypeRecord::from_row,
            )?
        };

        self.cache_write()?.insert(
            (record.app_label.clone(), record.model.clone()),
            record.clone(),
        );
        info!(
            entity_type = %record.qualified_name(),
            id = %record.id,
            attributes_enabled,
            "Registered entity type"
        );
        Ok(record)
    }

    /// Finds a registered type by its natural key.
    pub fn lookup(&self, app_label: &str, model: &str) -> DbResult<Option<EntityTypeRecord>> {
        let key = (app_label.to_string(), model.to_string());
        if let Some(record) = self.cache_read()?.get(&key) {
            return Ok(Some(record.clone()));
        }

        let record = {
            let conn = lock(&self.conn, "registry")?;
            conn.query_row(
                &format!(
                    "SELECT id, app_label, model, attributes_enabled
                     FROM main.{ENTITY_TYPE_TABLE} WHERE app_label = ?1 AND model = ?2"
                ),
                params![app_label, model],
                EntityTypeRecord::from_row,
            )
            .optional()?
        };

        if let Some(record) = &record {
            self.cache_write()?.insert(key, record.clone());
        }
        Ok(record)
    }

    /// Finds a registered type by id.
    pub fn get(&self, id: EntityTypeId) -> DbResult<Option<EntityTypeRecord>> {
        let conn = lock(&self.conn, "registry")?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT id, app_label, model, attributes_enabled
                     FROM main.{ENTITY_TYPE_TABLE} WHERE id = ?1"
                ),
                params![id.get()],
                EntityTypeRecord::from_row,
            )
            .optional()?)
    }

    /// All registered types, ordered by id.
    pub fn list(&self) -> DbResult<Vec<EntityTypeRecord>> {
        let conn = lock(&self.conn, "registry")?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, app_label, model, attributes_enabled
             FROM main.{ENTITY_TYPE_TABLE} ORDER BY id"
        ))?;
        let rows = stmt.query_map([], EntityTypeRecord::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn cache_read(
        &self,
    ) -> DbResult<std::sync::RwLockReadGuard<'_, HashMap<CacheKey, EntityTypeRecord>>> {
        self.cache
            .read()
            .map_err(|_| DbError::LockPoisoned("registry cache"))
    }

    fn cache_write(
        &self,
    ) -> DbResult<std::sync::RwLockWriteGuard<'_, HashMap<CacheKey, EntityTypeRecord>>> {
        self.cache
            .write()
            .map_err(|_| DbError::LockPoisoned("registry cache"))
    }
}

impl std::fmt::Debug for EntityTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityTypeRegistry").finish_non_exhaustive()
    }
}
