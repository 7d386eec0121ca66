//! A record that exists only to own custom attributes.

use crate::error::{AttributeError, AttributeResult};
use crate::owner::{AttributeBinding, EntityKind, HasAttributes};
use crate::store::{AttributeStore, delete_owned};
use enclave_db::schema::ATTRIBUTE_HUB_TABLE;
use enclave_db::{DbResult, EntityTypeRecord, EntityTypeRegistry};
use enclave_tenancy::WriteGuarded;
use rusqlite::{OptionalExtension, TransactionBehavior, params};
use std::fmt;
use tracing::debug;

/// Kind of every [`AttributeHub`].
pub static ATTRIBUTE_HUB: EntityKind = EntityKind::new("enclave", "AttributeHub");

/// Free-standing key/value data: an id, a type tag, and attributes.
#[derive(Debug)]
pub struct AttributeHub {
    id: String,
    hub_type: String,
    binding: AttributeBinding,
}

impl AttributeHub {
    pub fn new(store: AttributeStore, id: impl Into<String>, hub_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            hub_type: hub_type.into(),
            binding: AttributeBinding::new(store),
        }
    }

    /// Registers the hub kind with attribute support.
    pub fn register(registry: &EntityTypeRegistry) -> DbResult<EntityTypeRecord> {
        registry.register(ATTRIBUTE_HUB.app_label, ATTRIBUTE_HUB.model, true)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn hub_type(&self) -> &str {
        &self.hub_type
    }

    /// Inserts or updates the hub row in the active schema.
    pub fn save(&self) -> AttributeResult<()> {
        self.before_save()?;
        self.binding.store().session().with_connection(|conn, schema| {
            conn.execute(
                &format!(
                    "INSERT INTO {schema}.{ATTRIBUTE_HUB_TABLE} (id, type) VALUES (?1, ?2)
                     ON CONFLICT(id) DO UPDATE SET type = excluded.type"
                ),
                params![self.id, self.hub_type],
            )
            .map_err(AttributeError::from)
        })?;
        debug!(id = %self.id, hub_type = %self.hub_type, "Saved attribute hub");
        Ok(())
    }

    /// Loads a hub from the active schema.
    pub fn load(store: &AttributeStore, id: &str) -> AttributeResult<Option<Self>> {
        let hub_type: Option<String> = store.session().with_connection(|conn, schema| {
            conn.query_row(
                &format!("SELECT type FROM {schema}.{ATTRIBUTE_HUB_TABLE} WHERE id = ?1"),
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(AttributeError::from)
        })?;
        Ok(hub_type.map(|hub_type| Self::new(store.clone(), id, hub_type)))
    }

    /// Loads a hub and prefetches all of its attributes, or only `names`.
    pub fn load_prefetched(
        store: &AttributeStore,
        id: &str,
        names: Option<&[&str]>,
    ) -> AttributeResult<Option<Self>> {
        let Some(hub) = Self::load(store, id)? else {
            return Ok(None);
        };
        hub.prefetch_attributes(names)?;
        Ok(Some(hub))
    }

    /// Deletes the hub and all of its attributes in one transaction.
    /// Returns how many attributes were removed.
    pub fn delete(self) -> AttributeResult<usize> {
        self.before_delete()?;
        let owner = self.attribute_owner()?;
        let removed = self.binding.store().session().with_connection(|conn, schema| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let removed = delete_owned(&tx, schema, &owner)?;
            tx.execute(
                &format!("DELETE FROM {schema}.{ATTRIBUTE_HUB_TABLE} WHERE id = ?1"),
                params![self.id],
            )?;
            tx.commit()?;
            Ok::<_, AttributeError>(removed)
        })?;
        debug!(id = %self.id, removed, "Deleted attribute hub");
        Ok(removed)
    }
}

impl WriteGuarded for AttributeHub {
    fn entity_name(&self) -> &str {
        "AttributeHub"
    }
}

impl HasAttributes for AttributeHub {
    fn entity_kind(&self) -> &'static EntityKind {
        &ATTRIBUTE_HUB
    }

    fn owner_id(&self) -> &str {
        &self.id
    }

    fn attribute_binding(&self) -> &AttributeBinding {
        &self.binding
    }
}

impl fmt::Display for AttributeHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttributeHub({}): {}", self.hub_type, self.id)
    }
}
