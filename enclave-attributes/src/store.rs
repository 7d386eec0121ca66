//! Custom attribute persistence in the active schema.
//!
//! Every mutation runs the write gate before touching storage. Writes are
//! upserts keyed on the `(content_type_id, object_id, name)` unique
//! constraint, so concurrent writers of the same name never create a second
//! row; the last writer wins.

use crate::codec::AttributeSlots;
use crate::error::{AttributeError, AttributeResult};
use crate::owner::EntityKind;
use crate::record::{CustomAttribute, RECORD_COLUMNS};
use crate::value::AttributeValue;
use enclave_db::Session;
use enclave_db::schema::{CUSTOM_ATTRIBUTE_TABLE, VALUE_COLUMNS};
use enclave_tenancy::check_write_permission_for;
use enclave_types::EntityTypeId;
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params, params_from_iter};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

const ENTITY_NAME: &str = "CustomAttribute";

/// Identifies the owner of a set of attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerKey {
    pub type_id: EntityTypeId,
    pub object_id: String,
}

impl OwnerKey {
    pub fn new(type_id: EntityTypeId, object_id: impl Into<String>) -> Self {
        Self {
            type_id,
            object_id: object_id.into(),
        }
    }
}

/// Attributes of one owner loaded ahead of time.
///
/// A cache built for a subset of names only answers for those names.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeCache {
    owner: OwnerKey,
    names: Option<BTreeSet<String>>,
    values: BTreeMap<String, AttributeValue>,
}

impl AttributeCache {
    pub fn owner(&self) -> &OwnerKey {
        &self.owner
    }

    /// True if the cache can answer for `name` without a query.
    pub fn covers(&self, name: &str) -> bool {
        self.names.as_ref().is_none_or(|names| names.contains(name))
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn record(&mut self, name: &str, value: AttributeValue) {
        if self.covers(name) {
            self.values.insert(name.to_string(), value);
        }
    }

    pub(crate) fn forget(&mut self, name: &str) {
        self.values.remove(name);
    }
}

/// Attribute CRUD over one session.
#[derive(Debug, Clone)]
pub struct AttributeStore {
    session: Session,
}

impl AttributeStore {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Resolves the registry id attributes of `kind` are stored under.
    ///
    /// Specializations share the id of their root base kind.
    pub fn resolve_owner_type(&self, kind: &'static EntityKind) -> AttributeResult<EntityTypeId> {
        let root = kind.root();
        let record = self
            .session
            .database()
            .registry()
            .lookup(root.app_label, root.model)?
            .ok_or_else(|| AttributeError::OwnerNotFound {
                entity_type: kind.qualified_name(),
            })?;
        if !record.attributes_enabled {
            return Err(AttributeError::AttributeBindingMissing {
                entity_type: kind.qualified_name(),
            });
        }
        Ok(record.id)
    }

    /// The value stored under `name`, or `None` if there is no such attribute.
    pub fn get(&self, owner: &OwnerKey, name: &str) -> AttributeResult<Option<AttributeValue>> {
        Ok(self.get_record(owner, name)?.map(|record| record.value()))
    }

    pub fn get_record(
        &self,
        owner: &OwnerKey,
        name: &str,
    ) -> AttributeResult<Option<CustomAttribute>> {
        let stored = self.session.with_connection(|conn, schema| {
            conn.query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM {schema}.{CUSTOM_ATTRIBUTE_TABLE}
                     WHERE content_type_id = ?1 AND object_id = ?2 AND name = ?3"
                ),
                params![owner.type_id.get(), owner.object_id, name],
                CustomAttribute::from_row,
            )
            .optional()
            .map_err(AttributeError::from)
        })?;
        stored.map(|s| s.decode()).transpose()
    }

    /// Answers from `cache` when it covers `name`, otherwise queries.
    pub fn get_cached(
        &self,
        cache: &AttributeCache,
        name: &str,
    ) -> AttributeResult<Option<AttributeValue>> {
        if cache.covers(name) {
            return Ok(cache.get(name).cloned());
        }
        self.get(cache.owner(), name)
    }

    /// Loads all attributes of `owner`, or only `names`, in one query.
    pub fn prefetch(
        &self,
        owner: &OwnerKey,
        names: Option<&[&str]>,
    ) -> AttributeResult<AttributeCache> {
        let records = self.select(owner, names)?;
        Ok(AttributeCache {
            owner: owner.clone(),
            names: names.map(|names| names.iter().map(|n| n.to_string()).collect()),
            values: records
                .into_iter()
                .map(|record| {
                    let value = record.value();
                    (record.name, value)
                })
                .collect(),
        })
    }

    /// All attributes of `owner`, ordered by name.
    pub fn list(&self, owner: &OwnerKey) -> AttributeResult<Vec<CustomAttribute>> {
        self.select(owner, None)
    }

    /// Creates or updates one attribute and returns the stored record.
    pub fn set(
        &self,
        owner: &OwnerKey,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> AttributeResult<CustomAttribute> {
        check_write_permission_for(ENTITY_NAME)?;
        let slots = AttributeSlots::from_value(value);
        let record = self
            .session
            .with_connection(|conn, schema| upsert(conn, schema, owner, name, &slots))?;
        debug!(
            owner_type = %owner.type_id,
            owner_id = %owner.object_id,
            name,
            "Upserted custom attribute"
        );
        Ok(record)
    }

    /// Creates or updates several attributes in one transaction.
    ///
    /// Returns the stored records ordered by name. A name given twice keeps
    /// its last value.
    pub fn set_many<I, K, V>(&self, owner: &OwnerKey, values: I) -> AttributeResult<Vec<CustomAttribute>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        check_write_permission_for(ENTITY_NAME)?;
        let values: BTreeMap<String, AttributeSlots> = values
            .into_iter()
            .map(|(name, value)| (name.into(), AttributeSlots::from_value(value)))
            .collect();
        if values.is_empty() {
            return Ok(Vec::new());
        }

        let records = self.session.with_connection(|conn, schema| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let records = values
                .iter()
                .map(|(name, slots)| upsert(&tx, schema, owner, name, slots))
                .collect::<AttributeResult<Vec<_>>>()?;
            tx.commit()?;
            Ok::<_, AttributeError>(records)
        })?;

        debug!(
            owner_type = %owner.type_id,
            owner_id = %owner.object_id,
            count = records.len(),
            "Upserted custom attributes"
        );
        Ok(records)
    }

    /// Removes one attribute. Returns false if it did not exist.
    pub fn delete(&self, owner: &OwnerKey, name: &str) -> AttributeResult<bool> {
        check_write_permission_for(ENTITY_NAME)?;
        let removed = self.session.with_connection(|conn, schema| {
            conn.execute(
                &format!(
                    "DELETE FROM {schema}.{CUSTOM_ATTRIBUTE_TABLE}
                     WHERE content_type_id = ?1 AND object_id = ?2 AND name = ?3"
                ),
                params![owner.type_id.get(), owner.object_id, name],
            )
            .map_err(AttributeError::from)
        })?;
        Ok(removed > 0)
    }

    /// Removes every attribute of `owner`. Returns how many were removed.
    pub fn delete_all(&self, owner: &OwnerKey) -> AttributeResult<usize> {
        check_write_permission_for(ENTITY_NAME)?;
        let removed = self
            .session
            .with_connection(|conn, schema| delete_owned(conn, schema, owner))?;
        debug!(
            owner_type = %owner.type_id,
            owner_id = %owner.object_id,
            removed,
            "Deleted custom attributes"
        );
        Ok(removed)
    }

    fn select(
        &self,
        owner: &OwnerKey,
        names: Option<&[&str]>,
    ) -> AttributeResult<Vec<CustomAttribute>> {
        if names.is_some_and(|names| names.is_empty()) {
            return Ok(Vec::new());
        }

        let stored = self.session.with_connection(|conn, schema| {
            let mut sql = format!(
                "SELECT {RECORD_COLUMNS} FROM {schema}.{CUSTOM_ATTRIBUTE_TABLE}
                 WHERE content_type_id = ?1 AND object_id = ?2"
            );
            let type_id = owner.type_id.get();
            let mut values: Vec<&dyn ToSql> = vec![&type_id, &owner.object_id];
            if let Some(names) = names {
                let placeholders: Vec<String> =
                    (0..names.len()).map(|i| format!("?{}", i + 3)).collect();
                sql.push_str(&format!(" AND name IN ({})", placeholders.join(", ")));
                values.extend(names.iter().map(|n| n as &dyn ToSql));
            }
            sql.push_str(" ORDER BY name");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values), CustomAttribute::from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(AttributeError::from)
        })?;

        stored.into_iter().map(|s| s.decode()).collect()
    }
}

fn upsert(
    conn: &Connection,
    schema: &str,
    owner: &OwnerKey,
    name: &str,
    slots: &AttributeSlots,
) -> AttributeResult<CustomAttribute> {
    let stored = slots.encode()?;
    let columns = VALUE_COLUMNS.join(", ");
    let updates = VALUE_COLUMNS
        .iter()
        .map(|c| format!("{c} = excluded.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {schema}.{CUSTOM_ATTRIBUTE_TABLE}
            (content_type_id, object_id, name, {columns})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(content_type_id, object_id, name) DO UPDATE SET {updates}
         RETURNING {RECORD_COLUMNS}"
    );

    let type_id = owner.type_id.get();
    let mut values: Vec<&dyn ToSql> = vec![&type_id, &owner.object_id, &name];
    values.extend(stored.params());
    let row = conn.query_row(&sql, values.as_slice(), CustomAttribute::from_row)?;
    row.decode()
}

/// Deletes every attribute of `owner` on `conn`. Shared with owner deletion,
/// which runs it inside its own transaction.
pub(crate) fn delete_owned(
    conn: &Connection,
    schema: &str,
    owner: &OwnerKey,
) -> AttributeResult<usize> {
    Ok(conn.execute(
        &format!(
            "DELETE FROM {schema}.{CUSTOM_ATTRIBUTE_TABLE}
             WHERE content_type_id = ?1 AND object_id = ?2"
        ),
        params![owner.type_id.get(), owner.object_id],
    )?)
}
