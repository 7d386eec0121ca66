//! Attribute support for arbitrary entities.
//!
//! An entity opts in by implementing [`HasAttributes`] and holding an
//! [`AttributeBinding`]. Attributes are keyed by the registry id of the
//! entity's root [`EntityKind`], so every specialization of a record sees the
//! same attributes.

use crate::error::{AttributeError, AttributeResult};
use crate::record::CustomAttribute;
use crate::store::{AttributeCache, AttributeStore, OwnerKey};
use crate::value::AttributeValue;
use enclave_db::DbError;
use enclave_tenancy::check_write_permission_for;
use enclave_types::EntityTypeId;
use std::sync::{Mutex, MutexGuard, OnceLock};

/// Static description of an entity type.
#[derive(Debug, PartialEq, Eq)]
pub struct EntityKind {
    pub app_label: &'static str,
    pub model: &'static str,
    /// The kind this one specializes, if any.
    pub base: Option<&'static EntityKind>,
}

impl EntityKind {
    pub const fn new(app_label: &'static str, model: &'static str) -> Self {
        Self {
            app_label,
            model,
            base: None,
        }
    }

    /// A kind that stores its records (and attributes) as `base`.
    pub const fn specializing(
        base: &'static EntityKind,
        app_label: &'static str,
        model: &'static str,
    ) -> Self {
        Self {
            app_label,
            model,
            base: Some(base),
        }
    }

    /// The outermost base kind; `self` when there is none.
    pub fn root(&self) -> &EntityKind {
        let mut kind = self;
        while let Some(base) = kind.base {
            kind = base;
        }
        kind
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.app_label, self.model)
    }
}

/// The attribute capability held by an entity instance.
#[derive(Debug)]
pub struct AttributeBinding {
    store: AttributeStore,
    owner_type: OnceLock<EntityTypeId>,
    cache: Mutex<Option<AttributeCache>>,
}

impl AttributeBinding {
    pub fn new(store: AttributeStore) -> Self {
        Self {
            store,
            owner_type: OnceLock::new(),
            cache: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &AttributeStore {
        &self.store
    }

    /// Registry id for `kind`, resolved on first use and reused afterwards.
    pub fn owner_type(&self, kind: &'static EntityKind) -> AttributeResult<EntityTypeId> {
        if let Some(id) = self.owner_type.get() {
            return Ok(*id);
        }
        let id = self.store.resolve_owner_type(kind)?;
        Ok(*self.owner_type.get_or_init(|| id))
    }

    /// True if a prefetch cache is held.
    pub fn is_prefetched(&self) -> AttributeResult<bool> {
        Ok(self.cache()?.is_some())
    }

    pub fn clear_cache(&self) -> AttributeResult<()> {
        *self.cache()? = None;
        Ok(())
    }

    fn cache(&self) -> AttributeResult<MutexGuard<'_, Option<AttributeCache>>> {
        self.cache
            .lock()
            .map_err(|_| AttributeError::Db(DbError::LockPoisoned("attribute cache")))
    }
}

/// Custom attribute access for an entity.
///
/// Implementors supply their kind, their id and their binding; every
/// attribute operation is provided. Mutations are gated under the entity's
/// own qualified name, so a denial names e.g. `plugin_x.StaffProxy`.
pub trait HasAttributes {
    fn entity_kind(&self) -> &'static EntityKind;

    fn owner_id(&self) -> &str;

    fn attribute_binding(&self) -> &AttributeBinding;

    /// The key this entity's attributes are stored under.
    fn attribute_owner(&self) -> AttributeResult<OwnerKey> {
        let type_id = self.attribute_binding().owner_type(self.entity_kind())?;
        Ok(OwnerKey::new(type_id, self.owner_id()))
    }

    /// Reads one attribute, from the prefetch cache when it covers `name`.
    fn get_attribute(&self, name: &str) -> AttributeResult<Option<AttributeValue>> {
        let owner = self.attribute_owner()?;
        let binding = self.attribute_binding();
        let cache = binding.cache()?;
        match cache.as_ref() {
            Some(cache) if cache.owner() == &owner => binding.store().get_cached(cache, name),
            _ => binding.store().get(&owner, name),
        }
    }

    fn set_attribute(
        &self,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> AttributeResult<CustomAttribute>
    where
        Self: Sized,
    {
        self.check_attribute_write()?;
        let owner = self.attribute_owner()?;
        let binding = self.attribute_binding();
        let record = binding.store().set(&owner, name, value)?;
        if let Some(cache) = binding.cache()?.as_mut() {
            cache.record(name, record.value());
        }
        Ok(record)
    }

    fn set_attributes<I, K, V>(&self, values: I) -> AttributeResult<Vec<CustomAttribute>>
    where
        Self: Sized,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        self.check_attribute_write()?;
        let owner = self.attribute_owner()?;
        let binding = self.attribute_binding();
        let records = binding.store().set_many(&owner, values)?;
        if let Some(cache) = binding.cache()?.as_mut() {
            for record in &records {
                cache.record(&record.name, record.value());
            }
        }
        Ok(records)
    }

    fn delete_attribute(&self, name: &str) -> AttributeResult<bool> {
        self.check_attribute_write()?;
        let owner = self.attribute_owner()?;
        let binding = self.attribute_binding();
        let removed = binding.store().delete(&owner, name)?;
        if let Some(cache) = binding.cache()?.as_mut() {
            cache.forget(name);
        }
        Ok(removed)
    }

    /// Loads all attributes, or only `names`, so later reads skip the query.
    fn prefetch_attributes(&self, names: Option<&[&str]>) -> AttributeResult<()> {
        let owner = self.attribute_owner()?;
        let binding = self.attribute_binding();
        let cache = binding.store().prefetch(&owner, names)?;
        *binding.cache()? = Some(cache);
        Ok(())
    }

    /// The write gate for this entity's attributes.
    fn check_attribute_write(&self) -> AttributeResult<()> {
        Ok(check_write_permission_for(&self.entity_kind().qualified_name())?)
    }

    fn attribute_records(&self) -> AttributeResult<Vec<CustomAttribute>> {
        let owner = self.attribute_owner()?;
        self.attribute_binding().store().list(&owner)
    }
}
