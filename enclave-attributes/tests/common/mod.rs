//! Shared test helpers for attribute tests.

#![allow(dead_code)]

use enclave_attributes::{AttributeHub, AttributeStore, OwnerKey};
use enclave_db::Database;
use enclave_tenancy::context;
use enclave_types::{EntityTypeId, NamespaceName};
use std::sync::Once;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

static INIT_TRACING: Once = Once::new();

pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A fresh database with the hub kind registered. Keep the `TempDir` alive.
pub struct Fixture {
    pub dir: TempDir,
    pub db: Database,
    pub hub_type: EntityTypeId,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        context::clear();
        let dir = TempDir::new().unwrap();
        let db = Database::open_in_dir(dir.path()).unwrap();
        let hub_type = AttributeHub::register(db.registry()).unwrap().id;
        Self { dir, db, hub_type }
    }

    /// A store over a new session on the host schema.
    pub fn store(&self) -> AttributeStore {
        AttributeStore::new(self.db.session().unwrap())
    }

    pub fn provision(&self, name: &str) -> NamespaceName {
        let namespace = NamespaceName::new(name).unwrap();
        self.db.create_namespace(&namespace).unwrap();
        namespace
    }

    pub fn hub_owner(&self, id: &str) -> OwnerKey {
        OwnerKey::new(self.hub_type, id)
    }
}

pub fn ns(name: &str) -> NamespaceName {
    NamespaceName::new(name).unwrap()
}
