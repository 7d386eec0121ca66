//! Shared test helpers for database tests.

#![allow(dead_code)]

use enclave_db::{Database, NamespaceKeys};
use enclave_types::NamespaceName;
use std::sync::Once;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

static INIT_TRACING: Once = Once::new();

/// Installs a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A database in a fresh temporary directory. Keep the `TempDir` alive for
/// the duration of the test.
pub fn temp_database() -> (TempDir, Database) {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let db = Database::open_in_dir(dir.path()).unwrap();
    (dir, db)
}

/// Provisions `name` and returns its generated keys.
pub fn provision(db: &Database, name: &str) -> (NamespaceName, NamespaceKeys) {
    let namespace = ns(name);
    let keys = db.create_namespace(&namespace).unwrap().unwrap();
    (namespace, keys)
}

pub fn ns(name: &str) -> NamespaceName {
    NamespaceName::new(name).unwrap()
}
