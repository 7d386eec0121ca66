//! SQLite storage layer for Enclave.
//!
//! # Layout
//!
//! - `<data_dir>/main.db` is the host schema: the entity type registry plus
//!   host-owned attributes.
//! - `<data_dir>/<namespace>.db` is one file per provisioned namespace, holding
//!   its `namespace_auth`, `custom_attribute` and `attribute_hub` tables.
//!
//! A [`Session`] is one connection checked out by one logical operation. It
//! implements [`SchemaBackend`](enclave_tenancy::SchemaBackend): switching the
//! active schema attaches the namespace file and detaches the previous one,
//! so a session never sees more than one tenant at a time.

mod config;
mod database;
mod error;
mod namespace;
mod registry;
pub mod schema;
mod session;

pub use config::{DatabaseConfig, JournalMode};
pub use database::Database;
pub use error::{DbError, DbResult};
pub use namespace::{
    NamespaceKeys, READ_KEY_SECRET, READ_WRITE_KEY_SECRET, hash_key, resolve_namespace_secret,
    secret_name, validate_provisioned_name, verify_plugin_namespace_access,
};
pub use registry::{EntityTypeRecord, EntityTypeRegistry};
pub use session::Session;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Opens a connection with the configured busy timeout and journal mode.
pub(crate) fn open_connection(path: &Path, config: &DatabaseConfig) -> DbResult<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(config.busy_timeout())?;
    let mode: String = conn.pragma_update_and_check(
        None,
        "journal_mode",
        config.journal_mode.as_str(),
        |row| row.get(0),
    )?;
    if !mode.eq_ignore_ascii_case(config.journal_mode.as_str()) {
        tracing::warn!(
            path = %path.display(),
            requested = config.journal_mode.as_str(),
            actual = %mode,
            "Journal mode not applied"
        );
    }
    Ok(conn)
}

pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, what: &'static str) -> DbResult<MutexGuard<'a, T>> {
    mutex.lock().map_err(|_| DbError::LockPoisoned(what))
}
