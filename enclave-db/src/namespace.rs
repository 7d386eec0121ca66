//! Namespace provisioning and plugin authorization.
//!
//! A provisioned namespace carries its own `namespace_auth` table of hashed
//! access keys. Plugins present a key through their secrets; the key's stored
//! access level bounds what the plugin may request.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::{open_connection, schema};
use enclave_types::{AccessLevel, NamespaceContext, NamespaceName, TypesError};
use rusqlite::{OptionalExtension, TransactionBehavior, params};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{error, info, warn};

/// Secret holding a plugin's read key for its namespace.
pub const READ_KEY_SECRET: &str = "namespace_read_access_key";
/// Secret holding a plugin's read_write key for its namespace.
pub const READ_WRITE_KEY_SECRET: &str = "namespace_read_write_access_key";

/// Plaintext keys generated when a namespace is first provisioned.
///
/// Only the hashes are stored; these values are shown once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceKeys {
    pub read_access_key: String,
    pub read_write_access_key: String,
}

impl NamespaceKeys {
    fn generate() -> Self {
        Self {
            read_access_key: uuid::Uuid::new_v4().to_string(),
            read_write_access_key: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn key_for(&self, level: AccessLevel) -> &str {
        match level {
            AccessLevel::Read => &self.read_access_key,
            AccessLevel::ReadWrite => &self.read_write_access_key,
        }
    }

    /// The keys as plugin secrets, under their secret names.
    pub fn to_secrets(&self) -> HashMap<String, String> {
        HashMap::from([
            (READ_KEY_SECRET.to_string(), self.read_access_key.clone()),
            (
                READ_WRITE_KEY_SECRET.to_string(),
                self.read_write_access_key.clone(),
            ),
        ])
    }
}

/// SHA-256 of the key, hex encoded.
pub fn hash_key(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Name of the secret a plugin must configure to request `level`.
pub fn secret_name(level: AccessLevel) -> &'static str {
    match level {
        AccessLevel::Read => READ_KEY_SECRET,
        AccessLevel::ReadWrite => READ_WRITE_KEY_SECRET,
    }
}

/// Validates a name for provisioning: a valid namespace name in `org__name`
/// form.
pub fn validate_provisioned_name(name: &str) -> DbResult<NamespaceName> {
    let namespace = NamespaceName::new(name)?;
    if !namespace.is_org_qualified() {
        return Err(TypesError::InvalidNamespace {
            name: name.to_string(),
            reason: "provisioned namespaces must use the 'org__name' format".to_string(),
        }
        .into());
    }
    Ok(namespace)
}

impl Database {
    /// Provisions a namespace database.
    ///
    /// Returns freshly generated keys when the namespace had none, or `None`
    /// if it was already provisioned.
    pub fn create_namespace(&self, namespace: &NamespaceName) -> DbResult<Option<NamespaceKeys>> {
        let namespace = validate_provisioned_name(namespace.as_str())?;
        let path = self.namespace_path(&namespace);
        let mut conn = open_connection(&path, self.config())?;
        schema::init_namespace(&conn)?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing: i64 = tx.query_row(
            &format!("SELECT count(*) FROM main.{}", schema::NAMESPACE_AUTH_TABLE),
            [],
            |row| row.get(0),
        )?;
        if existing > 0 {
            tx.commit()?;
            info!(namespace = %namespace, "Namespace already exists");
            return Ok(None);
        }

        let keys = NamespaceKeys::generate();
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO main.{} (key_hash, access_level, description) VALUES (?1, ?2, ?3)",
                schema::NAMESPACE_AUTH_TABLE
            ))?;
            for level in [AccessLevel::Read, AccessLevel::ReadWrite] {
                stmt.execute(params![
                    hash_key(keys.key_for(level)),
                    level.as_str(),
                    format!("Auto-generated {level} access key"),
                ])?;
            }
        }
        tx.commit()?;

        info!(namespace = %namespace, "Created namespace with auto-generated access keys");
        Ok(Some(keys))
    }

    /// Adds a key to a namespace, or updates the level and description of an
    /// existing one.
    pub fn add_namespace_auth_key(
        &self,
        namespace: &NamespaceName,
        secret: &str,
        access_level: AccessLevel,
        description: &str,
    ) -> DbResult<()> {
        let conn = self.namespace_connection(namespace)?;
        conn.execute(
            &format!(
                "INSERT INTO main.{} (key_hash, access_level, description) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key_hash) DO UPDATE SET
                    access_level = excluded.access_level,
                    description = excluded.description",
                schema::NAMESPACE_AUTH_TABLE
            ),
            params![hash_key(secret), access_level.as_str(), description],
        )?;
        info!(
            namespace = %namespace,
            access_level = %access_level,
            "Added or updated namespace auth key"
        );
        Ok(())
    }

    /// Access level granted by `secret`, or `None` for an unknown key.
    pub fn check_namespace_auth_key(
        &self,
        namespace: &NamespaceName,
        secret: &str,
    ) -> DbResult<Option<AccessLevel>> {
        let conn = self.namespace_connection(namespace)?;
        let level: Option<String> = conn
            .query_row(
                &format!(
                    "SELECT access_level FROM main.{} WHERE key_hash = ?1",
                    schema::NAMESPACE_AUTH_TABLE
                ),
                params![hash_key(secret)],
                |row| row.get(0),
            )
            .optional()?;
        level
            .map(|s| s.parse::<AccessLevel>().map_err(DbError::from))
            .transpose()
    }

    fn namespace_connection(&self, namespace: &NamespaceName) -> DbResult<rusqlite::Connection> {
        if !self.namespace_exists(namespace) {
            return Err(DbError::NamespaceNotFound(namespace.to_string()));
        }
        open_connection(&self.namespace_path(namespace), self.config())
    }
}

/// Looks up the secret a plugin configured for `requested` access.
pub fn resolve_namespace_secret<'a>(
    plugin: &str,
    namespace: &NamespaceName,
    requested: AccessLevel,
    secrets: &'a HashMap<String, String>,
) -> DbResult<&'a str> {
    let name = secret_name(requested);
    match secrets.get(name).map(String::as_str) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(DbError::NamespaceAccess(format!(
            "Plugin '{plugin}' declares namespace '{namespace}' with '{requested}' access \
             but secret '{name}' is not configured. Ensure the secret is listed in the \
             manifest's 'secrets' array and has a value set."
        ))),
    }
}

/// Checks a plugin's configured key against the namespace and returns the
/// context it may run under, attributed to `plugin`.
///
/// A `read_write` key satisfies a `read` request; the context is still
/// `read`. Failures other than a missing or rejected key are reported as an
/// unexpected error.
pub fn verify_plugin_namespace_access(
    database: &Database,
    plugin: &str,
    namespace: &NamespaceName,
    requested: AccessLevel,
    secrets: &HashMap<String, String>,
) -> DbResult<NamespaceContext> {
    let secret = resolve_namespace_secret(plugin, namespace, requested, secrets)?;

    let granted = match database.check_namespace_auth_key(namespace, secret) {
        Ok(granted) => granted,
        Err(err @ DbError::NamespaceAccess(_)) => return Err(err),
        Err(err) => {
            error!(
                plugin,
                namespace = %namespace,
                error = %err,
                "Unexpected error verifying namespace access"
            );
            return Err(DbError::NamespaceAccess(format!(
                "Unexpected error verifying plugin '{plugin}' access to namespace \
                 '{namespace}': {err}"
            )));
        }
    };

    let Some(granted) = granted else {
        warn!(plugin, namespace = %namespace, "Rejected namespace access key");
        return Err(DbError::NamespaceAccess(format!(
            "Plugin '{plugin}' denied access to namespace '{namespace}': the '{}' value \
             is not a valid access key for this namespace.",
            secret_name(requested)
        )));
    };

    if !granted.satisfies(requested) {
        warn!(
            plugin,
            namespace = %namespace,
            requested = %requested,
            granted = %granted,
            "Namespace access key grants insufficient access"
        );
        return Err(DbError::NamespaceAccess(format!(
            "Plugin '{plugin}' requests '{requested}' access to namespace '{namespace}' \
             but the provided key only grants '{granted}' access. Use the \
             '{READ_WRITE_KEY_SECRET}' secret for write access."
        )));
    }

    Ok(NamespaceContext::new(Some(namespace.clone()), requested).with_plugin(plugin))
}
