mod common;

use common::{ns, provision, temp_database};
use enclave_db::{
    DbError, READ_KEY_SECRET, READ_WRITE_KEY_SECRET, hash_key, resolve_namespace_secret,
    validate_provisioned_name, verify_plugin_namespace_access,
};
use enclave_types::{AccessLevel, NamespaceContext, TypesError};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

fn secrets(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn access_message(err: DbError) -> String {
    match err {
        DbError::NamespaceAccess(msg) => msg,
        other => panic!("expected NamespaceAccess, got {other:?}"),
    }
}

// ====================================================================
// Provisioning
// ====================================================================

#[test]
fn create_namespace_generates_keys_once() {
    let (_dir, db) = temp_database();
    let name = ns("acme__labs");
    assert!(!db.namespace_exists(&name));

    let keys = db.create_namespace(&name).unwrap().expect("first creation returns keys");
    assert!(db.namespace_exists(&name));
    assert_ne!(keys.read_access_key, keys.read_write_access_key);

    assert_eq!(db.create_namespace(&name).unwrap(), None);
}

#[test]
fn generated_keys_grant_their_levels() {
    let (_dir, db) = temp_database();
    let (name, keys) = provision(&db, "acme__labs");

    assert_eq!(
        db.check_namespace_auth_key(&name, &keys.read_access_key).unwrap(),
        Some(AccessLevel::Read)
    );
    assert_eq!(
        db.check_namespace_auth_key(&name, &keys.read_write_access_key).unwrap(),
        Some(AccessLevel::ReadWrite)
    );
    assert_eq!(db.check_namespace_auth_key(&name, "not-a-key").unwrap(), None);
}

#[test]
fn provisioning_requires_org_qualified_name() {
    let (_dir, db) = temp_database();
    let err = db.create_namespace(&ns("plugin_x")).unwrap_err();
    assert!(matches!(err, DbError::Types(TypesError::InvalidNamespace { .. })));
    assert!(err.to_string().contains("org__name"));
    assert!(!db.namespace_exists(&ns("plugin_x")));
}

#[test]
fn validate_provisioned_name_rules() {
    assert!(validate_provisioned_name("acme__labs").is_ok());
    assert!(validate_provisioned_name("acme_labs").is_err());
    assert!(validate_provisioned_name("__labs").is_err());
    assert!(validate_provisioned_name("Acme__labs").is_err());
    assert!(validate_provisioned_name("pg_acme__labs").is_err());
    assert!(validate_provisioned_name("main").is_err());
}

#[test]
fn keys_are_stored_hashed() {
    let (_dir, db) = temp_database();
    let (name, keys) = provision(&db, "acme__labs");

    let conn = rusqlite::Connection::open(db.namespace_path(&name)).unwrap();
    let stored: Vec<String> = conn
        .prepare("SELECT key_hash FROM namespace_auth ORDER BY id")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(
        stored,
        vec![
            hash_key(&keys.read_access_key),
            hash_key(&keys.read_write_access_key)
        ]
    );
}

#[test]
fn add_auth_key_upserts_on_hash() {
    let (_dir, db) = temp_database();
    let (name, _) = provision(&db, "acme__labs");

    db.add_namespace_auth_key(&name, "partner-key", AccessLevel::Read, "partner")
        .unwrap();
    assert_eq!(
        db.check_namespace_auth_key(&name, "partner-key").unwrap(),
        Some(AccessLevel::Read)
    );

    db.add_namespace_auth_key(&name, "partner-key", AccessLevel::ReadWrite, "promoted")
        .unwrap();
    assert_eq!(
        db.check_namespace_auth_key(&name, "partner-key").unwrap(),
        Some(AccessLevel::ReadWrite)
    );
}

#[test]
fn auth_operations_on_missing_namespace_fail() {
    let (_dir, db) = temp_database();
    let name = ns("acme__missing");
    assert!(matches!(
        db.check_namespace_auth_key(&name, "k"),
        Err(DbError::NamespaceNotFound(_))
    ));
    assert!(matches!(
        db.add_namespace_auth_key(&name, "k", AccessLevel::Read, ""),
        Err(DbError::NamespaceNotFound(_))
    ));
}

// ====================================================================
// resolve_namespace_secret
// ====================================================================

#[test]
fn resolve_picks_secret_by_level() {
    let name = ns("org__data");
    let s = secrets(&[
        (READ_KEY_SECRET, "my-read-secret"),
        (READ_WRITE_KEY_SECRET, "my-rw-secret"),
    ]);
    assert_eq!(
        resolve_namespace_secret("my_plugin", &name, AccessLevel::Read, &s).unwrap(),
        "my-read-secret"
    );
    assert_eq!(
        resolve_namespace_secret("my_plugin", &name, AccessLevel::ReadWrite, &s).unwrap(),
        "my-rw-secret"
    );
}

#[test]
fn resolve_rejects_missing_or_empty_secret() {
    let name = ns("org__data");
    let err = resolve_namespace_secret("my_plugin", &name, AccessLevel::Read, &secrets(&[]))
        .unwrap_err();
    let msg = access_message(err);
    assert!(msg.contains("not configured"));
    assert!(msg.contains("my_plugin"));
    assert!(msg.contains("org__data"));
    assert!(msg.contains(READ_KEY_SECRET));

    let empty = secrets(&[(READ_KEY_SECRET, "")]);
    assert!(resolve_namespace_secret("my_plugin", &name, AccessLevel::Read, &empty).is_err());
}

// ====================================================================
// verify_plugin_namespace_access
// ====================================================================

#[test]
fn verify_grants_requested_level() {
    let (_dir, db) = temp_database();
    let (name, keys) = provision(&db, "org__data");

    let ctx = verify_plugin_namespace_access(
        &db,
        "my_plugin",
        &name,
        AccessLevel::ReadWrite,
        &keys.to_secrets(),
    )
    .unwrap();
    assert_eq!(ctx, NamespaceContext::read_write(name).with_plugin("my_plugin"));
}

#[test]
fn verify_read_with_read_write_key_is_granted_as_read() {
    let (_dir, db) = temp_database();
    let (name, keys) = provision(&db, "org__data");
    let s = secrets(&[(READ_KEY_SECRET, keys.read_write_access_key.as_str())]);

    let ctx = verify_plugin_namespace_access(&db, "my_plugin", &name, AccessLevel::Read, &s)
        .unwrap();
    assert_eq!(ctx, NamespaceContext::read(name).with_plugin("my_plugin"));
}

#[test]
fn verified_context_keeps_plugin_identity_inside_the_namespace() {
    let (_dir, db) = temp_database();
    let (name, keys) = provision(&db, "org__data");
    let ctx = verify_plugin_namespace_access(
        &db,
        "my_plugin",
        &name,
        AccessLevel::Read,
        &keys.to_secrets(),
    )
    .unwrap();

    let session = db.session().unwrap();
    let guard = session.router().enter_context(ctx).unwrap();
    assert_eq!(session.active_namespace().unwrap(), Some(name.clone()));
    assert_eq!(enclave_tenancy::current_plugin().as_deref(), Some("my_plugin"));

    let err = enclave_tenancy::check_write_permission().unwrap_err();
    assert!(err.to_string().contains("(plugin 'my_plugin')"));
    guard.exit().unwrap();

    assert_eq!(enclave_tenancy::current_plugin(), None);
    assert_eq!(session.active_namespace().unwrap(), None);
}

#[test]
fn verify_rejects_unknown_key() {
    let (_dir, db) = temp_database();
    let (name, _) = provision(&db, "org__data");
    let s = secrets(&[(READ_KEY_SECRET, "bad-key")]);

    let err = verify_plugin_namespace_access(&db, "my_plugin", &name, AccessLevel::Read, &s)
        .unwrap_err();
    let msg = access_message(err);
    assert!(msg.contains("denied access"));
    assert!(msg.contains("not a valid access key"));
}

#[test]
fn verify_rejects_read_key_for_write() {
    let (_dir, db) = temp_database();
    let (name, keys) = provision(&db, "org__data");
    let s = secrets(&[(READ_WRITE_KEY_SECRET, keys.read_access_key.as_str())]);

    let err = verify_plugin_namespace_access(&db, "my_plugin", &name, AccessLevel::ReadWrite, &s)
        .unwrap_err();
    assert!(access_message(err).contains("only grants 'read' access"));
}

#[test]
fn verify_propagates_missing_secret_unchanged() {
    let (_dir, db) = temp_database();
    let (name, _) = provision(&db, "org__data");

    let err = verify_plugin_namespace_access(&db, "my_plugin", &name, AccessLevel::Read, &secrets(&[]))
        .unwrap_err();
    let msg = access_message(err);
    assert!(msg.contains("not configured"));
    assert!(!msg.contains("Unexpected error"));
}

#[test]
fn verify_wraps_unexpected_failures() {
    let (_dir, db) = temp_database();
    let name = ns("org__never_created");
    let s = secrets(&[(READ_KEY_SECRET, "some-key")]);

    let err = verify_plugin_namespace_access(&db, "my_plugin", &name, AccessLevel::Read, &s)
        .unwrap_err();
    let msg = access_message(err);
    assert!(msg.contains("Unexpected error"));
    assert!(msg.contains("org__never_created"));
}
