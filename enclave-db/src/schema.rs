//! Table definitions.
//!
//! The host database (`main`) holds the entity type registry plus host-owned
//! custom attributes and hubs. Every namespace database holds its own
//! `custom_attribute`, `attribute_hub` and `namespace_auth` tables. DDL takes
//! the schema identifier so the same statements serve both.

use rusqlite::Connection;

pub const CUSTOM_ATTRIBUTE_TABLE: &str = "custom_attribute";
pub const ATTRIBUTE_HUB_TABLE: &str = "attribute_hub";
pub const ENTITY_TYPE_TABLE: &str = "entity_type";
pub const NAMESPACE_AUTH_TABLE: &str = "namespace_auth";

/// Value columns of `custom_attribute`, in the codec's read order.
pub const VALUE_COLUMNS: [&str; 7] = [
    "text_value",
    "date_value",
    "timestamp_value",
    "int_value",
    "decimal_value",
    "bool_value",
    "json_value",
];

fn custom_attribute_ddl(schema: &str) -> String {
    format!(
        "
        CREATE TABLE IF NOT EXISTS {schema}.{CUSTOM_ATTRIBUTE_TABLE} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content_type_id INTEGER NOT NULL,
            object_id TEXT NOT NULL,
            name TEXT NOT NULL,
            text_value TEXT,
            date_value TEXT,
            timestamp_value TEXT,
            int_value INTEGER,
            decimal_value TEXT,
            bool_value INTEGER,
            json_value TEXT,
            CONSTRAINT unique_custom_attribute UNIQUE (content_type_id, object_id, name),
            CONSTRAINT single_value_slot CHECK (
                (text_value IS NOT NULL) + (date_value IS NOT NULL)
                + (timestamp_value IS NOT NULL) + (int_value IS NOT NULL)
                + (decimal_value IS NOT NULL) + (bool_value IS NOT NULL)
                + (json_value IS NOT NULL) <= 1
            )
        );
        "
    )
}

fn attribute_hub_ddl(schema: &str) -> String {
    format!(
        "
        CREATE TABLE IF NOT EXISTS {schema}.{ATTRIBUTE_HUB_TABLE} (
            id TEXT PRIMARY KEY,
            type TEXT NOT NULL
        );
        "
    )
}

/// Creates the host tables in the `main` schema of `conn`.
pub fn init_host(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS main.{ENTITY_TYPE_TABLE} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            app_label TEXT NOT NULL,
            model TEXT NOT NULL,
            attributes_enabled INTEGER NOT NULL DEFAULT 1,
            UNIQUE (app_label, model)
        );
        {}
        {}
        ",
        custom_attribute_ddl("main"),
        attribute_hub_ddl("main"),
    ))
}

/// Creates the namespace tables in the `main` schema of a connection opened
/// directly on a namespace file.
pub fn init_namespace(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS main.{NAMESPACE_AUTH_TABLE} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            key_hash TEXT NOT NULL UNIQUE,
            access_level TEXT NOT NULL CHECK (access_level IN ('read', 'read_write')),
            description TEXT NOT NULL DEFAULT ''
        );
        {}
        {}
        ",
        custom_attribute_ddl("main"),
        attribute_hub_ddl("main"),
    ))
}
