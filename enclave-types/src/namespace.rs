//! Namespace names.
//!
//! A namespace name ends up interpolated into schema-qualified SQL, so it is
//! validated once at construction and carried around as [`NamespaceName`]
//! afterwards. Only lowercase ASCII identifiers are accepted.

use crate::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Schema names that can never be used as a namespace.
pub const RESERVED_SCHEMAS: &[&str] = &[
    "public",
    "main",
    "temp",
    "information_schema",
    "pg_catalog",
    "pg_toast",
];

/// Prefixes reserved by the storage engines.
pub const RESERVED_SCHEMA_PREFIXES: &[&str] = &["pg_", "sqlite_"];

const MAX_LEN: usize = 63;

/// A validated namespace (tenant schema) name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamespaceName(String);

impl NamespaceName {
    /// Validates and wraps a namespace name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypesError> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the name follows the `org__name` convention required for
    /// provisioned (shared data) namespaces.
    pub fn is_org_qualified(&self) -> bool {
        match self.0.split_once("__") {
            Some((org, rest)) => !org.is_empty() && !rest.is_empty(),
            None => false,
        }
    }

    /// Returns the name wrapped in double quotes for use as a SQL identifier.
    ///
    /// Validation guarantees the name never contains a quote character.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

fn validate(name: &str) -> Result<(), TypesError> {
    let invalid = |reason: &str| TypesError::InvalidNamespace {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_LEN {
        return Err(invalid("name is longer than 63 characters"));
    }
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(invalid("name must start with a lowercase letter"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(invalid(
            "only lowercase letters, digits and underscores are allowed",
        ));
    }
    if RESERVED_SCHEMAS.contains(&name) {
        return Err(invalid("name is a reserved schema"));
    }
    if RESERVED_SCHEMA_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return Err(invalid("name uses a reserved prefix"));
    }
    Ok(())
}

impl fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NamespaceName {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for NamespaceName {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for NamespaceName {
    type Error = TypesError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NamespaceName> for String {
    fn from(value: NamespaceName) -> Self {
        value.0
    }
}

impl AsRef<str> for NamespaceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
