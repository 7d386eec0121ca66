use crate::{NamespaceName, TypesError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access level granted to an operation inside a namespace.
///
/// Defaults to [`AccessLevel::Read`]: write access is only ever granted
/// explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    #[default]
    Read,
    ReadWrite,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::ReadWrite => "read_write",
        }
    }

    pub fn allows_write(&self) -> bool {
        matches!(self, Self::ReadWrite)
    }

    /// Whether a grant at this level satisfies a request for `requested`.
    /// `read_write` satisfies `read`; `read` never satisfies `read_write`.
    pub fn satisfies(&self, requested: AccessLevel) -> bool {
        match requested {
            Self::Read => true,
            Self::ReadWrite => self.allows_write(),
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "read_write" => Ok(Self::ReadWrite),
            other => Err(TypesError::InvalidAccessLevel(other.to_string())),
        }
    }
}

/// The namespace, access level and (optionally) plugin of one logical
/// operation.
///
/// `namespace: None` means the operation runs against the host schema but is
/// still subject to `access_level`. The *absence* of a context (no
/// `NamespaceContext` installed at all) is what marks host-owned code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceContext {
    pub namespace: Option<NamespaceName>,
    #[serde(default)]
    pub access_level: AccessLevel,
    /// Plugin the operation runs on behalf of, once it has been authenticated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
}

impl NamespaceContext {
    pub fn new(namespace: Option<NamespaceName>, access_level: AccessLevel) -> Self {
        Self {
            namespace,
            access_level,
            plugin: None,
        }
    }

    /// Attributes the operation to `plugin`.
    #[must_use]
    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    pub fn read(namespace: NamespaceName) -> Self {
        Self::new(Some(namespace), AccessLevel::Read)
    }

    pub fn read_write(namespace: NamespaceName) -> Self {
        Self::new(Some(namespace), AccessLevel::ReadWrite)
    }

    /// Namespace name for display in logs and error messages.
    pub fn namespace_label(&self) -> &str {
        self.namespace
            .as_ref()
            .map(NamespaceName::as_str)
            .unwrap_or("<host>")
    }

    /// Plugin name for logs; `-` when the operation is not attributed.
    pub fn plugin_label(&self) -> &str {
        self.plugin.as_deref().unwrap_or("-")
    }
}
