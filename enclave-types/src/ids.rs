use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a registered entity type.
///
/// Assigned by the entity type registry and stored as the owner type of every
/// custom attribute record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityTypeId(i64);

impl EntityTypeId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for EntityTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntityTypeId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}
