//! Persisted custom attribute rows.

use crate::codec::{AttributeSlots, StoredSlots};
use crate::error::AttributeResult;
use crate::value::AttributeValue;
use enclave_types::EntityTypeId;
use rusqlite::Row;
use std::fmt;

/// Columns selected for a full record, in [`CustomAttribute::from_row`] order.
pub(crate) const RECORD_COLUMNS: &str = "id, content_type_id, object_id, name, \
     text_value, date_value, timestamp_value, int_value, decimal_value, bool_value, json_value";

/// One named value attached to one owner.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttribute {
    pub id: i64,
    pub owner_type: EntityTypeId,
    pub owner_id: String,
    pub name: String,
    pub slots: AttributeSlots,
}

impl CustomAttribute {
    pub fn value(&self) -> AttributeValue {
        self.slots.value()
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<StoredAttribute> {
        Ok(StoredAttribute {
            id: row.get(0)?,
            owner_type: EntityTypeId::new(row.get(1)?),
            owner_id: row.get(2)?,
            name: row.get(3)?,
            slots: StoredSlots::from_row(row, 4)?,
        })
    }
}

impl fmt::Display for CustomAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} - {}: {}",
            self.owner_type,
            self.owner_id,
            self.name,
            self.value()
        )
    }
}

/// A row as read from SQLite, before its slots are decoded.
pub(crate) struct StoredAttribute {
    id: i64,
    owner_type: EntityTypeId,
    owner_id: String,
    name: String,
    slots: StoredSlots,
}

impl StoredAttribute {
    pub(crate) fn decode(self) -> AttributeResult<CustomAttribute> {
        Ok(CustomAttribute {
            id: self.id,
            owner_type: self.owner_type,
            owner_id: self.owner_id,
            name: self.name,
            slots: self.slots.decode()?,
        })
    }
}
