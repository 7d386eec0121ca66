//! Maps an [`AttributeValue`] onto seven typed storage slots and back.
//!
//! At most one slot is ever populated. [`AttributeSlots::set`] clears every
//! slot before filling the one matching the value's variant, so re-setting a
//! value of a different type never leaves a stale slot behind.

use crate::error::{AttributeError, AttributeResult};
use crate::value::AttributeValue;
use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};
use enclave_db::schema::VALUE_COLUMNS;
use rust_decimal::Decimal;
use rusqlite::Row;
use rusqlite::types::ToSql;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Years representable with a four-digit ISO 8601 year.
const STORABLE_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// One typed storage slot, in read order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueSlot {
    Text,
    Date,
    Timestamp,
    Int,
    Decimal,
    Bool,
    Json,
}

impl ValueSlot {
    /// Every slot, in the order a reader consults them.
    pub const ALL: [ValueSlot; 7] = [
        Self::Text,
        Self::Date,
        Self::Timestamp,
        Self::Int,
        Self::Decimal,
        Self::Bool,
        Self::Json,
    ];

    /// The slot a value belongs in, or `None` for null.
    pub fn for_value(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Null | AttributeValue::Json(serde_json::Value::Null) => None,
            AttributeValue::Text(_) => Some(Self::Text),
            AttributeValue::Int(_) => Some(Self::Int),
            AttributeValue::Bool(_) => Some(Self::Bool),
            AttributeValue::Decimal(_) => Some(Self::Decimal),
            AttributeValue::Date(_) => Some(Self::Date),
            AttributeValue::Timestamp(_) => Some(Self::Timestamp),
            AttributeValue::Json(_) => Some(Self::Json),
        }
    }

    /// Storage column backing this slot.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Text => VALUE_COLUMNS[0],
            Self::Date => VALUE_COLUMNS[1],
            Self::Timestamp => VALUE_COLUMNS[2],
            Self::Int => VALUE_COLUMNS[3],
            Self::Decimal => VALUE_COLUMNS[4],
            Self::Bool => VALUE_COLUMNS[5],
            Self::Json => VALUE_COLUMNS[6],
        }
    }
}

/// The seven value slots of one attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSlots {
    text: Option<String>,
    date: Option<NaiveDate>,
    timestamp: Option<DateTime<Utc>>,
    int: Option<i64>,
    decimal: Option<Decimal>,
    bool: Option<bool>,
    json: Option<serde_json::Value>,
}

impl AttributeSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: impl Into<AttributeValue>) -> Self {
        let mut slots = Self::new();
        slots.set(value);
        slots
    }

    /// Clears every slot, then stores a non-null value in its one slot.
    pub fn set(&mut self, value: impl Into<AttributeValue>) {
        self.clear();
        match value.into() {
            AttributeValue::Null => {}
            AttributeValue::Text(v) => self.text = Some(v),
            AttributeValue::Int(v) => self.int = Some(v),
            AttributeValue::Bool(v) => self.bool = Some(v),
            AttributeValue::Decimal(v) => self.decimal = Some(v),
            AttributeValue::Date(v) => self.date = Some(v),
            AttributeValue::Timestamp(v) => self.timestamp = Some(v),
            AttributeValue::Json(serde_json::Value::Null) => {}
            AttributeValue::Json(v) => self.json = Some(v),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// The stored value, or `Null` when every slot is clear.
    pub fn value(&self) -> AttributeValue {
        if let Some(v) = &self.text {
            AttributeValue::Text(v.clone())
        } else if let Some(v) = self.date {
            AttributeValue::Date(v)
        } else if let Some(v) = self.timestamp {
            AttributeValue::Timestamp(v)
        } else if let Some(v) = self.int {
            AttributeValue::Int(v)
        } else if let Some(v) = self.decimal {
            AttributeValue::Decimal(v)
        } else if let Some(v) = self.bool {
            AttributeValue::Bool(v)
        } else if let Some(v) = &self.json {
            AttributeValue::Json(v.clone())
        } else {
            AttributeValue::Null
        }
    }

    /// Which slot holds the value, if any.
    pub fn populated(&self) -> Option<ValueSlot> {
        ValueSlot::ALL.into_iter().find(|slot| self.is_set(*slot))
    }

    /// Number of non-empty slots. Never more than one for slots built
    /// through [`set`](Self::set).
    pub fn populated_count(&self) -> usize {
        ValueSlot::ALL
            .into_iter()
            .filter(|slot| self.is_set(*slot))
            .count()
    }

    pub fn is_set(&self, slot: ValueSlot) -> bool {
        match slot {
            ValueSlot::Text => self.text.is_some(),
            ValueSlot::Date => self.date.is_some(),
            ValueSlot::Timestamp => self.timestamp.is_some(),
            ValueSlot::Int => self.int.is_some(),
            ValueSlot::Decimal => self.decimal.is_some(),
            ValueSlot::Bool => self.bool.is_some(),
            ValueSlot::Json => self.json.is_some(),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn int(&self) -> Option<i64> {
        self.int
    }

    pub fn decimal(&self) -> Option<Decimal> {
        self.decimal
    }

    pub fn bool(&self) -> Option<bool> {
        self.bool
    }

    pub fn json(&self) -> Option<&serde_json::Value> {
        self.json.as_ref()
    }

    /// Column encodings, in [`VALUE_COLUMNS`] order.
    ///
    /// Dates and timestamps outside years 1 to 9999 are rejected here, before
    /// anything is written, because their text form would not parse back.
    pub(crate) fn encode(&self) -> AttributeResult<StoredSlots> {
        if let Some(date) = self.date {
            check_year("date", date.year(), &date)?;
        }
        if let Some(ts) = self.timestamp {
            check_year("timestamp", ts.year(), &ts)?;
        }
        Ok(StoredSlots {
            text: self.text.clone(),
            date: self.date.map(|d| d.format(DATE_FORMAT).to_string()),
            timestamp: self
                .timestamp
                .map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            int: self.int,
            decimal: self.decimal.map(|d| d.to_string()),
            bool: self.bool,
            json: self.json.as_ref().map(serde_json::to_string).transpose()?,
        })
    }
}

fn check_year(kind: &str, year: i32, value: &dyn std::fmt::Display) -> AttributeResult<()> {
    if STORABLE_YEARS.contains(&year) {
        return Ok(());
    }
    Err(AttributeError::InvalidValue(format!(
        "{kind} {value} is out of range: only years {} to {} can be stored",
        STORABLE_YEARS.start(),
        STORABLE_YEARS.end()
    )))
}

/// Slot values as stored in SQLite.
#[derive(Debug, Clone, Default)]
pub(crate) struct StoredSlots {
    text: Option<String>,
    date: Option<String>,
    timestamp: Option<String>,
    int: Option<i64>,
    decimal: Option<String>,
    bool: Option<bool>,
    json: Option<String>,
}

impl StoredSlots {
    /// Reads the seven value columns starting at `offset`.
    pub(crate) fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            text: row.get(offset)?,
            date: row.get(offset + 1)?,
            timestamp: row.get(offset + 2)?,
            int: row.get(offset + 3)?,
            decimal: row.get(offset + 4)?,
            bool: row.get(offset + 5)?,
            json: row.get(offset + 6)?,
        })
    }

    pub(crate) fn params(&self) -> [&dyn ToSql; 7] {
        [
            &self.text,
            &self.date,
            &self.timestamp,
            &self.int,
            &self.decimal,
            &self.bool,
            &self.json,
        ]
    }

    pub(crate) fn decode(self) -> AttributeResult<AttributeSlots> {
        let invalid = |column: &str, raw: &str, err: &dyn std::fmt::Display| {
            AttributeError::InvalidValue(format!("stored {column} '{raw}' is malformed: {err}"))
        };

        let date = self
            .date
            .map(|raw| {
                NaiveDate::parse_from_str(&raw, DATE_FORMAT)
                    .map_err(|e| invalid("date_value", &raw, &e))
            })
            .transpose()?;
        let timestamp = self
            .timestamp
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| invalid("timestamp_value", &raw, &e))
            })
            .transpose()?;
        let decimal = self
            .decimal
            .map(|raw| {
                raw.parse::<Decimal>()
                    .map_err(|e| invalid("decimal_value", &raw, &e))
            })
            .transpose()?;
        let json = self
            .json
            .map(|raw| serde_json::from_str(&raw))
            .transpose()?;

        Ok(AttributeSlots {
            text: self.text,
            date,
            timestamp,
            int: self.int,
            decimal,
            bool: self.bool,
            json,
        })
    }
}
