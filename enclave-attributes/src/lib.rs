//! Typed custom attributes for Enclave entities.
//!
//! Any record can carry named values without changing its own schema:
//!
//! - [`AttributeValue`] is the value sum type; [`AttributeSlots`] maps it to
//!   the seven typed storage columns, exactly one of which is ever set.
//! - [`AttributeStore`] reads and upserts attributes in the session's active
//!   schema, behind the write gate.
//! - [`HasAttributes`] gives an entity `get_attribute` / `set_attribute` and
//!   friends; [`AttributeHub`] is a ready-made entity that exists only to own
//!   attributes.

mod codec;
mod error;
mod hub;
mod owner;
mod record;
mod store;
mod value;

pub use codec::{AttributeSlots, ValueSlot};
pub use error::{AttributeError, AttributeResult};
pub use hub::{ATTRIBUTE_HUB, AttributeHub};
pub use owner::{AttributeBinding, EntityKind, HasAttributes};
pub use record::CustomAttribute;
pub use store::{AttributeCache, AttributeStore, OwnerKey};
pub use value::AttributeValue;
