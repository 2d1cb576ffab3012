//! Data model types for Arkiv attributes.
//!
//! - Attribute names and categories
//! - Wire values and typed attribute values
//! - References
//! - Entity snapshots

pub mod entity;
pub mod name;
pub mod reference;
pub mod value;

pub use entity::{AttributeSet, EntitySnapshot, SystemField};
pub use name::{AttributeName, Category, ATTRIBUTE_NAME_PATTERN};
pub use reference::{ArkivRef, ChainId, EntityKey, Scope, PAYLOAD_FIELD};
pub use value::{AttributeValue, GeoAxis, GeoCoordinate, Timestamp, WireKind, WireValue};
