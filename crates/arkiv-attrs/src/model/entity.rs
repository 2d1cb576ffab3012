//! Entity snapshots as handed over by an entity store.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::model::{EntityKey, WireValue};

/// Custom attributes keyed by name, in a stable order.
pub type AttributeSet = BTreeMap<String, WireValue>;

/// Read-only metadata fields addressable as `$name`.
///
/// `$payload` is handled separately because it is gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemField {
    Key,
    Owner,
    ContentType,
    CreatedAtBlock,
    LastModifiedAtBlock,
    ExpiresAtBlock,
}

impl SystemField {
    pub const ALL: [SystemField; 6] = [
        SystemField::Key,
        SystemField::Owner,
        SystemField::ContentType,
        SystemField::CreatedAtBlock,
        SystemField::LastModifiedAtBlock,
        SystemField::ExpiresAtBlock,
    ];

    /// Looks up a field by its reference name (without the `$`).
    pub fn from_name(name: &str) -> Option<SystemField> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            SystemField::Key => "key",
            SystemField::Owner => "owner",
            SystemField::ContentType => "contentType",
            SystemField::CreatedAtBlock => "createdAtBlock",
            SystemField::LastModifiedAtBlock => "lastModifiedAtBlock",
            SystemField::ExpiresAtBlock => "expiresAtBlock",
        }
    }
}

/// The state of one entity at the time it was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySnapshot {
    pub key: EntityKey,
    pub owner: Option<String>,
    pub content_type: Option<String>,
    pub created_at_block: Option<u64>,
    pub last_modified_at_block: Option<u64>,
    pub expires_at_block: Option<u64>,
    pub payload: Bytes,
    pub attributes: AttributeSet,
}

impl EntitySnapshot {
    /// An entity with no payload, metadata or attributes.
    pub fn new(key: EntityKey) -> Self {
        Self {
            key,
            owner: None,
            content_type: None,
            created_at_block: None,
            last_modified_at_block: None,
            expires_at_block: None,
            payload: Bytes::new(),
            attributes: AttributeSet::new(),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        self.payload = payload.into();
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<WireValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_blocks(mut self, created: u64, last_modified: u64, expires: u64) -> Self {
        self.created_at_block = Some(created);
        self.last_modified_at_block = Some(last_modified);
        self.expires_at_block = Some(expires);
        self
    }

    /// Returns a metadata field as a wire value, if the store supplied it.
    pub fn system_field(&self, field: SystemField) -> Option<WireValue> {
        match field {
            SystemField::Key => Some(WireValue::Str(self.key.as_str().to_string())),
            SystemField::Owner => self.owner.clone().map(WireValue::Str),
            SystemField::ContentType => self.content_type.clone().map(WireValue::Str),
            SystemField::CreatedAtBlock => self.created_at_block.map(WireValue::Uint),
            SystemField::LastModifiedAtBlock => self.last_modified_at_block.map(WireValue::Uint),
            SystemField::ExpiresAtBlock => self.expires_at_block.map(WireValue::Uint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> EntityKey {
        EntityKey::parse("0x123abc").unwrap()
    }

    #[test]
    fn test_system_field_names_roundtrip() {
        for field in SystemField::ALL {
            assert_eq!(SystemField::from_name(field.name()), Some(field));
        }
        assert_eq!(SystemField::from_name("payload"), None);
        assert_eq!(SystemField::from_name("Owner"), None);
    }

    #[test]
    fn test_system_field_values() {
        let entity = EntitySnapshot::new(key())
            .with_owner("0xowner")
            .with_blocks(10, 12, 100);
        assert_eq!(
            entity.system_field(SystemField::Key),
            Some(WireValue::from("0x123abc"))
        );
        assert_eq!(
            entity.system_field(SystemField::Owner),
            Some(WireValue::from("0xowner"))
        );
        assert_eq!(
            entity.system_field(SystemField::ExpiresAtBlock),
            Some(WireValue::Uint(100))
        );
        assert_eq!(entity.system_field(SystemField::ContentType), None);
    }
}
