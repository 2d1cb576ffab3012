//! Structured form of `arkiv:` reference strings.
//!
//! ```text
//! arkiv:[<chainId>:][0x<entityKey>]($|#)<attributeName>
//! ```
//!
//! Parsing and serialization live in [`crate::codec::reference`]; this module
//! only holds the types.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::ParseError;

/// Name of the gated payload system field.
pub const PAYLOAD_FIELD: &str = "payload";

/// A chain identifier as written in a reference.
///
/// The literal spelling (decimal or `0x` hex, including any leading zeros)
/// is kept so a parsed reference serializes back byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainId {
    value: u64,
    literal: String,
}

impl ChainId {
    /// A chain written in decimal.
    pub fn new(value: u64) -> Self {
        Self { value, literal: value.to_string() }
    }

    /// A chain written as lowercase `0x` hex.
    pub fn hex(value: u64) -> Self {
        Self { value, literal: format!("0x{:x}", value) }
    }

    /// Parses a decimal or `0x` hex literal. Returns `None` if it is not a
    /// numeral or does not fit in 64 bits.
    pub fn parse(literal: &str) -> Option<Self> {
        let value = match literal.strip_prefix("0x") {
            Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
                u64::from_str_radix(hex, 16).ok()?
            }
            Some(_) => return None,
            None if !literal.is_empty() && literal.bytes().all(|b| b.is_ascii_digit()) => {
                literal.parse().ok()?
            }
            None => return None,
        };
        Some(Self { value, literal: literal.to_string() })
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal)
    }
}

/// A `0x`-prefixed hex entity key.
///
/// Equality and hashing ignore hex digit case; the literal is preserved
/// for serialization.
#[derive(Debug, Clone)]
pub struct EntityKey(String);

impl EntityKey {
    /// Validates `0x` followed by one or more hex digits.
    pub fn parse(s: &str) -> Option<Self> {
        let digits = s.strip_prefix("0x")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form used for store lookups.
    pub fn normalized(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl PartialEq for EntityKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for EntityKey {}

impl Hash for EntityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a reference targets a store-managed field or an authored attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// `$`: read-only metadata managed by the store.
    System,
    /// `#`: application-defined attribute.
    Custom,
}

impl Scope {
    pub fn sigil(self) -> char {
        match self {
            Scope::System => '$',
            Scope::Custom => '#',
        }
    }

    pub fn from_sigil(c: char) -> Option<Scope> {
        match c {
            '$' => Some(Scope::System),
            '#' => Some(Scope::Custom),
            _ => None,
        }
    }
}

/// A parsed reference.
///
/// An absent `chain` means the caller's current chain; an absent `entity`
/// means the entity being read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArkivRef {
    pub chain: Option<ChainId>,
    pub entity: Option<EntityKey>,
    pub scope: Scope,
    pub name: String,
}

impl ArkivRef {
    /// Reference to a custom attribute on the current entity.
    pub fn custom(name: impl Into<String>) -> Self {
        Self { chain: None, entity: None, scope: Scope::Custom, name: name.into() }
    }

    /// Reference to a system field on the current entity.
    pub fn system(name: impl Into<String>) -> Self {
        Self { chain: None, entity: None, scope: Scope::System, name: name.into() }
    }

    pub fn on_chain(mut self, chain: ChainId) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn of_entity(mut self, entity: EntityKey) -> Self {
        self.entity = Some(entity);
        self
    }

    /// True for `$payload`, the only field that goes through payload gating.
    pub fn is_payload(&self) -> bool {
        self.scope == Scope::System && self.name == PAYLOAD_FIELD
    }

    /// Fills absent components from the reference that led here, so a
    /// relative reference found on an entity resolves against that entity.
    pub fn relative_to(&self, holder: &ArkivRef) -> ArkivRef {
        ArkivRef {
            chain: self.chain.clone().or_else(|| holder.chain.clone()),
            entity: self.entity.clone().or_else(|| holder.entity.clone()),
            scope: self.scope,
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for ArkivRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::codec::reference::serialize_reference(self))
    }
}

impl FromStr for ArkivRef {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::codec::reference::parse_reference(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_parse() {
        assert_eq!(ChainId::parse("137").unwrap().value(), 137);
        assert_eq!(ChainId::parse("0x89").unwrap().value(), 137);
        assert_eq!(ChainId::parse("0x0089").unwrap().literal(), "0x0089");
        assert!(ChainId::parse("0x").is_none());
        assert!(ChainId::parse("").is_none());
        assert!(ChainId::parse("12a").is_none());
        assert!(ChainId::parse("99999999999999999999999").is_none());
        assert_eq!(ChainId::hex(137).literal(), "0x89");
    }

    #[test]
    fn test_entity_key_case_insensitive_eq() {
        let a = EntityKey::parse("0xABCdef").unwrap();
        let b = EntityKey::parse("0xabcdef").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "0xABCdef");
        assert_eq!(a.normalized(), "0xabcdef");

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));

        assert!(EntityKey::parse("abc").is_none());
        assert!(EntityKey::parse("0xZZ").is_none());
    }

    #[test]
    fn test_relative_to_fills_missing_parts() {
        let holder = ArkivRef::custom("avatarRef")
            .on_chain(ChainId::new(137))
            .of_entity(EntityKey::parse("0x01").unwrap());
        let nested = ArkivRef::system("owner").relative_to(&holder);
        assert_eq!(nested.chain.as_ref().map(ChainId::value), Some(137));
        assert_eq!(nested.entity, EntityKey::parse("0x01"));
        assert_eq!(nested.scope, Scope::System);

        let pinned = ArkivRef::custom("x")
            .of_entity(EntityKey::parse("0x02").unwrap())
            .relative_to(&holder);
        assert_eq!(pinned.entity, EntityKey::parse("0x02"));
    }

    #[test]
    fn test_is_payload() {
        assert!(ArkivRef::system("payload").is_payload());
        assert!(!ArkivRef::custom("payload").is_payload());
        assert!(!ArkivRef::system("owner").is_payload());
    }
}
