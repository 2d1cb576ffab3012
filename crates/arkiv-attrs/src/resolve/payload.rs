//! Gated payload access for `$payload`.

use std::collections::BTreeSet;
use std::fmt;

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::ResolveError;
use crate::limits::FALLBACK_CONTENT_TYPE;
use crate::model::EntitySnapshot;

/// A payload that passed the content-type and size gates.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload {
    pub content_type: String,
    pub bytes: Bytes,
    /// SHA-256 of `bytes`.
    pub digest: [u8; 32],
}

impl Payload {
    fn new(content_type: String, bytes: Bytes) -> Self {
        let digest = Sha256::digest(&bytes).into();
        Self { content_type, bytes, digest }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lowercase hex digest.
    pub fn digest_hex(&self) -> String {
        self.digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

// Bytes are left out so payloads do not end up in logs.
impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .field("digest", &self.digest_hex())
            .finish()
    }
}

/// The media type without parameters, lowercased: `Text/Plain; charset=utf-8` → `text/plain`.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// True if `content_type` matches an entry of `allowed` exactly or by `type/*`.
pub fn content_type_allowed(content_type: &str, allowed: &BTreeSet<String>) -> bool {
    let essence = essence(content_type);
    let Some((ty, _)) = essence.split_once('/') else {
        return false;
    };
    allowed.iter().any(|entry| {
        let entry = entry.to_ascii_lowercase();
        match entry.strip_suffix("/*") {
            Some(family) => family == ty,
            None => entry == essence,
        }
    })
}

/// Applies the content-type allow-list, then the size limit.
///
/// Rejections carry only the content type or size.
pub fn gate_payload(
    entity: &EntitySnapshot,
    allowed: &BTreeSet<String>,
    max_bytes: u64,
) -> Result<Payload, ResolveError> {
    let content_type = entity
        .content_type
        .clone()
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

    if !content_type_allowed(&content_type, allowed) {
        warn!(entity = %entity.key, content_type = %content_type, "payload content type rejected");
        return Err(ResolveError::ContentTypeRejected { content_type });
    }

    let size = entity.payload.len() as u64;
    if size > max_bytes {
        warn!(entity = %entity.key, size, limit = max_bytes, "payload size limit exceeded");
        return Err(ResolveError::SizeExceeded { size, limit: max_bytes });
    }

    Ok(Payload::new(content_type, entity.payload.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityKey;

    fn allowed(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn entity(payload: &'static [u8], content_type: &str) -> EntitySnapshot {
        EntitySnapshot::new(EntityKey::parse("0x1").unwrap()).with_payload(payload, content_type)
    }

    #[test]
    fn test_essence() {
        assert_eq!(essence("Text/Plain; charset=utf-8"), "text/plain");
        assert_eq!(essence("application/json"), "application/json");
        assert_eq!(essence(""), "");
    }

    #[test]
    fn test_content_type_matching() {
        let list = allowed(&["text/plain", "image/*", "Application/JSON"]);
        assert!(content_type_allowed("text/plain", &list));
        assert!(content_type_allowed("TEXT/PLAIN; charset=utf-8", &list));
        assert!(content_type_allowed("image/png", &list));
        assert!(content_type_allowed("application/json", &list));
        assert!(!content_type_allowed("text/html", &list));
        assert!(!content_type_allowed("image", &list));
        assert!(!content_type_allowed("imagex/png", &list));
        assert!(!content_type_allowed("", &list));
    }

    #[test]
    fn test_gate_accepts() {
        let payload = gate_payload(&entity(b"hello", "text/plain"), &allowed(&["text/plain"]), 5).unwrap();
        assert_eq!(payload.bytes, Bytes::from_static(b"hello"));
        assert_eq!(
            payload.digest_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert!(!format!("{payload:?}").contains("hello"));
    }

    #[test]
    fn test_gate_checks_type_before_size() {
        let err = gate_payload(&entity(b"0123456789", "text/html"), &allowed(&["text/plain"]), 4)
            .unwrap_err();
        assert_eq!(err, ResolveError::ContentTypeRejected { content_type: "text/html".into() });
    }

    #[test]
    fn test_gate_size() {
        let err = gate_payload(&entity(b"0123456789", "text/plain"), &allowed(&["text/plain"]), 4)
            .unwrap_err();
        assert_eq!(err, ResolveError::SizeExceeded { size: 10, limit: 4 });
        assert!(!err.to_string().contains("0123456789"));
    }

    #[test]
    fn test_missing_content_type_uses_fallback() {
        let bare = EntitySnapshot::new(EntityKey::parse("0x1").unwrap());
        assert_eq!(
            gate_payload(&bare, &allowed(&["text/plain"]), 10).unwrap_err(),
            ResolveError::ContentTypeRejected { content_type: FALLBACK_CONTENT_TYPE.into() }
        );
        let ok = gate_payload(&bare, &allowed(&["application/*"]), 10).unwrap();
        assert!(ok.is_empty());
    }
}
