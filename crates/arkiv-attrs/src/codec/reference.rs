//! Reference string grammar.
//!
//! ```text
//! arkiv:[<chainId>:][0x<entityKey>]($|#)<attributeName>
//! ```
//!
//! Parsing also accepts two legacy shorthands: a bare `$name` / `#name`
//! with no scheme, and an unqualified `#payload` for the system payload.
//! Serialization always produces the canonical form.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ParseError;
use crate::model::{ArkivRef, ChainId, EntityKey, Scope, PAYLOAD_FIELD};

/// URI scheme prefix.
pub const SCHEME: &str = "arkiv:";

lazy_static! {
    static ref REFERENCE_RE: Regex = Regex::new(
        r"^arkiv:(?:(\d+|0x[0-9a-fA-F]+):)?(0x[0-9a-fA-F]+)?([$#])([A-Za-z][A-Za-z0-9_-]*)$"
    )
    .expect("reference pattern is valid");
}

fn malformed(input: &str, reason: &'static str) -> ParseError {
    ParseError::Malformed { input: input.to_string(), reason }
}

/// Parses a reference string.
pub fn parse_reference(input: &str) -> Result<ArkivRef, ParseError> {
    let scheme_less = input.starts_with(['$', '#']);
    let owned;
    let candidate = if scheme_less {
        owned = format!("{SCHEME}{input}");
        owned.as_str()
    } else if input.starts_with(SCHEME) {
        input
    } else {
        return Err(malformed(input, "missing arkiv: scheme"));
    };

    let caps = REFERENCE_RE
        .captures(candidate)
        .ok_or_else(|| malformed(input, "does not match arkiv:[chain:][0xkey]($|#)name"))?;

    let chain = match caps.get(1) {
        Some(m) => Some(
            ChainId::parse(m.as_str()).ok_or_else(|| malformed(input, "chain id overflows u64"))?,
        ),
        None => None,
    };
    let entity = match caps.get(2) {
        Some(m) => Some(
            EntityKey::parse(m.as_str()).ok_or_else(|| malformed(input, "invalid entity key"))?,
        ),
        None => None,
    };
    let sigil = caps
        .get(3)
        .and_then(|m| m.as_str().chars().next())
        .and_then(Scope::from_sigil)
        .ok_or_else(|| malformed(input, "missing scope sigil"))?;
    let name = caps.get(4).map(|m| m.as_str()).unwrap_or_default().to_string();

    // Unqualified `#payload` is the legacy spelling of the system payload.
    // With a chain or key present it names a custom attribute.
    let scope = if sigil == Scope::Custom && name == PAYLOAD_FIELD && chain.is_none() && entity.is_none() {
        Scope::System
    } else {
        sigil
    };

    Ok(ArkivRef { chain, entity, scope, name })
}

/// Serializes a reference in canonical form, omitting absent components.
pub fn serialize_reference(r: &ArkivRef) -> String {
    let mut out = String::with_capacity(SCHEME.len() + r.name.len() + 48);
    out.push_str(SCHEME);
    if let Some(chain) = &r.chain {
        out.push_str(chain.literal());
        out.push(':');
    }
    if let Some(entity) = &r.entity {
        out.push_str(entity.as_str());
    }
    out.push(r.scope.sigil());
    out.push_str(&r.name);
    out
}

/// Returns true if `s` parses as a reference.
pub fn is_reference(s: &str) -> bool {
    parse_reference(s).is_ok()
}
