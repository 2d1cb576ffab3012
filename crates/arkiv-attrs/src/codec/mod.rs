//! Value encoding and decoding between [`AttributeValue`] and [`WireValue`].
//!
//! The category decides the wire form:
//!
//! | Category      | Wire   | Form                                  |
//! |---------------|--------|---------------------------------------|
//! | Url           | string | `http://` or `https://` link          |
//! | Timestamp     | string | RFC 3339 with explicit offset         |
//! | TokenArray    | string | `[a,b,c]`                             |
//! | Reference     | string | `arkiv:[chain:][0xkey]($\|#)name`     |
//! | Latitude      | uint   | `round((deg + 90) * 1e6)`             |
//! | Longitude     | uint   | `round((deg + 180) * 1e6)`            |
//! | Version       | uint   | strictly positive                     |
//! | PlainOrArray  | either | array if bracketed, else text/integer |

pub mod array;
pub mod geo;
pub mod reference;

pub use array::{decode_array, encode_array, has_array_shape};
pub use geo::{decode_degrees, encode_degrees};
pub use reference::{parse_reference, serialize_reference};

use crate::error::CodecError;
use crate::model::{AttributeValue, Category, GeoAxis, GeoCoordinate, Timestamp, WireKind, WireValue};

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes a typed value for storage under an attribute of `category`.
pub fn encode(category: Category, value: &AttributeValue) -> Result<WireValue, CodecError> {
    let mismatch = || CodecError::CategoryMismatch { category, found: value.kind_name() };

    match (category, value) {
        (Category::Url, AttributeValue::Url(s)) => {
            check_url(s)?;
            Ok(WireValue::Str(s.clone()))
        }
        (Category::Timestamp, AttributeValue::Timestamp(ts)) => ts
            .to_rfc3339()
            .map(WireValue::Str)
            .map_err(|e| CodecError::InvalidTimestamp { value: format!("{:?}", ts), reason: e.message }),
        (Category::TokenArray | Category::PlainOrArray, AttributeValue::TokenArray(tokens)) => {
            Ok(WireValue::Str(encode_array(tokens)?))
        }
        (Category::PlainString, AttributeValue::PlainString(s)) => Ok(WireValue::Str(s.clone())),
        (Category::PlainOrArray, AttributeValue::PlainString(s)) => {
            if has_array_shape(s) {
                return Err(CodecError::AmbiguousPlainString { value: s.clone() });
            }
            Ok(WireValue::Str(s.clone()))
        }
        (Category::PlainOrArray, AttributeValue::Integer(n)) => Ok(WireValue::Uint(*n)),
        (Category::Latitude, AttributeValue::Geo(g)) if g.axis() == GeoAxis::Latitude => {
            Ok(WireValue::Uint(g.encoded()))
        }
        (Category::Longitude, AttributeValue::Geo(g)) if g.axis() == GeoAxis::Longitude => {
            Ok(WireValue::Uint(g.encoded()))
        }
        (Category::Version, AttributeValue::Version(v)) => {
            if *v == 0 {
                return Err(CodecError::InvalidVersion { value: 0 });
            }
            Ok(WireValue::Uint(*v))
        }
        (Category::Reference, AttributeValue::Reference(r)) => {
            // Round-trip through the grammar so a hand-built reference with a
            // bad name cannot be stored.
            let s = serialize_reference(r);
            parse_reference(&s)?;
            Ok(WireValue::Str(s))
        }
        _ => Err(mismatch()),
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes a stored value read from an attribute of `category`.
pub fn decode(category: Category, wire: &WireValue) -> Result<AttributeValue, CodecError> {
    if let Some(expected) = category.wire_kind() {
        if wire.kind() != expected {
            return Err(CodecError::UnexpectedWireKind { category, expected, found: wire.kind() });
        }
    }

    match (category, wire) {
        (Category::PlainOrArray, WireValue::Uint(n)) => Ok(AttributeValue::Integer(*n)),
        (Category::PlainOrArray, WireValue::Str(s)) => {
            if has_array_shape(s) {
                Ok(AttributeValue::TokenArray(decode_array(s)?))
            } else {
                Ok(AttributeValue::PlainString(s.clone()))
            }
        }
        (Category::PlainString, WireValue::Str(s)) => Ok(AttributeValue::PlainString(s.clone())),
        (Category::TokenArray, WireValue::Str(s)) => Ok(AttributeValue::TokenArray(decode_array(s)?)),
        (Category::Url, WireValue::Str(s)) => {
            check_url(s)?;
            Ok(AttributeValue::Url(s.clone()))
        }
        (Category::Timestamp, WireValue::Str(s)) => Timestamp::parse(s)
            .map(AttributeValue::Timestamp)
            .map_err(|e| CodecError::InvalidTimestamp { value: s.clone(), reason: e.message }),
        (Category::Reference, WireValue::Str(s)) => Ok(AttributeValue::Reference(parse_reference(s)?)),
        (Category::Latitude, WireValue::Uint(n)) => {
            Ok(AttributeValue::Geo(GeoCoordinate::from_encoded(GeoAxis::Latitude, *n)?))
        }
        (Category::Longitude, WireValue::Uint(n)) => {
            Ok(AttributeValue::Geo(GeoCoordinate::from_encoded(GeoAxis::Longitude, *n)?))
        }
        (Category::Version, WireValue::Uint(n)) => {
            if *n == 0 {
                return Err(CodecError::InvalidVersion { value: 0 });
            }
            Ok(AttributeValue::Version(*n))
        }
        // Every other combination was rejected by the wire-kind check.
        (category, wire) => Err(CodecError::UnexpectedWireKind {
            category,
            expected: wire_kind_other(wire.kind()),
            found: wire.kind(),
        }),
    }
}

fn wire_kind_other(kind: WireKind) -> WireKind {
    match kind {
        WireKind::String => WireKind::Uint,
        WireKind::Uint => WireKind::String,
    }
}

fn check_url(s: &str) -> Result<(), CodecError> {
    if s.starts_with("http://") || s.starts_with("https://") {
        Ok(())
    } else {
        Err(CodecError::InvalidUrl { value: s.to_string() })
    }
}
