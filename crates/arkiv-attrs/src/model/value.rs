//! Wire values and their typed, application-side interpretation.
//!
//! On chain an attribute is only ever a UTF-8 string or a non-negative
//! integer. [`AttributeValue`] is the richer view the codec produces.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::limits::{
    LATITUDE_OFFSET_DEGREES, LONGITUDE_OFFSET_DEGREES, MAX_LATITUDE_ENCODED, MAX_LONGITUDE_ENCODED,
};
use crate::model::{ArkivRef, Category};
use crate::util::datetime::{format_timestamp, parse_timestamp, DateTimeParseError};

/// The two representations an attribute may take on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireKind {
    String,
    Uint,
}

/// A raw attribute value as stored by the entity store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireValue {
    Uint(u64),
    Str(String),
}

impl WireValue {
    pub fn kind(&self) -> WireKind {
        match self {
            WireValue::Uint(_) => WireKind::Uint,
            WireValue::Str(_) => WireKind::String,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::Str(s) => Some(s),
            WireValue::Uint(_) => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            WireValue::Uint(n) => Some(*n),
            WireValue::Str(_) => None,
        }
    }

    /// Returns true for the empty string, which is never a valid stored value.
    pub fn is_empty_string(&self) -> bool {
        matches!(self, WireValue::Str(s) if s.is_empty())
    }
}

impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::Uint(n) => write!(f, "{}", n),
            WireValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<u64> for WireValue {
    fn from(n: u64) -> Self {
        WireValue::Uint(n)
    }
}

impl From<String> for WireValue {
    fn from(s: String) -> Self {
        WireValue::Str(s)
    }
}

impl From<&str> for WireValue {
    fn from(s: &str) -> Self {
        WireValue::Str(s.to_string())
    }
}

/// An instant with the UTC offset it was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    /// Microseconds since Unix epoch (1970-01-01T00:00:00Z).
    pub epoch_micros: i64,
    /// Signed UTC offset in minutes (e.g., +330 for +05:30).
    pub offset_min: i16,
}

impl Timestamp {
    pub fn new(epoch_micros: i64, offset_min: i16) -> Self {
        Self { epoch_micros, offset_min }
    }

    /// Parses an RFC 3339 timestamp. The offset is mandatory.
    pub fn parse(s: &str) -> Result<Self, DateTimeParseError> {
        let (epoch_micros, offset_min) = parse_timestamp(s)?;
        Ok(Self { epoch_micros, offset_min })
    }

    /// Formats as RFC 3339 in the stored offset.
    ///
    /// Fails when the offset or the local year cannot be written in a form
    /// [`Timestamp::parse`] accepts.
    pub fn to_rfc3339(&self) -> Result<String, DateTimeParseError> {
        format_timestamp(self.epoch_micros, self.offset_min)
    }
}

/// Which axis a fixed-point coordinate is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeoAxis {
    Latitude,
    Longitude,
}

impl GeoAxis {
    /// Degrees added before scaling so the stored integer is non-negative.
    pub fn offset_degrees(self) -> f64 {
        match self {
            GeoAxis::Latitude => LATITUDE_OFFSET_DEGREES,
            GeoAxis::Longitude => LONGITUDE_OFFSET_DEGREES,
        }
    }

    /// Largest valid stored integer.
    pub fn max_encoded(self) -> u64 {
        match self {
            GeoAxis::Latitude => MAX_LATITUDE_ENCODED,
            GeoAxis::Longitude => MAX_LONGITUDE_ENCODED,
        }
    }

    /// The attribute category carrying this axis.
    pub fn category(self) -> Category {
        match self {
            GeoAxis::Latitude => Category::Latitude,
            GeoAxis::Longitude => Category::Longitude,
        }
    }
}

/// A coordinate in microdegree-offset encoding.
///
/// The stored integer is always within `[0, axis.max_encoded()]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeoCoordinate {
    axis: GeoAxis,
    encoded: u64,
}

impl GeoCoordinate {
    /// Converts degrees to the fixed-point form, rounding to the nearest microdegree.
    pub fn from_degrees(axis: GeoAxis, degrees: f64) -> Result<Self, CodecError> {
        let encoded = crate::codec::geo::encode_degrees(axis, degrees)?;
        Ok(Self { axis, encoded })
    }

    /// Wraps an already-encoded integer after range checking it.
    pub fn from_encoded(axis: GeoAxis, encoded: u64) -> Result<Self, CodecError> {
        crate::codec::geo::decode_degrees(axis, encoded)?;
        Ok(Self { axis, encoded })
    }

    pub fn latitude(degrees: f64) -> Result<Self, CodecError> {
        Self::from_degrees(GeoAxis::Latitude, degrees)
    }

    pub fn longitude(degrees: f64) -> Result<Self, CodecError> {
        Self::from_degrees(GeoAxis::Longitude, degrees)
    }

    pub fn axis(&self) -> GeoAxis {
        self.axis
    }

    pub fn encoded(&self) -> u64 {
        self.encoded
    }

    pub fn degrees(&self) -> f64 {
        self.encoded as f64 / crate::limits::MICRODEGREES_PER_DEGREE - self.axis.offset_degrees()
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Free text.
    PlainString(String),

    /// Unpostfixed numeric attribute (e.g. an index or counter).
    Integer(u64),

    /// `http://` or `https://` link.
    Url(String),

    /// RFC 3339 instant with explicit offset.
    Timestamp(Timestamp),

    /// Ordered list of simple tokens.
    TokenArray(Vec<String>),

    /// Fixed-point latitude or longitude.
    Geo(GeoCoordinate),

    /// Strictly positive schema or document version.
    Version(u64),

    /// Pointer to another attribute or system field.
    Reference(ArkivRef),
}

impl AttributeValue {
    /// Short label for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AttributeValue::PlainString(_) => "plain string",
            AttributeValue::Integer(_) => "integer",
            AttributeValue::Url(_) => "url",
            AttributeValue::Timestamp(_) => "timestamp",
            AttributeValue::TokenArray(_) => "token array",
            AttributeValue::Geo(_) => "geo coordinate",
            AttributeValue::Version(_) => "version",
            AttributeValue::Reference(_) => "reference",
        }
    }

    /// The most specific category this value encodes under.
    pub fn natural_category(&self) -> Category {
        match self {
            AttributeValue::PlainString(_) => Category::PlainString,
            AttributeValue::Integer(_) => Category::PlainOrArray,
            AttributeValue::Url(_) => Category::Url,
            AttributeValue::Timestamp(_) => Category::Timestamp,
            AttributeValue::TokenArray(_) => Category::TokenArray,
            AttributeValue::Geo(g) => g.axis().category(),
            AttributeValue::Version(_) => Category::Version,
            AttributeValue::Reference(_) => Category::Reference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_value_json_shape() {
        let n: WireValue = serde_json::from_str("42").unwrap();
        assert_eq!(n, WireValue::Uint(42));
        let s: WireValue = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(s, WireValue::Str("42".into()));
        assert_eq!(serde_json::to_string(&WireValue::from("en")).unwrap(), "\"en\"");
    }

    #[test]
    fn test_wire_value_accessors() {
        assert_eq!(WireValue::from(7).as_uint(), Some(7));
        assert_eq!(WireValue::from("x").as_str(), Some("x"));
        assert!(WireValue::from("").is_empty_string());
        assert!(!WireValue::from(0).is_empty_string());
    }

    #[test]
    fn test_geo_coordinate_accessors() {
        let lat = GeoCoordinate::latitude(48.856613).unwrap();
        assert_eq!(lat.axis(), GeoAxis::Latitude);
        assert_eq!(lat.encoded(), 138_856_613);
        assert!((lat.degrees() - 48.856613).abs() < 1e-9);
        assert!(GeoCoordinate::from_encoded(GeoAxis::Longitude, 360_000_001).is_err());
    }

    #[test]
    fn test_timestamp_keeps_offset() {
        let ts = Timestamp::parse("2024-03-15T14:30:00+05:30").unwrap();
        assert_eq!(ts.offset_min, 330);
        assert_eq!(ts.to_rfc3339().unwrap(), "2024-03-15T14:30:00+05:30");
    }
}
