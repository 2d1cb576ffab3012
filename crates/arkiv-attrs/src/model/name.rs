//! Attribute names and the categories implied by their postfix.

use std::fmt;

use crate::error::NameError;
use crate::model::WireKind;

/// Regex every authored attribute name (and every reference target) must match.
pub const ATTRIBUTE_NAME_PATTERN: &str = "^[A-Za-z][A-Za-z0-9_-]*$";

/// Value category of an attribute.
///
/// Name inference only ever yields `PlainOrArray` for unpostfixed names.
/// `PlainString` and `TokenArray` exist so callers that know the shape can
/// skip the bracket sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    PlainOrArray,
    PlainString,
    TokenArray,
    Timestamp,
    Url,
    Reference,
    Version,
    Latitude,
    Longitude,
}

/// Recognized postfixes, longest first.
const POSTFIXES: [(&str, Category); 6] = [
    ("Version", Category::Version),
    ("Long", Category::Longitude),
    ("Url", Category::Url),
    ("Ref", Category::Reference),
    ("Lat", Category::Latitude),
    ("At", Category::Timestamp),
];

impl Category {
    /// Infers the category from a name's postfix.
    ///
    /// The postfix must be preceded by at least one character: `createdAt`
    /// is a timestamp, `At` is a plain attribute. Matching is case-sensitive.
    /// This does not check the name's syntax.
    pub fn infer(name: &str) -> Category {
        POSTFIXES
            .iter()
            .find(|(postfix, _)| name.len() > postfix.len() && name.ends_with(postfix))
            .map(|(_, category)| *category)
            .unwrap_or(Category::PlainOrArray)
    }

    /// Returns the wire representation values of this category use.
    ///
    /// `PlainOrArray` accepts both: text is sniffed for array shape,
    /// integers are plain numeric attributes.
    pub fn wire_kind(&self) -> Option<WireKind> {
        match self {
            Category::PlainOrArray => None,
            Category::Version | Category::Latitude | Category::Longitude => Some(WireKind::Uint),
            _ => Some(WireKind::String),
        }
    }

    /// Returns the postfix that implies this category, if any.
    pub fn postfix(&self) -> Option<&'static str> {
        POSTFIXES
            .iter()
            .find(|(_, category)| category == self)
            .map(|(postfix, _)| *postfix)
    }
}

/// A validated custom attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeName(String);

impl AttributeName {
    /// Validates `name` and wraps it.
    pub fn parse(name: &str) -> Result<Self, NameError> {
        crate::validate::validate_name(name)?;
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Category implied by the name's postfix.
    pub fn category(&self) -> Category {
        Category::infer(&self.0)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AttributeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
