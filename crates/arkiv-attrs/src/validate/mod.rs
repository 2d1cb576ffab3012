//! Attribute name validation and pre-submission attribute checks.
//!
//! Names are checked for the reserved `$` prefix before syntax, so an
//! authored `$owner` reports the more specific error.

use lazy_static::lazy_static;
use regex::Regex;

use crate::codec;
use crate::error::{AttributeError, NameError};
use crate::model::{AttributeSet, AttributeValue, Category, WireValue, ATTRIBUTE_NAME_PATTERN};

lazy_static! {
    static ref NAME_RE: Regex = Regex::new(ATTRIBUTE_NAME_PATTERN).expect("name pattern is valid");
}

/// Validates an authored attribute name and returns its inferred category.
pub fn validate_name(name: &str) -> Result<Category, NameError> {
    if name.starts_with('$') {
        return Err(NameError::ReservedPrefix { name: name.to_string() });
    }
    if !NAME_RE.is_match(name) {
        return Err(NameError::InvalidSyntax { name: name.to_string() });
    }
    Ok(Category::infer(name))
}

/// Validates a name/value pair the way the store would read it back.
pub fn validate_attribute(name: &str, value: &WireValue) -> Result<AttributeValue, AttributeError> {
    let category = validate_name(name)?;
    codec::decode(category, value).map_err(|source| AttributeError::Value {
        name: name.to_string(),
        source,
    })
}

/// Validates every attribute in a set, stopping at the first failure.
pub fn validate_attributes(attributes: &AttributeSet) -> Result<(), AttributeError> {
    for (name, value) in attributes {
        validate_attribute(name, value)?;
    }
    Ok(())
}
