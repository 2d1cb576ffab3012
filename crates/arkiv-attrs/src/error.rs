//! Error types for attribute validation, encoding, reference parsing,
//! resolution and mutation planning.

use std::time::Duration;

use thiserror::Error;

use crate::model::{Category, GeoAxis, WireKind};

/// Error classes used to group failures for diagnostics.
///
/// Every error in this crate is recoverable per call; the class only tells
/// the caller how to report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Caller-supplied data does not match a grammar.
    Syntax,
    /// Syntactically fine, but violates a domain constraint.
    Semantic,
    /// A reference could not be resolved to a value.
    Resolution,
    /// An authored name used the `$` prefix reserved for system attributes.
    ReservedPrefix,
    /// Resolver configuration is unusable. Fatal at startup only.
    Configuration,
}

impl ErrorClass {
    /// Returns a short lowercase label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Syntax => "syntax",
            ErrorClass::Semantic => "semantic",
            ErrorClass::Resolution => "resolution",
            ErrorClass::ReservedPrefix => "reserved-prefix",
            ErrorClass::Configuration => "configuration",
        }
    }
}

/// Error during attribute name validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("attribute name {name:?} starts with '$', which is reserved for system attributes")]
    ReservedPrefix { name: String },

    #[error("attribute name {name:?} does not match [A-Za-z][A-Za-z0-9_-]*")]
    InvalidSyntax { name: String },
}

impl NameError {
    pub fn class(&self) -> ErrorClass {
        match self {
            NameError::ReservedPrefix { .. } => ErrorClass::ReservedPrefix,
            NameError::InvalidSyntax { .. } => ErrorClass::Syntax,
        }
    }
}

/// Error while parsing a reference string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed reference {input:?}: {reason}")]
    Malformed { input: String, reason: &'static str },
}

impl ParseError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Syntax
    }
}

/// Error while encoding or decoding an attribute value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("{value:?} is not a web link (expected http:// or https://)")]
    InvalidUrl { value: String },

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("{value:?} is not a bracketed token array")]
    MalformedArray { value: String },

    #[error("token array element {index} is empty")]
    EmptyToken { index: usize },

    #[error("token {token:?} is empty, padded with whitespace, or contains ',', '[' or ']'")]
    InvalidToken { token: String },

    #[error("plain string {value:?} has token array shape and would not decode back as text")]
    AmbiguousPlainString { value: String },

    #[error("{axis:?} {degrees} is out of the encodable range")]
    CoordinateOutOfRange { axis: GeoAxis, degrees: f64 },

    #[error("version must be a positive integer, found {value}")]
    InvalidVersion { value: u64 },

    #[error("{category:?} attributes are stored as {expected:?}, found {found:?}")]
    UnexpectedWireKind {
        category: Category,
        expected: WireKind,
        found: WireKind,
    },

    #[error("{found} value cannot be encoded as a {category:?} attribute")]
    CategoryMismatch {
        category: Category,
        found: &'static str,
    },

    #[error(transparent)]
    Reference(#[from] ParseError),
}

impl CodecError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CodecError::MalformedArray { .. }
            | CodecError::EmptyToken { .. }
            | CodecError::InvalidToken { .. }
            | CodecError::UnexpectedWireKind { .. }
            | CodecError::Reference(_) => ErrorClass::Syntax,
            _ => ErrorClass::Semantic,
        }
    }
}

/// Error validating a complete name/value attribute pair.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttributeError {
    #[error(transparent)]
    Name(#[from] NameError),

    #[error("attribute {name:?}: {source}")]
    Value {
        name: String,
        #[source]
        source: CodecError,
    },
}

impl AttributeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AttributeError::Name(e) => e.class(),
            AttributeError::Value { source, .. } => source.class(),
        }
    }
}

/// Typed failure of a reference resolution.
///
/// None of these carry payload bytes: a gated payload that fails its checks
/// is reported by size and content type only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("{reference} not found")]
    NotFound { reference: String },

    #[error("chain {requested} is not reachable from chain {caller}")]
    ChainMismatch { requested: u64, caller: u64 },

    #[error("payload content type {content_type:?} is not allowed")]
    ContentTypeRejected { content_type: String },

    #[error("payload of {size} bytes exceeds limit of {limit} bytes")]
    SizeExceeded { size: u64, limit: u64 },

    #[error("attribute {name:?} failed to decode: {source}")]
    ValidationFailed {
        name: String,
        #[source]
        source: CodecError,
    },

    #[error("entity store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("resolution timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("resolution task ended without producing a result")]
    Aborted,

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl ResolveError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ResolveError::ValidationFailed { source, .. } => source.class(),
            ResolveError::Parse(_) => ErrorClass::Syntax,
            _ => ErrorClass::Resolution,
        }
    }
}

/// Error computing a mutation plan.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("attribute {name:?} set to an empty string; remove attributes by omitting them")]
    InvalidRemoval { name: String },

    #[error(transparent)]
    InvalidAttribute(#[from] AttributeError),
}

impl PlanError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PlanError::InvalidRemoval { .. } => ErrorClass::Semantic,
            PlanError::InvalidAttribute(e) => e.class(),
        }
    }
}

/// Resolver configuration error. Only raised while building a resolver.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid resolver config field {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to read resolver config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse resolver config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Configuration
    }
}
