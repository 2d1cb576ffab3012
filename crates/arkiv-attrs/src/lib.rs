//! Typed attribute values and reference resolution for Arkiv entities.
//!
//! On chain, an Arkiv attribute is either a UTF-8 string or a non-negative
//! integer. This crate layers a typed view on top, driven by naming
//! convention: the postfix of an attribute name decides how its value is
//! encoded and read back.
//!
//! # Overview
//!
//! | Postfix   | Category   | Wire form                          |
//! |-----------|------------|------------------------------------|
//! | `At`      | timestamp  | RFC 3339 string with offset        |
//! | `Url`     | web link   | `http://` / `https://` string      |
//! | `Ref`     | reference  | `arkiv:[chain:][0xkey]($\|#)name`  |
//! | `Version` | version    | positive integer                   |
//! | `Lat`     | latitude   | `round((deg + 90) * 1e6)`          |
//! | `Long`    | longitude  | `round((deg + 180) * 1e6)`         |
//! | (none)    | plain      | text, `[a,b]` token array, integer |
//!
//! # Quick Start
//!
//! ```rust
//! use arkiv_attrs::{codec, validate_name, AttributeValue, Category, GeoCoordinate, WireValue};
//!
//! let category = validate_name("homeLat").unwrap();
//! assert_eq!(category, Category::Latitude);
//!
//! let paris = AttributeValue::Geo(GeoCoordinate::latitude(48.856613).unwrap());
//! let wire = codec::encode(category, &paris).unwrap();
//! assert_eq!(wire, WireValue::Uint(138_856_613));
//! assert_eq!(codec::decode(category, &wire).unwrap(), paris);
//!
//! let reference: arkiv_attrs::ArkivRef = "arkiv:137:0xabc$owner".parse().unwrap();
//! assert_eq!(reference.to_string(), "arkiv:137:0xabc$owner");
//! ```
//!
//! # Modules
//!
//! - [`model`]: Names, categories, wire and typed values, references, entities
//! - [`codec`]: Value encoding/decoding and the reference grammar
//! - [`validate`]: Attribute name and pre-submission checks
//! - [`resolve`]: Cached, coalescing reference resolution over an [`EntityStore`]
//! - [`plan`]: Full-replace update planning
//! - [`describe`]: JSON rendering of entities
//! - [`error`]: Error types
//! - [`limits`]: Encoding constants and resolver defaults
//!
//! # Logging
//!
//! The crate emits `tracing` events and never installs a subscriber.

pub mod codec;
pub mod describe;
pub mod error;
pub mod limits;
pub mod model;
pub mod plan;
pub mod resolve;
pub mod util;
pub mod validate;

// Re-export commonly used types at crate root
pub use codec::{decode, encode, parse_reference, serialize_reference};
pub use describe::describe_entity;
pub use error::{
    AttributeError, CodecError, ConfigError, ErrorClass, NameError, ParseError, PlanError,
    ResolveError,
};
pub use model::{
    ArkivRef, AttributeName, AttributeSet, AttributeValue, Category, ChainId, EntityKey,
    EntitySnapshot, GeoAxis, GeoCoordinate, Scope, SystemField, Timestamp, WireKind, WireValue,
};
pub use plan::{MutationPlan, MutationPlanner, PlanWarning, VersionPolicy};
pub use resolve::{
    EntityStore, InMemoryStore, Payload, ResolutionCache, ResolutionResult, Resolved, Resolver,
    ResolverConfig, StoreError,
};
pub use validate::{validate_attribute, validate_attributes, validate_name};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
