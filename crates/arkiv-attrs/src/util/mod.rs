//! Utility modules.

pub mod datetime;

pub use datetime::{format_timestamp, parse_timestamp, DateTimeParseError};
