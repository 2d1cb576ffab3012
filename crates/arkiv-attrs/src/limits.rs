//! Encoding constants and resolver defaults.

/// Fixed-point scale for geographic coordinates (microdegrees).
pub const MICRODEGREES_PER_DEGREE: f64 = 1_000_000.0;

/// Latitudes are shifted by this many degrees so the stored integer is non-negative.
pub const LATITUDE_OFFSET_DEGREES: f64 = 90.0;

/// Longitudes are shifted by this many degrees so the stored integer is non-negative.
pub const LONGITUDE_OFFSET_DEGREES: f64 = 180.0;

/// Largest stored latitude (+90 degrees).
pub const MAX_LATITUDE_ENCODED: u64 = 180_000_000;

/// Largest stored longitude (+180 degrees).
pub const MAX_LONGITUDE_ENCODED: u64 = 360_000_000;

/// Hard cap on how many nested reference hops a resolver may follow.
pub const MAX_REFERENCE_DEPTH: u8 = 4;

/// Default limit for gated payload resolution (1 MiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 1024 * 1024;

/// Default number of cached resolution results.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Default lifetime of a successful resolution.
pub const DEFAULT_POSITIVE_TTL_MS: u64 = 60_000;

/// Default lifetime of a failed resolution.
pub const DEFAULT_NEGATIVE_TTL_MS: u64 = 5_000;

/// Content type assumed for payloads stored without one.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";
