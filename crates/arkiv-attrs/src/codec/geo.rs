//! Fixed-point coordinate encoding.
//!
//! ```text
//! latInt  = round((lat  +  90) * 1_000_000)   in [0, 180_000_000]
//! longInt = round((long + 180) * 1_000_000)   in [0, 360_000_000]
//! ```

use crate::error::CodecError;
use crate::limits::MICRODEGREES_PER_DEGREE;
use crate::model::GeoAxis;

/// Converts degrees to the stored integer.
pub fn encode_degrees(axis: GeoAxis, degrees: f64) -> Result<u64, CodecError> {
    let out_of_range = || CodecError::CoordinateOutOfRange { axis, degrees };
    if !degrees.is_finite() {
        return Err(out_of_range());
    }
    let scaled = ((degrees + axis.offset_degrees()) * MICRODEGREES_PER_DEGREE).round();
    if scaled < 0.0 || scaled > axis.max_encoded() as f64 {
        return Err(out_of_range());
    }
    Ok(scaled as u64)
}

/// Converts the stored integer back to degrees.
pub fn decode_degrees(axis: GeoAxis, encoded: u64) -> Result<f64, CodecError> {
    let degrees = encoded as f64 / MICRODEGREES_PER_DEGREE - axis.offset_degrees();
    if encoded > axis.max_encoded() {
        return Err(CodecError::CoordinateOutOfRange { axis, degrees });
    }
    Ok(degrees)
}
