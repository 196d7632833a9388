//! Scale constants shared by the decoder and the relay
//!
//! The feed transmits coordinates as scaled integers; conversion to degrees
//! happens exactly once per track, after delta accumulation.

/// Raw coordinate units per degree
pub const COORD_SCALE: f64 = 100_000.0;

/// Divisor for the percent-complete field in delta-encoded samples
pub const PC_DELTA_SCALE: f64 = 32_000.0;

/// Divisor for the percent-complete field in absolute-encoded samples
pub const PC_ABS_SCALE: f64 = 21_000_000.0;

/// Knots per km/h
const KNOTS_TO_KMH: f64 = 1.852;

/// Convert an accumulated raw coordinate to degrees.
pub fn degrees_from_raw(raw: i64) -> f64 {
    raw as f64 / COORD_SCALE
}

/// Convert a speed in knots to km/h.
pub fn knots_to_kmh(knots: f64) -> f64 {
    knots * KNOTS_TO_KMH
}
