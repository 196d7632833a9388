//! Binary decoder for the race-tracker position feed
//!
//! The feed packs per-vehicle position histories into a compact stream:
//! one flag byte and base epoch, then repeated (vehicle id, sample count,
//! samples) records. Samples are either absolute or delta-compressed
//! against the previous sample of the same track; coordinates accumulate
//! as raw integers and are rescaled to degrees once per track.

pub mod decode;
pub mod reader;

pub use decode::decode;
pub use reader::ByteReader;
