//! Decode error type
//!
//! A malformed or truncated feed buffer fails with a `FormatError` naming
//! the track index, the field being read, and the byte offset. Decoding is
//! all-or-nothing: no partial payload is ever returned. Network and relay
//! failures are not format errors and live with the bridge, not here.

use thiserror::Error;

/// Errors raised while decoding a feed buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The buffer is too short to hold the flag byte and base epoch.
    #[error("truncated header: {available} byte(s) available, 5 required")]
    TruncatedHeader { available: usize },

    /// A field read would pass the end of the buffer.
    #[error("track {track}: buffer ended reading {field} at offset {offset}")]
    UnexpectedEnd {
        track: usize,
        field: &'static str,
        offset: usize,
    },

    /// The first sample of a track carries the delta mode flag.
    ///
    /// There is no predecessor to delta against, so this is malformed
    /// input rather than a silent zero reference.
    #[error("track {track}: first sample at offset {offset} is delta-encoded")]
    DeltaWithoutReference { track: usize, offset: usize },
}
