//! TrackBridge Core Library
//!
//! This crate provides the data model for decoded race-tracker feed
//! payloads and the error type shared by the decoder and the bridge.

pub mod error;
pub mod model;
pub mod units;

pub use error::FormatError;
pub use model::{Fix, FormatFlags, Moment, Payload, TrackRecord};
