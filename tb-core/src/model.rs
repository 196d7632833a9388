//! Decoded feed data model
//!
//! Defines the structures one decode call produces: a payload of per-vehicle
//! tracks, each an ordered history of position samples. Uses Option<T> for
//! the fields that are only present when the payload's flag byte enables
//! them.

use serde::{Deserialize, Serialize};

/// One fully decoded feed payload.
///
/// Produced by a single decode call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Payload-wide optional-field flags
    pub flags: FormatFlags,

    /// Reference time added to absolute-mode time offsets (epoch seconds)
    pub base_epoch: u32,

    /// Per-vehicle position histories, in stream order
    pub tracks: Vec<TrackRecord>,
}

/// Payload-wide flag byte: which optional fields every sample carries.
///
/// Bits 0-3 of the flag byte; the remaining bits are reserved and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatFlags {
    /// Samples carry an altitude field
    pub has_alt: bool,

    /// Samples carry a distance-to-finish field
    pub has_dtf: bool,

    /// Samples carry a lap counter (only together with `has_dtf`)
    pub has_lap: bool,

    /// Samples carry a percent-complete field
    pub has_pc: bool,
}

impl FormatFlags {
    /// Decode the payload flag byte.
    pub fn from_byte(byte: u8) -> Self {
        Self {
            has_alt: byte & 0x01 != 0,
            has_dtf: byte & 0x02 != 0,
            has_lap: byte & 0x04 != 0,
            has_pc: byte & 0x08 != 0,
        }
    }

    /// Whether samples carry a lap byte.
    ///
    /// The lap field is only encoded when distance-to-finish is also
    /// enabled; `has_lap` on its own has no effect on the wire format.
    pub fn lap_enabled(&self) -> bool {
        self.has_dtf && self.has_lap
    }
}

/// The position history of one vehicle within a single payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Vehicle identifier, unique within this payload only
    pub vehicle_id: u16,

    /// Samples in stream order: index 0 is the most recent, later
    /// indices are progressively older
    pub moments: Vec<Moment>,
}

impl TrackRecord {
    /// The most recent sample of this track, if any.
    pub fn latest(&self) -> Option<&Moment> {
        self.moments.first()
    }
}

/// One timestamped position sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moment {
    /// Epoch seconds
    pub at: i64,

    /// Latitude in degrees
    pub lat: f64,

    /// Longitude in degrees
    pub lon: f64,

    /// Altitude (present iff `has_alt`)
    pub alt: Option<i16>,

    /// Distance to finish (present iff `has_dtf`)
    pub dtf: Option<i64>,

    /// Lap counter (present iff `has_dtf` and `has_lap`)
    pub lap: Option<u8>,

    /// Percent of course complete (present iff `has_pc`)
    pub pc: Option<f64>,
}

/// One resolved position report destined for the ingestion sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Latitude in degrees
    pub lat: f64,

    /// Longitude in degrees
    pub lon: f64,

    /// Speed in km/h
    pub speed_kmh: f64,

    /// Bearing in degrees
    pub bearing: f64,

    /// Epoch seconds
    pub timestamp: i64,
}

impl Fix {
    /// Build a fix from a decoded moment.
    ///
    /// The feed carries no speed or bearing, so both are reported as zero.
    pub fn from_moment(moment: &Moment) -> Self {
        Self {
            lat: moment.lat,
            lon: moment.lon,
            speed_kmh: crate::units::knots_to_kmh(0.0),
            bearing: 0.0,
            timestamp: moment.at,
        }
    }
}
