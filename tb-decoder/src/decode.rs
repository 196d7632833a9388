//! Feed payload decoding
//!
//! Layout, all fields big-endian, no length prefix or checksum:
//!
//! ```text
//! [flags:u8][baseEpoch:u32]
//! repeated until end of buffer:
//!   [vehicleId:u16][sampleCount:u16][sampleCount x sample]
//! ```
//!
//! Bit 15 of the first 16 bits of each sample selects the encoding:
//! set means delta against the previous sample of the same track, clear
//! means absolute. The low 15 bits of that same field are the delta time
//! offset; in absolute mode the field is the top half of a 32-bit time
//! offset instead, so the peek commits to nothing.

use crate::reader::{ByteReader, ShortRead};
use tb_core::units::{degrees_from_raw, PC_ABS_SCALE, PC_DELTA_SCALE};
use tb_core::{FormatError, FormatFlags, Moment, Payload, TrackRecord};

const DELTA_FLAG: u16 = 0x8000;
const TIME_OFFSET_MASK: u16 = 0x7FFF;

/// Cap on up-front moment allocation per track. sampleCount is a u16, but
/// a hostile count should not reserve 64k slots before the first sample
/// decodes; past the cap the vector grows only as samples actually arrive.
const MAX_MOMENT_PREALLOC: usize = 1024;

/// Per-track reference state for delta decoding.
enum Reference {
    AwaitingFirstPoint,
    HaveReference(RawMoment),
}

/// A decoded sample with coordinates still in raw integer units.
///
/// Deltas accumulate on these integers; conversion to degrees happens
/// exactly once per track, after all of its samples are decoded, so long
/// delta chains pick up no floating-point drift.
#[derive(Debug, Clone, Copy)]
struct RawMoment {
    at: i64,
    lat_raw: i64,
    lon_raw: i64,
    alt: Option<i16>,
    dtf: Option<i64>,
    lap: Option<u8>,
    pc: Option<f64>,
}

impl RawMoment {
    fn into_moment(self) -> Moment {
        Moment {
            at: self.at,
            lat: degrees_from_raw(self.lat_raw),
            lon: degrees_from_raw(self.lon_raw),
            alt: self.alt,
            dtf: self.dtf,
            lap: self.lap,
            pc: self.pc,
        }
    }
}

/// Decode one feed buffer into a payload.
///
/// Pure and stateless: the same buffer always decodes to the same payload,
/// and independent buffers may be decoded concurrently. Fails with a
/// [`FormatError`] on any truncation or a delta-encoded first sample; no
/// partial payload is ever returned.
pub fn decode(buf: &[u8]) -> Result<Payload, FormatError> {
    let mut reader = ByteReader::new(buf);
    let (flags, base_epoch) = read_header(&mut reader)?;

    let mut tracks = Vec::new();
    while !reader.is_empty() {
        let track = tracks.len();
        let in_track = |e: ShortRead| FormatError::UnexpectedEnd {
            track,
            field: e.field,
            offset: e.offset,
        };

        let vehicle_id = reader.read_u16("vehicleId").map_err(in_track)?;
        let sample_count = reader.read_u16("sampleCount").map_err(in_track)? as usize;

        let mut raw = Vec::with_capacity(sample_count.min(MAX_MOMENT_PREALLOC));
        let mut reference = Reference::AwaitingFirstPoint;
        for _ in 0..sample_count {
            let moment = decode_moment(&mut reader, &flags, base_epoch, &reference, track)?;
            raw.push(moment);
            reference = Reference::HaveReference(moment);
        }

        tracks.push(TrackRecord {
            vehicle_id,
            moments: raw.into_iter().map(RawMoment::into_moment).collect(),
        });
    }

    Ok(Payload {
        flags,
        base_epoch,
        tracks,
    })
}

/// Read the payload-wide flag byte and base epoch.
fn read_header(reader: &mut ByteReader<'_>) -> Result<(FormatFlags, u32), FormatError> {
    let available = reader.remaining();
    let truncated = |_: ShortRead| FormatError::TruncatedHeader { available };

    let flags = FormatFlags::from_byte(reader.read_u8("flags").map_err(truncated)?);
    let base_epoch = reader.read_u32("baseEpoch").map_err(truncated)?;
    Ok((flags, base_epoch))
}

/// Decode one sample, using `reference` for delta fields.
fn decode_moment(
    reader: &mut ByteReader<'_>,
    flags: &FormatFlags,
    base_epoch: u32,
    reference: &Reference,
    track: usize,
) -> Result<RawMoment, FormatError> {
    let in_track = |e: ShortRead| FormatError::UnexpectedEnd {
        track,
        field: e.field,
        offset: e.offset,
    };

    let head = reader.peek_u16("sampleHead").map_err(in_track)?;
    if head & DELTA_FLAG != 0 {
        let prev = match reference {
            Reference::HaveReference(prev) => prev,
            Reference::AwaitingFirstPoint => {
                return Err(FormatError::DeltaWithoutReference {
                    track,
                    offset: reader.offset(),
                })
            }
        };

        // Same 16 bits as the peek: bit 15 was the mode flag, the low 15
        // bits are the time offset back from the previous sample.
        let head = reader.read_u16("timeOffset").map_err(in_track)?;
        let at = prev.at - i64::from(head & TIME_OFFSET_MASK);
        let lat_raw = prev.lat_raw + i64::from(reader.read_i16("latDelta").map_err(in_track)?);
        let lon_raw = prev.lon_raw + i64::from(reader.read_i16("lonDelta").map_err(in_track)?);

        // Altitude is absolute even in delta samples.
        let alt = if flags.has_alt {
            Some(reader.read_i16("alt").map_err(in_track)?)
        } else {
            None
        };

        let (dtf, lap) = if flags.has_dtf {
            let delta = i64::from(reader.read_i16("dtfDelta").map_err(in_track)?);
            let dtf = prev.dtf.unwrap_or(0) + delta;
            let lap = if flags.has_lap {
                Some(reader.read_u8("lap").map_err(in_track)?)
            } else {
                None
            };
            (Some(dtf), lap)
        } else {
            (None, None)
        };

        let pc = if flags.has_pc {
            let delta = f64::from(reader.read_i16("pcDelta").map_err(in_track)?) / PC_DELTA_SCALE;
            // The feed's encoder counts the delta term twice; kept as-is
            // for parity with live payloads.
            Some(prev.pc.unwrap_or(0.0) + 2.0 * delta)
        } else {
            None
        };

        Ok(RawMoment {
            at,
            lat_raw,
            lon_raw,
            alt,
            dtf,
            lap,
            pc,
        })
    } else {
        // Absolute sample. The mode bit is 0, so the full 32-bit time
        // offset read is unperturbed by it.
        let at = i64::from(base_epoch) + i64::from(reader.read_u32("timeOffset").map_err(in_track)?);
        let lat_raw = i64::from(reader.read_i32("lat").map_err(in_track)?);
        let lon_raw = i64::from(reader.read_i32("lon").map_err(in_track)?);

        let alt = if flags.has_alt {
            Some(reader.read_i16("alt").map_err(in_track)?)
        } else {
            None
        };

        let (dtf, lap) = if flags.has_dtf {
            let dtf = i64::from(reader.read_i32("dtf").map_err(in_track)?);
            let lap = if flags.has_lap {
                Some(reader.read_u8("lap").map_err(in_track)?)
            } else {
                None
            };
            (Some(dtf), lap)
        } else {
            (None, None)
        };

        let pc = if flags.has_pc {
            Some(f64::from(reader.read_i32("pc").map_err(in_track)?) / PC_ABS_SCALE)
        } else {
            None
        };

        Ok(RawMoment {
            at,
            lat_raw,
            lon_raw,
            alt,
            dtf,
            lap,
            pc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_is_truncated_header() {
        assert_eq!(
            decode(&[]),
            Err(FormatError::TruncatedHeader { available: 0 })
        );
    }

    #[test]
    fn test_four_byte_buffer_is_truncated_header() {
        assert_eq!(
            decode(&[0x00, 0x00, 0x00, 0x00]),
            Err(FormatError::TruncatedHeader { available: 4 })
        );
    }

    #[test]
    fn test_header_only_yields_no_tracks() {
        let payload = decode(&[0x0F, 0x00, 0x00, 0x03, 0xE8]).unwrap();
        assert_eq!(payload.base_epoch, 1000);
        assert!(payload.flags.has_alt);
        assert!(payload.flags.has_pc);
        assert!(payload.tracks.is_empty());
    }

    #[test]
    fn test_dangling_record_header_fails() {
        // Header plus a lone vehicleId byte at the tail.
        let buf = [0x00, 0x00, 0x00, 0x00, 0x00, 0x12];
        let err = decode(&buf).unwrap_err();
        assert_eq!(
            err,
            FormatError::UnexpectedEnd {
                track: 0,
                field: "vehicleId",
                offset: 5,
            }
        );
    }

    #[test]
    fn test_first_sample_with_delta_flag_fails() {
        let mut buf = vec![0x00, 0x00, 0x00, 0x00, 0x00];
        buf.extend_from_slice(&7u16.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&0x8005u16.to_be_bytes());
        buf.extend_from_slice(&[0u8; 4]);
        assert_eq!(
            decode(&buf),
            Err(FormatError::DeltaWithoutReference {
                track: 0,
                offset: 9,
            })
        );
    }
}
