//! Bit-packed channel decoder
//!
//! One 20-byte frame carries nine physical channels plus a 10-bit packet
//! counter:
//!
//! ```text
//! bytes  0-5    accel x/y/z    big-endian i16 pairs
//! bytes  6-11   gyro  x/y/z    big-endian i16 pairs
//! bytes 12-18   optical red / infrared / green, packed bit fragments
//! bytes 18-19   sequence counter, 10 bits
//! ```
//!
//! Payload elements may arrive as fractional text; they are truncated to
//! whole numbers and narrowed to `i8` with wraparound (the wraparound is part
//! of the field encoding, not an error), then reinterpreted as `u8` before
//! any shifting. Skipping the intermediate narrowing would corrupt
//! out-of-range textual inputs.

use crate::error::DecodeError;
use crate::types::{DecodedSample, RawPayload, RawRecord, PAYLOAD_LEN};

/// Decode one validated record into physical channels.
///
/// The only error is a payload element that cannot be read as a number at
/// all; every numeric payload decodes, though the result may be garbage for
/// a spurious frame. Catching that is the wear classifier's job, not the
/// decoder's.
pub fn decode(record: &RawRecord) -> Result<DecodedSample, DecodeError> {
    let b = payload_bytes(&record.payload)?;
    Ok(DecodedSample {
        sequence: sequence_counter(&b),
        accel: [be16(b[0], b[1]), be16(b[2], b[3]), be16(b[4], b[5])],
        gyro: [be16(b[6], b[7]), be16(b[8], b[9]), be16(b[10], b[11])],
        optical: optical_channels(&b),
        capture_time: record.capture_time,
    })
}

/// Coerce the payload into the packed byte frame
fn payload_bytes(payload: &RawPayload) -> Result<[u8; PAYLOAD_LEN], DecodeError> {
    let mut out = [0u8; PAYLOAD_LEN];
    match payload {
        RawPayload::Text(s) => {
            let fields: Vec<&str> = s.split(',').collect();
            if fields.len() != PAYLOAD_LEN {
                return Err(DecodeError::PayloadLength(fields.len()));
            }
            for (i, field) in fields.iter().enumerate() {
                let value: f64 =
                    field
                        .trim()
                        .parse()
                        .map_err(|_| DecodeError::NonNumericField {
                            index: i,
                            value: field.to_string(),
                        })?;
                out[i] = narrow(value);
            }
        }
        RawPayload::Values(values) => {
            if values.len() != PAYLOAD_LEN {
                return Err(DecodeError::PayloadLength(values.len()));
            }
            for (i, &value) in values.iter().enumerate() {
                out[i] = narrow(value);
            }
        }
    }
    Ok(out)
}

/// Truncate to a whole number, narrow to `i8` with wraparound, reinterpret
/// as `u8`. Narrowing before the unsigned reinterpretation matters:
/// out-of-range inputs must wrap the same way the device's 8-bit fields do.
fn narrow(value: f64) -> u8 {
    (value.trunc() as i64) as i8 as u8
}

/// Big-endian signed 16-bit from two unsigned bytes
fn be16(high: u8, low: u8) -> i16 {
    (((high as u16) << 8) | low as u16) as i16
}

/// Assemble the three optical channels from bytes 12-18.
///
/// Each channel is built from 8-bit, 6-bit, and partial-byte fragments of
/// three consecutive bytes; the effective range is 14 bits (0-16383) on
/// healthy frames.
fn optical_channels(b: &[u8; PAYLOAD_LEN]) -> [u16; 3] {
    let red = ((b[12] as u32) << 10) | ((b[13] as u32) << 2) | ((b[14] as u32) >> 6);
    let infrared = (((b[14] & 0x3F) as u32) << 12) | ((b[15] as u32) << 4) | ((b[16] as u32) >> 4);
    let green = (((b[16] & 0x0F) as u32) << 14) | ((b[17] as u32) << 6) | ((b[18] as u32) >> 2);
    [red as u16, infrared as u16, green as u16]
}

/// 10-bit packet counter from the trailing two bytes
fn sequence_counter(b: &[u8; PAYLOAD_LEN]) -> u16 {
    (((b[18] & 0x03) as u16) << 8) | b[19] as u16
}

/// Inverse of the frame layout, for engineering known payloads in tests
#[cfg(test)]
pub(crate) fn pack_frame(
    accel: [i16; 3],
    gyro: [i16; 3],
    optical: [u16; 3],
    sequence: u16,
) -> Vec<f64> {
    let mut b = [0u8; PAYLOAD_LEN];
    for (i, v) in accel.iter().chain(gyro.iter()).enumerate() {
        let u = *v as u16;
        b[2 * i] = (u >> 8) as u8;
        b[2 * i + 1] = (u & 0xFF) as u8;
    }
    let [red, infrared, green] = optical.map(u32::from);
    b[12] = (red >> 10) as u8;
    b[13] = ((red >> 2) & 0xFF) as u8;
    b[14] = (((red & 0x03) << 6) | ((infrared >> 12) & 0x3F)) as u8;
    b[15] = ((infrared >> 4) & 0xFF) as u8;
    b[16] = (((infrared & 0x0F) << 4) | ((green >> 14) & 0x0F)) as u8;
    b[17] = ((green >> 6) & 0xFF) as u8;
    b[18] = (((green & 0x3F) << 2) | ((sequence as u32 >> 8) & 0x03)) as u8;
    b[19] = (sequence & 0xFF) as u8;
    b.iter().map(|&byte| byte as i8 as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn record(payload: RawPayload) -> RawRecord {
        RawRecord {
            capture_time: Utc::now(),
            payload,
        }
    }

    #[test]
    fn test_round_trip_known_frame() {
        let payload = pack_frame([4660, -2, 127], [-32768, 256, 0], [1023, 258, 194], 513);
        let sample = decode(&record(RawPayload::Values(payload))).unwrap();

        assert_eq!(sample.accel, [4660, -2, 127]);
        assert_eq!(sample.gyro, [-32768, 256, 0]);
        assert_eq!(sample.optical, [1023, 258, 194]);
        assert_eq!(sample.sequence, 513);
    }

    #[test]
    fn test_textual_payload_matches_numeric() {
        let payload = pack_frame([100, -100, 0], [1, -1, 300], [4000, 9000, 2000], 1023);
        let text = payload
            .iter()
            .map(|v| format!("{}", v))
            .collect::<Vec<_>>()
            .join(",");

        let capture_time = Utc::now();
        let from_values = decode(&RawRecord {
            capture_time,
            payload: RawPayload::Values(payload),
        })
        .unwrap();
        let from_text = decode(&RawRecord {
            capture_time,
            payload: RawPayload::Text(text),
        })
        .unwrap();
        assert_eq!(from_values, from_text);
    }

    #[test]
    fn test_fractional_text_truncates() {
        let mut payload = pack_frame([0; 3], [0; 3], [0; 3], 7);
        payload[19] += 0.9; // still byte value 7 after truncation
        let text = payload
            .iter()
            .map(|v| format!("{:.1}", v))
            .collect::<Vec<_>>()
            .join(",");
        let sample = decode(&record(RawPayload::Text(text))).unwrap();
        assert_eq!(sample.sequence, 7);
    }

    #[test]
    fn test_narrow_wraps_out_of_range() {
        assert_eq!(narrow(300.0), 44); // 300 & 0xFF
        assert_eq!(narrow(-129.0), 127);
        assert_eq!(narrow(-1.0), 255);
        assert_eq!(narrow(127.9), 127);
        assert_eq!(narrow(-0.5), 0);
    }

    #[test]
    fn test_sequence_range() {
        for seq in [0u16, 1, 511, 512, 1023] {
            let payload = pack_frame([0; 3], [0; 3], [0; 3], seq);
            let sample = decode(&record(RawPayload::Values(payload))).unwrap();
            assert_eq!(sample.sequence, seq);
        }
    }

    #[test]
    fn test_non_numeric_field_is_fatal() {
        let mut fields = vec!["1"; PAYLOAD_LEN];
        fields[3] = "bogus";
        let err = decode(&record(RawPayload::Text(fields.join(",")))).unwrap_err();
        match err {
            DecodeError::NonNumericField { index, value } => {
                assert_eq!(index, 3);
                assert_eq!(value, "bogus");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_length_rejected() {
        let err = decode(&record(RawPayload::Values(vec![0.0; 19]))).unwrap_err();
        assert!(matches!(err, DecodeError::PayloadLength(19)));
    }
}
