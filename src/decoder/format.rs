// TLOG binary format, as written by the wearable's firmware.
//
// Little-endian throughout. 16-byte header:
//   0..4   magic "TLOG"
//   4      format version (supported: 1)
//   5      flags, bit 0 = GPS frames present
//   6..8   sample interval in milliseconds (u16, nonzero)
//   8..16  log start, unix seconds (u64)
//
// Frames follow back-to-back. Baro-only logs use 9-byte frames:
//   offset ms (u32), baro altitude cm (i32), frame flags (u8)
// GPS logs use 27-byte frames, appending:
//   lat 1e-7 deg (i32), lon 1e-7 deg (i32), GPS altitude cm (i32),
//   ground speed cm/s (u16), ground track centideg (u16),
//   vertical speed cm/s (i16, positive up)
// Frame flag bit 0 = fix valid, bit 1 = velocity valid. A GPS frame without
// a valid fix decodes with `position: None` rather than a fabricated fix.

use chrono::{DateTime, Utc};
use log::warn;

use super::error::DecodeError;
use super::sample::{DecodedLog, GeoPosition, Sample};

const MAGIC: &[u8; 4] = b"TLOG";
const HEADER_LEN: usize = 16;
const SUPPORTED_VERSION: u8 = 1;

const HDR_FLAG_GPS: u8 = 0x01;
const FRAME_FLAG_FIX: u8 = 0x01;
const FRAME_FLAG_VEL: u8 = 0x02;

const BARO_FRAME_LEN: usize = 9;
const GPS_FRAME_LEN: usize = 27;

/// Decodes a raw TLOG buffer. Total: either a complete `DecodedLog` or a
/// typed error, never a partial result.
pub fn decode(bytes: &[u8]) -> Result<DecodedLog, DecodeError> {
    if bytes.len() < HEADER_LEN {
        return Err(DecodeError::TooShort(bytes.len(), HEADER_LEN));
    }
    if &bytes[0..4] != MAGIC {
        return Err(DecodeError::BadHeader("magic mismatch"));
    }
    let version = bytes[4];
    if version != SUPPORTED_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    let has_gps = bytes[5] & HDR_FLAG_GPS != 0;
    let interval_ms = u16_at(bytes, 6);
    if interval_ms == 0 {
        return Err(DecodeError::BadHeader("zero sample interval"));
    }
    let start_unix = u64_at(bytes, 8);
    let started_at = DateTime::<Utc>::from_timestamp(start_unix as i64, 0)
        .ok_or(DecodeError::BadHeader("start timestamp out of range"))?;

    let frame_len = if has_gps { GPS_FRAME_LEN } else { BARO_FRAME_LEN };
    let body = &bytes[HEADER_LEN..];
    if body.len() % frame_len != 0 {
        return Err(DecodeError::TruncatedFrame(
            body.len() % frame_len,
            body.len() / frame_len,
        ));
    }

    let mut samples = Vec::with_capacity(body.len() / frame_len);
    let mut dropped = 0usize;
    let mut last_offset = f64::NEG_INFINITY;
    for frame in body.chunks_exact(frame_len) {
        let sample = decode_frame(frame, has_gps);
        // Strictly increasing offsets. Duplicates and regressions are
        // dropped, never reordered into a different causal order.
        if sample.offset_sec <= last_offset {
            dropped += 1;
            continue;
        }
        last_offset = sample.offset_sec;
        samples.push(sample);
    }
    if dropped > 0 {
        warn!("dropped {dropped} out-of-order frame(s)");
    }

    let duration_sec = samples.last().map(|s| s.offset_sec).unwrap_or(0.0);
    Ok(DecodedLog {
        started_at,
        samples,
        has_gps,
        sample_rate_hz: 1000.0 / f64::from(interval_ms),
        duration_sec,
        dropped_frames: dropped,
    })
}

fn decode_frame(frame: &[u8], has_gps: bool) -> Sample {
    let offset_sec = f64::from(u32_at(frame, 0)) / 1000.0;
    let baro_alt_m = f64::from(i32_at(frame, 4)) / 100.0;
    let flags = frame[8];

    let mut sample = Sample {
        offset_sec,
        baro_alt_m,
        position: None,
        ground_speed_ms: None,
        ground_track_deg: None,
        vertical_speed_ms: None,
    };
    if !has_gps {
        return sample;
    }

    if flags & FRAME_FLAG_FIX != 0 {
        sample.position = Some(GeoPosition {
            lat_deg: f64::from(i32_at(frame, 9)) / 1e7,
            lon_deg: f64::from(i32_at(frame, 13)) / 1e7,
            alt_m: f64::from(i32_at(frame, 17)) / 100.0,
        });
    }
    if flags & FRAME_FLAG_VEL != 0 {
        sample.ground_speed_ms = Some(f64::from(u16_at(frame, 21)) / 100.0);
        sample.ground_track_deg = Some(f64::from(u16_at(frame, 23)) / 100.0);
        sample.vertical_speed_ms = Some(f64::from(i16_at(frame, 25)) / 100.0);
    }
    sample
}

// Offsets are validated against the frame/header length before these run.
fn u16_at(b: &[u8], i: usize) -> u16 {
    u16::from_le_bytes([b[i], b[i + 1]])
}

fn i16_at(b: &[u8], i: usize) -> i16 {
    i16::from_le_bytes([b[i], b[i + 1]])
}

fn u32_at(b: &[u8], i: usize) -> u32 {
    u32::from_le_bytes([b[i], b[i + 1], b[i + 2], b[i + 3]])
}

fn i32_at(b: &[u8], i: usize) -> i32 {
    i32::from_le_bytes([b[i], b[i + 1], b[i + 2], b[i + 3]])
}

fn u64_at(b: &[u8], i: usize) -> u64 {
    u64::from_le_bytes([
        b[i],
        b[i + 1],
        b[i + 2],
        b[i + 3],
        b[i + 4],
        b[i + 5],
        b[i + 6],
        b[i + 7],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(version: u8, gps: bool, interval_ms: u16, start_unix: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.push(version);
        buf.push(if gps { HDR_FLAG_GPS } else { 0 });
        buf.extend_from_slice(&interval_ms.to_le_bytes());
        buf.extend_from_slice(&start_unix.to_le_bytes());
        buf
    }

    fn baro_frame(buf: &mut Vec<u8>, offset_ms: u32, alt_cm: i32) {
        buf.extend_from_slice(&offset_ms.to_le_bytes());
        buf.extend_from_slice(&alt_cm.to_le_bytes());
        buf.push(0);
    }

    #[allow(clippy::too_many_arguments)]
    fn gps_frame(
        buf: &mut Vec<u8>,
        offset_ms: u32,
        alt_cm: i32,
        flags: u8,
        lat_e7: i32,
        lon_e7: i32,
        galt_cm: i32,
        speed_cms: u16,
        track_cdeg: u16,
        vspeed_cms: i16,
    ) {
        buf.extend_from_slice(&offset_ms.to_le_bytes());
        buf.extend_from_slice(&alt_cm.to_le_bytes());
        buf.push(flags);
        buf.extend_from_slice(&lat_e7.to_le_bytes());
        buf.extend_from_slice(&lon_e7.to_le_bytes());
        buf.extend_from_slice(&galt_cm.to_le_bytes());
        buf.extend_from_slice(&speed_cms.to_le_bytes());
        buf.extend_from_slice(&track_cdeg.to_le_bytes());
        buf.extend_from_slice(&vspeed_cms.to_le_bytes());
    }

    #[test]
    fn rejects_short_buffer() {
        assert_eq!(
            decode(b"TLO").unwrap_err(),
            DecodeError::TooShort(3, HEADER_LEN)
        );
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = header(1, false, 250, 0);
        buf[0] = b'X';
        assert_eq!(
            decode(&buf).unwrap_err(),
            DecodeError::BadHeader("magic mismatch")
        );
    }

    #[test]
    fn rejects_unsupported_version() {
        let buf = header(7, false, 250, 0);
        assert_eq!(decode(&buf).unwrap_err(), DecodeError::UnsupportedVersion(7));
    }

    #[test]
    fn rejects_zero_interval() {
        let buf = header(1, false, 0, 0);
        assert_eq!(
            decode(&buf).unwrap_err(),
            DecodeError::BadHeader("zero sample interval")
        );
    }

    #[test]
    fn rejects_truncated_frame() {
        let mut buf = header(1, false, 250, 1_700_000_000);
        baro_frame(&mut buf, 0, 400_000);
        buf.extend_from_slice(&[1, 2, 3]);
        assert_eq!(decode(&buf).unwrap_err(), DecodeError::TruncatedFrame(3, 1));
    }

    #[test]
    fn decodes_baro_only_log() {
        let mut buf = header(1, false, 250, 1_700_000_000);
        for i in 0..8u32 {
            baro_frame(&mut buf, i * 250, 400_000 - (i as i32) * 100);
        }
        let log = decode(&buf).unwrap();
        assert!(!log.has_gps);
        assert_eq!(log.samples.len(), 8);
        assert_eq!(log.sample_rate_hz, 4.0);
        assert!((log.duration_sec - 1.75).abs() < 1e-9);
        assert!(log.samples.iter().all(|s| s.position.is_none()));
        assert!((log.samples[1].baro_alt_m - 3999.0).abs() < 1e-9);
    }

    #[test]
    fn samples_are_strictly_ordered_and_regressions_dropped() {
        let mut buf = header(1, false, 250, 1_700_000_000);
        baro_frame(&mut buf, 0, 400_000);
        baro_frame(&mut buf, 250, 399_900);
        baro_frame(&mut buf, 250, 399_900); // duplicate
        baro_frame(&mut buf, 100, 399_950); // regression
        baro_frame(&mut buf, 500, 399_800);
        let log = decode(&buf).unwrap();
        assert_eq!(log.samples.len(), 3);
        assert_eq!(log.dropped_frames, 2);
        for pair in log.samples.windows(2) {
            assert!(pair[0].offset_sec < pair[1].offset_sec);
        }
    }

    #[test]
    fn gps_frame_without_fix_has_no_position() {
        let mut buf = header(1, true, 250, 1_700_000_000);
        gps_frame(&mut buf, 0, 400_000, 0, 0, 0, 0, 0, 0, 0);
        gps_frame(
            &mut buf,
            250,
            399_900,
            FRAME_FLAG_FIX | FRAME_FLAG_VEL,
            52_0000000,
            13_0000000,
            410_000,
            3500,
            27000,
            -120,
        );
        let log = decode(&buf).unwrap();
        assert!(log.has_gps);
        assert!(log.samples[0].position.is_none());
        let fix = log.samples[1].position.unwrap();
        assert!((fix.lat_deg - 52.0).abs() < 1e-9);
        assert!((fix.lon_deg - 13.0).abs() < 1e-9);
        assert!((fix.alt_m - 4100.0).abs() < 1e-9);
        assert_eq!(log.samples[1].ground_speed_ms, Some(35.0));
        assert_eq!(log.samples[1].ground_track_deg, Some(270.0));
        assert_eq!(log.samples[1].vertical_speed_ms, Some(-1.2));
    }

    #[test]
    fn empty_body_decodes_to_empty_log() {
        let buf = header(1, false, 250, 1_700_000_000);
        let log = decode(&buf).unwrap();
        assert!(log.samples.is_empty());
        assert_eq!(log.duration_sec, 0.0);
    }
}
