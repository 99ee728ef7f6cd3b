use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Geodetic fix: WGS84 degrees, meters above the ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, utoipa::ToSchema)]
pub struct GeoPosition {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub alt_m: f64,
}

/// One decoded instant of a flight log.
///
/// Barometric altitude is always present; everything else depends on the
/// device having a GPS fix at that instant.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct Sample {
    pub offset_sec: f64,
    pub baro_alt_m: f64,
    pub position: Option<GeoPosition>,
    pub ground_speed_ms: Option<f64>,
    pub ground_track_deg: Option<f64>,
    pub vertical_speed_ms: Option<f64>,
}

/// A fully decoded flight log. Samples are strictly increasing in
/// `offset_sec`; the decoder drops duplicate and regressing frames.
#[derive(Debug, Clone)]
pub struct DecodedLog {
    pub started_at: DateTime<Utc>,
    pub samples: Vec<Sample>,
    pub has_gps: bool,
    pub sample_rate_hz: f64,
    pub duration_sec: f64,
    pub dropped_frames: usize,
}

impl DecodedLog {
    /// Absolute UTC instant of a time offset within this log.
    pub fn instant(&self, offset_sec: f64) -> DateTime<Utc> {
        self.started_at + Duration::milliseconds((offset_sec * 1000.0).round() as i64)
    }
}
