// Assembles the per-formation replay dataset: every member's track
// re-based onto the base jumper's exit instant and expressed in the shared
// local frame.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::decoder::{DecodedLog, GeoPosition, Sample};
use crate::detector::JumpEvent;
use crate::geo::LocalFrame;

/// One formation member as handed over by the store.
#[derive(Debug, Clone)]
pub struct MemberInput {
    pub log_id: Uuid,
    pub user_id: String,
    pub visible: bool,
    pub is_base: bool,
    pub log: DecodedLog,
    pub exit: JumpEvent,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackPoint {
    pub time_offset_sec: f64,
    /// Absent for members without a GPS fix at this instant; consumers must
    /// treat the absence explicitly, not as the origin.
    pub forward_m: Option<f64>,
    pub right_m: Option<f64>,
    pub up_m: f64,
    pub altitude_m: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    pub is_base: bool,
    pub is_visible: bool,
    pub time_series: Vec<TrackPoint>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormationResponse {
    pub base_jumper_id: String,
    /// Null when the base carries no GPS track; the whole dataset is then
    /// altitude-only.
    pub jump_run_track_deg_true: Option<f64>,
    pub participants: Vec<Participant>,
}

/// Builds the formation dataset for `requester`.
///
/// Offset 0 is the base jumper's exit instant; members who left earlier get
/// negative offsets. A private member is included for a non-owner requester
/// with `isVisible: false` and an empty series, never with fabricated data.
pub fn build_dataset(members: &[MemberInput], requester: Option<&str>) -> FormationResponse {
    let base = match members.iter().find(|m| m.is_base).or_else(|| members.first()) {
        Some(base) => base,
        None => {
            return FormationResponse {
                base_jumper_id: String::new(),
                jump_run_track_deg_true: None,
                participants: Vec::new(),
            }
        }
    };
    let base_exit_at = base.exit.timestamp;

    // Jump-run bearing and frame origin come from the base's samples nearest
    // its exit instant. The altitude channel stays barometric throughout so
    // member tracks remain comparable with GPS-less members.
    let bearing = nearest_field(&base.log, base.exit.offset_sec, |s| s.ground_track_deg);
    let origin = nearest_field(&base.log, base.exit.offset_sec, |s| {
        s.position.map(|p| GeoPosition {
            lat_deg: p.lat_deg,
            lon_deg: p.lon_deg,
            alt_m: s.baro_alt_m,
        })
    });
    let frame = match (origin, bearing) {
        (Some(origin), Some(bearing)) => Some(LocalFrame::new(origin, bearing)),
        _ => None,
    };
    let origin_alt_m = origin.map(|o| o.alt_m).unwrap_or(base.exit.altitude_m);

    let participants = members
        .iter()
        .map(|member| {
            let is_visible = member.visible || requester == Some(member.user_id.as_str());
            let time_series = if is_visible {
                member_track(member, base_exit_at, frame.as_ref(), origin_alt_m)
            } else {
                Vec::new()
            };
            Participant {
                user_id: member.user_id.clone(),
                is_base: member.is_base,
                is_visible,
                time_series,
            }
        })
        .collect();

    FormationResponse {
        base_jumper_id: base.user_id.clone(),
        jump_run_track_deg_true: frame.as_ref().map(|f| round2(f.bearing_deg())),
        participants,
    }
}

fn member_track(
    member: &MemberInput,
    base_exit_at: chrono::DateTime<chrono::Utc>,
    frame: Option<&LocalFrame>,
    origin_alt_m: f64,
) -> Vec<TrackPoint> {
    member
        .log
        .samples
        .iter()
        .map(|sample| {
            let offset_ms = (member.log.instant(sample.offset_sec) - base_exit_at)
                .num_milliseconds();
            let local = match (frame, sample.position) {
                (Some(frame), Some(position)) => Some(frame.to_local(&GeoPosition {
                    lat_deg: position.lat_deg,
                    lon_deg: position.lon_deg,
                    alt_m: sample.baro_alt_m,
                })),
                _ => None,
            };
            TrackPoint {
                time_offset_sec: offset_ms as f64 / 1000.0,
                forward_m: local.map(|p| round2(p.forward_m)),
                right_m: local.map(|p| round2(p.right_m)),
                up_m: round2(
                    local
                        .map(|p| p.up_m)
                        .unwrap_or(sample.baro_alt_m - origin_alt_m),
                ),
                altitude_m: round2(sample.baro_alt_m),
            }
        })
        .collect()
}

fn nearest_field<T>(
    log: &DecodedLog,
    offset_sec: f64,
    field: impl Fn(&Sample) -> Option<T>,
) -> Option<T> {
    log.samples
        .iter()
        .filter_map(|s| field(s).map(|v| ((s.offset_sec - offset_sec).abs(), v)))
        .min_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, v)| v)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
