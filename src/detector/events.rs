use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum EventKind {
    Exit,
    Deployment,
}

/// A detected instant within a jump log.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JumpEvent {
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub altitude_m: f64,
    pub offset_sec: f64,
}

/// Detector output. Zero, one, or both events; a deployment is only ever
/// reported after an exit.
#[derive(Debug, Clone, Default)]
pub struct DetectedEvents {
    pub exit: Option<JumpEvent>,
    pub deployment: Option<JumpEvent>,
}
