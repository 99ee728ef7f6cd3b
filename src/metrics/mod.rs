// Per-jump metric derivation. Missing prerequisites always surface as
// explicit absence (`None` / JSON null), never as a zero that could be read
// as a real zero-duration freefall.

use serde::Serialize;
use strum_macros::Display;
use utoipa::ToSchema;

use crate::decoder::DecodedLog;
use crate::detector::{DetectedEvents, JumpEvent};

const M_TO_FT: f64 = 3.280_839_895;
const MS_TO_MPH: f64 = 2.236_936_292;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Verdict {
    Valid,
    NoExitDetected,
    NoDeploymentDetected,
    Malformed,
}

#[derive(Debug, Clone)]
pub struct JumpMetrics {
    pub verdict: Verdict,
    pub exit: Option<JumpEvent>,
    pub deployment: Option<JumpEvent>,
    pub freefall_time_sec: Option<f64>,
    pub avg_fall_rate_mph: Option<f64>,
}

impl JumpMetrics {
    pub fn malformed() -> Self {
        JumpMetrics {
            verdict: Verdict::Malformed,
            exit: None,
            deployment: None,
            freefall_time_sec: None,
            avg_fall_rate_mph: None,
        }
    }
}

/// Derives jump metrics from the detected events.
///
/// Freefall figures are reported only when both events exist and the window
/// has positive duration.
pub fn compute(events: &DetectedEvents) -> JumpMetrics {
    let (exit, deployment) = match (&events.exit, &events.deployment) {
        (None, _) => {
            return JumpMetrics {
                verdict: Verdict::NoExitDetected,
                exit: None,
                deployment: None,
                freefall_time_sec: None,
                avg_fall_rate_mph: None,
            }
        }
        (Some(exit), None) => {
            return JumpMetrics {
                verdict: Verdict::NoDeploymentDetected,
                exit: Some(exit.clone()),
                deployment: None,
                freefall_time_sec: None,
                avg_fall_rate_mph: None,
            }
        }
        (Some(exit), Some(deployment)) => (exit.clone(), deployment.clone()),
    };

    let duration = deployment.offset_sec - exit.offset_sec;
    let (freefall, rate) = if duration > 0.0 {
        let loss_m = exit.altitude_m - deployment.altitude_m;
        (Some(duration), Some(loss_m / duration * MS_TO_MPH))
    } else {
        (None, None)
    };

    JumpMetrics {
        verdict: Verdict::Valid,
        exit: Some(exit),
        deployment: Some(deployment),
        freefall_time_sec: freefall,
        avg_fall_rate_mph: rate,
    }
}

/// Wire-format report for one jump log, per the consumer contract.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JumpReport {
    // Two keys the consumer contract spells with full-caps acronyms.
    #[serde(rename = "hasGPS")]
    pub has_gps: bool,
    pub duration_sec: f64,
    pub sample_rate: f64,
    #[serde(rename = "exitTimestampUTC")]
    pub exit_timestamp_utc: Option<String>,
    pub exit_altitude_ft: Option<f64>,
    pub deploy_altitude_ft: Option<f64>,
    pub freefall_time_sec: Option<f64>,
    pub avg_fall_rate_mph: Option<f64>,
    pub verdict: Verdict,
}

impl JumpReport {
    pub fn from_metrics(log: &DecodedLog, metrics: &JumpMetrics) -> Self {
        JumpReport {
            has_gps: log.has_gps,
            duration_sec: round2(log.duration_sec),
            sample_rate: round2(log.sample_rate_hz),
            exit_timestamp_utc: metrics.exit.as_ref().map(|e| e.timestamp.to_rfc3339()),
            exit_altitude_ft: metrics.exit.as_ref().map(|e| round2(e.altitude_m * M_TO_FT)),
            deploy_altitude_ft: metrics
                .deployment
                .as_ref()
                .map(|e| round2(e.altitude_m * M_TO_FT)),
            freefall_time_sec: metrics.freefall_time_sec.map(round2),
            avg_fall_rate_mph: metrics.avg_fall_rate_mph.map(round2),
            verdict: metrics.verdict,
        }
    }

    /// Report for a log whose bytes failed to decode.
    pub fn malformed() -> Self {
        JumpReport {
            has_gps: false,
            duration_sec: 0.0,
            sample_rate: 0.0,
            exit_timestamp_utc: None,
            exit_altitude_ft: None,
            deploy_altitude_ft: None,
            freefall_time_sec: None,
            avg_fall_rate_mph: None,
            verdict: Verdict::Malformed,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
