use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FormationError {
    #[error("ambiguous base tie between logs {0} and {1}")]
    AmbiguousBase(Uuid, Uuid),
    #[error("log {0} equidistant between formations {1} and {2}")]
    AmbiguousAttachment(Uuid, Uuid, Uuid),
}

/// A formed group. Membership only ever grows; the group is never split
/// outside an explicit administrative correction.
#[derive(Debug, Clone)]
pub struct FormationGroup {
    pub id: Uuid,
    pub base_log: Uuid,
    pub member_logs: Vec<Uuid>,
    pub base_exit_at: DateTime<Utc>,
    pub formed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormationSummary {
    pub id: Uuid,
    pub base_jumper_id: String,
    pub member_count: usize,
    pub base_exit_at: DateTime<Utc>,
}
