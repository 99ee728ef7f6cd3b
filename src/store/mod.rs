// In-memory repository for raw logs, processed jump records, and formation
// membership. Persistence proper lives outside the core; this object is the
// explicit, passed-in stand-in for it (no process-wide globals), created at
// startup and handed to the pipeline and the web layer.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use log::warn;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::FormationConfig;
use crate::decoder::DecodedLog;
use crate::detector::DetectedEvents;
use crate::formation::{
    attach_to_existing, build_dataset, cluster_unattached, ExitCandidate, FormationGroup,
    FormationResponse, FormationSummary, MemberInput,
};
use crate::metrics::{JumpReport, Verdict};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("log {0} not found")]
    LogNotFound(Uuid),
    #[error("log {0} not processed yet")]
    NotProcessed(Uuid),
    #[error("formation {0} not found")]
    FormationNotFound(Uuid),
}

/// An uploaded raw log. Immutable once stored.
#[derive(Debug, Clone)]
pub struct RawLog {
    pub id: Uuid,
    pub device_id: String,
    pub user_id: String,
    pub uploaded_at: DateTime<Utc>,
    pub visible: bool,
    pub bytes: Vec<u8>,
    pub upload_seq: u64,
}

/// Everything the pipeline derived from one raw log, committed in a single
/// store write so partial results are never observable.
#[derive(Debug, Clone)]
pub struct JumpRecord {
    pub verdict: Verdict,
    pub report: JumpReport,
    /// Cached for formation assembly; dropped logs (malformed) have none.
    pub decoded: Option<DecodedLog>,
    pub events: DetectedEvents,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogSummary {
    pub id: Uuid,
    pub device_id: String,
    pub user_id: String,
    pub uploaded_at: DateTime<Utc>,
    pub verdict: Option<Verdict>,
}

#[derive(Default)]
struct Inner {
    raw: HashMap<Uuid, RawLog>,
    upload_order: Vec<Uuid>,
    jumps: HashMap<Uuid, JumpRecord>,
    formations: HashMap<Uuid, FormationGroup>,
    /// log id -> formation id; a log is attached at most once, ever.
    attached: HashMap<Uuid, Uuid>,
    next_seq: u64,
}

pub struct Store {
    inner: RwLock<Inner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Store {
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn insert_log(&self, device_id: &str, user_id: &str, visible: bool, bytes: Vec<u8>) -> Uuid {
        let mut inner = self.inner.write().unwrap();
        let id = Uuid::new_v4();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.raw.insert(
            id,
            RawLog {
                id,
                device_id: device_id.to_string(),
                user_id: user_id.to_string(),
                uploaded_at: Utc::now(),
                visible,
                bytes,
                upload_seq: seq,
            },
        );
        inner.upload_order.push(id);
        id
    }

    /// Logs that have no jump record yet, in upload order.
    pub fn pending_logs(&self) -> Vec<RawLog> {
        let inner = self.inner.read().unwrap();
        inner
            .upload_order
            .iter()
            .filter(|id| !inner.jumps.contains_key(id))
            .filter_map(|id| inner.raw.get(id).cloned())
            .collect()
    }

    pub fn commit_jump(&self, log_id: Uuid, record: JumpRecord) {
        let mut inner = self.inner.write().unwrap();
        inner.jumps.insert(log_id, record);
    }

    pub fn list_logs(&self) -> Vec<LogSummary> {
        let inner = self.inner.read().unwrap();
        inner
            .upload_order
            .iter()
            .filter_map(|id| inner.raw.get(id))
            .map(|raw| LogSummary {
                id: raw.id,
                device_id: raw.device_id.clone(),
                user_id: raw.user_id.clone(),
                uploaded_at: raw.uploaded_at,
                verdict: inner.jumps.get(&raw.id).map(|j| j.verdict),
            })
            .collect()
    }

    pub fn report(&self, log_id: Uuid) -> Result<JumpReport, StoreError> {
        let inner = self.inner.read().unwrap();
        if !inner.raw.contains_key(&log_id) {
            return Err(StoreError::LogNotFound(log_id));
        }
        inner
            .jumps
            .get(&log_id)
            .map(|j| j.report.clone())
            .ok_or(StoreError::NotProcessed(log_id))
    }

    /// One clustering pass. Reads and mutates shared membership state, so
    /// the whole pass runs under the write lock; two concurrent passes can
    /// never attach the same log twice.
    pub fn cluster_pass(&self, config: &FormationConfig) -> Vec<Uuid> {
        let mut inner = self.inner.write().unwrap();
        let window = Duration::seconds(config.window_sec);

        let mut candidates: Vec<ExitCandidate> = inner
            .jumps
            .iter()
            .filter(|(id, _)| !inner.attached.contains_key(*id))
            .filter_map(|(id, jump)| {
                let exit = jump.events.exit.as_ref()?;
                let raw = inner.raw.get(id)?;
                Some(ExitCandidate {
                    log_id: *id,
                    user_id: raw.user_id.clone(),
                    exit_at: exit.timestamp,
                    upload_seq: raw.upload_seq,
                })
            })
            .collect();

        // Late arrivals join an existing group before any new group forms;
        // existing groups are never re-clustered. Groups are ordered by base
        // exit so attachment does not depend on map iteration order.
        let mut existing: Vec<(Uuid, DateTime<Utc>)> = inner
            .formations
            .values()
            .map(|g| (g.id, g.base_exit_at))
            .collect();
        existing.sort_by_key(|(id, base_exit)| (*base_exit, *id));
        let attach = attach_to_existing(&existing, &mut candidates, window);
        for conflict in &attach.conflicts {
            warn!("formation clustering conflict: {conflict}");
        }
        for (group_id, candidate) in attach.attached {
            inner.attached.insert(candidate.log_id, group_id);
            if let Some(group) = inner.formations.get_mut(&group_id) {
                group.member_logs.push(candidate.log_id);
            }
        }

        let outcome = cluster_unattached(candidates, window, config.base_preference.as_deref());
        for conflict in &outcome.conflicts {
            warn!("formation clustering conflict: {conflict}");
        }

        let mut formed = Vec::new();
        for group in outcome.groups {
            let id = Uuid::new_v4();
            for member in &group.members {
                inner.attached.insert(member.log_id, id);
            }
            inner.formations.insert(
                id,
                FormationGroup {
                    id,
                    base_log: group.base,
                    member_logs: group.members.iter().map(|m| m.log_id).collect(),
                    base_exit_at: group.base_exit_at,
                    formed_at: Utc::now(),
                },
            );
            formed.push(id);
        }
        formed
    }

    pub fn list_formations(&self) -> Vec<FormationSummary> {
        let inner = self.inner.read().unwrap();
        let mut summaries: Vec<FormationSummary> = inner
            .formations
            .values()
            .map(|group| FormationSummary {
                id: group.id,
                base_jumper_id: inner
                    .raw
                    .get(&group.base_log)
                    .map(|r| r.user_id.clone())
                    .unwrap_or_default(),
                member_count: group.member_logs.len(),
                base_exit_at: group.base_exit_at,
            })
            .collect();
        summaries.sort_by_key(|s| s.base_exit_at);
        summaries
    }

    /// Builds the replay dataset for a formation, with `requester` driving
    /// per-member visibility.
    pub fn formation_dataset(
        &self,
        formation_id: Uuid,
        requester: Option<&str>,
    ) -> Result<FormationResponse, StoreError> {
        let inner = self.inner.read().unwrap();
        let group = inner
            .formations
            .get(&formation_id)
            .ok_or(StoreError::FormationNotFound(formation_id))?;

        let mut members = Vec::new();
        for log_id in &group.member_logs {
            let (raw, jump) = match (inner.raw.get(log_id), inner.jumps.get(log_id)) {
                (Some(raw), Some(jump)) => (raw, jump),
                _ => continue,
            };
            let (decoded, exit) = match (&jump.decoded, &jump.events.exit) {
                (Some(decoded), Some(exit)) => (decoded.clone(), exit.clone()),
                _ => continue,
            };
            members.push(MemberInput {
                log_id: *log_id,
                user_id: raw.user_id.clone(),
                visible: raw.visible,
                is_base: *log_id == group.base_log,
                log: decoded,
                exit,
            });
        }
        Ok(build_dataset(&members, requester))
    }
}
