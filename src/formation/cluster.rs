// Formation clustering over exit timestamps.
//
// Transitivity policy (anchor-based): the earliest unattached exit seeds a
// group, and only logs whose exit lies within the window of that seed join
// it. A chain A-B-C where C is inside B's window but outside A's does NOT
// pull C into A's group; C seeds the next one. This keeps clustering
// deterministic and idempotent regardless of arrival order.

use chrono::Duration;
use uuid::Uuid;

use super::types::FormationError;

/// A jump log eligible for clustering: exit detected, not yet attached.
#[derive(Debug, Clone)]
pub struct ExitCandidate {
    pub log_id: Uuid,
    pub user_id: String,
    pub exit_at: chrono::DateTime<chrono::Utc>,
    /// Upload order, used as the deterministic tiebreaker.
    pub upload_seq: u64,
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub base: Uuid,
    pub base_exit_at: chrono::DateTime<chrono::Utc>,
    pub members: Vec<ExitCandidate>,
}

#[derive(Debug, Default)]
pub struct ClusterOutcome {
    pub groups: Vec<NewGroup>,
    /// Conflicts abort only the group they occurred in.
    pub conflicts: Vec<FormationError>,
}

#[derive(Debug, Default)]
pub struct AttachOutcome {
    pub attached: Vec<(Uuid, ExitCandidate)>,
    pub conflicts: Vec<FormationError>,
}

/// Attaches candidates to already-formed groups whose base exit they fall
/// within the window of. Attached candidates are removed from the pool;
/// existing groups are never re-clustered or split.
///
/// A candidate eligible for more than one group goes to the group whose
/// base exit is nearest in time. A candidate exactly equidistant between
/// two bases is surfaced as a conflict and left in the pool, not assigned
/// by a coin flip.
pub fn attach_to_existing(
    existing: &[(Uuid, chrono::DateTime<chrono::Utc>)],
    candidates: &mut Vec<ExitCandidate>,
    window: Duration,
) -> AttachOutcome {
    let mut outcome = AttachOutcome::default();
    candidates.retain(|candidate| {
        let mut eligible: Vec<(Duration, Uuid)> = existing
            .iter()
            .map(|(id, base_exit)| ((candidate.exit_at - *base_exit).abs(), *id))
            .filter(|(distance, _)| *distance <= window)
            .collect();
        eligible.sort_by_key(|(distance, _)| *distance);
        match eligible.as_slice() {
            [] => true,
            [(first, group_a), (second, group_b), ..] if first == second => {
                outcome.conflicts.push(FormationError::AmbiguousAttachment(
                    candidate.log_id,
                    *group_a,
                    *group_b,
                ));
                true
            }
            [(_, group_id), ..] => {
                outcome.attached.push((*group_id, candidate.clone()));
                false
            }
        }
    });
    outcome
}

/// Clusters the unattached pool into new groups under the anchor policy.
///
/// A group needs at least two members; a lone exit stays unattached so it
/// can still join when a companion log shows up later. Base is the earliest
/// exit unless `base_preference` names a member's user; exact timestamp ties
/// fall back to upload order, and a tie on both is surfaced as a conflict.
pub fn cluster_unattached(
    mut candidates: Vec<ExitCandidate>,
    window: Duration,
    base_preference: Option<&str>,
) -> ClusterOutcome {
    candidates.sort_by_key(|c| (c.exit_at, c.upload_seq));

    let mut outcome = ClusterOutcome::default();
    let mut rest = candidates.as_slice();
    while let Some(seed) = rest.first() {
        let split = rest
            .iter()
            .position(|c| c.exit_at - seed.exit_at > window)
            .unwrap_or(rest.len());
        let (members, remaining) = rest.split_at(split);
        rest = remaining;

        if members.len() < 2 {
            continue;
        }
        match select_base(members, base_preference) {
            Ok(base_idx) => outcome.groups.push(NewGroup {
                base: members[base_idx].log_id,
                base_exit_at: members[base_idx].exit_at,
                members: members.to_vec(),
            }),
            Err(conflict) => outcome.conflicts.push(conflict),
        }
    }
    outcome
}

fn select_base(
    members: &[ExitCandidate],
    base_preference: Option<&str>,
) -> Result<usize, FormationError> {
    if let Some(preferred) = base_preference {
        if let Some(idx) = members.iter().position(|m| m.user_id == preferred) {
            return Ok(idx);
        }
    }
    // Members arrive sorted by (exit_at, upload_seq), so the earliest exit
    // with the lowest upload order is the first entry.
    let best = &members[0];
    if let Some(tied) = members[1..]
        .iter()
        .find(|m| m.exit_at == best.exit_at && m.upload_seq == best.upload_seq)
    {
        return Err(FormationError::AmbiguousBase(best.log_id, tied.log_id));
    }
    Ok(0)
}
