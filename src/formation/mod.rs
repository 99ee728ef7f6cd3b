mod cluster;
mod dataset;
mod types;

pub use cluster::{
    attach_to_existing, cluster_unattached, AttachOutcome, ClusterOutcome, ExitCandidate, NewGroup,
};
pub use dataset::{build_dataset, FormationResponse, MemberInput, Participant, TrackPoint};
pub use types::{FormationError, FormationGroup, FormationSummary};
