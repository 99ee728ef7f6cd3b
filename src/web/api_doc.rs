use utoipa::OpenApi;

use super::api::error::ErrorResponse;
use super::api::logs::{UploadQuery, UploadResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::logs::upload_log,
        super::api::logs::list_logs,
        super::api::logs::get_report,
        super::api::formations::list_formations,
        super::api::formations::get_formation,
    ),
    components(
        schemas(
            UploadQuery,
            UploadResponse,
            ErrorResponse,
            crate::store::LogSummary,
            crate::metrics::JumpReport,
            crate::metrics::Verdict,
            crate::formation::FormationSummary,
            crate::formation::FormationResponse,
            crate::formation::Participant,
            crate::formation::TrackPoint,
        )
    ),
    info(
        title = "Jumptrace API",
        description = "Flight log processing and formation replay",
        version = "0.1.0"
    ),
    tags(
        (name = "logs", description = "Jump log upload and reports"),
        (name = "formations", description = "Formation datasets")
    )
)]
pub struct ApiDoc;
