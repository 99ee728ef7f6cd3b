use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::metrics::JumpReport;
use crate::store::LogSummary;
use crate::web::api::error::{ApiError, ApiResult};
use crate::web::server::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadQuery {
    pub device: String,
    pub user: String,
    /// Whether other formation members may see this jumper's track.
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub id: Uuid,
}

#[utoipa::path(
    post,
    path = "/api/logs",
    tag = "logs",
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    params(
        ("device" = String, Query, description = "Owning device identifier"),
        ("user" = String, Query, description = "Owning user identifier"),
        ("visible" = Option<bool>, Query, description = "Visible to other formation members (default true)")
    ),
    responses(
        (status = 202, description = "Log accepted for processing", body = UploadResponse),
        (status = 400, description = "Empty upload")
    )
)]
pub async fn upload_log(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    if body.is_empty() {
        return Err(ApiError::Validation("empty log upload".into()));
    }
    let id = state
        .store
        .insert_log(&query.device, &query.user, query.visible, body.to_vec());
    Ok((StatusCode::ACCEPTED, Json(UploadResponse { id })))
}

#[utoipa::path(
    get,
    path = "/api/logs",
    tag = "logs",
    responses(
        (status = 200, description = "All uploaded logs with their verdicts", body = [LogSummary])
    )
)]
pub async fn list_logs(State(state): State<AppState>) -> Json<Vec<LogSummary>> {
    Json(state.store.list_logs())
}

#[utoipa::path(
    get,
    path = "/api/logs/{id}/report",
    tag = "logs",
    params(
        ("id" = Uuid, Path, description = "Log identifier")
    ),
    responses(
        (status = 200, description = "Jump report", body = JumpReport),
        (status = 404, description = "Unknown log"),
        (status = 409, description = "Log not processed yet")
    )
)]
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JumpReport>> {
    let report = state.store.report(id)?;
    Ok(Json(report))
}
