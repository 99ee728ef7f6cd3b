use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::formation::{FormationResponse, FormationSummary};
use crate::web::api::error::ApiResult;
use crate::web::server::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct FormationQuery {
    /// User id of the requesting party; private members stay hidden from
    /// everyone else.
    pub requester: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/formations",
    tag = "formations",
    responses(
        (status = 200, description = "Formed formations", body = [FormationSummary])
    )
)]
pub async fn list_formations(State(state): State<AppState>) -> Json<Vec<FormationSummary>> {
    Json(state.store.list_formations())
}

#[utoipa::path(
    get,
    path = "/api/formations/{id}",
    tag = "formations",
    params(
        ("id" = Uuid, Path, description = "Formation identifier"),
        ("requester" = Option<String>, Query, description = "Requesting user id")
    ),
    responses(
        (status = 200, description = "Synchronized formation dataset", body = FormationResponse),
        (status = 404, description = "Unknown formation")
    )
)]
pub async fn get_formation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<FormationQuery>,
) -> ApiResult<Json<FormationResponse>> {
    let dataset = state
        .store
        .formation_dataset(id, query.requester.as_deref())?;
    Ok(Json(dataset))
}
