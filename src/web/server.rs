use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::store::Store;

use super::api::formations as formation_handlers;
use super::api::logs as log_handlers;
use super::api_doc::ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
}

pub async fn run_server(config: Arc<Config>, store: Arc<Store>) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();
    let state = AppState { store };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // Log endpoints
        .route("/api/logs", post(log_handlers::upload_log))
        .route("/api/logs", get(log_handlers::list_logs))
        .route("/api/logs/{id}/report", get(log_handlers::get_report))
        // Formation endpoints
        .route("/api/formations", get(formation_handlers::list_formations))
        .route(
            "/api/formations/{id}",
            get(formation_handlers::get_formation),
        )
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await
}
