//! API routes

pub mod deploy;

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    dto::deploy::{RunScriptForm, UploadForm, UploadOnlyForm, UploadScriptForm},
    handlers, AppState,
};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::deploy::upload_only,
        handlers::deploy::upload_script,
        handlers::deploy::run_script,
        handlers::deploy::upload,
        health_handler
    ),
    components(
        schemas(UploadOnlyForm, UploadScriptForm, RunScriptForm, UploadForm)
    ),
    tags(
        (name = "deploy", description = "Upload, extract and run endpoints"),
        (name = "health", description = "Health check endpoints")
    ),
    info(
        title = "ZipShip API",
        version = "0.1.0",
        description = "Uploads ZIP archives, extracts them and runs shell commands, streaming the log back",
        contact(
            name = "ZipShip contributors"
        )
    )
)]
pub struct ApiDoc;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(deploy::routes(&state.profiles))
        .route("/health", axum::routing::get(health_handler))
        .with_state(state)
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    ),
    tag = "health"
)]
async fn health_handler() -> &'static str {
    "OK"
}
