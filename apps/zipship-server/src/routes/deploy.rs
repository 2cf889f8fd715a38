//! Deploy routes

use axum::{
    extract::DefaultBodyLimit,
    handler::Handler,
    routing::{post, MethodRouter},
    Router,
};

use crate::{
    config::Profiles,
    handlers::deploy::{method_not_allowed, run_script, upload, upload_only, upload_script},
    AppState,
};

/// Create deploy routes, each capped at its profile's form limit
pub fn routes(profiles: &Profiles) -> Router<AppState> {
    Router::new()
        .route(
            "/upload-only",
            deploy_route(upload_only, profiles.upload_only.max_form_bytes),
        )
        .route(
            "/upload-script",
            deploy_route(upload_script, profiles.upload_script.max_form_bytes),
        )
        .route(
            "/run-script",
            deploy_route(run_script, profiles.run_script.max_form_bytes),
        )
        .route("/upload", deploy_route(upload, profiles.upload.max_form_bytes))
}

fn deploy_route<H, T>(handler: H, max_form_bytes: u64) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    let limit = usize::try_from(max_form_bytes).unwrap_or(usize::MAX);
    post(handler)
        .fallback(method_not_allowed)
        .layer(DefaultBodyLimit::max(limit))
}
