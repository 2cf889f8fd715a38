//! Deploy handlers
//!
//! All four endpoints share one flow: collect the form, validate it against
//! the endpoint's profile, then run the pipeline. Validation failures are
//! answered with a plain-text status; once the pipeline starts, failures are
//! reported inside the response body.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{error, info, info_span, warn, Instrument};
use zipship_domain::{
    deploy::{EndpointProfile, ResponseMode, ValidationError},
    stream::EventLog,
    RequestId,
};

use crate::{
    dto::deploy::{RunScriptForm, UploadForm, UploadOnlyForm, UploadScriptForm},
    handlers::form::{self, CollectedForm, FormError},
    stream::{open_stream, TEXT_PLAIN},
    AppState,
};

/// Upload a ZIP archive and extract it into `target`
#[utoipa::path(
    post,
    path = "/upload-only",
    request_body(content = UploadOnlyForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Streamed log ending in a [DONE] or [ERR] line", body = String, content_type = "text/plain"),
        (status = 400, description = "Missing or malformed field", body = String, content_type = "text/plain"),
        (status = 405, description = "Method other than POST", body = String, content_type = "text/plain")
    ),
    tag = "deploy"
)]
pub async fn upload_only(State(state): State<AppState>, request: Request) -> Response {
    let profile = state.profiles.upload_only.clone();
    handle(state, profile, request).await
}

/// Upload a ZIP archive, extract it into `target` and run `script` there
#[utoipa::path(
    post,
    path = "/upload-script",
    request_body(content = UploadScriptForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Streamed log including [OUT]/[ERR] script lines", body = String, content_type = "text/plain"),
        (status = 400, description = "Missing or malformed field", body = String, content_type = "text/plain"),
        (status = 405, description = "Method other than POST", body = String, content_type = "text/plain")
    ),
    tag = "deploy"
)]
pub async fn upload_script(State(state): State<AppState>, request: Request) -> Response {
    let profile = state.profiles.upload_script.clone();
    handle(state, profile, request).await
}

/// Run `script` in `target`, or in the configured script directory
#[utoipa::path(
    post,
    path = "/run-script",
    request_body(content = RunScriptForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Streamed log including [OUT]/[ERR] script lines", body = String, content_type = "text/plain"),
        (status = 400, description = "Missing or malformed field", body = String, content_type = "text/plain"),
        (status = 405, description = "Method other than POST", body = String, content_type = "text/plain")
    ),
    tag = "deploy"
)]
pub async fn run_script(State(state): State<AppState>, request: Request) -> Response {
    let profile = state.profiles.run_script.clone();
    handle(state, profile, request).await
}

/// Upload a `.zip`, extract it and optionally run `script`, in one response
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Pipeline log, pipeline succeeded", body = String, content_type = "text/plain"),
        (status = 400, description = "Missing or malformed field, or not a .zip file", body = String, content_type = "text/plain"),
        (status = 405, description = "Method other than POST", body = String, content_type = "text/plain"),
        (status = 500, description = "Pipeline log ending in the failure", body = String, content_type = "text/plain")
    ),
    tag = "deploy"
)]
pub async fn upload(State(state): State<AppState>, request: Request) -> Response {
    let profile = state.profiles.upload.clone();
    handle(state, profile, request).await
}

/// Answer for every method other than POST on a deploy route
pub async fn method_not_allowed() -> Response {
    reject(ValidationError::MethodNotAllowed.into())
}

async fn handle(state: AppState, profile: EndpointProfile, request: Request) -> Response {
    let request_id = RequestId::new();
    let span = info_span!("deploy", endpoint = profile.name, request_id = %request_id);

    async move {
        info!("Received request");

        let CollectedForm { fields, spool } =
            match form::collect(request, &profile, &state.spool_dir).await {
                Ok(collected) => collected,
                Err(err) => return reject(err),
            };

        let upload = match profile.validate(fields) {
            Ok(upload) => upload,
            Err(err) => return reject(err.into()),
        };

        info!(
            target_dir = %upload.target_dir.display(),
            file = upload.file.as_ref().map(|file| file.file_name.as_str()),
            has_script = upload.script.is_some(),
            "Request accepted"
        );

        let mode = profile.mode;
        match mode {
            ResponseMode::Streaming => {
                let (emitter, response) = open_stream();

                // The body is fed from a separate task so headers go out now
                tokio::spawn(
                    async move {
                        let _spool = spool;
                        if state
                            .deploy_service
                            .execute(&profile, upload, &emitter)
                            .await
                            .is_ok()
                        {
                            info!("Pipeline finished");
                        }
                    }
                    .in_current_span(),
                );

                response
            }
            ResponseMode::Buffered => {
                let log = EventLog::new();
                let status = match state.deploy_service.execute(&profile, upload, &log).await {
                    Ok(()) => {
                        info!("Pipeline finished");
                        StatusCode::OK
                    }
                    Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                drop(spool);

                text_response(status, log.render())
            }
        }
    }
    .instrument(span)
    .await
}

fn reject(err: FormError) -> Response {
    match err {
        FormError::Invalid(ValidationError::MethodNotAllowed) => {
            warn!("Rejected request method");
            text_response(
                StatusCode::METHOD_NOT_ALLOWED,
                format!("{}\n", ValidationError::MethodNotAllowed),
            )
        }
        FormError::Invalid(err) => {
            warn!(error = %err, "Rejected request");
            text_response(StatusCode::BAD_REQUEST, format!("[ERR] {err}\n"))
        }
        FormError::Spool(err) => {
            error!(error = %err, "Failed to spool upload");
            text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("[ERR] {}\n", FormError::Spool(err)),
            )
        }
    }
}

fn text_response(status: StatusCode, body: impl Into<Body>) -> Response {
    (status, [(header::CONTENT_TYPE, TEXT_PLAIN)], body.into()).into_response()
}
