//! Form collection
//!
//! Reads the request body into `FormFields` before anything is validated.
//! File parts are spooled to a temp file so the archive never sits in
//! memory; the temp file is removed when the returned guard drops.

use std::io::SeekFrom;
use std::path::Path;

use axum::{
    extract::{multipart::Field, FromRequest, Multipart, Request},
    http::{header, StatusCode},
    Form,
};
use serde::Deserialize;
use tempfile::TempPath;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::debug;
use zipship_domain::deploy::{EndpointProfile, FormFields, UploadedFile, ValidationError};

const FIELD_FILE: &str = "file";
const FIELD_TARGET: &str = "target";
const FIELD_SCRIPT: &str = "script";

#[derive(Error, Debug)]
pub enum FormError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The upload could not be spooled to local disk
    #[error("could not spool upload: {0}")]
    Spool(#[from] std::io::Error),
}

/// Fields read from the body, plus the guard owning the spooled file
#[derive(Debug)]
pub struct CollectedForm {
    pub fields: FormFields<File>,
    pub spool: Option<TempPath>,
}

/// URL-encoded body accepted by endpoints without a file part
#[derive(Debug, Default, Deserialize)]
struct ScriptForm {
    target: Option<String>,
    script: Option<String>,
}

/// Read `request` into form fields according to `profile`
///
/// Upload endpoints always parse multipart. Endpoints without a file part
/// also take `application/x-www-form-urlencoded`; a body with neither
/// content type reads as an empty form.
pub async fn collect(
    request: Request,
    profile: &EndpointProfile,
    spool_dir: &Path,
) -> Result<CollectedForm, FormError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();

    if profile.accepts_upload() || content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|rejection| {
                ValidationError::malformed_form(rejection.body_text())
            })?;
        return collect_multipart(multipart, profile, spool_dir).await;
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(form) = Form::<ScriptForm>::from_request(request, &())
            .await
            .map_err(|rejection| {
                body_error(rejection.status(), rejection.body_text(), profile)
            })?;
        return Ok(CollectedForm {
            fields: FormFields {
                file: None,
                target: form.target,
                script: form.script,
            },
            spool: None,
        });
    }

    debug!(content_type = %content_type, "No form body, continuing with empty fields");
    Ok(CollectedForm {
        fields: FormFields::default(),
        spool: None,
    })
}

async fn collect_multipart(
    mut multipart: Multipart,
    profile: &EndpointProfile,
    spool_dir: &Path,
) -> Result<CollectedForm, FormError> {
    let mut collected = CollectedForm {
        fields: FormFields::default(),
        spool: None,
    };

    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|err| body_error(err.status(), err.body_text(), profile))?;
        let Some(field) = field else {
            break;
        };

        // The first occurrence of a field wins
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FIELD_FILE) if profile.accepts_upload() && collected.fields.file.is_none() => {
                let Some(file_name) = field.file_name().map(str::to_string) else {
                    continue;
                };
                let (content, guard) = spool(field, profile, spool_dir).await?;
                debug!(file_name = %file_name, "Upload spooled");
                collected.fields.file = Some(UploadedFile::new(file_name, content));
                collected.spool = Some(guard);
            }
            Some(FIELD_TARGET) if collected.fields.target.is_none() => {
                collected.fields.target = Some(read_text(field, profile).await?);
            }
            Some(FIELD_SCRIPT) if collected.fields.script.is_none() => {
                collected.fields.script = Some(read_text(field, profile).await?);
            }
            _ => {}
        }
    }

    Ok(collected)
}

/// Copy a file part chunk by chunk into a fresh temp file, rewound for reading
async fn spool(
    mut field: Field<'_>,
    profile: &EndpointProfile,
    spool_dir: &Path,
) -> Result<(File, TempPath), FormError> {
    let (file, guard) = tempfile::Builder::new()
        .prefix("zipship-")
        .suffix(".part")
        .tempfile_in(spool_dir)?
        .into_parts();
    let mut file = File::from_std(file);

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|err| body_error(err.status(), err.body_text(), profile))?
    {
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    file.seek(SeekFrom::Start(0)).await?;

    Ok((file, guard))
}

async fn read_text(field: Field<'_>, profile: &EndpointProfile) -> Result<String, FormError> {
    field
        .text()
        .await
        .map_err(|err| body_error(err.status(), err.body_text(), profile).into())
}

fn body_error(status: StatusCode, detail: String, profile: &EndpointProfile) -> ValidationError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::form_too_large(profile.max_form_bytes)
    } else {
        ValidationError::malformed_form(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use tokio::io::AsyncReadExt;

    const BOUNDARY: &str = "zipship-boundary";

    fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, file_name, data) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/zip\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(parts: &[(&str, Option<&str>, &[u8])]) -> Request {
        Request::builder()
            .method("POST")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_collects_and_spools_multipart_fields() {
        let spool_dir = tempfile::tempdir().unwrap();
        let profile = EndpointProfile::upload_script(1 << 20);
        let request = multipart_request(&[
            ("target", None, b"/srv/site"),
            ("file", Some("site.zip"), b"PK-not-really"),
            ("script", None, b"make install"),
            ("target", None, b"/ignored/second"),
        ]);

        let mut collected = collect(request, &profile, spool_dir.path()).await.unwrap();

        assert_eq!(collected.fields.target.as_deref(), Some("/srv/site"));
        assert_eq!(collected.fields.script.as_deref(), Some("make install"));

        let file = collected.fields.file.as_mut().unwrap();
        assert_eq!(file.file_name, "site.zip");
        let mut content = Vec::new();
        file.content.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"PK-not-really");

        let spooled = collected.spool.take().unwrap();
        assert!(spooled.starts_with(spool_dir.path()));
        let path = spooled.to_path_buf();
        drop(spooled);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_file_part_without_file_name_is_ignored() {
        let spool_dir = tempfile::tempdir().unwrap();
        let profile = EndpointProfile::upload_only(1 << 20);
        let request = multipart_request(&[("file", None, b"just text"), ("target", None, b"x")]);

        let collected = collect(request, &profile, spool_dir.path()).await.unwrap();

        assert!(collected.fields.file.is_none());
        assert!(collected.spool.is_none());
    }

    #[tokio::test]
    async fn test_upload_endpoint_rejects_non_multipart_body() {
        let spool_dir = tempfile::tempdir().unwrap();
        let profile = EndpointProfile::upload_only(1 << 20);
        let request = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let err = collect(request, &profile, spool_dir.path()).await.unwrap_err();
        assert!(matches!(
            err,
            FormError::Invalid(ValidationError::MalformedForm(_))
        ));
    }

    #[tokio::test]
    async fn test_run_script_accepts_urlencoded() {
        let spool_dir = tempfile::tempdir().unwrap();
        let profile = EndpointProfile::run_script(1 << 20, "./tmp".into());
        let request = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("script=echo+hi&target=%2Fsrv"))
            .unwrap();

        let collected = collect(request, &profile, spool_dir.path()).await.unwrap();

        assert_eq!(collected.fields.script.as_deref(), Some("echo hi"));
        assert_eq!(collected.fields.target.as_deref(), Some("/srv"));
    }

    #[tokio::test]
    async fn test_run_script_without_body_reads_empty() {
        let spool_dir = tempfile::tempdir().unwrap();
        let profile = EndpointProfile::run_script(1 << 20, "./tmp".into());
        let request = Request::builder()
            .method("POST")
            .body(Body::empty())
            .unwrap();

        let collected = collect(request, &profile, spool_dir.path()).await.unwrap();

        assert!(collected.fields.script.is_none());
        assert!(collected.fields.target.is_none());
    }

    #[tokio::test]
    async fn test_run_script_does_not_spool_files() {
        let spool_dir = tempfile::tempdir().unwrap();
        let profile = EndpointProfile::run_script(1 << 20, "./tmp".into());
        let request = multipart_request(&[
            ("file", Some("site.zip"), b"ignored"),
            ("script", None, b"ls"),
        ]);

        let collected = collect(request, &profile, spool_dir.path()).await.unwrap();

        assert!(collected.fields.file.is_none());
        assert_eq!(std::fs::read_dir(spool_dir.path()).unwrap().count(), 0);
    }
}
