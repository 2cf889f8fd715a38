//! Endpoint profiles
//!
//! Every endpoint runs the same pipeline; what differs between them is data.
//! A profile says which fields are required, where the target comes from,
//! how large the form may be and how the result is delivered.

use std::path::{Path, PathBuf};

use crate::deploy::entity::{FormFields, UploadRequest, UploadedFile};
use crate::deploy::error::ValidationError;

/// 500 MiB, the form limit of the streaming endpoints
pub const DEFAULT_MAX_FORM_BYTES: u64 = 500 << 20;

/// 10 MiB, the form limit of the buffered `/upload` endpoint
pub const DEFAULT_LEGACY_MAX_FORM_BYTES: u64 = 10 << 20;

/// How a form field is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Required,
    Optional,
    /// The field is dropped even if the client sends it
    Ignored,
}

/// Where the target directory comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRule {
    Required,
    DefaultsTo(PathBuf),
}

/// How the outcome reaches the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Chunked plain-text log, one flushed line per event
    Streaming,
    /// A single response once the pipeline finished
    Buffered,
}

#[derive(Debug, Clone)]
pub struct EndpointProfile {
    /// Route name, used in logs
    pub name: &'static str,
    pub file: FieldRule,
    pub script: FieldRule,
    pub target: TargetRule,
    /// File name suffix the upload must carry, compared case-insensitively
    pub required_extension: Option<&'static str>,
    pub max_form_bytes: u64,
    pub mode: ResponseMode,
    /// Remove the uploaded archive once it has been extracted
    pub delete_archive: bool,
    /// First INFO line of the stream
    pub start_message: Option<&'static str>,
    /// DONE line when no script runs
    pub done_message: &'static str,
}

impl EndpointProfile {
    /// `/upload-only`: save and extract, streamed
    pub fn upload_only(max_form_bytes: u64) -> Self {
        Self {
            name: "upload-only",
            file: FieldRule::Required,
            script: FieldRule::Ignored,
            target: TargetRule::Required,
            required_extension: None,
            max_form_bytes,
            mode: ResponseMode::Streaming,
            delete_archive: true,
            start_message: Some("Starting upload process"),
            done_message: "Upload and extract complete.",
        }
    }

    /// `/upload-script`: save, extract and run, streamed
    pub fn upload_script(max_form_bytes: u64) -> Self {
        Self {
            name: "upload-script",
            script: FieldRule::Required,
            start_message: Some("Starting upload + script execution"),
            ..Self::upload_only(max_form_bytes)
        }
    }

    /// `/run-script`: run a command in an existing directory, streamed
    pub fn run_script(max_form_bytes: u64, default_dir: PathBuf) -> Self {
        Self {
            name: "run-script",
            file: FieldRule::Ignored,
            script: FieldRule::Required,
            target: TargetRule::DefaultsTo(default_dir),
            start_message: None,
            ..Self::upload_only(max_form_bytes)
        }
    }

    /// `/upload`: save, extract and maybe run, answered in one response
    pub fn buffered_upload(max_form_bytes: u64, upload_dir: PathBuf) -> Self {
        Self {
            name: "upload",
            file: FieldRule::Required,
            script: FieldRule::Optional,
            target: TargetRule::DefaultsTo(upload_dir),
            required_extension: Some(".zip"),
            max_form_bytes,
            mode: ResponseMode::Buffered,
            delete_archive: false,
            start_message: None,
            done_message: "Upload and extract complete.",
        }
    }

    /// Whether this endpoint expects a multipart body with a file part
    pub fn accepts_upload(&self) -> bool {
        self.file != FieldRule::Ignored
    }

    /// Apply this profile's rules to the collected form
    ///
    /// Checks run in a fixed order (file, target, script) so the first
    /// missing field is the one reported.
    pub fn validate<F>(&self, form: FormFields<F>) -> Result<UploadRequest<F>, ValidationError> {
        let file = match self.file {
            FieldRule::Ignored => None,
            rule => {
                let file = form.file.and_then(|file| {
                    base_name(&file.file_name).map(|name| UploadedFile::new(name, file.content))
                });
                match (rule, file) {
                    (FieldRule::Required, None) => return Err(ValidationError::FileRequired),
                    (_, file) => file,
                }
            }
        };

        if let (Some(file), Some(extension)) = (&file, self.required_extension) {
            if !file
                .file_name
                .to_ascii_lowercase()
                .ends_with(&extension.to_ascii_lowercase())
            {
                return Err(ValidationError::UnsupportedFileType {
                    file_name: file.file_name.clone(),
                    extension: extension.to_string(),
                });
            }
        }

        let target_dir = match (non_empty(form.target), &self.target) {
            (Some(target), _) => PathBuf::from(target),
            (None, TargetRule::DefaultsTo(default)) => default.clone(),
            (None, TargetRule::Required) => return Err(ValidationError::TargetRequired),
        };

        let script = match self.script {
            FieldRule::Ignored => None,
            FieldRule::Optional => non_empty(form.script),
            FieldRule::Required => {
                Some(non_empty(form.script).ok_or(ValidationError::ScriptRequired)?)
            }
        };

        Ok(UploadRequest {
            file,
            target_dir,
            script,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Final component of a client-supplied file name
fn base_name(file_name: &str) -> Option<String> {
    let normalized = file_name.replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}
