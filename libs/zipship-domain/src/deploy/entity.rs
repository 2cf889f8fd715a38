//! Request-scoped entities
//!
//! Nothing here outlives a single HTTP request. `FormFields` is what the
//! transport collected; `UploadRequest` is what survived validation.

use std::path::PathBuf;

use crate::deploy::error::RunError;

/// An uploaded file part
///
/// `content` is any byte source; the server hands over a spooled temp file,
/// tests hand over in-memory buffers.
#[derive(Debug)]
pub struct UploadedFile<F> {
    pub file_name: String,
    pub content: F,
}

impl<F> UploadedFile<F> {
    pub fn new(file_name: impl Into<String>, content: F) -> Self {
        Self {
            file_name: file_name.into(),
            content,
        }
    }
}

/// Raw form fields as received, before any rule is applied
#[derive(Debug)]
pub struct FormFields<F> {
    pub file: Option<UploadedFile<F>>,
    pub target: Option<String>,
    pub script: Option<String>,
}

impl<F> Default for FormFields<F> {
    fn default() -> Self {
        Self {
            file: None,
            target: None,
            script: None,
        }
    }
}

/// A validated request, ready to be executed
///
/// Invariants, established by `EndpointProfile::validate`:
/// - `target_dir` is non-empty
/// - `file`, when present, has a non-empty file name without directories
/// - `script`, when present, is non-empty
#[derive(Debug)]
pub struct UploadRequest<F> {
    pub file: Option<UploadedFile<F>>,
    pub target_dir: PathBuf,
    pub script: Option<String>,
}

impl<F> UploadRequest<F> {
    /// Request that only runs a command
    pub fn script_only(target_dir: PathBuf, script: impl Into<String>) -> Self {
        Self {
            file: None,
            target_dir,
            script: Some(script.into()),
        }
    }
}

/// Counters collected while unpacking an archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Regular files written
    pub files: usize,
    /// Directory entries created
    pub directories: usize,
    /// Metadata entries left out
    pub skipped: usize,
}

/// Outcome of a command run in blocking mode
#[derive(Debug, Default)]
pub struct ExecutionResult {
    /// Set when the command could not start or exited unsuccessfully
    pub exit_error: Option<RunError>,
    /// Stdout and stderr lines, in the order they arrived
    pub combined_output_lines: Vec<String>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.exit_error.is_none()
    }

    /// Split into the output and, on failure, the error
    pub fn into_result(self) -> (Vec<String>, Result<(), RunError>) {
        let status = match self.exit_error {
            Some(err) => Err(err),
            None => Ok(()),
        };
        (self.combined_output_lines, status)
    }
}
