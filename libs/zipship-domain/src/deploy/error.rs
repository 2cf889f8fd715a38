//! Domain errors for deploy operations
//!
//! Errors fall in two groups. `ValidationError` is raised before any response
//! byte is written and still maps to an HTTP status. Everything else happens
//! after streaming began and can only be reported as a terminal `[ERR]` line.

use std::io;

use thiserror::Error;

/// Client input rejected before the event stream is opened
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Only POST is accepted
    #[error("Invalid request method")]
    MethodNotAllowed,

    /// The form body could not be decoded
    #[error("Error parsing form: {0}")]
    MalformedForm(String),

    /// The form body exceeds the endpoint's limit
    #[error("Error parsing form: request body exceeds {limit} bytes")]
    FormTooLarge { limit: u64 },

    /// No `file` part, or a part without a file name
    #[error("File is required")]
    FileRequired,

    /// The uploaded file name does not carry the expected extension
    #[error("Only {extension} files are allowed, got {file_name}")]
    UnsupportedFileType {
        file_name: String,
        extension: String,
    },

    /// No usable `target` field
    #[error("Target directory is required")]
    TargetRequired,

    /// No usable `script` field
    #[error("Script is required")]
    ScriptRequired,
}

impl ValidationError {
    /// Create a malformed form error with a message
    pub fn malformed_form(msg: impl Into<String>) -> Self {
        Self::MalformedForm(msg.into())
    }

    /// Create a form too large error
    pub fn form_too_large(limit: u64) -> Self {
        Self::FormTooLarge { limit }
    }
}

/// Errors raised while unpacking an archive
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The container is malformed or unreadable
    #[error("could not open zip: {0}")]
    OpenFailed(String),

    /// A directory entry, or a file's parent, could not be created
    #[error("create dir error for {entry}: {cause}")]
    MkdirFailed { entry: String, cause: String },

    /// A file entry could not be opened, created or copied
    #[error("extract file error for {entry}: {cause}")]
    EntryFailed { entry: String, cause: String },

    /// The worker running the extraction panicked or was cancelled
    #[error("extraction task failed: {0}")]
    Aborted(String),
}

impl ExtractError {
    pub fn open_failed(cause: impl ToString) -> Self {
        Self::OpenFailed(cause.to_string())
    }

    pub fn mkdir_failed(entry: impl Into<String>, cause: impl ToString) -> Self {
        Self::MkdirFailed {
            entry: entry.into(),
            cause: cause.to_string(),
        }
    }

    pub fn entry_failed(entry: impl Into<String>, cause: impl ToString) -> Self {
        Self::EntryFailed {
            entry: entry.into(),
            cause: cause.to_string(),
        }
    }

    pub fn aborted(cause: impl ToString) -> Self {
        Self::Aborted(cause.to_string())
    }
}

/// Errors raised while running a shell command
#[derive(Error, Debug)]
pub enum RunError {
    /// The shell could not be started
    #[error("start error: {0}")]
    Spawn(String),

    /// A child pipe was not available after spawn
    #[error("{0} error: pipe not captured")]
    Pipe(&'static str),

    /// Waiting on the child failed
    #[error("wait error: {0}")]
    Wait(String),

    /// The command ran and exited unsuccessfully
    #[error("script exited with error: {0}")]
    ExitStatus(String),
}

impl RunError {
    pub fn spawn(cause: impl ToString) -> Self {
        Self::Spawn(cause.to_string())
    }

    pub fn wait(cause: impl ToString) -> Self {
        Self::Wait(cause.to_string())
    }

    pub fn exit_status(status: impl ToString) -> Self {
        Self::ExitStatus(status.to_string())
    }
}

/// A step of the pipeline failed after streaming began
///
/// The `Display` text is exactly what follows `[ERR] ` on the terminal line.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("could not create target dir: {0}")]
    TargetDir(#[source] io::Error),

    #[error("could not create file: {0}")]
    CreateFile(#[source] io::Error),

    #[error("could not save file: {0}")]
    SaveFile(#[source] io::Error),

    #[error("extract failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("Script execution failed: {0}")]
    Script(#[from] RunError),
}

/// Result type alias for deploy operations
pub type Result<T> = std::result::Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(ValidationError::FileRequired.to_string(), "File is required");
        assert_eq!(
            ValidationError::TargetRequired.to_string(),
            "Target directory is required"
        );
        assert_eq!(ValidationError::ScriptRequired.to_string(), "Script is required");
        assert_eq!(
            ValidationError::MethodNotAllowed.to_string(),
            "Invalid request method"
        );
    }

    #[test]
    fn test_form_too_large_error() {
        let err = ValidationError::form_too_large(1024);
        assert!(matches!(err, ValidationError::FormTooLarge { limit: 1024 }));
        assert!(err.to_string().starts_with("Error parsing form"));
        assert!(err.to_string().contains("1024"));
    }

    #[test]
    fn test_extract_error_names_entry() {
        let err = ExtractError::entry_failed("dir/b.txt", "disk full");
        assert!(err.to_string().contains("dir/b.txt"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_aborted_extraction_is_not_an_open_error() {
        let err: DeployError = ExtractError::aborted("task 7 panicked").into();
        assert_eq!(
            err.to_string(),
            "extract failed: extraction task failed: task 7 panicked"
        );
    }

    #[test]
    fn test_deploy_error_wraps_script_failure() {
        let err: DeployError = RunError::exit_status("exit status: 1").into();
        assert_eq!(
            err.to_string(),
            "Script execution failed: script exited with error: exit status: 1"
        );
    }

    #[test]
    fn test_deploy_error_wraps_extract_failure() {
        let err: DeployError = ExtractError::open_failed("invalid Zip archive").into();
        assert_eq!(
            err.to_string(),
            "extract failed: could not open zip: invalid Zip archive"
        );
    }
}
