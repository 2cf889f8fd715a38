//! Ports (trait definitions) for side effects
//!
//! The domain decides *when* an archive is unpacked or a command is run; the
//! adapter crates decide *how*. Following the hexagonal layout, the traits
//! live here and the implementations live in `zipship-local`.
//!
//! ## Static Dispatch
//!
//! We use native Rust async traits with `impl Future` return types instead of
//! `async_trait` so `DeployService` is monomorphized over its adapters.

use std::future::Future;
use std::path::Path;

use crate::deploy::{ExecutionResult, ExtractError, ExtractReport, RunError};
use crate::stream::EventSink;

/// Port for unpacking an uploaded archive
pub trait ArchiveExtractor: Send + Sync {
    /// Extract `archive` into `target_dir`
    ///
    /// Entries are processed in archive order. Platform metadata entries are
    /// skipped and counted. Every extracted file is reported to `sink` as
    /// `Extracted: <path>` as soon as its bytes are on disk.
    ///
    /// # Errors
    ///
    /// - `ExtractError::OpenFailed` if the container cannot be read
    /// - `ExtractError::MkdirFailed` if a directory cannot be created
    /// - `ExtractError::EntryFailed` on the first file that cannot be written;
    ///   no further entries are processed
    fn extract<S: EventSink>(
        &self,
        archive: &Path,
        target_dir: &Path,
        sink: &S,
    ) -> impl Future<Output = Result<ExtractReport, ExtractError>> + Send;
}

/// Port for running shell commands
///
/// The command text is handed to the shell verbatim. Deciding whether a
/// command may run is the caller's responsibility.
pub trait CommandRunner: Send + Sync {
    /// Run `command` in `work_dir` and wait for it
    ///
    /// Stdout and stderr lines are captured together, in arrival order.
    /// A failed spawn or unsuccessful exit is reported through
    /// `ExecutionResult::exit_error`, keeping the output captured so far.
    fn run(&self, command: &str, work_dir: &Path) -> impl Future<Output = ExecutionResult> + Send;

    /// Run `command` in `work_dir`, forwarding output as it is produced
    ///
    /// Stdout lines go to `sink` as `OUT` events and stderr lines as `ERR`
    /// events. Both pipes are drained to end-of-stream before the exit
    /// status is collected.
    ///
    /// # Errors
    ///
    /// - `RunError::Spawn` if the shell cannot be started
    /// - `RunError::ExitStatus` if the command exits unsuccessfully
    fn run_streaming<S: EventSink>(
        &self,
        command: &str,
        work_dir: &Path,
        sink: &S,
    ) -> impl Future<Output = Result<(), RunError>> + Send;
}
