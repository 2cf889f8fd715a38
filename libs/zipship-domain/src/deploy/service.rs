//! Deploy service - pipeline orchestration
//!
//! Drives a validated request through save → extract → delete → run and
//! reports every step to an `EventSink`. The pipeline stops at the first
//! failing step, which is reported as a terminal `[ERR]` event.

use std::path::Path;

use tokio::fs;
use tokio::io::{self, AsyncRead, AsyncWriteExt};
use tracing::{debug, error, warn};

use super::entity::{UploadRequest, UploadedFile};
use super::error::{DeployError, Result};
use super::profile::{EndpointProfile, ResponseMode};
use crate::ports::{ArchiveExtractor, CommandRunner};
use crate::stream::{EventSink, StreamEvent};

/// DONE line after a successful script run
pub const SCRIPT_DONE_MESSAGE: &str = "Script executed successfully.";

/// Service running the upload pipeline
///
/// ## Static Dispatch
///
/// The service is generic over its extractor and runner. The server wires
/// the local adapters; tests wire in-memory fakes.
pub struct DeployService<E, R> {
    extractor: E,
    runner: R,
}

impl<E, R> DeployService<E, R>
where
    E: ArchiveExtractor,
    R: CommandRunner,
{
    pub fn new(extractor: E, runner: R) -> Self {
        Self { extractor, runner }
    }

    /// Run the pipeline for one validated request
    ///
    /// Every outcome, including failures, has already been reported to
    /// `sink` when this returns; the returned error is for server-side
    /// logging only. The last event is always terminal (`DONE` or `ERR`).
    pub async fn execute<F, S>(
        &self,
        profile: &EndpointProfile,
        request: UploadRequest<F>,
        sink: &S,
    ) -> Result<()>
    where
        F: AsyncRead + Unpin + Send,
        S: EventSink,
    {
        let UploadRequest {
            file,
            target_dir,
            script,
        } = request;

        if let Some(message) = profile.start_message {
            sink.emit(StreamEvent::info(message)).await;
        }

        let uploaded = file.is_some();
        if let Some(file) = file {
            sink.emit(StreamEvent::info(format!(
                "Uploading {} to {}",
                file.file_name,
                target_dir.display()
            )))
            .await;

            if let Err(err) = self.save_and_extract(profile, file, &target_dir, sink).await {
                return Err(fail(profile, sink, err).await);
            }
        }

        let Some(script) = script else {
            sink.emit(StreamEvent::done(profile.done_message)).await;
            return Ok(());
        };

        if uploaded {
            sink.emit(StreamEvent::info(format!("Running script: {script}")))
                .await;
        } else {
            sink.emit(StreamEvent::info(format!(
                "Executing script in {}: {}",
                target_dir.display(),
                script
            )))
            .await;
        }

        let status = match profile.mode {
            ResponseMode::Streaming => {
                self.runner
                    .run_streaming(&script, &target_dir, sink)
                    .await
            }
            ResponseMode::Buffered => {
                let (lines, status) = self.runner.run(&script, &target_dir).await.into_result();
                for line in lines {
                    sink.emit(StreamEvent::out(line)).await;
                }
                status
            }
        };

        match status {
            Ok(()) => {
                sink.emit(StreamEvent::done(SCRIPT_DONE_MESSAGE)).await;
                Ok(())
            }
            Err(err) => Err(fail(profile, sink, err.into()).await),
        }
    }

    async fn save_and_extract<F, S>(
        &self,
        profile: &EndpointProfile,
        file: UploadedFile<F>,
        target_dir: &Path,
        sink: &S,
    ) -> Result<()>
    where
        F: AsyncRead + Unpin + Send,
        S: EventSink,
    {
        let UploadedFile {
            file_name,
            mut content,
        } = file;

        fs::create_dir_all(target_dir)
            .await
            .map_err(DeployError::TargetDir)?;

        let archive_path = target_dir.join(&file_name);
        let mut out = fs::File::create(&archive_path)
            .await
            .map_err(DeployError::CreateFile)?;

        sink.emit(StreamEvent::info(format!(
            "Saving file to {}",
            archive_path.display()
        )))
        .await;

        let written = io::copy(&mut content, &mut out)
            .await
            .map_err(DeployError::SaveFile)?;
        out.flush().await.map_err(DeployError::SaveFile)?;
        drop(out);

        debug!(path = %archive_path.display(), bytes = written, "Archive saved");

        sink.emit(StreamEvent::info("Extracting ZIP...")).await;
        let report = self
            .extractor
            .extract(&archive_path, target_dir, sink)
            .await?;

        debug!(
            files = report.files,
            directories = report.directories,
            skipped = report.skipped,
            "Archive extracted"
        );

        if report.skipped > 0 {
            sink.emit(StreamEvent::info(format!(
                "Skipped {} metadata entries",
                report.skipped
            )))
            .await;
        }

        if profile.delete_archive {
            match fs::remove_file(&archive_path).await {
                Ok(()) => {
                    sink.emit(StreamEvent::info(format!(
                        "Deleted zip file {}",
                        archive_path.display()
                    )))
                    .await
                }
                Err(err) => {
                    warn!(path = %archive_path.display(), error = %err, "Failed to delete zip file")
                }
            }
        }

        Ok(())
    }
}

async fn fail<S: EventSink>(profile: &EndpointProfile, sink: &S, err: DeployError) -> DeployError {
    error!(endpoint = profile.name, error = %err, "Deploy step failed");
    sink.emit(StreamEvent::failed(err.to_string())).await;
    err
}
