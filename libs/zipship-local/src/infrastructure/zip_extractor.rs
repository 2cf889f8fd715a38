//! ZIP Archive Extractor Implementation
//!
//! This module implements the `ArchiveExtractor` port with the `zip` crate.
//! Reading a ZIP container needs random access, so the archive is first
//! saved to disk by the domain and then unpacked on the blocking pool.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use tokio::runtime::Handle;
use tracing::{debug, info, instrument};
use zip::ZipArchive;
use zipship_domain::{
    deploy::{ExtractError, ExtractReport},
    ports::ArchiveExtractor,
    stream::{EventSink, StreamEvent},
};

/// Prefix of the resource-fork folder added by the macOS archiver
const MACOS_METADATA_DIR: &str = "__MACOSX";

/// Prefix of AppleDouble companion files
const APPLE_DOUBLE_PREFIX: &str = "._";

/// Whether an archive entry is platform metadata rather than payload
///
/// Only the start of the entry name is checked: `__MACOSX/...` and a
/// top-level `._name` are skipped, while `dir/._name` is regular payload.
pub fn is_metadata_entry(name: &str) -> bool {
    name.starts_with(MACOS_METADATA_DIR) || name.starts_with(APPLE_DOUBLE_PREFIX)
}

/// `zip`-based implementation of the ArchiveExtractor port
///
/// Entries are written in archive order. Existing files at the same paths
/// are overwritten. The first failing entry aborts the extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveExtractor;

impl ZipArchiveExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous extraction, calling `on_extracted` with each written file
    pub fn extract_blocking(
        archive: &Path,
        target_dir: &Path,
        mut on_extracted: impl FnMut(&Path),
    ) -> Result<ExtractReport, ExtractError> {
        let file = File::open(archive).map_err(ExtractError::open_failed)?;
        let mut zip = ZipArchive::new(BufReader::new(file)).map_err(ExtractError::open_failed)?;

        let mut report = ExtractReport::default();

        for index in 0..zip.len() {
            let mut entry = zip
                .by_index(index)
                .map_err(|err| ExtractError::entry_failed(format!("#{index}"), err))?;
            let name = entry.name().to_string();

            if is_metadata_entry(&name) {
                debug!(entry = %name, "Skipping metadata entry");
                report.skipped += 1;
                continue;
            }

            let Some(relative) = entry.enclosed_name() else {
                return Err(ExtractError::entry_failed(
                    name,
                    "path escapes target directory",
                ));
            };
            let path = target_dir.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&path).map_err(|err| ExtractError::mkdir_failed(&name, err))?;
                report.directories += 1;
                continue;
            }

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|err| ExtractError::mkdir_failed(&name, err))?;
            }

            let mut out = File::create(&path).map_err(|err| ExtractError::entry_failed(&name, err))?;
            io::copy(&mut entry, &mut out).map_err(|err| ExtractError::entry_failed(&name, err))?;
            drop(out);

            report.files += 1;
            on_extracted(&path);
        }

        Ok(report)
    }
}

impl ArchiveExtractor for ZipArchiveExtractor {
    #[instrument(skip_all, fields(archive = %archive.display(), target = %target_dir.display()))]
    fn extract<S: EventSink>(
        &self,
        archive: &Path,
        target_dir: &Path,
        sink: &S,
    ) -> impl std::future::Future<Output = Result<ExtractReport, ExtractError>> + Send {
        let archive: PathBuf = archive.to_path_buf();
        let target_dir: PathBuf = target_dir.to_path_buf();
        let sink = sink.clone();

        async move {
            debug!("Extracting archive on blocking pool");

            // Progress lines go out from the blocking thread, which waits
            // while the sink is not keeping up
            let runtime = Handle::current();
            let report = tokio::task::spawn_blocking(move || {
                Self::extract_blocking(&archive, &target_dir, |path| {
                    let line = format!("Extracted: {}", path.display());
                    runtime.block_on(sink.emit(StreamEvent::info(line)));
                })
            })
            .await
            .map_err(ExtractError::aborted)??;

            info!(
                files = report.files,
                directories = report.directories,
                skipped = report.skipped,
                "Archive extracted"
            );
            Ok::<_, ExtractError>(report)
        }
    }
}
