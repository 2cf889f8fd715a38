mod shell_runner;
mod zip_extractor;

pub use shell_runner::ShellCommandRunner;
pub use zip_extractor::{is_metadata_entry, ZipArchiveExtractor};
