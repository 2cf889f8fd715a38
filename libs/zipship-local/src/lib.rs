//! # ZipShip local adapters
//!
//! Implementations of the domain ports against the local machine:
//!
//! - [`ZipArchiveExtractor`]: unpacks ZIP containers with the `zip` crate
//! - [`ShellCommandRunner`]: runs commands through a shell with `tokio::process`

pub mod infrastructure;

pub use infrastructure::{is_metadata_entry, ShellCommandRunner, ZipArchiveExtractor};
