//! ZipShip server
//!
//! HTTP front of the ZipShip pipeline: uploads a ZIP archive, extracts it
//! into a target directory, optionally runs a shell command there and
//! streams every step back as plain-text log lines.
//!
//! Commands are run exactly as received. Put the service behind
//! authentication before exposing it.

pub mod config;
pub mod dto;
mod handlers;
mod routes;
pub mod server;
mod stream;

use std::path::PathBuf;
use std::sync::Arc;

use zipship_domain::DeployService;
use zipship_local::{ShellCommandRunner, ZipArchiveExtractor};

use crate::config::Profiles;

pub use config::ServerConfig;
pub use server::Server;

/// Deploy service wired to the local filesystem and shell
pub type LocalDeployService = DeployService<ZipArchiveExtractor, ShellCommandRunner>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub deploy_service: Arc<LocalDeployService>,
    pub profiles: Arc<Profiles>,
    pub spool_dir: Arc<PathBuf>,
}
