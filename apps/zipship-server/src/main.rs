//! ZipShip - upload, extract and deploy service
//!
//! Binary entry point: loads `.env`, reads the configuration, sets up
//! tracing and serves until the process is stopped.

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use zipship_server::{Server, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;

    // Initialize tracing, RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting ZipShip server");
    info!(
        max_form_bytes = config.max_form_bytes,
        legacy_max_form_bytes = config.legacy_max_form_bytes,
        script_dir = %config.script_dir.display(),
        upload_dir = %config.upload_dir.display(),
        spool_dir = %config.spool_dir.display(),
        shell = %config.shell,
        "Configuration loaded"
    );
    warn!("Commands are executed as received without authentication; keep this service private");

    let server = Server::new(config);
    let listener = server.bind().await?;
    server.serve(listener).await
}
