//! Server object
//!
//! A `Server` owns a fully built router. Several instances can live in one
//! process, each serving its own listener.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;
use zipship_domain::DeployService;
use zipship_local::{ShellCommandRunner, ZipArchiveExtractor};

use crate::{config::ServerConfig, routes, AppState};

pub struct Server {
    config: ServerConfig,
    router: Router,
}

impl Server {
    /// Wire the adapters and build the router for `config`
    pub fn new(config: ServerConfig) -> Self {
        let service = DeployService::new(
            ZipArchiveExtractor::new(),
            ShellCommandRunner::new(config.shell.clone()),
        );

        let state = AppState {
            deploy_service: Arc::new(service),
            profiles: Arc::new(config.profiles()),
            spool_dir: Arc::new(config.spool_dir.clone()),
        };

        Self {
            router: routes::create_router(state),
            config,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.bind_addr();
        TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))
    }

    /// Serve requests on `listener` until the process stops
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        info!(addr = %addr, "Starting HTTP server");

        axum::serve(listener, self.router)
            .await
            .context("HTTP server stopped")
    }
}
