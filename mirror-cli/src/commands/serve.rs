//! Serve command for running the signaling server
//!
//! Loads the layered configuration, applies command-line overrides, and
//! serves `/magicmirror` until interrupted.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use mirror_server::{AppState, MirrorServer};
use tracing::{info, warn};

use crate::config::{ConfigLoader, MirrorConfig};

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// WebSocket URL of the Kurento media server
    #[arg(long, env = "KMS_URL")]
    pub kms_url: Option<String>,

    /// Image drawn over detected faces
    #[arg(long)]
    pub overlay_uri: Option<String>,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = apply_overrides(ConfigLoader::load()?, &args);
    config
        .kurento
        .validate()
        .context("Invalid media server configuration")?;

    info!(
        "Starting magic-mirror on {}:{} (media server {})",
        config.server.host, config.server.port, config.kurento.url
    );

    let state =
        AppState::with_kurento(config.kurento.clone())?.with_overlay(config.overlay_image());
    let server = MirrorServer::with_state(config.server_config(), Arc::new(state));

    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupted, shutting down"),
            Err(e) => warn!("Failed to listen for interrupt: {}", e),
        }
        shutdown.cancel();
    });

    server.run().await.map_err(Into::into)
}

/// Layer command-line flags over the loaded configuration
fn apply_overrides(mut config: MirrorConfig, args: &ServeArgs) -> MirrorConfig {
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(url) = &args.kms_url {
        config.kurento.url = url.clone();
    }
    if let Some(uri) = &args.overlay_uri {
        config.overlay.image_uri = uri.clone();
    }
    config
}
