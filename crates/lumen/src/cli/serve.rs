//! The `lumen serve` command: run the HTTP service.

use clap::Args;
use lumen_core::{Config, ThumbnailService};
use std::sync::Arc;

use crate::server::{self, AppState};

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Execute the serve command.
pub async fn execute(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let addr = config.server.bind_addr();
    let server_config = config.server.clone();
    let service = ThumbnailService::new(config)?;
    let state = Arc::new(AppState::new(
        service,
        server_config,
        tokio::runtime::Handle::current(),
    ));

    let listener = tiny_http::Server::http(addr.as_str())
        .map_err(|e| anyhow::anyhow!("Failed to bind {addr}: {e}"))?;
    tracing::info!("Lumen v{} listening on http://{}", lumen_core::VERSION, addr);

    // Accept loop blocks; keep it off the async workers.
    tokio::task::spawn_blocking(move || server::run(listener, state)).await?;
    Ok(())
}
