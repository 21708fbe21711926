//! Run the chat0 gateway in the foreground

use anyhow::Result;
use clap::Args;
use tracing::info;

use chat0_server::{AppState, Chat0Server};

use crate::config::Chat0Config;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides [server] port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides [server] host)
    #[arg(long)]
    pub host: Option<String>,
}

/// Run the serve command
pub async fn run(args: ServeArgs, mut config: Chat0Config) -> Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let registry = config.registry();
    info!(
        models = registry.len(),
        summary_model = %config.summary.model,
        "Starting chat0 server on {}:{}",
        config.server.host,
        config.server.port
    );
    if registry.resolve(&config.summary.model).is_err() {
        tracing::warn!(
            summary_model = %config.summary.model,
            "summary model is not in the catalog, /api/completion will reject requests"
        );
    }

    let state = AppState::new(registry)
        .with_endpoints(config.endpoints())
        .with_summary_model(config.summary.model.clone());
    let server = Chat0Server::new(config.server_config(), state);
    server.run().await.map_err(Into::into)
}
