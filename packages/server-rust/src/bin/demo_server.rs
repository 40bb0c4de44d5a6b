//! Demo server binary: serves `/health` and `/whoami` behind `ContextLayer`.

use clap::Parser;
use reqscope_server::cli::Cli;
use reqscope_server::telemetry::init_tracing;
use reqscope_server::NetworkModule;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format, &cli.log_filter)?;

    let network = cli.network_config()?;
    let context_config = cli.context_config();
    info!(
        host = %network.host,
        config_keys = context_config.len(),
        "starting reqscope demo server"
    );

    let mut module = NetworkModule::new(network, context_config);
    let port = module.start().await?;
    info!(port, "listening");

    module.serve(shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c; shutting down");
        return;
    }
    info!("shutdown signal received");
}
