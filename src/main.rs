use anyhow::Context;
use clap::Parser;

use varnish_fwd::backend::build_directory;
use varnish_fwd::config::{Cli, Config};
use varnish_fwd::proxy::{init_tracing, ForwardServer};

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_cli(cli).context("Invalid configuration")?;

    tracing::info!(
        provider = config.provider.kind(),
        listen = %config.listen.socket_addr(),
        refresh_interval = ?config.refresh_interval,
        "Starting forwarder"
    );

    let directory = build_directory(&config.provider).context("Failed to set up backend discovery")?;
    let mut server = ForwardServer::new(config, directory)
        .await
        .context("Failed to load initial backend set")?;
    server.try_bind().await?;
    server.run().await?;
    Ok(())
}
