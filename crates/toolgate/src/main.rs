//! toolgate - JSON-RPC tool gateway.
//!
//! This is the main entry point for the toolgate server.

mod logging;

use clap::Parser;
use logging::init_logging;
use toolgate::{build_router, serve, Cli};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let address = cli.bind_address();
    let router = build_router(cli.app_config())?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting toolgate on {}", address);
    serve(address, router).await?;

    Ok(())
}
