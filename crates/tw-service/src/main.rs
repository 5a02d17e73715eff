//! Tradewatch trigger service - entry point.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tw_store::MemoryOrderStore;

/// Conditional-order trigger service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via TW_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    tw_ws::init_crypto();

    let args = Args::parse();

    tw_telemetry::init_logging()?;

    info!("Starting tradewatch v{}", env!("CARGO_PKG_VERSION"));

    let config = match args.config {
        Some(path) => tw_service::AppConfig::from_file(&path)?,
        None => tw_service::AppConfig::load()?,
    };
    info!(feed_url = %config.feed.url, "Configuration loaded");

    // The surrounding application injects its database-backed store here;
    // standalone runs use the in-memory one.
    let store = Arc::new(MemoryOrderStore::new());

    let app = tw_service::Application::new(config, store);
    app.run().await?;

    Ok(())
}
