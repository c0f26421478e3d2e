//! tidlarr server binary
//!
//! Reads its configuration from the environment (and `.env`), then serves both API
//! surfaces until SIGTERM/SIGINT.

use std::sync::Arc;
use tidlarr::{CatalogDownloader, Config, run_with_shutdown};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("warning: could not load .env: {}", e);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tidlarr=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        bind_address = %config.server.api.bind_address,
        category = %config.download.category,
        quality = config.catalog.quality.catalog_id(),
        "Configuration loaded"
    );

    let downloader = Arc::new(CatalogDownloader::new(config).await?);
    run_with_shutdown(downloader).await?;

    tracing::info!("Shut down cleanly");
    Ok(())
}
