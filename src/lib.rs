//! # tidlarr
//!
//! Bridges a streaming music catalog into the two protocols Lidarr-style library managers
//! speak: it answers as a Newznab indexer (searches become release listings with a
//! synthetic NZB behind every result) and as a SABnzbd download client (submitting that
//! NZB fetches the album's tracks, tags them and moves the folder into place).
//!
//! ## Design Philosophy
//!
//! - **Two surfaces, one id** - the catalog album id travels from the indexer's fake NZB
//!   to the download client's job id (`SABnzbd_nzo_<id>`)
//! - **In-memory state** - the registry lives for the lifetime of the process
//! - **Event-driven** - embedders subscribe to events instead of polling the queue
//!
//! ## Quick Start
//!
//! ```no_run
//! use tidlarr::{CatalogDownloader, Config, run_with_shutdown};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let downloader = Arc::new(CatalogDownloader::new(config).await?);
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     run_with_shutdown(downloader).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP API (SABnzbd and Newznab surfaces)
pub mod api;
/// Upstream catalog client
pub mod catalog;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Media transfer and transcoding
pub mod fetcher;
/// Catalog search projection and album resolution
pub mod metadata;
/// In-memory download registry
pub mod registry;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use catalog::{CatalogClient, HttpCatalogClient};
pub use config::{Config, Quality};
pub use downloader::CatalogDownloader;
pub use error::{
    AcquisitionError, ApiError, CatalogError, Error, ErrorDetail, Result, ToHttpStatus,
};
pub use fetcher::{HttpTrackFetcher, TrackFetcher};
pub use registry::{DownloadRegistry, DownloadSnapshot};
pub use types::{Album, Download, Event, JobId, Lifecycle, StreamLocation, Track};

/// Serve the API until a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// In-flight requests are drained; acquisition tasks are abandoned with the process.
///
/// # Example
///
/// ```no_run
/// use tidlarr::{CatalogDownloader, Config, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = Arc::new(CatalogDownloader::new(Config::from_env()?).await?);
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: std::sync::Arc<CatalogDownloader>) -> Result<()> {
    let config = downloader.get_config();
    api::serve_until(downloader, config, wait_for_signal()).await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
