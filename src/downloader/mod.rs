//! Core downloader implementation split into focused submodules.
//!
//! The `CatalogDownloader` struct and its methods are organized by domain:
//! - [`queue`] - Job intake and the queue/history views
//! - [`control`] - History deletion
//! - [`tasks`] - Acquisition task spawning and supervision
//! - [`acquisition`] - The per-download acquisition pipeline
//! - [`tagging`] - Tag writing for acquired tracks

mod acquisition;
mod control;
mod queue;
mod tagging;
mod tasks;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use acquisition::track_file_name;

use crate::catalog::{CatalogClient, HttpCatalogClient};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{HttpTrackFetcher, TrackFetcher};
use crate::metadata::MetadataResolver;
use crate::registry::DownloadRegistry;
use crate::types::Event;
use std::sync::Arc;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct CatalogDownloader {
    /// Registry of every known download
    pub(crate) registry: Arc<DownloadRegistry>,
    /// Catalog search and album resolution
    pub(crate) resolver: Arc<MetadataResolver>,
    /// Media transfer (trait object so tests can script transfers)
    pub(crate) fetcher: Arc<dyn TrackFetcher>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Acquisition runs report their outcome to the supervisor through this channel
    pub(crate) outcome_tx: tokio::sync::mpsc::UnboundedSender<tasks::RunOutcome>,
}

impl CatalogDownloader {
    /// Create a new CatalogDownloader instance
    ///
    /// This initializes all core components:
    /// - Creates the `incomplete` and `complete` category directories
    /// - Builds the HTTP catalog client and the media fetcher
    /// - Sets up the event broadcast channel and the acquisition supervisor
    pub async fn new(config: Config) -> Result<Self> {
        for dir in [config.download.incomplete_dir(), config.download.complete_dir()] {
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create directory '{}': {}", dir.display(), e),
                ))
            })?;
        }

        let catalog: Arc<dyn CatalogClient> = Arc::new(HttpCatalogClient::new(&config.catalog)?);
        let fetcher: Arc<dyn TrackFetcher> = Arc::new(HttpTrackFetcher::new(&config)?);

        tracing::info!(
            catalog = %config.catalog.base_url,
            quality = config.catalog.quality.catalog_id(),
            fetcher = fetcher.name(),
            download_dir = %config.download.download_dir.display(),
            "Downloader initialized"
        );

        Ok(Self::with_components(config, catalog, fetcher))
    }

    /// Assemble a downloader from explicit catalog and fetcher implementations
    ///
    /// Spawns the acquisition supervisor, so it must be called from within a Tokio runtime.
    pub fn with_components(
        config: Config,
        catalog: Arc<dyn CatalogClient>,
        fetcher: Arc<dyn TrackFetcher>,
    ) -> Self {
        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        let resolver = Arc::new(MetadataResolver::new(
            catalog,
            config.catalog.quality,
            config.catalog.cover_url_template.clone(),
        ));

        let outcome_tx = tasks::spawn_supervisor(event_tx.clone());

        Self {
            registry: Arc::new(DownloadRegistry::new()),
            resolver,
            fetcher,
            event_tx,
            config: Arc::new(config),
            outcome_tx,
        }
    }

    /// Subscribe to download events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tidlarr::{CatalogDownloader, Config};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = CatalogDownloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "download event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// The registry backing the queue and history views
    pub fn registry(&self) -> &DownloadRegistry {
        &self.registry
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
