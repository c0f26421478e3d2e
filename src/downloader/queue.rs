//! Job intake and the queue/history views.

use crate::error::Result;
use crate::registry::DownloadSnapshot;
use crate::types::{Album, Event, JobId};

use super::CatalogDownloader;

impl CatalogDownloader {
    /// Resolve, register and start acquiring an album
    ///
    /// The download only becomes visible once the resolve has fully succeeded; a catalog
    /// error leaves the registry untouched. `declared_tracks` is the caller's count and is
    /// only logged, the catalog's track list is authoritative.
    ///
    /// # Errors
    ///
    /// Returns the resolve error, or [`crate::Error::AlreadyAcquiring`] when a download with
    /// this id is already running.
    pub async fn add_job(
        &self,
        id: JobId,
        display_name: &str,
        declared_tracks: Option<u32>,
    ) -> Result<JobId> {
        tracing::info!(download_id = %id, name = display_name, "Resolving album");

        let download = self.resolver.resolve(&id, display_name).await?;

        if let Some(declared) = declared_tracks
            && declared as usize != download.declared_tracks()
        {
            tracing::debug!(
                download_id = %id,
                declared,
                resolved = download.declared_tracks(),
                "Caller's track count differs from the catalog"
            );
        }

        let tracks = download.declared_tracks();
        let tracked = self.registry.put_started(download).await?;
        let name = tracked.download().folder_name.clone();

        tracing::info!(download_id = %id, name = %name, tracks, "Download queued");
        self.emit_event(Event::Queued {
            id: id.clone(),
            name,
            tracks,
        });

        self.start_acquisition(tracked);
        Ok(id)
    }

    /// Search the catalog for albums
    pub async fn search(&self, text: &str) -> Result<Vec<Album>> {
        self.resolver.search(text).await
    }

    /// Downloads still in progress (queued, acquiring or stalled), in insertion order
    pub async fn queue(&self) -> Vec<DownloadSnapshot> {
        self.registry
            .list()
            .await
            .into_iter()
            .filter(DownloadSnapshot::in_queue)
            .collect()
    }

    /// Downloads that finished or failed, in insertion order
    pub async fn history(&self) -> Vec<DownloadSnapshot> {
        self.registry
            .list()
            .await
            .into_iter()
            .filter(DownloadSnapshot::in_history)
            .collect()
    }
}
