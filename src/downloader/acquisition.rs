//! The per-download acquisition pipeline.
//!
//! Runs strictly sequentially: working folder, cover art, then each track in order, then
//! promotion of the folder into the complete area. There is no retry; the first fatal error
//! ends the run with the counter at its last value.

use crate::error::{AcquisitionError, Result};
use crate::registry::TrackedDownload;
use crate::types::{Download, Event, StreamLocation, Track};
use crate::utils::{is_single_component, sanitize_filename};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::CatalogDownloader;
use super::tagging::{TrackTags, write_tags};

/// File name of the cover image inside a download folder
pub const COVER_FILE_NAME: &str = "cover.jpg";

/// File name for one track
///
/// `NN - artist - title` with the two-digit position, prefixed with the disc number on
/// multi-disc albums, sanitized, plus `extension`.
///
/// # Examples
///
/// ```
/// # use tidlarr::downloader::track_file_name;
/// # use tidlarr::types::{Download, JobId, StreamLocation, Track};
/// # use tidlarr::config::Quality;
/// let track = Track {
///     id: "1".into(),
///     title: "Who? Me".into(),
///     position: 3,
///     disc: 2,
///     isrc: String::new(),
///     lyrics: None,
///     stream: StreamLocation::Direct("https://media.example/1.flac".into()),
/// };
/// let download = Download {
///     id: JobId::new("42"),
///     artist: "AC/DC".into(),
///     album: "Live".into(),
///     comment: String::new(),
///     cover_url: String::new(),
///     disc_count: 2,
///     label: String::new(),
///     tracks: vec![track.clone()],
///     folder_name: "AC_DC - Live".into(),
///     quality: Quality::Lossless,
///     has_lyrics: false,
/// };
/// assert_eq!(track_file_name(&download, &track, ".flac"), "2-03 - AC_DC - Who_ Me.flac");
/// ```
pub fn track_file_name(download: &Download, track: &Track, extension: &str) -> String {
    let stem = if download.disc_count > 1 {
        format!(
            "{}-{:02} - {} - {}",
            track.disc, track.position, download.artist, track.title
        )
    } else {
        format!("{:02} - {} - {}", track.position, download.artist, track.title)
    };
    format!("{}{}", sanitize_filename(&stem), extension)
}

impl CatalogDownloader {
    /// Execute one acquisition run, returning the promoted folder
    pub(crate) async fn run_acquisition(&self, tracked: Arc<TrackedDownload>) -> Result<PathBuf> {
        let download = tracked.download();
        let id = &download.id;

        if !is_single_component(&download.folder_name) {
            return Err(AcquisitionError::FolderCreation {
                path: PathBuf::from(&download.folder_name),
                reason: "folder name must be a single directory name".to_string(),
            }
            .into());
        }

        let working = self
            .config
            .download
            .incomplete_dir()
            .join(&download.folder_name);
        tokio::fs::create_dir_all(&working)
            .await
            .map_err(|e| AcquisitionError::FolderCreation {
                path: working.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(
            download_id = %id,
            folder = %working.display(),
            tracks = download.declared_tracks(),
            "Acquisition started"
        );

        self.fetcher
            .download(&download.cover_url, &working.join(COVER_FILE_NAME))
            .await
            .map_err(|e| AcquisitionError::CoverArt {
                url: download.cover_url.clone(),
                reason: e.to_string(),
            })?;

        let extension = self.config.file_extension();
        let total = download.declared_tracks();

        for (index, track) in download.tracks.iter().enumerate() {
            if tracked.is_track_done(index).await {
                continue;
            }

            let path = working.join(track_file_name(download, track, &extension));
            self.acquire_track(track, &path)
                .await
                .map_err(|e| AcquisitionError::Track {
                    position: track.position,
                    title: track.title.clone(),
                    reason: e.to_string(),
                })?;

            if let Err(e) = write_tags(path.clone(), TrackTags::new(download, track)).await {
                tracing::warn!(
                    download_id = %id,
                    file = %path.display(),
                    error = %e,
                    "Failed to write tags"
                );
            }

            if let Some(completed) = tracked.complete_track(index).await {
                tracing::debug!(
                    download_id = %id,
                    track = %track.title,
                    completed,
                    total,
                    "Track acquired"
                );
                self.emit_event(Event::TrackCompleted {
                    id: id.clone(),
                    completed,
                    total,
                });
            }
        }

        let destination = self
            .config
            .download
            .complete_dir()
            .join(&download.folder_name);

        if let Err(e) = promote(&working, &destination).await {
            // every track is on disk but the job cannot be reported as completed
            tracked.mark_failed().await;
            return Err(e.into());
        }

        Ok(destination)
    }

    async fn acquire_track(&self, track: &Track, path: &Path) -> Result<()> {
        match &track.stream {
            StreamLocation::Direct(url) => {
                self.fetcher.download(url, path).await?;
            }
            StreamLocation::Manifest(manifest) => {
                self.fetcher.transcode(manifest, path).await?;
            }
        }
        Ok(())
    }
}

async fn promote(source: &Path, destination: &Path) -> std::result::Result<(), AcquisitionError> {
    let fail = |reason: String| AcquisitionError::Promotion {
        source_path: source.to_path_buf(),
        dest_path: destination.to_path_buf(),
        reason,
    };

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| fail(e.to_string()))?;
    }

    tokio::fs::rename(source, destination)
        .await
        .map_err(|e| fail(e.to_string()))
}
