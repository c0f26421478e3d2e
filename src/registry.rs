//! Process-wide download registry
//!
//! Maps external identifiers to download aggregates. Protocol handlers never touch the map
//! directly; every insert, lookup, delete and snapshot goes through [`DownloadRegistry`].
//!
//! Lock order is always registry map first, then a download's progress record. The
//! acquisition task only ever takes the progress lock.

use crate::config::Quality;
use crate::error::{Error, Result};
use crate::types::{Download, JobId, Lifecycle};
use crate::utils::sanitize_filename;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Value of `completed` once a download has been marked failed
pub const FAILED_SENTINEL: i64 = -1;

/// Mutable part of a download, guarded as one unit
#[derive(Debug)]
struct Progress {
    completed: i64,
    tracks_done: Vec<bool>,
    started: bool,
    last_error: Option<String>,
}

/// A registered download: the immutable aggregate plus its guarded progress record
#[derive(Debug)]
pub struct TrackedDownload {
    download: Download,
    progress: Mutex<Progress>,
}

impl TrackedDownload {
    /// Wrap a freshly resolved download
    pub fn new(download: Download) -> Self {
        let tracks = download.declared_tracks();
        Self {
            download,
            progress: Mutex::new(Progress {
                completed: 0,
                tracks_done: vec![false; tracks],
                started: false,
                last_error: None,
            }),
        }
    }

    /// The resolved aggregate
    pub fn download(&self) -> &Download {
        &self.download
    }

    /// External identifier
    pub fn id(&self) -> &JobId {
        &self.download.id
    }

    /// Flip the started flag. Returns `false` if acquisition had already started.
    pub async fn mark_started(&self) -> bool {
        let mut progress = self.progress.lock().await;
        if progress.started {
            return false;
        }
        progress.started = true;
        true
    }

    /// Mark track `index` complete and advance the counter in one step
    ///
    /// Returns the new completed count, or `None` when the track was already complete,
    /// the index is out of range or the download carries the failure sentinel.
    pub async fn complete_track(&self, index: usize) -> Option<usize> {
        let mut progress = self.progress.lock().await;
        if progress.completed == FAILED_SENTINEL {
            return None;
        }
        let done = progress.tracks_done.get_mut(index)?;
        if *done {
            return None;
        }
        *done = true;
        progress.completed += 1;
        Some(progress.completed as usize)
    }

    /// Remember why the last run stopped
    pub async fn record_error(&self, error: impl Into<String>) {
        self.progress.lock().await.last_error = Some(error.into());
    }

    /// Force the failure sentinel
    pub async fn mark_failed(&self) {
        self.progress.lock().await.completed = FAILED_SENTINEL;
    }

    /// Whether a given track has been written
    pub async fn is_track_done(&self, index: usize) -> bool {
        self.progress
            .lock()
            .await
            .tracks_done
            .get(index)
            .copied()
            .unwrap_or(false)
    }

    /// Consistent view of the download and its progress
    pub async fn snapshot(&self) -> DownloadSnapshot {
        let progress = self.progress.lock().await;
        DownloadSnapshot {
            id: self.download.id.clone(),
            folder_name: self.download.folder_name.clone(),
            artist: self.download.artist.clone(),
            album: self.download.album.clone(),
            declared: self.download.declared_tracks(),
            completed: progress.completed,
            quality: self.download.quality,
            started: progress.started,
            last_error: progress.last_error.clone(),
        }
    }
}

/// Point-in-time copy of one download's state
#[derive(Clone, Debug, PartialEq)]
pub struct DownloadSnapshot {
    /// External identifier
    pub id: JobId,
    /// Folder name under incomplete/ and complete/
    pub folder_name: String,
    /// Album artist
    pub artist: String,
    /// Album title
    pub album: String,
    /// Declared track count
    pub declared: usize,
    /// Completed tracks, or [`FAILED_SENTINEL`]
    pub completed: i64,
    /// Quality the download was resolved for
    pub quality: Quality,
    /// Whether acquisition has started
    pub started: bool,
    /// Error that stopped the last run
    pub last_error: Option<String>,
}

impl DownloadSnapshot {
    /// Lifecycle state derived from the progress values
    pub fn lifecycle(&self) -> Lifecycle {
        if self.completed == FAILED_SENTINEL {
            Lifecycle::Failed
        } else if self.completed >= self.declared as i64 {
            Lifecycle::Done
        } else if self.last_error.is_some() {
            Lifecycle::Stalled
        } else if self.started {
            Lifecycle::Acquiring
        } else {
            Lifecycle::Queued
        }
    }

    /// Shown in the download-client queue
    pub fn in_queue(&self) -> bool {
        matches!(
            self.lifecycle(),
            Lifecycle::Queued | Lifecycle::Acquiring | Lifecycle::Stalled
        )
    }

    /// Shown in the download-client history
    pub fn in_history(&self) -> bool {
        matches!(self.lifecycle(), Lifecycle::Done | Lifecycle::Failed)
    }

    /// Integer percentage of completed tracks (0 for a failed download)
    pub fn percentage(&self) -> u32 {
        if self.declared == 0 || self.completed <= 0 {
            return 0;
        }
        ((self.completed as u64 * 100) / self.declared as u64).min(100) as u32
    }

    /// Tracks still to be acquired
    pub fn remaining_tracks(&self) -> usize {
        self.declared
            .saturating_sub(self.completed.max(0) as usize)
    }
}

#[derive(Debug)]
struct Entry {
    seq: u64,
    download: Arc<TrackedDownload>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    entries: HashMap<JobId, Entry>,
    next_seq: u64,
}

/// Mapping from external identifier to download aggregate
#[derive(Debug, Default)]
pub struct DownloadRegistry {
    inner: Mutex<RegistryInner>,
}

impl DownloadRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a download, replacing a previous entry that has not started acquisition
    ///
    /// A replaced entry keeps its position in [`DownloadRegistry::list`].
    pub async fn put(&self, download: Download) -> Result<Arc<TrackedDownload>> {
        self.insert(download, false).await
    }

    /// Insert a download already claimed for acquisition
    ///
    /// The started flag is set while the map lock is held, so a concurrent insert for the
    /// same id sees the claim and is rejected instead of replacing the entry.
    pub async fn put_started(&self, download: Download) -> Result<Arc<TrackedDownload>> {
        self.insert(download, true).await
    }

    async fn insert(
        &self,
        mut download: Download,
        started: bool,
    ) -> Result<Arc<TrackedDownload>> {
        let mut inner = self.inner.lock().await;
        let id = download.id.clone();

        let seq = match inner.entries.get(&id) {
            Some(existing) => {
                if existing.download.progress.lock().await.started {
                    return Err(Error::AlreadyAcquiring(id.to_string()));
                }
                tracing::debug!(download_id = %id, "replacing queued download");
                existing.seq
            }
            None => {
                let seq = inner.next_seq;
                inner.next_seq += 1;
                seq
            }
        };

        if inner.entries.iter().any(|(other, e)| {
            *other != id && e.download.download.folder_name == download.folder_name
        }) {
            let renamed = sanitize_filename(&format!("{} [{}]", download.folder_name, id));
            tracing::warn!(
                download_id = %id,
                folder = %download.folder_name,
                renamed = %renamed,
                "Folder name already used by another download"
            );
            download.folder_name = renamed;
        }

        let tracked = Arc::new(TrackedDownload::new(download));
        if started {
            tracked.mark_started().await;
        }

        inner.entries.insert(
            id,
            Entry {
                seq,
                download: tracked.clone(),
            },
        );
        Ok(tracked)
    }

    /// Look up a download
    pub async fn get(&self, id: &JobId) -> Option<Arc<TrackedDownload>> {
        self.inner
            .lock()
            .await
            .entries
            .get(id)
            .map(|e| e.download.clone())
    }

    /// Remove a download, returning it if it was present
    pub async fn delete(&self, id: &JobId) -> Option<Arc<TrackedDownload>> {
        self.inner
            .lock()
            .await
            .entries
            .remove(id)
            .map(|e| e.download)
    }

    /// Snapshot every download in insertion order
    pub async fn list(&self) -> Vec<DownloadSnapshot> {
        let inner = self.inner.lock().await;
        let mut entries: Vec<&Entry> = inner.entries.values().collect();
        entries.sort_by_key(|e| e.seq);

        let mut snapshots = Vec::with_capacity(entries.len());
        for entry in entries {
            snapshots.push(entry.download.snapshot().await);
        }
        snapshots
    }

    /// Force the failure sentinel on a download. Returns `false` for unknown ids.
    pub async fn mark_failed(&self, id: &JobId) -> bool {
        match self.get(id).await {
            Some(download) => {
                download.mark_failed().await;
                true
            }
            None => false,
        }
    }

    /// Number of registered downloads
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// Whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::test_helpers::sample_download;

    #[tokio::test]
    async fn test_put_and_get() {
        let registry = DownloadRegistry::new();
        registry.put(sample_download("42", 3)).await.unwrap();

        let tracked = registry.get(&JobId::new("42")).await.unwrap();
        assert_eq!(tracked.download().declared_tracks(), 3);
        assert!(registry.get(&JobId::new("43")).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_replace_before_start_keeps_position() {
        let registry = DownloadRegistry::new();
        registry.put(sample_download("a", 2)).await.unwrap();
        registry.put(sample_download("b", 2)).await.unwrap();
        registry.put(sample_download("a", 5)).await.unwrap();

        let list = registry.list().await;
        let ids: Vec<&str> = list.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(list[0].declared, 5);
    }

    #[tokio::test]
    async fn test_replace_after_start_is_rejected() {
        let registry = DownloadRegistry::new();
        let tracked = registry.put(sample_download("42", 2)).await.unwrap();
        assert!(tracked.mark_started().await);
        assert!(!tracked.mark_started().await);

        let err = registry.put(sample_download("42", 2)).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyAcquiring(id) if id == "42"));
    }

    #[tokio::test]
    async fn test_put_started_blocks_concurrent_replace() {
        let registry = Arc::new(DownloadRegistry::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.put_started(sample_download("42", 2)).await
            }));
        }
        let mut claimed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(tracked) => {
                    claimed += 1;
                    assert!(tracked.snapshot().await.started);
                }
                Err(e) => assert!(matches!(e, Error::AlreadyAcquiring(_))),
            }
        }
        assert_eq!(claimed, 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_shared_folder_name_gets_id_suffix() {
        let registry = DownloadRegistry::new();
        registry.put(sample_download("1", 1)).await.unwrap();
        let second = registry.put(sample_download("2", 1)).await.unwrap();
        // replacing an entry does not collide with itself
        let first = registry.put(sample_download("1", 1)).await.unwrap();

        assert_eq!(first.download().folder_name, "Bob Smith - Groovy Tunes");
        assert_eq!(second.download().folder_name, "Bob Smith - Groovy Tunes [2]");
    }

    #[tokio::test]
    async fn test_list_is_insertion_ordered() {
        let registry = DownloadRegistry::new();
        for id in ["9", "1", "5", "3"] {
            registry.put(sample_download(id, 1)).await.unwrap();
        }
        let ids: Vec<String> = registry
            .list()
            .await
            .into_iter()
            .map(|s| s.id.to_string())
            .collect();
        assert_eq!(ids, vec!["9", "1", "5", "3"]);
    }

    #[tokio::test]
    async fn test_progress_lifecycle() {
        let registry = DownloadRegistry::new();
        let tracked = registry.put(sample_download("42", 2)).await.unwrap();

        let snapshot = tracked.snapshot().await;
        assert_eq!(snapshot.lifecycle(), Lifecycle::Queued);
        assert!(snapshot.in_queue());

        tracked.mark_started().await;
        assert_eq!(tracked.complete_track(0).await, Some(1));
        // same track twice does not advance the counter
        assert_eq!(tracked.complete_track(0).await, None);
        assert_eq!(tracked.complete_track(7).await, None);

        let snapshot = tracked.snapshot().await;
        assert_eq!(snapshot.lifecycle(), Lifecycle::Acquiring);
        assert_eq!(snapshot.percentage(), 50);
        assert_eq!(snapshot.remaining_tracks(), 1);

        assert_eq!(tracked.complete_track(1).await, Some(2));
        let snapshot = tracked.snapshot().await;
        assert_eq!(snapshot.lifecycle(), Lifecycle::Done);
        assert!(!snapshot.in_queue());
        assert!(snapshot.in_history());
        assert_eq!(snapshot.percentage(), 100);
    }

    #[tokio::test]
    async fn test_error_stalls_without_leaving_queue() {
        let registry = DownloadRegistry::new();
        let tracked = registry.put(sample_download("42", 5)).await.unwrap();
        tracked.mark_started().await;
        tracked.complete_track(0).await;
        tracked.complete_track(1).await;
        tracked.record_error("track 3 failed").await;

        let snapshot = tracked.snapshot().await;
        assert_eq!(snapshot.lifecycle(), Lifecycle::Stalled);
        assert_eq!(snapshot.completed, 2);
        assert!(snapshot.in_queue());
        assert!(!snapshot.in_history());
    }

    #[tokio::test]
    async fn test_mark_failed_sets_sentinel() {
        let registry = DownloadRegistry::new();
        let tracked = registry.put(sample_download("42", 2)).await.unwrap();
        tracked.complete_track(0).await;

        assert!(registry.mark_failed(&JobId::new("42")).await);
        assert!(!registry.mark_failed(&JobId::new("nope")).await);

        let snapshot = tracked.snapshot().await;
        assert_eq!(snapshot.completed, FAILED_SENTINEL);
        assert_eq!(snapshot.lifecycle(), Lifecycle::Failed);
        assert!(snapshot.in_history());
        assert_eq!(snapshot.percentage(), 0);

        // sentinel never advances
        assert_eq!(tracked.complete_track(1).await, None);
        assert_eq!(tracked.snapshot().await.completed, FAILED_SENTINEL);
    }

    #[tokio::test]
    async fn test_delete() {
        let registry = DownloadRegistry::new();
        registry.put(sample_download("42", 1)).await.unwrap();

        assert!(registry.delete(&JobId::new("42")).await.is_some());
        assert!(registry.delete(&JobId::new("42")).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_counter_bounds_hold_under_concurrency() {
        let registry = Arc::new(DownloadRegistry::new());
        let tracked = registry.put(sample_download("42", 20)).await.unwrap();

        let mut handles = Vec::new();
        for index in 0..40 {
            let tracked = tracked.clone();
            handles.push(tokio::spawn(async move {
                tracked.complete_track(index % 20).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = tracked.snapshot().await;
        assert_eq!(snapshot.completed, 20);
        for index in 0..20 {
            assert!(tracked.is_track_done(index).await);
        }
    }
}
