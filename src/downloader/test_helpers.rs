//! Shared test helpers: an in-memory catalog, a scripted fetcher and downloader setup.

use crate::catalog::CatalogClient;
use crate::config::{Config, Quality};
use crate::downloader::CatalogDownloader;
use crate::error::{CatalogError, Error, Result};
use crate::fetcher::TrackFetcher;
use crate::types::{Download, Event, JobId, StreamLocation, Track};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;

/// Catalog answering from a fixed map keyed by path and the first query value
#[derive(Default)]
pub(crate) struct StaticCatalog {
    responses: Mutex<HashMap<(String, String), serde_json::Value>>,
    calls: AtomicUsize,
}

impl StaticCatalog {
    pub(crate) fn insert(&self, path: &str, key: &str, value: serde_json::Value) {
        self.responses
            .lock()
            .unwrap()
            .insert((path.to_string(), key.to_string()), value);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogClient for StaticCatalog {
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = query.first().map(|(_, v)| *v).unwrap_or_default();
        self.responses
            .lock()
            .unwrap()
            .get(&(path.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| {
                CatalogError::Status {
                    path: path.to_string(),
                    status: 404,
                }
                .into()
            })
    }
}

fn json_id(id: &str) -> serde_json::Value {
    id.parse::<u64>()
        .map(serde_json::Value::from)
        .unwrap_or_else(|_| serde_json::Value::from(id))
}

/// Album detail payload. Tracks are `(id, title, track number, volume number)`.
pub(crate) fn album_detail_json(
    artist: &str,
    album: &str,
    cover: &str,
    tracks: &[(&str, &str, u32, u32)],
) -> serde_json::Value {
    let items: Vec<serde_json::Value> = tracks
        .iter()
        .map(|(id, title, number, volume)| {
            serde_json::json!({
                "type": "track",
                "item": {
                    "id": json_id(id),
                    "title": title,
                    "trackNumber": number,
                    "volumeNumber": volume,
                    "isrc": format!("ISRC{id}"),
                    "copyright": "(P) Groovy Records",
                    "artist": {"name": artist},
                    "album": {"title": album, "cover": cover},
                }
            })
        })
        .collect();
    serde_json::json!({"data": {"items": items}})
}

/// Stream payload whose manifest points at one direct URL
pub(crate) fn direct_track_json(url: &str) -> serde_json::Value {
    let manifest = serde_json::json!({"mimeType": "audio/flac", "urls": [url]}).to_string();
    serde_json::json!({"data": {"manifest": BASE64.encode(manifest)}})
}

/// Search payload. Albums are `(id, artist, title, release date, tracks, duration)`.
pub(crate) fn search_json(albums: &[(&str, &str, &str, &str, u32, u64)]) -> serde_json::Value {
    let items: Vec<serde_json::Value> = albums
        .iter()
        .map(|(id, artist, title, date, tracks, duration)| {
            serde_json::json!({
                "id": json_id(id),
                "title": title,
                "version": null,
                "releaseDate": date,
                "copyright": "(P) Groovy Records",
                "numberOfTracks": tracks,
                "duration": duration,
                "artists": [{"name": artist}],
            })
        })
        .collect();
    serde_json::json!({"data": {"albums": {"items": items}}})
}

/// Register an album with `tracks` direct-stream tracks in the catalog
pub(crate) fn seed_album(catalog: &StaticCatalog, id: &str, tracks: u32) {
    let ids: Vec<String> = (1..=tracks).map(|n| format!("{id}{n:02}")).collect();
    let titles: Vec<String> = (1..=tracks).map(|n| format!("Song {n}")).collect();
    let rows: Vec<(&str, &str, u32, u32)> = ids
        .iter()
        .zip(&titles)
        .enumerate()
        .map(|(i, (track_id, title))| (track_id.as_str(), title.as_str(), i as u32 + 1, 1))
        .collect();

    catalog.insert(
        "/album/",
        id,
        album_detail_json("Bob Smith", "Groovy Tunes", "ab-cd", &rows),
    );
    for (n, track_id) in ids.iter().enumerate() {
        catalog.insert(
            "/track/",
            track_id,
            direct_track_json(&format!("https://media.example/{id}/{}.flac", n + 1)),
        );
    }
}

/// A resolved download with `tracks` direct-stream tracks
pub(crate) fn sample_download(id: &str, tracks: u32) -> Download {
    Download {
        id: JobId::new(id),
        artist: "Bob Smith".to_string(),
        album: "Groovy Tunes".to_string(),
        comment: format!("http://www.tidal.com/album/{id}"),
        cover_url: "https://images.example/ab/cd/1280x1280.jpg".to_string(),
        disc_count: 1,
        label: "(P) Groovy Records".to_string(),
        tracks: (1..=tracks)
            .map(|n| Track {
                id: format!("{id}{n:02}"),
                title: format!("Song {n}"),
                position: n,
                disc: 1,
                isrc: format!("ISRC{n}"),
                lyrics: None,
                stream: StreamLocation::Direct(format!("https://media.example/{id}/{n}.flac")),
            })
            .collect(),
        folder_name: "Bob Smith - Groovy Tunes".to_string(),
        quality: Quality::Lossless,
        has_lyrics: false,
    }
}

/// Fetcher that writes fixed bytes and fails for URLs containing a marker
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    fail_on: Option<String>,
    requested: Mutex<Vec<String>>,
    gate: Option<Arc<tokio::sync::Semaphore>>,
}

impl ScriptedFetcher {
    pub(crate) fn failing_on(marker: &str) -> Self {
        Self {
            fail_on: Some(marker.to_string()),
            ..Default::default()
        }
    }

    /// Every track transfer waits for one permit from `gate`
    pub(crate) fn gated(gate: Arc<tokio::sync::Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Default::default()
        }
    }

    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackFetcher for ScriptedFetcher {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        self.requested.lock().unwrap().push(url.to_string());

        if let Some(gate) = &self.gate
            && !url.ends_with(".jpg")
        {
            gate.acquire().await.unwrap().forget();
        }

        if let Some(marker) = &self.fail_on
            && url.contains(marker.as_str())
        {
            return Err(Error::Other(format!("{} returned HTTP 500", url)));
        }

        let body = b"not really audio";
        tokio::fs::write(dest, body).await?;
        Ok(body.len() as u64)
    }

    async fn transcode(&self, manifest: &str, dest: &Path) -> Result<()> {
        self.requested.lock().unwrap().push(format!("manifest:{manifest}"));
        tokio::fs::write(dest, b"hi-res").await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Config rooted in a temp directory
pub(crate) fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.download.download_dir = root.join("downloads");
    config.server.api.api_key = "test-key".to_string();
    config
}

/// Create a downloader over the given catalog and fetcher.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader(
    catalog: Arc<dyn CatalogClient>,
    fetcher: Arc<dyn TrackFetcher>,
) -> (CatalogDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let downloader = CatalogDownloader::with_components(config, catalog, fetcher);
    (downloader, temp_dir)
}

/// Wait for the run of `id` to end, returning the terminal event
pub(crate) async fn wait_for_outcome(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    id: &str,
) -> Event {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await.unwrap() {
                event @ (Event::Completed { .. } | Event::Stalled { .. } | Event::Failed { .. })
                    if event_id(&event) == Some(id) =>
                {
                    return event;
                }
                _ => continue,
            }
        }
    })
    .await
    .expect("acquisition did not finish in time")
}

fn event_id(event: &Event) -> Option<&str> {
    match event {
        Event::Completed { id, .. } | Event::Stalled { id, .. } | Event::Failed { id, .. } => {
            Some(id.as_str())
        }
        _ => None,
    }
}
