//! Metadata resolution: catalog search projection and album resolve
//!
//! Size and format figures in search results follow a fixed estimation policy instead of
//! probing audio. Per-track probing would cost one extra catalog call per track, so the
//! following are assumed for every album:
//!
//! - stereo ([`ASSUMED_CHANNELS`]), 44 kHz ([`ASSUMED_SAMPLE_RATE_KHZ`]), 16 bit
//!   ([`ASSUMED_BIT_DEPTH`])
//! - compressed quality: `320 kbit/s * duration / 8`
//! - lossless qualities: PCM-equivalent size scaled by [`LOSSLESS_SIZE_RATIO`]

use crate::catalog::CatalogClient;
use crate::config::Quality;
use crate::error::{CatalogError, Result};
use crate::types::{Album, Download, JobId, StreamLocation, Track};
use crate::utils::{is_dots_only, sanitize_filename};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

/// Assumed channel count for search results
pub const ASSUMED_CHANNELS: u32 = 2;
/// Assumed sample rate (kHz) for search results
pub const ASSUMED_SAMPLE_RATE_KHZ: u32 = 44;
/// Assumed bit depth for search results
pub const ASSUMED_BIT_DEPTH: u32 = 16;
/// Bitrate used to estimate compressed album sizes
pub const COMPRESSED_BITRATE_BPS: u64 = 320_000;
/// FLAC-over-PCM ratio used to estimate lossless album sizes
pub const LOSSLESS_SIZE_RATIO: f64 = 0.7;

/// Base of the public album page, used for permalinks and the tag comment
pub const ALBUM_PERMALINK_BASE: &str = "http://www.tidal.com/album/";

const SEARCH_PATH: &str = "/search/";
const ALBUM_PATH: &str = "/album/";
const TRACK_PATH: &str = "/track/";

/// Estimated album size in bytes for the given duration and quality
pub fn estimate_size(duration_secs: u64, quality: Quality) -> u64 {
    if quality.is_lossless() {
        let pcm_bytes = (ASSUMED_SAMPLE_RATE_KHZ as u64 * 1000)
            * (ASSUMED_BIT_DEPTH as u64 * ASSUMED_CHANNELS as u64 * duration_secs)
            / 8;
        (pcm_bytes as f64 * LOSSLESS_SIZE_RATIO) as u64
    } else {
        COMPRESSED_BITRATE_BPS * duration_secs / 8
    }
}

/// Turns catalog payloads into [`Album`] projections and [`Download`] aggregates
pub struct MetadataResolver {
    catalog: Arc<dyn CatalogClient>,
    quality: Quality,
    cover_url_template: String,
}

impl MetadataResolver {
    /// Create a resolver for the given catalog and quality
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        quality: Quality,
        cover_url_template: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            quality,
            cover_url_template: cover_url_template.into(),
        }
    }

    /// Quality this resolver requests
    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Run one catalog search and project every hit into an [`Album`]
    pub async fn search(&self, text: &str) -> Result<Vec<Album>> {
        let json = self.catalog.get_json(SEARCH_PATH, &[("al", text)]).await?;
        let response: SearchResponse = parse(SEARCH_PATH, json)?;

        Ok(response
            .data
            .albums
            .items
            .into_iter()
            .map(|raw| self.project_album(raw))
            .collect())
    }

    fn project_album(&self, raw: RawSearchAlbum) -> Album {
        let duration_secs = raw.duration;
        Album {
            artist: raw
                .artists
                .into_iter()
                .next()
                .map(|a| a.name)
                .unwrap_or_default(),
            title: raw.title,
            edition: raw.version.unwrap_or_default(),
            release_date: raw.release_date.unwrap_or_default(),
            publisher: raw.copyright.unwrap_or_default(),
            id: raw.id,
            track_count: raw.number_of_tracks,
            channels: ASSUMED_CHANNELS,
            sample_rate_khz: ASSUMED_SAMPLE_RATE_KHZ,
            bit_depth: ASSUMED_BIT_DEPTH,
            duration_secs,
            size_bytes: estimate_size(duration_secs, self.quality),
        }
    }

    /// Resolve an album id into a complete [`Download`]
    ///
    /// Issues one album-detail call plus one stream call per track. Any failure aborts
    /// the whole resolve; a partially populated aggregate is never returned.
    ///
    /// `display_name` becomes the folder name after sanitizing; when blank or made only of
    /// dots the folder is named `<artist> - <album>`.
    pub async fn resolve(&self, id: &JobId, display_name: &str) -> Result<Download> {
        let json = self
            .catalog
            .get_json(ALBUM_PATH, &[("id", id.as_str())])
            .await?;
        let detail: AlbumDetailResponse = parse(ALBUM_PATH, json)?;

        let items: Vec<RawTrack> = detail.data.items.into_iter().map(|i| i.item).collect();
        let Some(first) = items.first() else {
            return Err(CatalogError::EmptyAlbum { id: id.to_string() }.into());
        };

        let artist = first.artist.as_ref().map(|a| a.name.clone()).unwrap_or_default();
        let album_ref = first.album.clone().unwrap_or_default();
        let label = first.copyright.clone().unwrap_or_default();

        let cover = album_ref
            .cover
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| CatalogError::Malformed {
                path: ALBUM_PATH.to_string(),
                reason: format!("album {} has no cover", id),
            })?;
        let cover_url = self.cover_url(&cover);

        let disc_count = items.iter().map(|t| t.volume_number).max().unwrap_or(1).max(1);

        let folder_name = if is_dots_only(display_name) {
            sanitize_filename(&format!("{} - {}", artist, album_ref.title))
        } else {
            sanitize_filename(display_name.trim())
        };

        let mut tracks = Vec::with_capacity(items.len());
        for raw in items {
            let stream = self.resolve_stream(&raw.id).await?;
            tracks.push(Track {
                id: raw.id,
                title: raw.title,
                position: raw.track_number,
                disc: raw.volume_number.max(1),
                isrc: raw.isrc.unwrap_or_default(),
                lyrics: raw.lyrics.filter(|l| !l.trim().is_empty()),
                stream,
            });
        }

        tracing::debug!(
            download_id = %id,
            artist = %artist,
            album = %album_ref.title,
            tracks = tracks.len(),
            "resolved album"
        );

        Ok(Download {
            id: id.clone(),
            has_lyrics: tracks.iter().any(|t| t.lyrics.is_some()),
            comment: format!("{}{}", ALBUM_PERMALINK_BASE, id),
            artist,
            album: album_ref.title,
            cover_url,
            disc_count,
            label,
            tracks,
            folder_name,
            quality: self.quality,
        })
    }

    /// Cover path tokens come dash-separated; the image CDN wants them as path segments
    fn cover_url(&self, cover: &str) -> String {
        self.cover_url_template
            .replace("{cover}", &cover.replace('-', "/"))
    }

    async fn resolve_stream(&self, track_id: &str) -> Result<StreamLocation> {
        let json = self
            .catalog
            .get_json(
                TRACK_PATH,
                &[("id", track_id), ("quality", self.quality.catalog_id())],
            )
            .await?;
        let playback: PlaybackResponse = parse(TRACK_PATH, json)?;

        let manifest = playback
            .data
            .manifest
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| CatalogError::Manifest {
                track_id: track_id.to_string(),
                reason: "missing manifest".to_string(),
            })?;

        stream_location(track_id, manifest, self.quality).map_err(Into::into)
    }
}

/// Interpret a track manifest for the requested quality
///
/// Hi-res manifests are stream descriptors and are handed to the transcoder untouched.
/// Every other quality carries base64 JSON with a `urls` list; the first URL wins.
pub fn stream_location(
    track_id: &str,
    manifest: String,
    quality: Quality,
) -> std::result::Result<StreamLocation, CatalogError> {
    if quality.needs_transcode() {
        return Ok(StreamLocation::Manifest(manifest));
    }

    let bad = |reason: String| CatalogError::Manifest {
        track_id: track_id.to_string(),
        reason,
    };

    let decoded = BASE64
        .decode(manifest.trim())
        .map_err(|e| bad(format!("manifest is not base64: {}", e)))?;
    let manifest: DirectManifest = serde_json::from_slice(&decoded)
        .map_err(|e| bad(format!("manifest is not JSON: {}", e)))?;

    manifest
        .urls
        .into_iter()
        .find(|u| !u.trim().is_empty())
        .map(StreamLocation::Direct)
        .ok_or_else(|| bad("manifest lists no URLs".to_string()))
}

fn parse<T: for<'de> Deserialize<'de>>(path: &str, json: serde_json::Value) -> Result<T> {
    serde_json::from_value(json).map_err(|e| {
        CatalogError::Malformed {
            path: path.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Catalog ids arrive as numbers or strings depending on the endpoint
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Text(s)) => s,
        Some(Id::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: SearchData,
}

#[derive(Debug, Default, Deserialize)]
struct SearchData {
    #[serde(default)]
    albums: SearchAlbums,
}

#[derive(Debug, Default, Deserialize)]
struct SearchAlbums {
    #[serde(default)]
    items: Vec<RawSearchAlbum>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawSearchAlbum {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    title: String,
    version: Option<String>,
    release_date: Option<String>,
    copyright: Option<String>,
    number_of_tracks: u32,
    duration: u64,
    artists: Vec<RawArtist>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawArtist {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct AlbumDetailResponse {
    #[serde(default)]
    data: AlbumDetailData,
}

#[derive(Debug, Default, Deserialize)]
struct AlbumDetailData {
    #[serde(default)]
    items: Vec<AlbumDetailItem>,
}

#[derive(Debug, Deserialize)]
struct AlbumDetailItem {
    item: RawTrack,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawTrack {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    title: String,
    track_number: u32,
    volume_number: u32,
    isrc: Option<String>,
    copyright: Option<String>,
    lyrics: Option<String>,
    artist: Option<RawArtist>,
    album: Option<RawAlbumRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawAlbumRef {
    title: String,
    cover: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PlaybackResponse {
    #[serde(default)]
    data: PlaybackData,
}

#[derive(Debug, Default, Deserialize)]
struct PlaybackData {
    manifest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DirectManifest {
    #[serde(default)]
    urls: Vec<String>,
}
