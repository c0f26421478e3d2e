//! Core types for tidlarr

use serde::{Deserialize, Serialize};

use crate::config::Quality;

/// External identifier of a download (the catalog album id)
///
/// Both protocols join on it: the indexer embeds it in the fake-NZB link and the download
/// client reports it back as `SABnzbd_nzo_<id>`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

/// Prefix SABnzbd puts in front of every job id
pub const NZO_PREFIX: &str = "SABnzbd_nzo_";

impl JobId {
    /// Create a new JobId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id as SABnzbd clients see it
    pub fn nzo_id(&self) -> String {
        format!("{}{}", NZO_PREFIX, self.0)
    }

    /// Parse a SABnzbd job id, tolerating a missing prefix
    pub fn from_nzo_id(nzo_id: &str) -> Self {
        let trimmed = nzo_id.trim();
        Self(trimmed.strip_prefix(NZO_PREFIX).unwrap_or(trimmed).to_string())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Album as projected from a catalog search result
///
/// Channel count, sample rate and bit depth are fixed assumptions and `size_bytes` is an
/// estimate (see [`crate::metadata`]); nothing here is measured from audio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Album {
    /// Primary artist name
    pub artist: String,
    /// Album title
    pub title: String,
    /// Edition/version tag ("Deluxe", "Remastered"), empty when absent
    pub edition: String,
    /// Release date as delivered by the catalog (`YYYY-MM-DD`)
    pub release_date: String,
    /// Publisher / label line
    pub publisher: String,
    /// Catalog album id
    pub id: String,
    /// Number of tracks
    pub track_count: u32,
    /// Channel count (assumed)
    pub channels: u32,
    /// Sample rate in kHz (assumed)
    pub sample_rate_khz: u32,
    /// Bit depth (assumed)
    pub bit_depth: u32,
    /// Total duration in seconds
    pub duration_secs: u64,
    /// Estimated size in bytes
    pub size_bytes: u64,
}

/// Where a track's audio comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamLocation {
    /// Plain file URL fetched with one HTTP transfer
    Direct(String),
    /// Base64 stream descriptor that has to go through the transcoder
    Manifest(String),
}

/// One track of a download
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    /// Catalog track id
    pub id: String,
    /// Display name
    pub title: String,
    /// 1-based position within its disc
    pub position: u32,
    /// Disc/volume number
    pub disc: u32,
    /// ISRC code, empty when unknown
    pub isrc: String,
    /// Lyrics text
    pub lyrics: Option<String>,
    /// Resolved stream location
    pub stream: StreamLocation,
}

/// The download aggregate as produced by a successful resolve
///
/// Immutable once built. Progress (completed count, per-track flags) lives in the
/// registry's guarded record, see [`crate::registry::TrackedDownload`].
#[derive(Clone, Debug)]
pub struct Download {
    /// External identifier
    pub id: JobId,
    /// Album artist
    pub artist: String,
    /// Album title
    pub album: String,
    /// Free-text comment written into every track's tags
    pub comment: String,
    /// Cover art URL
    pub cover_url: String,
    /// Highest disc/volume number
    pub disc_count: u32,
    /// Label / copyright line
    pub label: String,
    /// Ordered tracks
    pub tracks: Vec<Track>,
    /// Sanitized folder name used under incomplete/ and complete/
    pub folder_name: String,
    /// Quality the tracks were resolved for
    pub quality: Quality,
    /// Whether any track carries lyrics
    pub has_lyrics: bool,
}

impl Download {
    /// Declared track count (always the number of resolved tracks)
    pub fn declared_tracks(&self) -> usize {
        self.tracks.len()
    }
}

/// Lifecycle state, derived from a download's progress record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// Stored, acquisition not started
    Queued,
    /// Acquisition task running
    Acquiring,
    /// The run stopped on an error; counter frozen, still shown in the queue
    Stalled,
    /// Every track acquired and the folder promoted
    Done,
    /// Failure sentinel set
    Failed,
}

/// Event emitted during a download's lifecycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Download stored in the registry
    Queued {
        /// Download id
        id: JobId,
        /// Folder name
        name: String,
        /// Number of tracks
        tracks: usize,
    },

    /// One more track finished
    TrackCompleted {
        /// Download id
        id: JobId,
        /// Completed count after this track
        completed: usize,
        /// Declared track count
        total: usize,
    },

    /// All tracks acquired and folder promoted
    Completed {
        /// Download id
        id: JobId,
        /// Final folder path
        path: std::path::PathBuf,
    },

    /// Acquisition stopped with an error; the download stays in the queue
    Stalled {
        /// Download id
        id: JobId,
        /// Error description
        error: String,
    },

    /// Failure sentinel set
    Failed {
        /// Download id
        id: JobId,
        /// Error description
        error: String,
    },

    /// Removed from the registry by a history delete
    Removed {
        /// Download id
        id: JobId,
    },
}
