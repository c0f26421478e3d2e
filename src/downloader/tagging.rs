//! In-place tag writing for acquired tracks.

use crate::types::{Download, Track};
use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::read_from_path;
use lofty::tag::{ItemKey, Tag};
use std::path::{Path, PathBuf};

/// Tag values for one track, copied out of the aggregate so the blocking writer owns them
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TrackTags {
    pub(crate) album_artist: String,
    pub(crate) artist: String,
    pub(crate) album: String,
    pub(crate) track_number: u32,
    pub(crate) title: String,
    pub(crate) comment: String,
    pub(crate) disc_number: u32,
    pub(crate) label: String,
    pub(crate) isrc: String,
    pub(crate) lyrics: Option<String>,
}

impl TrackTags {
    pub(crate) fn new(download: &Download, track: &Track) -> Self {
        Self {
            album_artist: download.artist.clone(),
            artist: download.artist.clone(),
            album: download.album.clone(),
            track_number: track.position,
            title: track.title.clone(),
            comment: download.comment.clone(),
            disc_number: track.disc,
            label: download.label.clone(),
            isrc: track.isrc.clone(),
            lyrics: track.lyrics.clone(),
        }
    }

    fn items(&self) -> Vec<(ItemKey, String)> {
        let mut items = vec![
            (ItemKey::AlbumArtist, self.album_artist.clone()),
            (ItemKey::TrackArtist, self.artist.clone()),
            (ItemKey::AlbumTitle, self.album.clone()),
            (ItemKey::TrackNumber, self.track_number.to_string()),
            (ItemKey::TrackTitle, self.title.clone()),
            (ItemKey::Comment, self.comment.clone()),
            (ItemKey::DiscNumber, self.disc_number.to_string()),
            (ItemKey::Label, self.label.clone()),
            (ItemKey::Isrc, self.isrc.clone()),
        ];
        if let Some(lyrics) = &self.lyrics {
            items.push((ItemKey::Lyrics, lyrics.clone()));
        }
        items.retain(|(_, value)| !value.is_empty());
        items
    }
}

/// Write `tags` into the file at `path`
///
/// Runs on the blocking pool. Callers treat a failure as non-fatal.
pub(crate) async fn write_tags(path: PathBuf, tags: TrackTags) -> Result<(), String> {
    tokio::task::spawn_blocking(move || write_tags_blocking(&path, &tags))
        .await
        .map_err(|e| format!("tag writer panicked: {e}"))?
}

fn write_tags_blocking(path: &Path, tags: &TrackTags) -> Result<(), String> {
    let mut tagged_file =
        read_from_path(path).map_err(|error| format!("Failed to read tags: {error}"))?;

    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }

    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| "Failed to access primary tag".to_string())?;

    for (key, value) in tags.items() {
        tag.insert_text(key, value);
    }

    tagged_file
        .save_to_path(path, WriteOptions::default())
        .map_err(|error| format!("Failed to write tags: {error}"))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::test_helpers::sample_download;
    use tempfile::tempdir;

    #[test]
    fn test_tags_copied_from_aggregate() {
        let mut download = sample_download("42", 2);
        download.tracks[1].lyrics = Some("la la".to_string());
        let tags = TrackTags::new(&download, &download.tracks[1]);

        assert_eq!(tags.album_artist, download.artist);
        assert_eq!(tags.track_number, 2);
        assert_eq!(tags.comment, "http://www.tidal.com/album/42");

        let items = tags.items();
        assert!(items.contains(&(ItemKey::Lyrics, "la la".to_string())));
        assert!(items.contains(&(ItemKey::TrackNumber, "2".to_string())));
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let mut download = sample_download("42", 1);
        download.label = String::new();
        download.tracks[0].isrc = String::new();
        let items = TrackTags::new(&download, &download.tracks[0]).items();

        assert!(!items.iter().any(|(key, _)| *key == ItemKey::Label));
        assert!(!items.iter().any(|(key, _)| *key == ItemKey::Isrc));
        assert!(!items.iter().any(|(key, _)| *key == ItemKey::Lyrics));
    }

    #[tokio::test]
    async fn test_non_audio_file_reports_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("01 - not audio.flac");
        std::fs::write(&path, b"definitely not flac").unwrap();

        let download = sample_download("42", 1);
        let result = write_tags(path.clone(), TrackTags::new(&download, &download.tracks[0])).await;

        assert!(result.is_err());
        // the file is left as it was
        assert_eq!(std::fs::read(&path).unwrap(), b"definitely not flac");
    }
}
