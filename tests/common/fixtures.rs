//! Mock catalog and media host built on wiremock

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Bytes served for every track file
pub const TRACK_BYTES: &[u8] = b"placeholder track payload";

/// Bytes served for every cover image
pub const COVER_BYTES: &[u8] = b"\xff\xd8\xff-cover";

/// One wiremock server acting as catalog, image CDN and media host
pub struct MockCatalog {
    pub server: MockServer,
}

impl MockCatalog {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Cover template pointing at this server
    pub fn cover_template(&self) -> String {
        format!("{}/images/{{cover}}/1280x1280.jpg", self.uri())
    }

    /// Register a search answer. Albums are `(id, title, track count)` by "Bob Smith".
    pub async fn search(&self, text: &str, albums: &[(&str, &str, u32)]) {
        let items: Vec<serde_json::Value> = albums
            .iter()
            .map(|(id, title, tracks)| {
                json!({
                    "id": id.parse::<u64>().unwrap(),
                    "title": title,
                    "releaseDate": "2011-05-01",
                    "copyright": "(P) Epic Music",
                    "numberOfTracks": tracks,
                    "duration": 240 * tracks,
                    "artists": [{"name": "Bob Smith"}],
                })
            })
            .collect();

        Mock::given(method("GET"))
            .and(path("/search/"))
            .and(query_param("al", text))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"albums": {"items": items}}})),
            )
            .mount(&self.server)
            .await;
    }

    /// Register album detail, per-track streams, media files and the cover for an album
    ///
    /// `media_delay` holds back every track file so a test can observe the queue mid-run.
    pub async fn album(&self, id: &str, title: &str, tracks: u32, media_delay: Duration) {
        let items: Vec<serde_json::Value> = (1..=tracks)
            .map(|n| {
                json!({
                    "type": "track",
                    "item": {
                        "id": format!("{id}{n:02}").parse::<u64>().unwrap(),
                        "title": format!("Song {n}"),
                        "trackNumber": n,
                        "volumeNumber": 1,
                        "isrc": format!("USX{id}{n:02}"),
                        "copyright": "(P) Epic Music",
                        "artist": {"name": "Bob Smith"},
                        "album": {"title": title, "cover": "ab-cd-ef"},
                    }
                })
            })
            .collect();

        Mock::given(method("GET"))
            .and(path("/album/"))
            .and(query_param("id", id))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"items": items}})))
            .mount(&self.server)
            .await;

        for n in 1..=tracks {
            let media_path = format!("/media/{id}/{n}.flac");
            let manifest = json!({
                "mimeType": "audio/flac",
                "urls": [format!("{}{}", self.uri(), media_path)],
            })
            .to_string();

            Mock::given(method("GET"))
                .and(path("/track/"))
                .and(query_param("id", format!("{id}{n:02}")))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({"data": {"manifest": BASE64.encode(manifest)}})),
                )
                .mount(&self.server)
                .await;

            Mock::given(method("GET"))
                .and(path(media_path))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_bytes(TRACK_BYTES)
                        .set_delay(media_delay),
                )
                .mount(&self.server)
                .await;
        }

        Mock::given(method("GET"))
            .and(path("/images/ab/cd/ef/1280x1280.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(COVER_BYTES))
            .mount(&self.server)
            .await;
    }
}
