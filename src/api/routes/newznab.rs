//! Indexer (Newznab) API handler

use super::acknowledge_unhandled;
use crate::api::newznab::{
    CAPS_XML, FeedContext, NZB_CONTENT_TYPE, album_item, placeholder_feed, search_feed,
};
use crate::api::nzb::render_fake_nzb;
use crate::api::state::AppState;
use crate::utils::sanitize_filename;
use axum::{
    extract::{Query, Request, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// Query parameters of `/indexer`
#[derive(Debug, Default, Deserialize)]
pub struct NewznabParams {
    t: Option<String>,
    q: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    offset: Option<String>,
    limit: Option<String>,
    name: Option<String>,
    tidalid: Option<String>,
    numtracks: Option<String>,
}

impl NewznabParams {
    /// Search text: `artist album` for music searches that name either, `q` otherwise
    fn query_text(&self) -> String {
        let artist = self.artist.as_deref().unwrap_or_default().trim();
        let album = self.album.as_deref().unwrap_or_default().trim();
        if self.t.as_deref() == Some("music") && !(artist.is_empty() && album.is_empty()) {
            return format!("{} {}", artist, album).trim().to_string();
        }
        self.q.as_deref().unwrap_or_default().trim().to_string()
    }

    fn offset(&self) -> usize {
        self.offset
            .as_deref()
            .and_then(|o| o.trim().parse().ok())
            .unwrap_or(0)
    }

    fn limit(&self) -> Option<usize> {
        self.limit.as_deref().and_then(|l| l.trim().parse().ok())
    }
}

/// `GET /indexer`, dispatching on `t`
pub async fn newznab_api(
    State(state): State<AppState>,
    Query(params): Query<NewznabParams>,
    request: Request,
) -> Response {
    match params.t.as_deref() {
        Some("caps") => xml(CAPS_XML.to_string()),
        Some("search" | "music") => search(&state, &params).await,
        Some("fakenzb") => fake_nzb(&params),
        other => acknowledge_unhandled("newznab", other, request).await,
    }
}

fn xml(body: String) -> Response {
    ([(header::CONTENT_TYPE, XML_CONTENT_TYPE)], body).into_response()
}

async fn search(state: &AppState, params: &NewznabParams) -> Response {
    let text = params.query_text();
    if text.is_empty() {
        tracing::debug!("Blank search, answering with the sample release");
        return xml(placeholder_feed().to_string());
    }

    let albums = match state.downloader.search(&text).await {
        Ok(albums) => albums,
        Err(e) => {
            tracing::warn!(query = %text, error = %e, "Catalog search failed");
            Vec::new()
        }
    };

    let ctx = FeedContext {
        quality: state.config.catalog.quality,
        release_suffix: &state.config.download.release_suffix,
        public_url: state.config.server.api.public_url.as_deref(),
        api_key: &state.config.server.api.api_key,
    };
    let offset = params.offset();
    let items = albums
        .iter()
        .skip(offset)
        .take(params.limit().unwrap_or(usize::MAX))
        .map(|album| album_item(album, &ctx))
        .collect::<Vec<_>>();

    tracing::info!(query = %text, total = albums.len(), returned = items.len(), "Search");
    xml(search_feed(items, offset, albums.len()).to_string())
}

fn fake_nzb(params: &NewznabParams) -> Response {
    let body = render_fake_nzb(
        params.tidalid.as_deref().unwrap_or_default(),
        params.numtracks.as_deref().unwrap_or_default(),
    );
    let mut response = ([(header::CONTENT_TYPE, NZB_CONTENT_TYPE)], body).into_response();

    let name = sanitize_filename(params.name.as_deref().unwrap_or_default());
    if !name.is_empty()
        && let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}.nzb\"", name))
    {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }
    response
}
