//! Download-client (SABnzbd) API handler

use super::acknowledge_unhandled;
use crate::api::nzb::{NzbDescriptor, alphanumeric, parse_fake_nzb};
use crate::api::sabnzbd::{
    AddRejected, AddResponse, ConfigResponse, History, HistoryResponse, HistorySlot, Queue,
    QueueResponse, QueueSlot, SABNZBD_VERSION, SabParams, VersionResponse,
};
use crate::api::state::AppState;
use crate::error::{Error, Result};
use crate::types::JobId;
use crate::utils::strip_nzb_extension;
use axum::{
    Json,
    extract::{FromRequest, Multipart, Query, Request, State},
    response::{IntoResponse, Response},
};

/// `GET|POST /api`, dispatching on `mode`
pub async fn sabnzbd_api(
    State(state): State<AppState>,
    Query(params): Query<SabParams>,
    request: Request,
) -> Response {
    match params.mode.as_deref() {
        Some("get_config") => Json(ConfigResponse::from_config(&state.config)).into_response(),
        Some("version") => Json(VersionResponse {
            version: SABNZBD_VERSION.to_string(),
        })
        .into_response(),
        Some("addurl") => add_url(&state, &params).await,
        Some("addfile") => add_file(&state, request)
            .await
            .unwrap_or_else(IntoResponse::into_response),
        Some("queue") => queue(&state).await,
        Some("history") => history(&state, &params).await,
        other => acknowledge_unhandled("sabnzbd", other, request).await,
    }
}

/// Recover display name, album id and track count from a fake-NZB link
///
/// The link may be absolute or relative; only its query string is read.
pub(crate) fn parse_nzb_link(link: &str) -> Option<(String, NzbDescriptor)> {
    let query = link.split_once('?').map(|(_, q)| q).unwrap_or(link);

    let mut name = String::new();
    let mut id = String::new();
    let mut tracks = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "name" => name = value.into_owned(),
            "tidalid" => id = alphanumeric(&value),
            "numtracks" => tracks = value.trim().parse().ok(),
            _ => {}
        }
    }

    if id.is_empty() {
        return None;
    }
    Some((name, NzbDescriptor { id, tracks }))
}

async fn add_url(state: &AppState, params: &SabParams) -> Response {
    let link = params.name.as_deref().unwrap_or_default();
    let Some((name, descriptor)) = parse_nzb_link(link) else {
        tracing::warn!(link, "addurl without an album id");
        return reject("no album id in link");
    };
    submit(state, descriptor, &name).await
}

async fn add_file(state: &AppState, request: Request) -> Result<Response> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| Error::InvalidPayload(format!("expected a multipart upload: {}", e)))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidPayload(format!("unreadable upload: {}", e)))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content = field
            .text()
            .await
            .map_err(|e| Error::InvalidPayload(format!("unreadable NZB {}: {}", file_name, e)))?;

        let Some(descriptor) = parse_fake_nzb(&content) else {
            tracing::warn!(file_name = %file_name, "Uploaded NZB carries no album id");
            return Ok(reject("no album id in NZB"));
        };
        return Ok(submit(state, descriptor, strip_nzb_extension(&file_name)).await);
    }

    Err(Error::InvalidPayload("no NZB file in upload".to_string()))
}

/// Resolve and start a download; the reply acknowledges the job even if resolving failed
async fn submit(state: &AppState, descriptor: NzbDescriptor, display_name: &str) -> Response {
    let id = JobId::new(descriptor.id);
    if let Err(e) = state
        .downloader
        .add_job(id.clone(), display_name, descriptor.tracks)
        .await
    {
        tracing::error!(download_id = %id, error = %e, "Failed to add download");
    }
    Json(AddResponse::for_job(&id)).into_response()
}

fn reject(message: &str) -> Response {
    Json(AddRejected {
        status: false,
        error: message.to_string(),
    })
    .into_response()
}

async fn queue(state: &AppState) -> Response {
    let slots = state
        .downloader
        .queue()
        .await
        .iter()
        .enumerate()
        .map(|(index, snapshot)| QueueSlot::from_snapshot(index, snapshot, &state.config))
        .collect();

    Json(QueueResponse {
        queue: Queue {
            paused: false,
            slots,
        },
    })
    .into_response()
}

async fn history(state: &AppState, params: &SabParams) -> Response {
    if params.name.as_deref() == Some("delete") {
        let ids = params.delete_ids();
        let removed = state
            .downloader
            .delete_history(&ids, params.delete_files())
            .await;
        tracing::info!(
            requested = ids.len(),
            removed,
            delete_files = params.delete_files(),
            "History delete"
        );
    }

    let mut slots = Vec::new();
    for snapshot in state.downloader.history().await {
        slots.push(HistorySlot::from_snapshot(&snapshot, &state.config).await);
    }

    Json(HistoryResponse {
        history: History { slots },
    })
    .into_response()
}
