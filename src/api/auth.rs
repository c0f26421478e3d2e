//! Authentication middleware for both protocol surfaces
//!
//! Download clients and indexer managers pass the shared key as the `apikey` query
//! parameter. A mismatch is answered in the dialect of the protocol that was called and
//! never reaches a handler.

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::newznab::error_xml;

/// Body SABnzbd returns for a wrong key
pub const SABNZBD_AUTH_ERROR: &str = "error: API Key Incorrect";

/// Read the `apikey` query parameter of a request
pub fn query_api_key(request: &Request) -> Option<String> {
    let query = request.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "apikey")
        .map(|(_, value)| value.into_owned())
}

fn key_matches(request: &Request, expected: &str) -> bool {
    query_api_key(request)
        .is_some_and(|provided| constant_time_eq(provided.as_bytes(), expected.as_bytes()))
}

/// Gate for the SABnzbd surface
///
/// SABnzbd reports a bad key with a 200 and a plain-text body, clients match on the text.
pub async fn require_sabnzbd_key(
    State(expected_api_key): State<String>,
    request: Request,
    next: Next,
) -> Response {
    if key_matches(&request, &expected_api_key) {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), "Rejected download-client request with wrong API key");
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        SABNZBD_AUTH_ERROR,
    )
        .into_response()
}

/// Gate for the Newznab surface
pub async fn require_newznab_key(
    State(expected_api_key): State<String>,
    request: Request,
    next: Next,
) -> Response {
    if key_matches(&request, &expected_api_key) {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), "Rejected indexer request with wrong API key");
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        error_xml(100, "Incorrect user credentials"),
    )
        .into_response()
}

/// Constant-time byte comparison to prevent timing side-channel attacks.
/// Always compares all bytes regardless of where the first mismatch occurs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
