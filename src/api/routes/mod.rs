//! Route handlers for the two protocol surfaces

mod newznab;
mod sabnzbd;

pub use newznab::newznab_api;
pub use sabnzbd::sabnzbd_api;

use axum::extract::Request;
use axum::response::{IntoResponse, Response};

/// Generic acknowledgment for requests neither surface understands
pub const ACKNOWLEDGMENT: &str = "Request received!";

/// Upper bound on how much of an unknown request body is read before acknowledging
const DRAIN_LIMIT: usize = 16 * 1024 * 1024;

/// Consume and log a request with an unknown selector, then acknowledge it
pub(crate) async fn acknowledge_unhandled(
    surface: &'static str,
    selector: Option<&str>,
    request: Request,
) -> Response {
    let path = request.uri().path().to_string();
    let method = request.method().clone();
    let body_bytes = match axum::body::to_bytes(request.into_body(), DRAIN_LIMIT).await {
        Ok(body) => body.len(),
        Err(e) => {
            tracing::debug!(error = %e, "Could not drain request body");
            0
        }
    };

    tracing::info!(
        surface,
        selector = selector.unwrap_or_default(),
        %method,
        path = %path,
        body_bytes,
        "Unhandled request"
    );
    ACKNOWLEDGMENT.into_response()
}
