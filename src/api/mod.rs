//! HTTP server module
//!
//! Serves the two protocol surfaces on one listener: the SABnzbd download-client API
//! and the Newznab indexer API. Each surface has its own key gate so a bad key is
//! answered in the dialect the caller expects.

use crate::{CatalogDownloader, Config, Result};
use axum::{Router, http::HeaderValue, middleware, routing::get};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod error_response;
pub mod newznab;
pub mod nzb;
pub mod routes;
pub mod sabnzbd;
pub mod state;

pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Download client (SABnzbd)
/// - `GET|POST /api` - `mode` dispatch: get_config, version, addurl, addfile, queue, history
/// - `GET|POST /downloader/api` - alias of `/api`
///
/// ## Indexer (Newznab)
/// - `GET /indexer` - `t` dispatch: caps, search, music, fakenzb
/// - `GET /indexer/api` - alias of `/indexer`
pub fn create_router(downloader: Arc<CatalogDownloader>, config: Arc<Config>) -> Router {
    let state = AppState::new(downloader, config.clone());
    let api_key = config.server.api.api_key.clone();

    let sabnzbd = Router::new()
        .route(
            "/api",
            get(routes::sabnzbd_api).post(routes::sabnzbd_api),
        )
        .route(
            "/downloader/api",
            get(routes::sabnzbd_api).post(routes::sabnzbd_api),
        )
        .route_layer(middleware::from_fn_with_state(
            api_key.clone(),
            auth::require_sabnzbd_key,
        ));

    let newznab = Router::new()
        .route("/indexer", get(routes::newznab_api))
        .route("/indexer/api", get(routes::newznab_api))
        .route_layer(middleware::from_fn_with_state(
            api_key,
            auth::require_newznab_key,
        ));

    let router = sabnzbd
        .merge(newznab)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` or an empty list allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server fails; see [`serve_until`] for a stoppable variant.
///
/// # Example
///
/// ```no_run
/// use tidlarr::{CatalogDownloader, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::from_env()?);
/// let downloader = Arc::new(CatalogDownloader::new((*config).clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// tidlarr::api::start_api_server(downloader, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(
    downloader: Arc<CatalogDownloader>,
    config: Arc<Config>,
) -> Result<()> {
    serve_until(downloader, config, std::future::pending()).await
}

/// Serve the API until `shutdown` resolves, then drain in-flight requests
pub async fn serve_until<F>(
    downloader: Arc<CatalogDownloader>,
    config: Arc<Config>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = config.server.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = create_router(downloader, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
