use super::*;
use crate::downloader::test_helpers::{
    ScriptedFetcher, StaticCatalog, create_test_downloader, seed_album, wait_for_outcome,
};
use crate::types::JobId;
use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use std::time::Duration;
use tower::ServiceExt;


const KEY: &str = "test-key";

/// Router over a downloader built from the given catalog and fetcher
async fn create_test_app(
    catalog: Arc<StaticCatalog>,
    fetcher: Arc<ScriptedFetcher>,
) -> (Router, Arc<CatalogDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) = create_test_downloader(catalog, fetcher).await;
    let downloader = Arc::new(downloader);
    let app = create_router(downloader.clone(), downloader.get_config());
    (app, downloader, temp_dir)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn get_json(app: &Router, uri: &str) -> serde_json::Value {
    let (status, body) = get(app, uri).await;
    assert_eq!(status, StatusCode::OK, "unexpected status for {uri}: {body}");
    serde_json::from_str(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (downloader, _temp_dir) = create_test_downloader(
        Arc::new(StaticCatalog::default()),
        Arc::new(ScriptedFetcher::default()),
    )
    .await;
    let downloader = Arc::new(downloader);

    let mut config = (*downloader.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let config = Arc::new(config);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let api_handle = tokio::spawn(serve_until(downloader, config, async move {
        stop_rx.await.ok();
    }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    stop_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), api_handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let (downloader, _temp_dir) = create_test_downloader(
        Arc::new(StaticCatalog::default()),
        Arc::new(ScriptedFetcher::default()),
    )
    .await;
    let downloader = Arc::new(downloader);

    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(downloader, Arc::new(config));

    let request = Request::get(format!("/api?mode=version&apikey={KEY}"))
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_aliases_reach_the_same_handlers() {
    let (app, _downloader, _temp_dir) = create_test_app(
        Arc::new(StaticCatalog::default()),
        Arc::new(ScriptedFetcher::default()),
    )
    .await;

    for uri in ["/api", "/downloader/api"] {
        let json = get_json(&app, &format!("{uri}?mode=version&apikey={KEY}")).await;
        assert_eq!(json["version"], "4.5.1");
    }
    for uri in ["/indexer", "/indexer/api"] {
        let (_, body) = get(&app, &format!("{uri}?t=caps&apikey={KEY}")).await;
        assert!(body.contains("<caps>"));
    }
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let (app, _downloader, _temp_dir) = create_test_app(
        Arc::new(StaticCatalog::default()),
        Arc::new(ScriptedFetcher::default()),
    )
    .await;

    let (status, _) = get(&app, &format!("/health?apikey={KEY}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
