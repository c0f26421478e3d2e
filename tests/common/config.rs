//! Test configuration helpers for creating downloaders against the mock catalog

use super::MockCatalog;
use axum::Router;
use std::sync::Arc;
use tempfile::TempDir;
use tidlarr::{CatalogDownloader, Config};

/// Key every test request carries
pub const API_KEY: &str = "integration-key";

/// Public URL advertised in enclosure links
pub const PUBLIC_URL: &str = "http://tidlarr.test:8688";

/// Configuration pointing at the mock catalog, rooted in `temp_dir`
pub fn test_config(catalog: &MockCatalog, temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.catalog.base_url = catalog.uri();
    config.catalog.cover_url_template = catalog.cover_template();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.server.api.api_key = API_KEY.to_string();
    config.server.api.public_url = Some(PUBLIC_URL.to_string());
    config.validate().unwrap();
    config
}

/// Real downloader (HTTP catalog client, HTTP fetcher) plus the router serving it
pub async fn create_test_app(catalog: &MockCatalog) -> (Router, Arc<CatalogDownloader>, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = test_config(catalog, &temp_dir);
    let downloader = Arc::new(CatalogDownloader::new(config).await.unwrap());
    let app = tidlarr::api::create_router(downloader.clone(), downloader.get_config());
    (app, downloader, temp_dir)
}
