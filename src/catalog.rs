//! Upstream catalog access
//!
//! The catalog is a plain request/response JSON API. [`CatalogClient`] is the seam the
//! resolver talks to; [`HttpCatalogClient`] is the reqwest-backed implementation.

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Source of catalog JSON documents
///
/// Implementations own base URL, headers and transport details. Callers pass a path
/// (`/album/`, `/track/`, `/search/`) and query pairs.
///
/// # Examples
///
/// ```no_run
/// use tidlarr::catalog::{CatalogClient, HttpCatalogClient};
/// use tidlarr::config::CatalogConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpCatalogClient::new(&CatalogConfig::default())?;
/// let album = client.get_json("/album/", &[("id", "12345")]).await?;
/// println!("{}", album["data"]["items"].as_array().map(|a| a.len()).unwrap_or(0));
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch `path` with the given query parameters and parse the body as JSON
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value>;
}

/// reqwest-backed catalog client
pub struct HttpCatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCatalogClient {
    /// Create a client for the configured base URL and timeout
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| CatalogError::Request {
                path: path.to_string(),
                reason: if e.is_timeout() {
                    "timed out".to_string()
                } else {
                    e.to_string()
                },
            })?;

        if !response.status().is_success() {
            return Err(CatalogError::Status {
                path: path.to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }

        let body = response.bytes().await.map_err(|e| CatalogError::Request {
            path: path.to_string(),
            reason: format!("failed to read body: {}", e),
        })?;

        serde_json::from_slice(&body).map_err(|e| {
            CatalogError::Malformed {
                path: path.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}
