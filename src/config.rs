//! Configuration types for tidlarr

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf};

/// Requested audio quality
///
/// Drives every quality-dependent decision: the `quality` parameter sent to the catalog,
/// how a track's manifest is interpreted, the acquisition method, the file extension and
/// the release name advertised to the indexer client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Quality {
    /// AAC 320 kbit/s
    High,
    /// FLAC 16 bit / 44.1 kHz (default)
    #[default]
    Lossless,
    /// FLAC up to 24 bit / 192 kHz, delivered as a DASH manifest
    HiResLossless,
}

impl Quality {
    /// Identifier the catalog expects in the `quality` query parameter
    pub fn catalog_id(&self) -> &'static str {
        match self {
            Quality::High => "HIGH",
            Quality::Lossless => "LOSSLESS",
            Quality::HiResLossless => "HI_RES_LOSSLESS",
        }
    }

    /// Whether the audio is lossless (size estimate, release naming, indexer category)
    pub fn is_lossless(&self) -> bool {
        !matches!(self, Quality::High)
    }

    /// Whether tracks arrive as a stream descriptor that must go through the transcoder
    pub fn needs_transcode(&self) -> bool {
        matches!(self, Quality::HiResLossless)
    }

    /// Default file extension (with leading dot) for tracks of this quality
    pub fn default_extension(&self) -> &'static str {
        match self {
            Quality::High => ".m4a",
            Quality::Lossless | Quality::HiResLossless => ".flac",
        }
    }
}

impl std::str::FromStr for Quality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Quality::High),
            "LOSSLESS" => Ok(Quality::Lossless),
            "HI_RES_LOSSLESS" | "HI_RES" => Ok(Quality::HiResLossless),
            other => Err(Error::Config {
                message: format!("unknown quality '{}'", other),
                key: Some("QUALITY".to_string()),
            }),
        }
    }
}

/// Upstream catalog settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog API (default: "http://localhost:8000")
    #[serde(default = "default_catalog_url")]
    pub base_url: String,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_catalog_timeout_secs")]
    pub timeout_secs: u64,

    /// Requested quality
    #[serde(default)]
    pub quality: Quality,

    /// Cover image URL template, `{cover}` is replaced by the cover path
    #[serde(default = "default_cover_url_template")]
    pub cover_url_template: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_url(),
            timeout_secs: default_catalog_timeout_secs(),
            quality: Quality::default(),
            cover_url_template: default_cover_url_template(),
        }
    }
}

/// Download behavior configuration (directories, naming, external tools)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Download root holding `incomplete/` and `complete/` (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Category name reported to clients and used as a folder level (default: "music")
    #[serde(default = "default_category")]
    pub category: String,

    /// Track file extension override (defaults to the quality's extension)
    #[serde(default)]
    pub file_extension: Option<String>,

    /// Path to ffmpeg (auto-detected from PATH if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Group suffix appended to advertised release names (default: "TIDLARR")
    #[serde(default = "default_release_suffix")]
    pub release_suffix: String,

    /// Seconds per remaining track used for the queue's time-left estimate (default: 10)
    #[serde(default = "default_seconds_per_track")]
    pub seconds_per_track: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            category: default_category(),
            file_extension: None,
            ffmpeg_path: None,
            release_suffix: default_release_suffix(),
            seconds_per_track: default_seconds_per_track(),
        }
    }
}

impl DownloadConfig {
    /// `<root>/incomplete/<category>`
    pub fn incomplete_dir(&self) -> PathBuf {
        self.download_dir.join("incomplete").join(&self.category)
    }

    /// `<root>/complete/<category>`
    pub fn complete_dir(&self) -> PathBuf {
        self.download_dir.join("complete").join(&self.category)
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind the HTTP server (default: 0.0.0.0:8688)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Shared key both protocols check against the `apikey` query parameter
    #[serde(default)]
    pub api_key: String,

    /// Externally reachable base URL used in enclosure links (relative links if None)
    #[serde(default)]
    pub public_url: Option<String>,

    /// Enable CORS (default: false)
    #[serde(default)]
    pub cors_enabled: bool,

    /// Allowed CORS origins ("*" for any)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: String::new(),
            public_url: None,
            cors_enabled: false,
            cors_origins: vec![],
        }
    }
}

/// API and external server integration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerIntegrationConfig {
    /// API server settings
    #[serde(default)]
    pub api: ApiConfig,
}

/// Main configuration for tidlarr
///
/// Download settings are flattened so the serialized form keeps directory and naming
/// keys at the top level.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream catalog settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Directories, naming and external tools
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// API server settings
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Build a configuration from process environment variables.
    ///
    /// Unset variables keep their defaults. See [`Config::from_lookup`] for the keys.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Recognized keys: `API_KEY`, `CATALOG_URL`, `CATALOG_TIMEOUT_SECS`, `QUALITY`,
    /// `COVER_URL_TEMPLATE`, `DOWNLOAD_PATH`, `CATEGORY`, `FILE_EXTENSION`, `FFMPEG_PATH`,
    /// `RELEASE_SUFFIX`, `BIND_ADDRESS`, `PUBLIC_URL`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(key) = get("API_KEY") {
            config.server.api.api_key = key;
        }
        if let Some(url) = get("CATALOG_URL") {
            config.catalog.base_url = url;
        }
        if let Some(secs) = get("CATALOG_TIMEOUT_SECS") {
            config.catalog.timeout_secs = secs.parse().map_err(|e| Error::Config {
                message: format!("invalid timeout '{}': {}", secs, e),
                key: Some("CATALOG_TIMEOUT_SECS".to_string()),
            })?;
        }
        if let Some(quality) = get("QUALITY") {
            config.catalog.quality = quality.parse()?;
        }
        if let Some(template) = get("COVER_URL_TEMPLATE") {
            config.catalog.cover_url_template = template;
        }
        if let Some(path) = get("DOWNLOAD_PATH") {
            config.download.download_dir = PathBuf::from(path);
        }
        if let Some(category) = get("CATEGORY") {
            config.download.category = category;
        }
        if let Some(ext) = get("FILE_EXTENSION") {
            config.download.file_extension = Some(ext);
        }
        if let Some(path) = get("FFMPEG_PATH") {
            config.download.ffmpeg_path = Some(PathBuf::from(path));
        }
        if let Some(suffix) = get("RELEASE_SUFFIX") {
            config.download.release_suffix = suffix;
        }
        if let Some(addr) = get("BIND_ADDRESS") {
            config.server.api.bind_address = addr.parse().map_err(|e| Error::Config {
                message: format!("invalid bind address '{}': {}", addr, e),
                key: Some("BIND_ADDRESS".to_string()),
            })?;
        }
        if let Some(url) = get("PUBLIC_URL") {
            config.server.api.public_url = Some(url.trim_end_matches('/').to_string());
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the bridge cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.api.api_key.trim().is_empty() {
            return Err(Error::Config {
                message: "an API key is required".to_string(),
                key: Some("API_KEY".to_string()),
            });
        }
        if let Err(e) = url::Url::parse(&self.catalog.base_url) {
            return Err(Error::Config {
                message: format!("invalid catalog URL '{}': {}", self.catalog.base_url, e),
                key: Some("CATALOG_URL".to_string()),
            });
        }
        if self.download.category.trim().is_empty() {
            return Err(Error::Config {
                message: "category must not be empty".to_string(),
                key: Some("CATEGORY".to_string()),
            });
        }
        Ok(())
    }

    /// Extension (with leading dot) for track files
    pub fn file_extension(&self) -> String {
        match &self.download.file_extension {
            Some(ext) if ext.starts_with('.') => ext.clone(),
            Some(ext) => format!(".{}", ext),
            None => self.catalog.quality.default_extension().to_string(),
        }
    }
}

fn default_catalog_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_catalog_timeout_secs() -> u64 {
    30
}

fn default_cover_url_template() -> String {
    "https://resources.tidal.com/images/{cover}/1280x1280.jpg".to_string()
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_category() -> String {
    "music".to_string()
}

fn default_release_suffix() -> String {
    "TIDLARR".to_string()
}

fn default_seconds_per_track() -> u64 {
    10
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8688))
}
