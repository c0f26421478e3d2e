//! Error types for tidlarr
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Catalog, Acquisition)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tidlarr operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tidlarr
///
/// Each variant includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "API_KEY")
        key: Option<String>,
    },

    /// Upstream catalog lookup failed
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Track acquisition failed
    #[error("acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),

    /// A caller-supplied add payload did not carry the fields we need
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A download with this id is already being acquired and cannot be replaced
    #[error("download {0} is already being acquired")]
    AlreadyAcquiring(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// External tool execution failed (ffmpeg)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Catalog-related errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The request never produced a response (connect, timeout, TLS)
    #[error("request to {path} failed: {reason}")]
    Request {
        /// Catalog path that was requested
        path: String,
        /// Transport error description
        reason: String,
    },

    /// The catalog answered with a non-success status
    #[error("{path} returned HTTP {status}")]
    Status {
        /// Catalog path that was requested
        path: String,
        /// HTTP status code
        status: u16,
    },

    /// The body could not be interpreted
    #[error("malformed response from {path}: {reason}")]
    Malformed {
        /// Catalog path that was requested
        path: String,
        /// What was wrong with the payload
        reason: String,
    },

    /// The album detail listed no tracks
    #[error("album {id} has no tracks")]
    EmptyAlbum {
        /// Catalog album id
        id: String,
    },

    /// A track's stream manifest could not be turned into a location
    #[error("track {track_id} has no usable stream: {reason}")]
    Manifest {
        /// Catalog track id
        track_id: String,
        /// Why the manifest was rejected
        reason: String,
    },
}

/// Acquisition pipeline errors. Every variant is fatal to the run it occurs in.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// The working folder could not be created
    #[error("failed to create folder {path}: {reason}")]
    FolderCreation {
        /// Folder that was being created
        path: PathBuf,
        /// The reason creation failed
        reason: String,
    },

    /// Cover art could not be fetched
    #[error("failed to fetch cover art from {url}: {reason}")]
    CoverArt {
        /// Cover URL
        url: String,
        /// The reason the fetch failed
        reason: String,
    },

    /// A track transfer or transcode failed
    #[error("track {position} ({title}) failed: {reason}")]
    Track {
        /// 1-based position of the track within the album
        position: u32,
        /// Track title
        title: String,
        /// The reason the track failed
        reason: String,
    },

    /// The finished folder could not be moved into the complete area
    #[error("failed to move {source_path} to {dest_path}: {reason}")]
    Promotion {
        /// Folder under the incomplete area
        source_path: PathBuf,
        /// Destination under the complete area
        dest_path: PathBuf,
        /// The reason the move failed
        reason: String,
    },
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "download not found: 42",
///     "details": {
///       "download_id": "42"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "invalid_payload")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::InvalidPayload(_) => 422,

            // 409 Conflict
            Error::AlreadyAcquiring(_) => 409,

            // 500 Internal Server Error - Server-side issues
            Error::Acquisition(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Serialization(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::Catalog(_) => 502,
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ExternalTool(_) => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Catalog(e) => match e {
                CatalogError::Request { .. } => "catalog_unreachable",
                CatalogError::Status { .. } => "catalog_status",
                CatalogError::Malformed { .. } => "catalog_malformed",
                CatalogError::EmptyAlbum { .. } => "empty_album",
                CatalogError::Manifest { .. } => "unusable_manifest",
            },
            Error::Acquisition(e) => match e {
                AcquisitionError::FolderCreation { .. } => "folder_creation_failed",
                AcquisitionError::CoverArt { .. } => "cover_art_failed",
                AcquisitionError::Track { .. } => "track_failed",
                AcquisitionError::Promotion { .. } => "promotion_failed",
            },
            Error::InvalidPayload(_) => "invalid_payload",
            Error::AlreadyAcquiring(_) => "already_acquiring",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::AlreadyAcquiring(id) => Some(serde_json::json!({
                "download_id": id,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Catalog(CatalogError::Status { path, status }) => Some(serde_json::json!({
                "path": path,
                "status": status,
            })),
            Error::Acquisition(AcquisitionError::Track { position, title, .. }) => {
                Some(serde_json::json!({
                    "position": position,
                    "title": title,
                }))
            }
            _ => None,
        };

        match details {
            Some(details) => ApiError::with_details(code, message, details),
            None => ApiError::new(code, message),
        }
    }
}
