//! HTTP request handlers for the thumbnail API.
//!
//! # Endpoints
//!
//! - `GET /{token}/{*source}` - Serve a thumbnail
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{StorageError, ThumbnailError, TransformError};
use crate::store::BlobStore;
use crate::thumbnail::ThumbnailService;

/// Default `Cache-Control` for thumbnails: they never change once written.
pub const DEFAULT_CACHE_CONTROL: &str = "public, max-age=31536000";

/// How far in the future the `Expires` header points.
const EXPIRES_AFTER_DAYS: i64 = 365;

/// Header reporting whether the thumbnail came from the thumbnail store.
pub const CACHE_HIT_HEADER: &str = "x-thumbnail-cache-hit";

/// Header reporting whether the thumbnail is in the thumbnail store.
pub const PERSISTED_HEADER: &str = "x-thumbnail-persisted";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the thumbnail service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<I: BlobStore, T: BlobStore> {
    pub thumbnail_service: Arc<ThumbnailService<I, T>>,

    /// Value sent as `Cache-Control` on thumbnails
    pub cache_control: HeaderValue,
}

impl<I: BlobStore, T: BlobStore> AppState<I, T> {
    /// Create a new application state with the default cache policy.
    pub fn new(thumbnail_service: ThumbnailService<I, T>) -> Self {
        Self {
            thumbnail_service: Arc::new(thumbnail_service),
            cache_control: HeaderValue::from_static(DEFAULT_CACHE_CONTROL),
        }
    }

    /// Replace the `Cache-Control` value.
    pub fn with_cache_control(mut self, cache_control: HeaderValue) -> Self {
        self.cache_control = cache_control;
        self
    }
}

impl<I: BlobStore, T: BlobStore> Clone for AppState<I, T> {
    fn clone(&self) -> Self {
        Self {
            thumbnail_service: Arc::clone(&self.thumbnail_service),
            cache_control: self.cache_control.clone(),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_mode")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

fn transform_error_kind(err: &TransformError) -> (StatusCode, &'static str) {
    match err {
        TransformError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
        TransformError::InvalidMode { .. } => (StatusCode::BAD_REQUEST, "invalid_mode"),
        TransformError::InvalidDimensions { .. } => (StatusCode::BAD_REQUEST, "invalid_dimensions"),
        TransformError::DimensionsTooLarge { .. } => {
            (StatusCode::BAD_REQUEST, "dimensions_too_large")
        }
        TransformError::UnsupportedSourceFormat { .. } => (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "unsupported_source_format",
        ),
        TransformError::UnsupportedOutputFormat { .. } => {
            (StatusCode::BAD_REQUEST, "unsupported_output_format")
        }
        TransformError::DecodeFailed { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "decode_error"),
        TransformError::EncodeFailed { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
    }
}

fn storage_error_kind(err: &StorageError) -> (StatusCode, &'static str) {
    match err {
        StorageError::Connection(_) => (StatusCode::BAD_GATEWAY, "connection_error"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
    }
}

/// Convert ThumbnailError to HTTP response.
///
/// This implementation logs errors appropriately based on their severity:
/// - 4xx errors are logged at WARN level (404 at DEBUG)
/// - 5xx errors are logged at ERROR level
impl IntoResponse for ThumbnailError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ThumbnailError::BadRequest(err) | ThumbnailError::Generation(err) => {
                transform_error_kind(err)
            }
            ThumbnailError::SourceNotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            ThumbnailError::Storage(err) => storage_error_kind(err),
        };
        let message = match &self {
            ThumbnailError::BadRequest(err) | ThumbnailError::Generation(err) => err.to_string(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// HTTP date `days` from now, e.g. `Wed, 21 Oct 2026 07:28:00 GMT`.
pub fn http_date_in_days(days: i64) -> String {
    (Utc::now() + Duration::days(days))
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

fn flag(value: bool) -> HeaderValue {
    HeaderValue::from_static(if value { "true" } else { "false" })
}

/// Handle thumbnail requests.
///
/// # Endpoint
///
/// `GET /{token}/{*source}`, e.g. `GET /wcc200x200,ff0000,q90/photos/cat.jpg`
///
/// # Response
///
/// - `200 OK`: encoded thumbnail
/// - `400 Bad Request`: malformed token or unsupported output format
/// - `404 Not Found`: source image not found
/// - `415 Unsupported Media Type`: source format cannot be decoded
/// - `500 Internal Server Error`: processing or storage error
/// - `502 Bad Gateway`: storage backend unreachable
///
/// # Headers
///
/// - `Content-Type` of the output format
/// - `Cache-Control` (configurable) and `Expires` one year ahead
/// - `X-Thumbnail-Cache-Hit: true|false`
/// - `X-Thumbnail-Persisted: true|false`
pub async fn thumbnail_handler<I, T>(
    State(state): State<AppState<I, T>>,
    Path((token, source)): Path<(String, String)>,
) -> Result<Response, ThumbnailError>
where
    I: BlobStore + 'static,
    T: BlobStore + 'static,
{
    let response = state
        .thumbnail_service
        .get_thumbnail(&token, &source)
        .await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(response.content_type),
    );
    headers.insert(header::CACHE_CONTROL, state.cache_control.clone());
    if let Ok(expires) = HeaderValue::from_str(&http_date_in_days(EXPIRES_AFTER_DAYS)) {
        headers.insert(header::EXPIRES, expires);
    }
    headers.insert(CACHE_HIT_HEADER, flag(response.cache_hit));
    headers.insert(PERSISTED_HEADER, flag(response.persisted));

    Ok((StatusCode::OK, headers, response.data).into_response())
}

/// Handle `GET /{token}` with no source path.
pub async fn missing_source_handler(Path(token): Path<String>) -> ThumbnailError {
    ThumbnailError::BadRequest(TransformError::InvalidRequest {
        reason: format!("missing source image path after {:?}", token),
    })
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
