//! Router configuration for the thumbnail server.
//!
//! # Route Structure
//!
//! ```text
//! /health                - Health check
//! /{token}/{*source}     - Thumbnail of `source` as described by `token`
//! /{token}               - Rejected: no source path
//! ```
//!
//! # Example
//!
//! ```ignore
//! use thumbs_server::server::{create_router, RouterConfig};
//! use thumbs_server::store::{FsStore, MemoryStore};
//! use thumbs_server::thumbnail::ThumbnailService;
//!
//! let service = ThumbnailService::new(FsStore::new("/srv/images"), MemoryStore::new());
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    health_handler, missing_source_handler, thumbnail_handler, AppState, DEFAULT_CACHE_CONTROL,
};
use crate::store::BlobStore;
use crate::thumbnail::ThumbnailService;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control value for thumbnails
    pub cache_control: HeaderValue,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Thumbnails are cacheable for one year
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_control: HeaderValue::from_static(DEFAULT_CACHE_CONTROL),
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the Cache-Control value sent with thumbnails.
    pub fn with_cache_control(mut self, value: HeaderValue) -> Self {
        self.cache_control = value;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `service` - The thumbnail service handling requests
/// * `config` - Router configuration
pub fn create_router<I, T>(service: ThumbnailService<I, T>, config: RouterConfig) -> Router
where
    I: BlobStore + 'static,
    T: BlobStore + 'static,
{
    let app_state = AppState::new(service).with_cache_control(config.cache_control.clone());
    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/{token}", get(missing_source_handler))
        .route("/{token}/{*source}", get(thumbnail_handler::<I, T>))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<HeaderValue> =
                origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
