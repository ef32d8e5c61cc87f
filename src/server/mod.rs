//! HTTP server layer for the thumbnail server.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                 GET /{token}/{*source}                          │
//! │                                                                 │
//! │      ┌──────────────────────┐    ┌─────────────────────────┐    │
//! │      │      handlers        │    │        routes           │    │
//! │      │ (requests, errors)   │    │  (router config, CORS)  │    │
//! │      └──────────────────────┘    └─────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    health_handler, http_date_in_days, missing_source_handler, thumbnail_handler, AppState,
    ErrorResponse, HealthResponse, CACHE_HIT_HEADER, DEFAULT_CACHE_CONTROL, PERSISTED_HEADER,
};
pub use routes::{create_router, RouterConfig};
