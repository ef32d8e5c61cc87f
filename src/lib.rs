//! # Thumbs Server
//!
//! An HTTP thumbnail server. A request names a transformation and a source
//! image; the server answers with a thumbnail, rendering it once and keeping
//! it in a thumbnail store for every later request.
//!
//! ```text
//! GET /wcc200x200,ff0000,q90/photos/cat.jpg
//!      └───── token ───────┘└─ source ───┘
//! ```
//!
//! ## Features
//!
//! - **Three mode families**: fit inside the box, pad to the box with a
//!   background color, or crop to fill the box, with nine anchor positions
//! - **Content-sniffed decoding**: JPEG, PNG and WebP sources, detected from
//!   magic bytes rather than file extensions
//! - **Write-once cache**: thumbnails are stored under a canonical key, on
//!   local disk, in S3, or in memory
//! - **Coalesced generation**: concurrent requests for the same missing
//!   thumbnail share one render
//!
//! ## Architecture
//!
//! - [`transform`] - Token parsing, geometry and compositing
//! - [`codec`] - Format detection, decoding and encoding
//! - [`store`] - Blob stores for images and thumbnails
//! - [`thumbnail`] - The cache-mediated pipeline
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use thumbs_server::{create_router, FsStore, RouterConfig, ThumbnailService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = ThumbnailService::new(
//!         FsStore::new("/srv/images"),
//!         FsStore::new("/srv/thumbs"),
//!     );
//!     let router = create_router(service, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod thumbnail;
pub mod transform;

// Re-export commonly used types
pub use codec::{CodecRegistry, EncodedImage, ImageCodec, SourceFormat};
pub use config::{Config, StoreLocation};
pub use error::{StorageError, ThumbnailError, TransformError};
pub use server::{create_router, AppState, ErrorResponse, HealthResponse, RouterConfig};
pub use store::{BlobStore, FsStore, MemoryStore, S3Store, SharedStore};
pub use thumbnail::{ThumbnailResponse, ThumbnailService};
pub use transform::{Anchor, Color, DescriptorParser, Mode, TransformDescriptor};
