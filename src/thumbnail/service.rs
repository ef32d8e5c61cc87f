//! Thumbnail Service for orchestrating the cache-mediated pipeline.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       ThumbnailService                           │
//! │  ┌────────────────────────────────────────────────────────────┐  │
//! │  │                    get_thumbnail()                         │  │
//! │  │  1. Parse token        4. Load source                      │  │
//! │  │  2. Check thumbs       5. Decode, transform, encode        │  │
//! │  │  3. Check source       6. Persist & return                 │  │
//! │  └────────────────────────────────────────────────────────────┘  │
//! │        │                   │                        │            │
//! │        ▼                   ▼                        ▼            │
//! │ ┌─────────────────┐ ┌─────────────┐      ┌──────────────────┐    │
//! │ │DescriptorParser │ │ BlobStore x2│      │  CodecRegistry   │    │
//! │ └─────────────────┘ └─────────────┘      └──────────────────┘    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A thumbnail is only written after a successful encode, so the thumbnail
//! store never holds partial output. Nothing is retried.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::codec::{CodecRegistry, EncodedImage};
use crate::error::{StorageError, ThumbnailError, TransformError};
use crate::store::BlobStore;
use crate::transform::{self, DescriptorParser, TransformDescriptor};

use super::inflight::{InFlight, Role};

/// Fallback MIME type for stored thumbnails with no registered codec.
const OCTET_STREAM: &str = "application/octet-stream";

// =============================================================================
// Thumbnail Response
// =============================================================================

/// Response from the thumbnail service.
#[derive(Debug, Clone)]
pub struct ThumbnailResponse {
    /// The encoded thumbnail
    pub data: Bytes,

    /// MIME type of `data`
    pub content_type: &'static str,

    /// Key the thumbnail is stored under
    pub cache_key: String,

    /// Whether the thumbnail was served from the thumbnail store
    pub cache_hit: bool,

    /// Whether the thumbnail is in the thumbnail store after this request
    pub persisted: bool,
}

// =============================================================================
// Generation
// =============================================================================

/// Decode `source`, apply `descriptor` and encode the result.
///
/// CPU-bound; async callers should use [`ThumbnailService::generate`].
pub fn render_thumbnail(
    codecs: &CodecRegistry,
    descriptor: &TransformDescriptor,
    source: &[u8],
) -> Result<EncodedImage, TransformError> {
    let image = codecs.decode(source)?;
    let rendered = transform::render(&image, descriptor);
    codecs.encode(&rendered, &descriptor.format, descriptor.quality)
}

// =============================================================================
// Thumbnail Service
// =============================================================================

/// Service resolving thumbnail requests against an image store and a
/// thumbnail store.
///
/// # Type Parameters
///
/// * `I` - Store holding source images (read-only)
/// * `T` - Store holding generated thumbnails
///
/// # Example
///
/// ```ignore
/// use thumbs_server::store::{FsStore, MemoryStore};
/// use thumbs_server::thumbnail::ThumbnailService;
///
/// let service = ThumbnailService::new(FsStore::new("/srv/images"), MemoryStore::new());
/// let response = service.get_thumbnail("m100x100", "photos/cat.jpg").await?;
/// println!("{} bytes, cache hit: {}", response.data.len(), response.cache_hit);
/// ```
pub struct ThumbnailService<I: BlobStore, T: BlobStore> {
    images: I,
    thumbs: T,
    parser: DescriptorParser,
    codecs: Arc<CodecRegistry>,

    /// Generation runs shared between concurrent identical requests
    in_flight: Option<InFlight<Result<ThumbnailResponse, ThumbnailError>>>,
}

impl<I: BlobStore, T: BlobStore> ThumbnailService<I, T> {
    /// Create a service with the default parser, the default codecs and
    /// coalescing enabled.
    pub fn new(images: I, thumbs: T) -> Self {
        Self {
            images,
            thumbs,
            parser: DescriptorParser::default(),
            codecs: Arc::new(CodecRegistry::with_defaults()),
            in_flight: Some(InFlight::new()),
        }
    }

    /// Replace the token parser.
    pub fn with_parser(mut self, parser: DescriptorParser) -> Self {
        self.parser = parser;
        self
    }

    /// Replace the codec registry.
    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = Arc::new(codecs);
        self
    }

    /// Enable or disable coalescing of concurrent identical generations.
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.in_flight = enabled.then(InFlight::new);
        self
    }

    pub fn parser(&self) -> &DescriptorParser {
        &self.parser
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn images(&self) -> &I {
        &self.images
    }

    pub fn thumbs(&self) -> &T {
        &self.thumbs
    }

    /// Whether concurrent identical generations are coalesced.
    pub fn coalescing(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Resolve a thumbnail request.
    ///
    /// # Errors
    ///
    /// - `BadRequest` if the token or source path is malformed
    /// - `SourceNotFound` if the image store has no such source
    /// - `Generation` if the source cannot be decoded or the output encoded
    /// - `Storage` if a store fails while checking or loading
    ///
    /// Failing to persist a freshly generated thumbnail is not an error; the
    /// response carries `persisted = false`.
    pub async fn get_thumbnail(
        &self,
        token: &str,
        source_path: &str,
    ) -> Result<ThumbnailResponse, ThumbnailError> {
        let descriptor = self
            .parser
            .parse(token, source_path)
            .map_err(ThumbnailError::BadRequest)?;
        let cache_key = descriptor.cache_key();

        if self.thumbs.exists(&cache_key).await? {
            match self.thumbs.load(&cache_key).await {
                Ok(data) => {
                    debug!(cache_key = %cache_key, bytes = data.len(), "Thumbnail cache hit");
                    return Ok(ThumbnailResponse {
                        data,
                        content_type: self.content_type_for(&descriptor.format),
                        cache_key,
                        cache_hit: true,
                        persisted: true,
                    });
                }
                // Removed between the check and the load; regenerate
                Err(StorageError::NotFound(_)) => {
                    debug!(cache_key = %cache_key, "Thumbnail vanished before load");
                }
                Err(e) => return Err(e.into()),
            }
        }

        match &self.in_flight {
            Some(in_flight) => {
                let (result, role) = in_flight
                    .run(&cache_key, || self.generate_and_persist(&descriptor, &cache_key))
                    .await;
                if role == Role::Follower {
                    debug!(cache_key = %cache_key, "Joined in-flight generation");
                }
                result
            }
            None => self.generate_and_persist(&descriptor, &cache_key).await,
        }
    }

    /// Run generation for `descriptor` on the blocking pool.
    ///
    /// Touches neither store.
    pub async fn generate(
        &self,
        descriptor: &TransformDescriptor,
        source: Bytes,
    ) -> Result<EncodedImage, ThumbnailError> {
        let codecs = Arc::clone(&self.codecs);
        let task_descriptor = descriptor.clone();

        tokio::task::spawn_blocking(move || render_thumbnail(&codecs, &task_descriptor, &source))
            .await
            .map_err(|e| {
                ThumbnailError::Generation(TransformError::EncodeFailed {
                    message: format!("generation task failed: {}", e),
                })
            })?
            .map_err(ThumbnailError::Generation)
    }

    async fn generate_and_persist(
        &self,
        descriptor: &TransformDescriptor,
        cache_key: &str,
    ) -> Result<ThumbnailResponse, ThumbnailError> {
        let source_key = descriptor.source_key.as_str();

        if !self.images.exists(source_key).await? {
            return Err(ThumbnailError::SourceNotFound {
                source_key: source_key.to_string(),
            });
        }

        let source = self.images.load(source_key).await.map_err(|e| match e {
            StorageError::NotFound(_) => ThumbnailError::SourceNotFound {
                source_key: source_key.to_string(),
            },
            other => ThumbnailError::Storage(other),
        })?;

        let encoded = self.generate(descriptor, source).await?;

        info!(
            cache_key = %cache_key,
            source_key = %source_key,
            mode = %descriptor.mode,
            width = descriptor.width,
            height = descriptor.height,
            quality = descriptor.quality,
            format = %descriptor.format,
            bytes = encoded.data.len(),
            "Generated thumbnail"
        );

        let persisted = match self.thumbs.store(cache_key, encoded.data.clone()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(cache_key = %cache_key, error = %e, "Failed to persist thumbnail");
                false
            }
        };

        Ok(ThumbnailResponse {
            data: encoded.data,
            content_type: encoded.content_type,
            cache_key: cache_key.to_string(),
            cache_hit: false,
            persisted,
        })
    }

    fn content_type_for(&self, format: &str) -> &'static str {
        self.codecs
            .for_format(format)
            .map(|codec| codec.content_type())
            .unwrap_or(OCTET_STREAM)
    }
}
