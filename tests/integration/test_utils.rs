//! Test utilities for integration tests.
//!
//! This module provides a tracking blob store, helpers for creating encoded
//! test images and a one-shot request helper for the router.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use tower::ServiceExt;

use thumbs_server::error::StorageError;
use thumbs_server::store::{BlobStore, MemoryStore};
use thumbs_server::{create_router, RouterConfig, ThumbnailService};

// =============================================================================
// Tracking Store
// =============================================================================

/// An in-memory store that counts calls and can be told to misbehave.
pub struct TrackingStore {
    inner: MemoryStore,
    exists_calls: AtomicUsize,
    load_calls: AtomicUsize,
    store_calls: AtomicUsize,
    fail_writes: AtomicBool,
    load_delay: Option<Duration>,
}

impl TrackingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            exists_calls: AtomicUsize::new(0),
            load_calls: AtomicUsize::new(0),
            store_calls: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            load_delay: None,
        }
    }

    /// Sleep this long inside every `load`.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    /// Make every `store` fail.
    pub fn failing_writes(self) -> Self {
        self.fail_writes.store(true, Ordering::SeqCst);
        self
    }

    /// Seed an object without counting the call.
    pub async fn with_object(self, key: &str, data: impl Into<Bytes>) -> Self {
        self.inner.store(key, data.into()).await.unwrap();
        self
    }

    pub fn exists_count(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn load_count(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn store_count(&self) -> usize {
        self.store_calls.load(Ordering::SeqCst)
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.inner.exists(key).await.unwrap()
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }
}

impl Default for TrackingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for TrackingStore {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(key).await
    }

    async fn load(&self, key: &str) -> Result<Bytes, StorageError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.load(key).await
    }

    async fn store(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Filesystem("disk full".to_string()));
        }
        self.inner.store(key, data).await
    }

    fn describe(&self) -> String {
        "tracking://".to_string()
    }
}

/// A store whose every call fails with a connection error.
pub struct UnreachableStore;

#[async_trait]
impl BlobStore for UnreachableStore {
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Err(StorageError::Connection(format!("cannot reach {}", key)))
    }

    async fn load(&self, key: &str) -> Result<Bytes, StorageError> {
        Err(StorageError::Connection(format!("cannot reach {}", key)))
    }

    async fn store(&self, key: &str, _data: Bytes) -> Result<(), StorageError> {
        Err(StorageError::Connection(format!("cannot reach {}", key)))
    }

    fn describe(&self) -> String {
        "unreachable://".to_string()
    }
}

// =============================================================================
// Router Helpers
// =============================================================================

/// Build a router over shared stores with tracing off.
pub fn router_for(images: Arc<TrackingStore>, thumbs: Arc<TrackingStore>) -> Router {
    create_router(
        ThumbnailService::new(images, thumbs),
        RouterConfig::new().with_tracing(false),
    )
}

/// Send a GET request and collect the response.
pub async fn get(router: &Router, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

/// Read a header as a string.
pub fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .unwrap_or_else(|| panic!("missing header {name}"))
        .to_str()
        .unwrap()
}

/// Parse a JSON error body and return its `error` field.
pub fn error_type(body: &[u8]) -> String {
    let value: serde_json::Value = serde_json::from_slice(body).unwrap();
    value["error"].as_str().unwrap().to_string()
}

// =============================================================================
// Test Image Creation
// =============================================================================

/// Create an RGB gradient image.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

/// Create a single-color image.
pub fn solid_image(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)))
}

/// Encode an image as JPEG.
pub fn to_jpeg(image: &DynamicImage, quality: u8) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(image).unwrap();
    buf
}

/// Encode an image as PNG.
pub fn to_png(image: &DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image.write_with_encoder(PngEncoder::new(&mut buf)).unwrap();
    buf
}

/// Encode an image as lossless WebP.
pub fn to_webp(image: &DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image
        .write_with_encoder(WebPEncoder::new_lossless(&mut buf))
        .unwrap();
    buf
}

/// Create a test RGB JPEG image.
pub fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    to_jpeg(&gradient_image(width, height), 90)
}

/// Minimal GIF header; never decoded.
pub fn create_test_gif() -> Vec<u8> {
    b"GIF89a\x01\x00\x01\x00\x80\x00\x00\xff\xff\xff\x00\x00\x00!\xf9\x04".to_vec()
}

/// Check JPEG start and end markers.
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 4
        && data[0] == 0xFF
        && data[1] == 0xD8
        && data[data.len() - 2] == 0xFF
        && data[data.len() - 1] == 0xD9
}

/// Decode any supported image and return its dimensions.
pub fn decoded_dimensions(data: &[u8]) -> (u32, u32) {
    image::load_from_memory(data).unwrap().dimensions()
}
