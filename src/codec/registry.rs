//! Format-keyed codec registry.
//!
//! Each codec knows how to recognise, decode and encode one format. The
//! registry dispatches on sniffed content when decoding and on the output
//! format tag when encoding, so adding a format means registering a codec.

use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};

use crate::error::TransformError;

use super::detect::{is_webp, signature_hex, sniff_format, SourceFormat};

/// Minimum JPEG encoder quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum JPEG encoder quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// Maximum WebP encoder quality.
pub const MAX_WEBP_QUALITY: u8 = 100;

// =============================================================================
// Codec Trait
// =============================================================================

/// One image format's decode and encode capabilities.
pub trait ImageCodec: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// MIME type of encoded output.
    fn content_type(&self) -> &'static str;

    /// Output format tags (lowercase extensions) served by this codec.
    fn extensions(&self) -> &'static [&'static str];

    /// Whether `header` carries this format's signature.
    fn sniff(&self, header: &[u8]) -> bool;

    fn decode(&self, data: &[u8]) -> Result<DynamicImage, TransformError>;

    /// Encode `image`. Lossless codecs ignore `quality`.
    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Bytes, TransformError>;
}

fn decode_with(data: &[u8], format: ImageFormat) -> Result<DynamicImage, TransformError> {
    ImageReader::with_format(Cursor::new(data), format)
        .decode()
        .map_err(|e| TransformError::DecodeFailed {
            message: e.to_string(),
        })
}

fn encode_failed(e: image::ImageError) -> TransformError {
    TransformError::EncodeFailed {
        message: e.to_string(),
    }
}

// =============================================================================
// Codecs
// =============================================================================

/// Baseline JPEG, quality-parameterised. Alpha is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegCodec;

impl ImageCodec for JpegCodec {
    fn name(&self) -> &'static str {
        "jpeg"
    }

    fn content_type(&self) -> &'static str {
        "image/jpeg"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["jpg", "jpeg"]
    }

    fn sniff(&self, header: &[u8]) -> bool {
        sniff_format(header) == Some(SourceFormat::Jpeg)
    }

    fn decode(&self, data: &[u8]) -> Result<DynamicImage, TransformError> {
        decode_with(data, ImageFormat::Jpeg)
    }

    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Bytes, TransformError> {
        let quality = quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY);

        let flattened;
        let image = match image {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => image,
            other => {
                flattened = DynamicImage::ImageRgb8(other.to_rgb8());
                &flattened
            }
        };

        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);
        encoder.encode_image(image).map_err(encode_failed)?;

        Ok(Bytes::from(output))
    }
}

/// Lossless PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngCodec;

impl ImageCodec for PngCodec {
    fn name(&self) -> &'static str {
        "png"
    }

    fn content_type(&self) -> &'static str {
        "image/png"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["png"]
    }

    fn sniff(&self, header: &[u8]) -> bool {
        sniff_format(header) == Some(SourceFormat::Png)
    }

    fn decode(&self, data: &[u8]) -> Result<DynamicImage, TransformError> {
        decode_with(data, ImageFormat::Png)
    }

    fn encode(&self, image: &DynamicImage, _quality: u8) -> Result<Bytes, TransformError> {
        let mut output = Vec::new();
        image
            .write_with_encoder(PngEncoder::new(&mut output))
            .map_err(encode_failed)?;
        Ok(Bytes::from(output))
    }
}

/// WebP. Decodes lossy and lossless files through `image` and encodes
/// lossy output through libwebp at the requested quality.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebPCodec;

impl ImageCodec for WebPCodec {
    fn name(&self) -> &'static str {
        "webp"
    }

    fn content_type(&self) -> &'static str {
        "image/webp"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["webp"]
    }

    fn sniff(&self, header: &[u8]) -> bool {
        is_webp(header)
    }

    fn decode(&self, data: &[u8]) -> Result<DynamicImage, TransformError> {
        decode_with(data, ImageFormat::WebP)
    }

    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Bytes, TransformError> {
        let quality = f32::from(quality.min(MAX_WEBP_QUALITY));
        let (width, height) = (image.width(), image.height());

        let encoded = if image.color().has_alpha() {
            let rgba = image.to_rgba8();
            webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode_simple(false, quality)
        } else {
            let rgb = image.to_rgb8();
            webp::Encoder::from_rgb(rgb.as_raw(), width, height).encode_simple(false, quality)
        }
        .map_err(|e| TransformError::EncodeFailed {
            message: format!("webp: {:?}", e),
        })?;

        Ok(Bytes::copy_from_slice(&encoded))
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Encoded thumbnail bytes with their MIME type.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Bytes,
    pub content_type: &'static str,
}

/// Codecs keyed by signature (for decoding) and by format tag (for encoding).
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: Vec<Arc<dyn ImageCodec>>,
    by_tag: HashMap<&'static str, usize>,
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.codecs.iter().map(|c| c.name()).collect();
        f.debug_struct("CodecRegistry")
            .field("codecs", &names)
            .finish()
    }
}

impl CodecRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with JPEG, PNG and WebP.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_codec(Arc::new(JpegCodec))
            .with_codec(Arc::new(PngCodec))
            .with_codec(Arc::new(WebPCodec))
    }

    /// Register a codec. Later registrations win for shared format tags.
    pub fn with_codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        let index = self.codecs.len();
        for tag in codec.extensions() {
            self.by_tag.insert(tag, index);
        }
        self.codecs.push(codec);
        self
    }

    /// Whether an encoder is registered for `format`.
    pub fn supports_output(&self, format: &str) -> bool {
        self.by_tag.contains_key(format)
    }

    /// Find the codec whose signature matches `data`.
    pub fn detect(&self, data: &[u8]) -> Result<&dyn ImageCodec, TransformError> {
        self.codecs
            .iter()
            .find(|codec| codec.sniff(data))
            .map(|codec| codec.as_ref())
            .ok_or_else(|| TransformError::UnsupportedSourceFormat {
                reason: match sniff_format(data) {
                    Some(format) => format!("{} sources cannot be decoded", format.name()),
                    None => format!("unrecognized file signature {}", signature_hex(data)),
                },
            })
    }

    /// Sniff and decode a source image.
    pub fn decode(&self, data: &[u8]) -> Result<DynamicImage, TransformError> {
        self.detect(data)?.decode(data)
    }

    /// Find the codec that encodes `format`.
    pub fn for_format(&self, format: &str) -> Result<&dyn ImageCodec, TransformError> {
        self.by_tag
            .get(format)
            .map(|&index| self.codecs[index].as_ref())
            .ok_or_else(|| TransformError::UnsupportedOutputFormat {
                format: format.to_string(),
            })
    }

    /// Encode `image` as `format`.
    pub fn encode(
        &self,
        image: &DynamicImage,
        format: &str,
        quality: u8,
    ) -> Result<EncodedImage, TransformError> {
        let codec = self.for_format(format)?;
        let data = codec.encode(image, quality)?;
        Ok(EncodedImage {
            data,
            content_type: codec.content_type(),
        })
    }
}
