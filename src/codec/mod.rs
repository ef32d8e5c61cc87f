//! Codec adapter: sniff, decode and encode.
//!
//! - [`detect`] identifies source formats from magic bytes
//! - [`registry`] maps formats to [`ImageCodec`] implementations
//!
//! | Format | Decode | Encode |
//! |--------|--------|--------|
//! | JPEG   | yes    | lossy, quality 1-100 |
//! | PNG    | yes    | lossless |
//! | WebP   | yes    | lossless |

pub mod detect;
pub mod registry;

pub use detect::{is_webp, sniff_format, SourceFormat};
pub use registry::{
    CodecRegistry, EncodedImage, ImageCodec, JpegCodec, PngCodec, WebPCodec, MAX_JPEG_QUALITY,
    MIN_JPEG_QUALITY,
};
