//! Source format detection.
//!
//! The format of a source image is determined from its leading bytes, never
//! from the file extension. A handful of formats that cannot be decoded are
//! still recognised so that errors can name them.

// =============================================================================
// SourceFormat
// =============================================================================

/// Format identified from a file signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Bmp,
    Tiff,
    Avif,
}

impl SourceFormat {
    /// Get a human-readable name for the format.
    pub const fn name(&self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "JPEG",
            SourceFormat::Png => "PNG",
            SourceFormat::WebP => "WebP",
            SourceFormat::Gif => "GIF",
            SourceFormat::Bmp => "BMP",
            SourceFormat::Tiff => "TIFF",
            SourceFormat::Avif => "AVIF",
        }
    }
}

// =============================================================================
// Signatures
// =============================================================================

/// JPEG start-of-image marker.
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8];

/// PNG file signature.
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// RIFF container tag; WebP carries `WEBP` at offset 8.
const RIFF_MAGIC: &[u8] = b"RIFF";
const WEBP_FOURCC: &[u8] = b"WEBP";

const GIF87_MAGIC: &[u8] = b"GIF87a";
const GIF89_MAGIC: &[u8] = b"GIF89a";
const BMP_MAGIC: &[u8] = b"BM";
const TIFF_LE_MAGIC: &[u8] = &[0x49, 0x49, 0x2A, 0x00];
const TIFF_BE_MAGIC: &[u8] = &[0x4D, 0x4D, 0x00, 0x2A];

/// ISO-BMFF `ftyp` box tag at offset 4, followed by an AVIF brand.
const FTYP_TAG: &[u8] = b"ftyp";
const AVIF_BRANDS: [&[u8]; 2] = [b"avif", b"avis"];

/// Number of leading bytes needed to tell every known format apart.
pub const SNIFF_LEN: usize = 16;

/// Identify the format of `data` from its signature.
///
/// Returns `None` when no known signature matches.
pub fn sniff_format(data: &[u8]) -> Option<SourceFormat> {
    if data.starts_with(JPEG_MAGIC) {
        return Some(SourceFormat::Jpeg);
    }
    if data.starts_with(PNG_MAGIC) {
        return Some(SourceFormat::Png);
    }
    if is_webp(data) {
        return Some(SourceFormat::WebP);
    }
    if data.starts_with(GIF87_MAGIC) || data.starts_with(GIF89_MAGIC) {
        return Some(SourceFormat::Gif);
    }
    if data.starts_with(TIFF_LE_MAGIC) || data.starts_with(TIFF_BE_MAGIC) {
        return Some(SourceFormat::Tiff);
    }
    if is_avif(data) {
        return Some(SourceFormat::Avif);
    }
    if data.starts_with(BMP_MAGIC) && data.len() >= 14 {
        return Some(SourceFormat::Bmp);
    }
    None
}

/// Check for a `RIFF....WEBP` container header.
#[inline]
pub fn is_webp(data: &[u8]) -> bool {
    data.len() >= 12 && data.starts_with(RIFF_MAGIC) && &data[8..12] == WEBP_FOURCC
}

fn is_avif(data: &[u8]) -> bool {
    data.len() >= 12 && &data[4..8] == FTYP_TAG && AVIF_BRANDS.contains(&&data[8..12])
}

/// Hex rendering of the first few bytes, for error messages.
pub fn signature_hex(data: &[u8]) -> String {
    data.iter()
        .take(SNIFF_LEN)
        .map(|b| format!("{:02x}", b))
        .collect()
}
