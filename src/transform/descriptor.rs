//! Transformation request parsing.
//!
//! A request is one token path segment followed by the source path:
//!
//! ```text
//! {mode}{width}x{height}[,{color}][,q{quality}][,{format}]/{source path}
//! ```
//!
//! Malformed colors and qualities are not errors: they fall back to the
//! default background (opaque white) and the configured default quality.

use std::fmt;

use crate::error::TransformError;

use super::mode::Mode;

/// Default maximum width/height accepted in a request.
pub const DEFAULT_MAX_DIMENSION: u32 = 2000;

/// Default output quality for lossy formats.
pub const DEFAULT_QUALITY: u8 = 85;

/// Highest accepted quality value.
pub const MAX_QUALITY: u8 = 100;

// =============================================================================
// Color
// =============================================================================

/// RGBA background color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a 6 (RGB) or 8 (RGBA) digit hex string.
    ///
    /// Returns `None` for any other length or for non-hex characters.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(hex, 16).ok()?;
        match hex.len() {
            6 => Some(Self::rgba(
                (value >> 16) as u8,
                (value >> 8) as u8,
                value as u8,
                255,
            )),
            8 => Some(Self::rgba(
                (value >> 24) as u8,
                (value >> 16) as u8,
                (value >> 8) as u8,
                value as u8,
            )),
            _ => None,
        }
    }

    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.a
        )
    }
}

// =============================================================================
// Descriptor
// =============================================================================

/// A fully resolved transformation request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransformDescriptor {
    pub mode: Mode,
    pub width: u32,
    pub height: u32,
    pub background: Color,
    pub quality: u8,
    /// Lowercase output format tag (`jpg`, `png`, `webp`, ...). Empty when
    /// neither an override nor a source extension was given.
    pub format: String,
    /// Key of the original image in the image store.
    pub source_key: String,
}

impl TransformDescriptor {
    /// Thumbnail store key for this descriptor.
    ///
    /// Aliased spellings of the same request (e.g. `w` and `wcc`, or an
    /// omitted vs explicit default quality) produce the same key.
    pub fn cache_key(&self) -> String {
        format!(
            "{}{}x{},{},q{},{}/{}",
            self.mode.token(),
            self.width,
            self.height,
            self.background,
            self.quality,
            self.format,
            self.source_key
        )
    }
}

// =============================================================================
// Parser
// =============================================================================

/// Turns request path segments into [`TransformDescriptor`]s.
///
/// The parser holds only the limits it validates against, so one instance
/// can be shared freely between requests.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorParser {
    max_dimension: u32,
    default_quality: u8,
}

impl Default for DescriptorParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIMENSION, DEFAULT_QUALITY)
    }
}

/// Slot order of the optional comma-separated parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Slot {
    Color,
    Quality,
    Format,
}

impl DescriptorParser {
    pub fn new(max_dimension: u32, default_quality: u8) -> Self {
        Self {
            max_dimension,
            default_quality: default_quality.min(MAX_QUALITY),
        }
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    pub fn default_quality(&self) -> u8 {
        self.default_quality
    }

    /// Parse a token segment and a source path.
    pub fn parse(&self, token: &str, source: &str) -> Result<TransformDescriptor, TransformError> {
        let mut parts = token.split(',');
        let head = parts.next().unwrap_or_default();

        let mode_len = head
            .bytes()
            .take_while(|b| b.is_ascii_lowercase())
            .count();
        let (mode_token, dims) = head.split_at(mode_len);
        let mode = Mode::parse(mode_token)?;
        let (width, height) = self.parse_dimensions(dims)?;

        let mut background = Color::WHITE;
        let mut quality = self.default_quality;
        let mut format_override = None;
        let mut last_slot = None;

        for part in parts {
            let slot = classify(part, last_slot).ok_or_else(|| TransformError::InvalidRequest {
                reason: format!("empty option in token {:?}", token),
            })?;
            if last_slot.is_some_and(|last| slot <= last) {
                return Err(TransformError::InvalidRequest {
                    reason: format!("option {:?} out of order in token {:?}", part, token),
                });
            }
            last_slot = Some(slot);

            match slot {
                Slot::Color => background = Color::from_hex(part).unwrap_or_default(),
                Slot::Quality => quality = self.parse_quality(&part[1..]),
                Slot::Format => format_override = Some(part.to_ascii_lowercase()),
            }
        }

        let source_key = normalize_source(source)?;
        let format = format_override.unwrap_or_else(|| extension_of(&source_key));

        Ok(TransformDescriptor {
            mode,
            width,
            height,
            background,
            quality,
            format,
            source_key,
        })
    }

    fn parse_dimensions(&self, dims: &str) -> Result<(u32, u32), TransformError> {
        let invalid = |reason: String| TransformError::InvalidDimensions { reason };

        let (w, h) = dims
            .split_once('x')
            .ok_or_else(|| invalid(format!("expected WIDTHxHEIGHT, got {:?}", dims)))?;
        let width = parse_positive(w).ok_or_else(|| invalid(format!("bad width {:?}", w)))?;
        let height = parse_positive(h).ok_or_else(|| invalid(format!("bad height {:?}", h)))?;

        if width > self.max_dimension || height > self.max_dimension {
            return Err(TransformError::DimensionsTooLarge {
                width,
                height,
                max: self.max_dimension,
            });
        }

        Ok((width, height))
    }

    fn parse_quality(&self, digits: &str) -> u8 {
        match digits.parse::<u32>() {
            Ok(q) if q <= MAX_QUALITY as u32 => q as u8,
            _ => self.default_quality,
        }
    }
}

/// Output format tags the parser recognises in the color position.
///
/// Any other unrecognised first option is read as a malformed color.
pub const OUTPUT_FORMAT_TAGS: &[&str] = &["jpg", "jpeg", "png", "webp"];

fn classify(part: &str, last: Option<Slot>) -> Option<Slot> {
    if part.is_empty() {
        return None;
    }
    if part.starts_with('q') {
        return Some(Slot::Quality);
    }
    if part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Some(Slot::Color);
    }
    let is_format = OUTPUT_FORMAT_TAGS
        .iter()
        .any(|tag| tag.eq_ignore_ascii_case(part));
    if last.is_none() && !is_format {
        return Some(Slot::Color);
    }
    Some(Slot::Format)
}

fn parse_positive(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok().filter(|v| *v > 0)
}

/// Strip the leading slash and reject paths that could escape the store root.
fn normalize_source(source: &str) -> Result<String, TransformError> {
    let trimmed = source.trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(TransformError::InvalidRequest {
            reason: "missing source path".to_string(),
        });
    }
    if trimmed
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(TransformError::InvalidRequest {
            reason: format!("invalid source path {:?}", source),
        });
    }
    Ok(trimmed.to_string())
}

fn extension_of(source_key: &str) -> String {
    let file_name = source_key.rsplit('/').next().unwrap_or(source_key);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}
