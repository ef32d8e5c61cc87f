//! Transformation engine.
//!
//! ```text
//! "wcc100x100,ff0000/photos/cat.jpg"
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  DescriptorParser   │  token → TransformDescriptor
//! └──────────┬──────────┘
//!            ▼
//! ┌─────────────────────┐
//! │  geometry::resolve  │  source size + mode → scaled size, offset, canvas
//! └──────────┬──────────┘
//!            ▼
//! ┌─────────────────────┐
//! │ compositor::compose │  resample, pad or crop
//! └─────────────────────┘
//! ```
//!
//! Decoding and encoding live in [`crate::codec`].

pub mod compositor;
pub mod descriptor;
pub mod geometry;
pub mod mode;

pub use compositor::{compose, RESAMPLE_FILTER};
pub use descriptor::{
    Color, DescriptorParser, TransformDescriptor, DEFAULT_MAX_DIMENSION, DEFAULT_QUALITY,
    MAX_QUALITY,
};
pub use geometry::{cover_size, fit_size, resolve, Geometry};
pub use mode::{Anchor, HorizontalAnchor, Mode, VerticalAnchor};

use image::{DynamicImage, GenericImageView};

/// Resolve geometry for `source` and render it per `descriptor`.
pub fn render(source: &DynamicImage, descriptor: &TransformDescriptor) -> DynamicImage {
    let geometry = resolve(
        source.dimensions(),
        (descriptor.width, descriptor.height),
        descriptor.mode,
    );
    compose(source, &geometry, descriptor.mode, descriptor.background)
}
