//! Pixel compositing.
//!
//! Every resample uses Lanczos3. Fit keeps the source color type; pad and
//! crop produce a canvas of exactly the target size.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

use super::descriptor::Color;
use super::geometry::Geometry;
use super::mode::Mode;

/// Filter used for all scaling.
pub const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// Render `source` according to `geometry`.
///
/// `background` is only used by pad modes.
pub fn compose(
    source: &DynamicImage,
    geometry: &Geometry,
    mode: Mode,
    background: Color,
) -> DynamicImage {
    let (canvas_w, canvas_h) = geometry.canvas;
    let (x, y) = geometry.offset;

    match mode {
        Mode::Fit => scale(source, geometry.scaled),
        Mode::Pad(_) => {
            let scaled = scale(source, geometry.scaled);
            let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, Rgba(background.to_array()));
            imageops::overlay(&mut canvas, &scaled.to_rgba8(), x as i64, y as i64);
            DynamicImage::ImageRgba8(canvas)
        }
        Mode::Crop(_) => {
            // Resample only the part of the source that lands in the window.
            let (sx, sy, sw, sh) = geometry.source_window(source.dimensions());
            let window = source.crop_imm(sx, sy, sw, sh);
            scale(&window, geometry.canvas)
        }
    }
}

fn scale(source: &DynamicImage, (width, height): (u32, u32)) -> DynamicImage {
    if source.dimensions() == (width, height) {
        source.clone()
    } else {
        source.resize_exact(width, height, RESAMPLE_FILTER)
    }
}
