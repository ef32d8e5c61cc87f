//! Output geometry for each mode family.
//!
//! All arithmetic is on integer pixel coordinates. Center offsets truncate
//! toward zero.
//!
//! - **Fit** never upscales: a source already inside the target box keeps
//!   its native size.
//! - **Pad** uses the fit size and places it on a target-sized canvas.
//! - **Crop** uses the cover size (which may upscale) and cuts a
//!   target-sized window out of it.

use super::mode::Mode;

/// Resolved layout of a thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Size the source is resampled to.
    pub scaled: (u32, u32),
    /// Pad: where the scaled image lands on the canvas.
    /// Crop: origin of the window inside the scaled image.
    pub offset: (u32, u32),
    /// Size of the output image.
    pub canvas: (u32, u32),
}

impl Geometry {
    /// Crop: the source region `(x, y, width, height)` that maps onto the
    /// output window, so only that region needs resampling.
    pub fn source_window(&self, source: (u32, u32)) -> (u32, u32, u32, u32) {
        let (x, width) = project(self.offset.0, self.canvas.0, self.scaled.0, source.0);
        let (y, height) = project(self.offset.1, self.canvas.1, self.scaled.1, source.1);
        (x, y, width, height)
    }
}

/// Map the span `[offset, offset + len)` of a `scaled`-long axis back onto a
/// `source`-long axis. The result is at least one pixel and stays in bounds.
fn project(offset: u32, len: u32, scaled: u32, source: u32) -> (u32, u32) {
    let (offset, len) = (offset as u64, len as u64);
    let (scaled, source) = (scaled.max(1) as u64, source.max(1) as u64);

    let start = (offset * source / scaled).min(source - 1);
    let end = ((offset + len) * source)
        .div_ceil(scaled)
        .clamp(start + 1, source);

    (start as u32, (end - start) as u32)
}

/// Compute the geometry for a source of `source` size rendered into `target`
/// with the given mode.
///
/// Zero-sized sources or targets are treated as 1 pixel.
pub fn resolve(source: (u32, u32), target: (u32, u32), mode: Mode) -> Geometry {
    let source = (source.0.max(1), source.1.max(1));
    let target = (target.0.max(1), target.1.max(1));

    match mode {
        Mode::Fit => {
            let scaled = fit_size(source, target);
            Geometry {
                scaled,
                offset: (0, 0),
                canvas: scaled,
            }
        }
        Mode::Pad(anchor) => {
            let scaled = fit_size(source, target);
            let slack_x = target.0 - scaled.0;
            let slack_y = target.1 - scaled.1;
            Geometry {
                scaled,
                offset: anchor.offsets(slack_x, slack_y),
                canvas: target,
            }
        }
        Mode::Crop(anchor) => {
            let scaled = cover_size(source, target);
            let slack_x = scaled.0.saturating_sub(target.0);
            let slack_y = scaled.1.saturating_sub(target.1);
            let (x, y) = anchor.offsets(slack_x, slack_y);
            Geometry {
                scaled,
                offset: (x.min(slack_x), y.min(slack_y)),
                canvas: target,
            }
        }
    }
}

/// Largest size that fits inside `target` while preserving aspect ratio.
///
/// Returns `source` unchanged when it already fits.
pub fn fit_size(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = (source.0 as u64, source.1 as u64);
    let (max_w, max_h) = (target.0 as u64, target.1 as u64);

    if src_w <= max_w && src_h <= max_h {
        return source;
    }

    let (mut w, mut h) = (src_w, src_h);
    if w > max_w {
        h = (src_h * max_w / src_w).max(1);
        w = max_w;
    }
    if h > max_h {
        w = (w * max_h / h).max(1);
        h = max_h;
    }

    (w as u32, h as u32)
}

/// Smallest size that covers `target` while preserving aspect ratio.
///
/// One side always equals its target exactly; the other is at least its
/// target. Sources smaller than the target are scaled up.
pub fn cover_size(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = (source.0 as u64, source.1 as u64);
    let (tgt_w, tgt_h) = (target.0 as u64, target.1 as u64);

    // Compare tgt_w/src_w against tgt_h/src_h without division.
    let (w, h) = if tgt_w * src_h >= tgt_h * src_w {
        (tgt_w, (src_h * tgt_w / src_w).max(tgt_h))
    } else {
        ((src_w * tgt_h / src_h).max(tgt_w), tgt_h)
    };

    (clamp_u32(w), clamp_u32(h))
}

fn clamp_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}
