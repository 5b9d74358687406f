//! Binary masks of matched regions.

use crate::result::MatchResult;
use image::{GrayImage, Luma, Rgb, RgbImage};

/// Mask value of a matched pixel.
pub const MASKED: u8 = 255;

/// Builds a `width x height` mask with every matched rectangle set to
/// [`MASKED`]; rectangles are clipped to the image.
pub fn build_mask(width: u32, height: u32, matches: &[MatchResult]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    for m in matches {
        let x1 = m.x.saturating_add(m.w).min(width);
        let y1 = m.y.saturating_add(m.h).min(height);
        for y in m.y.min(height)..y1 {
            for x in m.x.min(width)..x1 {
                mask.put_pixel(x, y, Luma([MASKED]));
            }
        }
    }
    mask
}

/// Paints every masked pixel pure white.
pub fn fill_white(img: &mut RgbImage, mask: &GrayImage) {
    for (px, m) in img.pixels_mut().zip(mask.pixels()) {
        if m[0] == MASKED {
            *px = Rgb([255, 255, 255]);
        }
    }
}
