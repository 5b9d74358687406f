//! Match annotation: outlined boxes with a similarity label.

use super::font::{draw_text_mut, text_size};
use crate::result::MatchResult;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

/// Outline and label background color.
pub const MARK_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
/// Label text color.
pub const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
/// Outline thickness in pixels, centred on the box edge.
pub const OUTLINE_THICKNESS: i32 = 3;
/// Label glyph scale.
pub const FONT_SCALE: u32 = 2;
const LABEL_PADDING: i32 = 10;
const TEXT_INSET: i32 = 5;

/// Label text of one match, e.g. `"0.953 - TM_CCOEFF_NORMED"`.
pub fn label(m: &MatchResult) -> String {
    format!("{:.3} - {}", m.similarity, m.method)
}

/// Draws the outline from `(x, y)` to `(x + w, y + h)` inclusive.
fn draw_outline(img: &mut RgbImage, x: i32, y: i32, w: i32, h: i32) {
    let half = OUTLINE_THICKNESS / 2;
    for t in -half..=half {
        let (rw, rh) = (w + 1 - 2 * t, h + 1 - 2 * t);
        if rw > 0 && rh > 0 {
            let rect = Rect::at(x + t, y + t).of_size(rw as u32, rh as u32);
            draw_hollow_rect_mut(img, rect, MARK_COLOR);
        }
    }
}

/// Clamps a box coordinate to `limit + margin`, where everything is already
/// off-canvas.
fn clip(value: u64, limit: u32, margin: u32) -> i32 {
    let bound = u64::from(limit) + u64::from(margin);
    i32::try_from(value.min(bound)).unwrap_or(i32::MAX)
}

/// Annotates one match in place.
pub fn draw_match(img: &mut RgbImage, m: &MatchResult) {
    let text = label(m);
    let (text_w, text_h) = text_size(&text, FONT_SCALE);
    // the label reaches `text_h + LABEL_PADDING` above the box
    let margin = text_h + (LABEL_PADDING + OUTLINE_THICKNESS) as u32;
    let (width, height) = img.dimensions();
    let x = clip(u64::from(m.x), width, margin);
    let y = clip(u64::from(m.y), height, margin);
    let right = clip(u64::from(m.x) + u64::from(m.w), width, margin);
    let bottom = clip(u64::from(m.y) + u64::from(m.h), height, margin);
    draw_outline(img, x, y, right - x, bottom - y);

    let bg_top = y - text_h as i32 - LABEL_PADDING;
    let bg = Rect::at(x, bg_top).of_size(
        text_w + LABEL_PADDING as u32 + 1,
        text_h + LABEL_PADDING as u32 + 1,
    );
    draw_filled_rect_mut(img, bg, MARK_COLOR);
    draw_text_mut(
        img,
        &text,
        x + TEXT_INSET,
        y - TEXT_INSET - text_h as i32,
        FONT_SCALE,
        TEXT_COLOR,
    );
}

#[cfg(test)]
mod tests {
    use super::{draw_match, label, MARK_COLOR};
    use crate::result::{MatchMethod, MatchResult};
    use image::{Rgb, RgbImage};

    #[test]
    fn label_has_three_decimals_and_method() {
        let m = MatchResult::new(0, 0, 5, 5, 0.95312, MatchMethod::CcoeffNormed);
        assert_eq!(label(&m), "0.953 - TM_CCOEFF_NORMED");
    }

    #[test]
    fn outline_is_three_pixels_and_interior_is_untouched() {
        let mut img = RgbImage::from_pixel(200, 120, Rgb([0, 0, 80]));
        let m = MatchResult::new(40, 60, 30, 20, 1.0, MatchMethod::AHash);
        draw_match(&mut img, &m);

        for x in [39, 40, 41] {
            assert_eq!(*img.get_pixel(x, 70), MARK_COLOR);
        }
        assert_eq!(*img.get_pixel(38, 70), Rgb([0, 0, 80]));
        assert_eq!(*img.get_pixel(55, 70), Rgb([0, 0, 80]));
        assert_eq!(*img.get_pixel(71, 70), MARK_COLOR);
        // bottom-right corner
        assert_eq!(*img.get_pixel(70, 80), MARK_COLOR);
    }

    #[test]
    fn boxes_far_past_the_canvas_are_clipped() {
        let background = Rgb([0, 0, 80]);
        let mut img = RgbImage::from_pixel(64, 48, background);
        let wide = MatchResult::new(10, 20, 3_000_000_000, 30, 0.6, MatchMethod::Sift);
        draw_match(&mut img, &wide);

        assert_eq!(*img.get_pixel(10, 40), MARK_COLOR);
        assert_eq!(*img.get_pixel(30, 40), background);
        // top edge runs to the right border
        assert_eq!(*img.get_pixel(63, 20), MARK_COLOR);

        let mut img = RgbImage::from_pixel(64, 48, background);
        let far = MatchResult::new(4_000_000_000, 4_000_000_000, 10, 10, 0.6, MatchMethod::Sift);
        draw_match(&mut img, &far);
        assert!(img.pixels().all(|px| *px == background));
    }
}
