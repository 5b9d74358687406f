//! Area-averaging resize for grayscale views.
//!
//! Each destination sample is the mean of the source area it covers, with
//! fractional weights on partially covered source pixels. Upscaling degrades
//! to nearest-neighbor blending. Output is `f32` in row-major order, or
//! rounded `u8` samples from [`resize_area_u8`].

use crate::image::ImageView;

/// Source taps contributing to one destination index along an axis.
struct AxisTaps {
    start: usize,
    weights: Vec<f32>,
}

fn axis_taps(src_len: usize, dst_len: usize) -> Vec<AxisTaps> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let lo = d as f64 * scale;
            let hi = (d + 1) as f64 * scale;
            let start = lo.floor() as usize;
            let end = (hi.ceil() as usize).min(src_len).max(start + 1);
            let weights = (start..end)
                .map(|s| {
                    let overlap = (hi.min((s + 1) as f64) - lo.max(s as f64)).max(0.0);
                    (overlap / scale) as f32
                })
                .collect();
            AxisTaps { start, weights }
        })
        .collect()
}

/// Resizes a grayscale view to `dst_width x dst_height` by area averaging.
pub fn resize_area(src: ImageView<'_, u8>, dst_width: usize, dst_height: usize) -> Vec<f32> {
    let x_taps = axis_taps(src.width(), dst_width);
    let y_taps = axis_taps(src.height(), dst_height);

    let mut horizontal = vec![0.0f32; src.height() * dst_width];
    for y in 0..src.height() {
        let Some(row) = src.row(y) else {
            continue;
        };
        let out = &mut horizontal[y * dst_width..(y + 1) * dst_width];
        for (dx, taps) in x_taps.iter().enumerate() {
            out[dx] = taps
                .weights
                .iter()
                .enumerate()
                .map(|(i, w)| w * f32::from(row[taps.start + i]))
                .sum();
        }
    }

    let mut out = vec![0.0f32; dst_width * dst_height];
    for (dy, taps) in y_taps.iter().enumerate() {
        for (i, w) in taps.weights.iter().enumerate() {
            let src_row = &horizontal[(taps.start + i) * dst_width..(taps.start + i + 1) * dst_width];
            let dst_row = &mut out[dy * dst_width..(dy + 1) * dst_width];
            for (d, s) in dst_row.iter_mut().zip(src_row) {
                *d += w * s;
            }
        }
    }
    out
}

/// Area-averaging resize rounded back to 8-bit samples.
pub fn resize_area_u8(src: ImageView<'_, u8>, dst_width: usize, dst_height: usize) -> Vec<u8> {
    resize_area(src, dst_width, dst_height)
        .into_iter()
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{resize_area, resize_area_u8};
    use crate::image::ImageView;

    #[test]
    fn halving_averages_two_by_two_blocks() {
        let data = [0u8, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120, 130, 140, 150];
        let view = ImageView::from_slice(&data, 4, 4).unwrap();
        let out = resize_area(view, 2, 2);
        assert!((out[0] - 25.0).abs() < 1e-4);
        assert!((out[1] - 45.0).abs() < 1e-4);
        assert!((out[2] - 105.0).abs() < 1e-4);
        assert!((out[3] - 125.0).abs() < 1e-4);
    }

    #[test]
    fn identity_size_preserves_values() {
        let data: Vec<u8> = (0..15).map(|v| v * 7).collect();
        let view = ImageView::from_slice(&data, 5, 3).unwrap();
        let out = resize_area(view, 5, 3);
        for (a, b) in out.iter().zip(&data) {
            assert!((a - f32::from(*b)).abs() < 1e-4);
        }
    }

    #[test]
    fn fractional_downscale_keeps_mean() {
        let data: Vec<u8> = (0..49).map(|v| (v * 5 % 256) as u8).collect();
        let view = ImageView::from_slice(&data, 7, 7).unwrap();
        let out = resize_area(view, 3, 3);
        let src_mean = data.iter().map(|&v| f32::from(v)).sum::<f32>() / 49.0;
        let dst_mean = out.iter().sum::<f32>() / 9.0;
        assert!((src_mean - dst_mean).abs() < 1e-2);
    }

    #[test]
    fn quantized_resize_rounds_to_nearest() {
        // block means 10.25, 10.75, 10.0, 254.5
        let data = [
            10u8, 10, 10, 11, 10, 10, //
            10, 11, 11, 11, 10, 10, //
            254, 255, 0, 0, 0, 0, //
            254, 255, 0, 0, 0, 0,
        ];
        let view = ImageView::from_slice(&data, 6, 4).unwrap();
        assert_eq!(resize_area_u8(view, 3, 2), vec![10, 11, 10, 255, 0, 0]);
    }
}
