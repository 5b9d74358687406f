//! Template plan precomputation for normalized correlation metrics.

use crate::image::rgb_view;
use crate::util::{AutoEditError, AutoEditResult};
use image::RgbImage;

/// Channels per pixel in the interleaved buffers.
pub const CHANNELS: usize = 3;

/// Precomputed statistics for an interleaved RGB template.
///
/// `width` counts pixels; rows of `data` and `zero_mean` hold
/// `width * CHANNELS` samples.
pub struct TemplatePlan {
    width: usize,
    height: usize,
    data: Vec<f32>,
    zero_mean: Vec<f32>,
    means: [f64; CHANNELS],
    sum_sq: f64,
    var_t: f64,
}

impl TemplatePlan {
    /// Builds a plan from an RGB template.
    pub fn from_rgb(tpl: &RgbImage) -> AutoEditResult<Self> {
        let view = rgb_view(tpl)?;
        let width = tpl.width() as usize;
        let height = tpl.height() as usize;
        let pixels = width
            .checked_mul(height)
            .ok_or(AutoEditError::InvalidDimensions { width, height })?;

        let mut sums = [0.0f64; CHANNELS];
        let mut sum_sq = 0.0f64;
        let mut data = Vec::with_capacity(pixels * CHANNELS);
        for y in 0..height {
            let row = view.row(y).ok_or(AutoEditError::BufferTooSmall {
                needed: (y + 1) * view.stride(),
                got: view.as_slice().len(),
            })?;
            for (i, &value) in row.iter().enumerate() {
                let v = f64::from(value);
                sums[i % CHANNELS] += v;
                sum_sq += v * v;
                data.push(value as f32);
            }
        }

        let n = pixels as f64;
        let means = sums.map(|s| s / n);
        let mut var_t = 0.0f64;
        let zero_mean: Vec<f32> = data
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let d = f64::from(v) - means[i % CHANNELS];
                var_t += d * d;
                d as f32
            })
            .collect();

        Ok(Self {
            width,
            height,
            data,
            zero_mean,
            means,
            sum_sq,
            var_t,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Returns the raw interleaved samples in row-major order.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns the per-channel zero-mean samples in row-major order.
    pub fn zero_mean(&self) -> &[f32] {
        &self.zero_mean
    }

    /// Returns the per-channel means.
    pub fn means(&self) -> [f64; CHANNELS] {
        self.means
    }

    /// Returns the sum of squared samples.
    pub fn sum_sq(&self) -> f64 {
        self.sum_sq
    }

    /// Returns the sum of squared zero-mean samples.
    pub fn var_t(&self) -> f64 {
        self.var_t
    }
}
