//! Correlation kernels evaluated at every template placement.
//!
//! Images are interleaved RGB views (see [`crate::image::rgb_view`]); a
//! placement `(x, y)` is the template's top-left corner in pixels.

use crate::template::{TemplatePlan, CHANNELS};
use crate::util::{AutoEditError, AutoEditResult};
use crate::ImageView;

pub mod scalar;

#[cfg(feature = "rayon")]
pub mod rayon;

/// Raw sums gathered for one placement.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowStats {
    /// Sum of `T * I`.
    pub dot: f64,
    /// Sum of `(T - mean_T) * I` (per-channel template mean).
    pub dot_zero_mean: f64,
    /// Sum of `I^2`.
    pub sum_sq: f64,
    /// Per-channel sums of `I`.
    pub sums: [f64; CHANNELS],
}

/// Kernel trait mapping window statistics to a score.
pub trait Kernel {
    /// Computes the score from precomputed window statistics.
    fn score(stats: &WindowStats, plan: &TemplatePlan) -> f32;

    /// Computes the score at a single placement (top-left coordinates).
    fn score_at(image: ImageView<'_, u8>, plan: &TemplatePlan, x: usize, y: usize) -> f32 {
        match window_stats(image, plan, x, y) {
            Some(stats) => Self::score(&stats, plan),
            None => f32::NAN,
        }
    }
}

/// Dense score surface in raster order.
#[derive(Clone, Debug)]
pub struct ScoreMap {
    width: usize,
    height: usize,
    scores: Vec<f32>,
}

impl ScoreMap {
    pub(crate) fn new(width: usize, height: usize, scores: Vec<f32>) -> Self {
        debug_assert_eq!(scores.len(), width * height);
        Self {
            width,
            height,
            scores,
        }
    }

    /// Returns the number of placements along x.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the number of placements along y.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the score at placement `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.scores.get(y * self.width + x).copied()
    }

    /// Iterates `(x, y, score)` in raster order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.scores
            .iter()
            .enumerate()
            .map(move |(i, &s)| (i % self.width, i / self.width, s))
    }
}

/// Number of valid placements along each axis.
pub(crate) fn placement_range(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
) -> AutoEditResult<(usize, usize)> {
    let img_width = image.width() / CHANNELS;
    let img_height = image.height();
    if img_width < plan.width() || img_height < plan.height() {
        return Err(AutoEditError::RoiOutOfBounds {
            x: 0,
            y: 0,
            width: plan.width(),
            height: plan.height(),
            img_width,
            img_height,
        });
    }
    Ok((img_width - plan.width() + 1, img_height - plan.height() + 1))
}

/// Gathers the sums for one placement, or `None` when it is out of range.
pub fn window_stats(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
    x: usize,
    y: usize,
) -> Option<WindowStats> {
    let row_len = plan.width() * CHANNELS;
    let start = x * CHANNELS;
    let data = plan.data();
    let zero_mean = plan.zero_mean();

    let mut stats = WindowStats::default();
    for ty in 0..plan.height() {
        let img_row = image.row(y + ty)?.get(start..start + row_len)?;
        let base = ty * row_len;
        for (i, &value) in img_row.iter().enumerate() {
            let v = f64::from(value);
            stats.dot += f64::from(data[base + i]) * v;
            stats.dot_zero_mean += f64::from(zero_mean[base + i]) * v;
            stats.sum_sq += v * v;
            stats.sums[i % CHANNELS] += v;
        }
    }
    Some(stats)
}
