//! Scalar reference kernels for the normalized template metrics.
//!
//! Definitions follow the usual normalized forms summed over all channels:
//!
//! - CCORR_NORMED: `sum(T*I) / sqrt(sum(T^2) * sum(I^2))`
//! - CCOEFF_NORMED: zero-mean correlation over zero-mean energies
//! - SQDIFF_NORMED: `sum((T-I)^2) / sqrt(sum(T^2) * sum(I^2))`
//!
//! A vanishing denominator scores 0 for the correlation forms and 1 (worst)
//! for the squared-difference form.

use crate::kernel::{placement_range, window_stats, Kernel, ScoreMap, WindowStats};
use crate::template::{TemplatePlan, CHANNELS};
use crate::util::AutoEditResult;
use crate::ImageView;

const MIN_DENOM: f64 = 1e-12;

/// Normalized cross-correlation.
pub struct CcorrNormedScalar;

/// Zero-mean normalized cross-correlation.
pub struct CcoeffNormedScalar;

/// Normalized squared difference (lower is better).
pub struct SqdiffNormedScalar;

impl Kernel for CcorrNormedScalar {
    fn score(stats: &WindowStats, plan: &TemplatePlan) -> f32 {
        let denom = (plan.sum_sq() * stats.sum_sq).sqrt();
        if denom <= MIN_DENOM {
            return 0.0;
        }
        (stats.dot / denom) as f32
    }
}

impl Kernel for CcoeffNormedScalar {
    fn score(stats: &WindowStats, plan: &TemplatePlan) -> f32 {
        let n = plan.pixel_count() as f64;
        let mean_energy: f64 = (0..CHANNELS).map(|c| stats.sums[c] * stats.sums[c] / n).sum();
        let var_i = (stats.sum_sq - mean_energy).max(0.0);
        let denom = (plan.var_t() * var_i).sqrt();
        if denom <= MIN_DENOM {
            return 0.0;
        }
        (stats.dot_zero_mean / denom) as f32
    }
}

impl Kernel for SqdiffNormedScalar {
    fn score(stats: &WindowStats, plan: &TemplatePlan) -> f32 {
        let denom = (plan.sum_sq() * stats.sum_sq).sqrt();
        if denom <= MIN_DENOM {
            return 1.0;
        }
        let sqdiff = (plan.sum_sq() + stats.sum_sq - 2.0 * stats.dot).max(0.0);
        (sqdiff / denom) as f32
    }
}

/// Scans every valid placement and returns the score surface.
pub fn scan_full<K: Kernel>(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
) -> AutoEditResult<ScoreMap> {
    let (out_w, out_h) = placement_range(image, plan)?;
    let mut scores = Vec::with_capacity(out_w * out_h);
    for y in 0..out_h {
        for x in 0..out_w {
            let score = window_stats(image, plan, x, y)
                .map(|stats| K::score(&stats, plan))
                .unwrap_or(f32::NAN);
            scores.push(score);
        }
    }
    Ok(ScoreMap::new(out_w, out_h, scores))
}
