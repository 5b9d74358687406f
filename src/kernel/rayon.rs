//! Rayon-parallel score surfaces (feature-gated).
//!
//! Rows of placements are distributed across threads; the resulting surface
//! is identical to [`scan_full`](crate::kernel::scalar::scan_full).

use crate::kernel::{placement_range, window_stats, Kernel, ScoreMap};
use crate::template::TemplatePlan;
use crate::util::AutoEditResult;
use crate::ImageView;
use rayon::prelude::*;

/// Row-parallel full scan.
pub fn scan_full_par<K: Kernel>(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
) -> AutoEditResult<ScoreMap> {
    let (out_w, out_h) = placement_range(image, plan)?;

    let rows: Vec<Vec<f32>> = (0..out_h)
        .into_par_iter()
        .map(|y| {
            (0..out_w)
                .map(|x| {
                    window_stats(image, plan, x, y)
                        .map(|stats| K::score(&stats, plan))
                        .unwrap_or(f32::NAN)
                })
                .collect()
        })
        .collect();

    Ok(ScoreMap::new(out_w, out_h, rows.concat()))
}
