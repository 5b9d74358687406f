//! End-user edit operations built on the matcher chain.
//!
//! Every operation loads its inputs (any load failure is returned), matches
//! every target against the original, and derives its output from the
//! combined match list. `None` means no target matched anywhere.

use crate::builder::MatcherBuilder;
use crate::dispatch::dispatch_targets;
use crate::image::{load_targets, ImageSource};
use crate::result::MatchResult;
use crate::trace::{trace_debug, trace_span, trace_warn};
use crate::util::AutoEditResult;
use image::RgbImage;

pub mod draw;
pub mod font;
pub mod inpaint;
pub mod mask;

pub use draw::{draw_match, label};
pub use inpaint::{inpaint_telea, DEFAULT_RADIUS};
pub use mask::build_mask;

fn load_and_match(
    original: &ImageSource,
    targets: &[ImageSource],
    builder: &MatcherBuilder,
    workers: Option<usize>,
) -> AutoEditResult<(RgbImage, Vec<MatchResult>)> {
    let original = original.load()?;
    let targets = load_targets(targets)?;
    let matches = dispatch_targets(&original, &targets, builder, workers)?;
    trace_debug!("found {} matches over {} targets", matches.len(), targets.len());
    Ok((original, matches))
}

/// Finds every occurrence of every target in the original.
///
/// `workers` of `Some(1)` runs in the calling thread; `None` uses one worker
/// per host core. Results are concatenated with no cross-target dedup.
pub fn find_matches(
    original: &ImageSource,
    targets: &[ImageSource],
    builder: &MatcherBuilder,
    workers: Option<usize>,
) -> AutoEditResult<Vec<MatchResult>> {
    let _span = trace_span!("find_matches").entered();
    load_and_match(original, targets, builder, workers).map(|(_, matches)| matches)
}

/// Removes matched regions from `original`.
///
/// With `inpaint` the regions are reconstructed from their surroundings,
/// otherwise they are painted white.
pub fn slice_with_matches(original: &RgbImage, matches: &[MatchResult], inpaint: bool) -> RgbImage {
    let mask = build_mask(original.width(), original.height(), matches);
    let mut out = original.clone();
    if inpaint {
        inpaint_telea(&mut out, &mask, DEFAULT_RADIUS);
    } else {
        mask::fill_white(&mut out, &mask);
    }
    out
}

/// Draws every match on a copy of `original`.
pub fn mark_with_matches(original: &RgbImage, matches: &[MatchResult]) -> RgbImage {
    let mut out = original.clone();
    for (i, m) in matches.iter().enumerate() {
        draw_match(&mut out, m);
        trace_debug!(
            "  region {}: ({}, {}, {}, {}) similarity {:.4}",
            i + 1,
            m.x,
            m.y,
            m.w,
            m.h,
            m.similarity
        );
    }
    out
}

/// Finds the targets and removes them from the original.
pub fn slice(
    original: &ImageSource,
    targets: &[ImageSource],
    builder: &MatcherBuilder,
    inpaint: bool,
    workers: Option<usize>,
) -> AutoEditResult<Option<RgbImage>> {
    let _span = trace_span!("slice", inpaint = inpaint).entered();
    let (original, matches) = load_and_match(original, targets, builder, workers)?;
    if matches.is_empty() {
        trace_warn!("no match");
        return Ok(None);
    }
    Ok(Some(slice_with_matches(&original, &matches, inpaint)))
}

/// Finds the targets and marks them on the original.
pub fn mark(
    original: &ImageSource,
    targets: &[ImageSource],
    builder: &MatcherBuilder,
    workers: Option<usize>,
) -> AutoEditResult<Option<RgbImage>> {
    let _span = trace_span!("mark").entered();
    let (original, matches) = load_and_match(original, targets, builder, workers)?;
    if matches.is_empty() {
        trace_warn!("no match");
        return Ok(None);
    }
    Ok(Some(mark_with_matches(&original, &matches)))
}

/// Matches once and returns `(sliced, marked)`.
pub fn mark_and_slice(
    original: &ImageSource,
    targets: &[ImageSource],
    builder: &MatcherBuilder,
    inpaint: bool,
    workers: Option<usize>,
) -> AutoEditResult<Option<(RgbImage, RgbImage)>> {
    let _span = trace_span!("mark_and_slice", inpaint = inpaint).entered();
    let (original, matches) = load_and_match(original, targets, builder, workers)?;
    if matches.is_empty() {
        trace_warn!("no match");
        return Ok(None);
    }
    let sliced = slice_with_matches(&original, &matches, inpaint);
    let marked = mark_with_matches(&original, &matches);
    Ok(Some((sliced, marked)))
}
