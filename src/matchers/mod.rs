//! Matcher variants and the guarded invocation shared by all of them.
//!
//! Every variant implements [`Matcher::match_impl`]; callers go through
//! [`guarded_match`], which validates the image pair and turns any error or
//! panic raised inside the variant into an empty result.

use crate::config::MatcherConfig;
use crate::result::MatchResult;
use crate::spec::SpecItem;
use crate::trace::{trace_debug, trace_warn};
use crate::util::AutoEditResult;
use image::RgbImage;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

pub mod fingerprint;
pub mod hash;
pub mod sift;
pub mod template;

pub use hash::{HashMatcher, HashMethod};
pub use sift::SiftMatcher;
pub use template::{TemplateMatcher, TemplateMethod};

/// Smallest accepted target edge length in pixels.
pub const MIN_TARGET_SIZE: u32 = 5;

/// Capability to locate a target image inside an original image.
pub trait Matcher: Send + Sync {
    /// Human-readable name used in log lines.
    fn name(&self) -> String;

    /// Runs the variant algorithm on a validated image pair.
    ///
    /// Implementations may assume both images are present, the target fits
    /// inside the original, and the target is at least 5x5.
    fn match_impl(
        &self,
        original: &RgbImage,
        target: &RgbImage,
        cfg: &MatcherConfig,
    ) -> AutoEditResult<Vec<MatchResult>>;

    /// Data-only description used to rebuild this matcher elsewhere.
    ///
    /// Matchers that cannot be described return `None` and make the owning
    /// builder non-serializable.
    fn spec_item(&self) -> Option<SpecItem> {
        None
    }
}

/// Validates the pair, runs the matcher, and isolates its failures.
pub fn guarded_match(
    matcher: &dyn Matcher,
    original: Option<&RgbImage>,
    target: Option<&RgbImage>,
    cfg: &MatcherConfig,
) -> Vec<MatchResult> {
    let (Some(original), Some(target)) = (original, target) else {
        trace_debug!("[{}] image is missing", matcher.name());
        return Vec::new();
    };

    let (orig_w, orig_h) = original.dimensions();
    let (targ_w, targ_h) = target.dimensions();
    if targ_w > orig_w || targ_h > orig_h {
        trace_debug!(
            "[{}] target {}x{} larger than original {}x{}",
            matcher.name(),
            targ_w,
            targ_h,
            orig_w,
            orig_h
        );
        return Vec::new();
    }
    if targ_w < MIN_TARGET_SIZE || targ_h < MIN_TARGET_SIZE {
        trace_debug!(
            "[{}] target {}x{} is too small",
            matcher.name(),
            targ_w,
            targ_h
        );
        return Vec::new();
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        matcher.match_impl(original, target, cfg)
    }));
    match outcome {
        Ok(Ok(matches)) => {
            log_result(matcher, &matches);
            matches
        }
        Ok(Err(err)) => {
            trace_warn!("[{}] matching error: {}", matcher.name(), err);
            Vec::new()
        }
        Err(payload) => {
            trace_warn!(
                "[{}] matcher panicked: {}",
                matcher.name(),
                panic_message(payload.as_ref())
            );
            Vec::new()
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn log_result(matcher: &dyn Matcher, matches: &[MatchResult]) {
    trace_debug!("[{}] {} matches", matcher.name(), matches.len());
    for (i, m) in matches.iter().take(3).enumerate() {
        trace_debug!(
            "  {}. ({}, {}) {}x{} similarity {:.3}",
            i + 1,
            m.x,
            m.y,
            m.w,
            m.h,
            m.similarity
        );
    }
    if matches.len() > 3 {
        trace_debug!("  ... and {} more", matches.len() - 3);
    }
}
