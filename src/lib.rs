//! autoedit locates target images inside an original image and edits the
//! located regions.
//!
//! Three matcher strategies share one [`Matcher`] capability: normalized
//! template correlation ([`TemplateMatcher`]), perceptual-hash sliding windows
//! ([`HashMatcher`]), and keypoint correspondences with a RANSAC homography
//! ([`SiftMatcher`]). A [`MatcherBuilder`] chains them, serializes to a
//! data-only [`MatcherSpec`], and is fanned out over targets by the
//! dispatcher (thread-parallel with the `rayon` feature). The [`editor`]
//! operations turn the combined match list into sliced (masked and inpainted)
//! or marked images.

mod trace;

pub mod builder;
mod candidate;
pub mod config;
pub mod dispatch;
pub mod editor;
pub mod homography;
pub mod image;
pub mod kernel;
pub mod matchers;
mod refine;
pub mod result;
pub mod spec;
pub mod template;
pub mod util;

pub use crate::image::{load_image, ImageSource, ImageView};
pub use builder::MatcherBuilder;
pub use config::MatcherConfig;
pub use dispatch::dispatch_targets;
pub use editor::{
    find_matches, mark, mark_and_slice, mark_with_matches, slice, slice_with_matches,
};
pub use matchers::{
    guarded_match, HashMatcher, HashMethod, Matcher, SiftMatcher, TemplateMatcher, TemplateMethod,
};
pub use result::{MatchMethod, MatchResult};
pub use spec::{MatcherSpec, ParamMap, ParamValue, SpecItem, SPEC_VERSION};
pub use util::{AutoEditError, AutoEditResult};
