//! Perceptual-hash sliding window matcher.

use crate::config::MatcherConfig;
use crate::image::{gray_view, to_gray};
use crate::matchers::fingerprint::{average_hash, difference_hash, perceptual_hash, Fingerprint};
use crate::matchers::Matcher;
use crate::result::{MatchMethod, MatchResult};
use crate::spec::{ParamMap, SpecItem};
use crate::trace::{trace_debug, trace_span};
use crate::util::{AutoEditError, AutoEditResult};
use crate::ImageView;
use image::RgbImage;
use std::fmt;
use std::str::FromStr;

/// Descriptor kind tag for hash matchers.
pub const HASH_KIND: &str = "hash";

/// Default qualifying similarity for hash matching.
pub const DEFAULT_HASH_THRESHOLD: f64 = 0.95;
/// Default fingerprint side length.
pub const DEFAULT_HASH_SIZE: usize = 8;
/// Default window stride as a fraction of the target size.
pub const DEFAULT_STRIDE_RATIO: f64 = 0.25;

/// Fingerprint algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashMethod {
    AHash,
    PHash,
    DHash,
}

impl HashMethod {
    /// Returns the method name used in descriptors and match tags.
    pub fn as_str(self) -> &'static str {
        self.match_method().as_str()
    }

    /// Returns the tag attached to results.
    pub fn match_method(self) -> MatchMethod {
        match self {
            Self::AHash => MatchMethod::AHash,
            Self::PHash => MatchMethod::PHash,
            Self::DHash => MatchMethod::DHash,
        }
    }
}

impl FromStr for HashMethod {
    type Err = AutoEditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AHASH" => Ok(Self::AHash),
            "PHASH" => Ok(Self::PHash),
            "DHASH" => Ok(Self::DHash),
            other => Err(AutoEditError::InvalidMethod {
                kind: "hash",
                method: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for HashMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slides a target-sized window over the original and compares fingerprints.
///
/// Every qualifying window is reported; no overlap suppression is applied.
#[derive(Clone, Debug)]
pub struct HashMatcher {
    threshold: f64,
    method: HashMethod,
    hash_size: usize,
    stride_ratio: f64,
}

impl HashMatcher {
    /// Creates a matcher with the default hash size and stride ratio.
    pub fn new(threshold: f64, method: HashMethod) -> AutoEditResult<Self> {
        Self::with_params(threshold, method, DEFAULT_HASH_SIZE, DEFAULT_STRIDE_RATIO)
    }

    /// Creates a matcher with explicit hash size and stride ratio.
    pub fn with_params(
        threshold: f64,
        method: HashMethod,
        hash_size: usize,
        stride_ratio: f64,
    ) -> AutoEditResult<Self> {
        if !threshold.is_finite() {
            return Err(AutoEditError::InvalidParameter("hash threshold must be finite"));
        }
        if hash_size < 2 {
            return Err(AutoEditError::InvalidParameter("hash_size must be at least 2"));
        }
        if !(stride_ratio > 0.0 && stride_ratio <= 1.0) {
            return Err(AutoEditError::InvalidParameter("stride_ratio must be in (0, 1]"));
        }
        Ok(Self {
            threshold,
            method,
            hash_size,
            stride_ratio,
        })
    }

    /// Rebuilds a matcher from a descriptor item.
    pub fn from_spec(item: &SpecItem) -> AutoEditResult<Self> {
        Self::with_params(
            item.f64_param("threshold")?,
            item.str_param("method")?.parse()?,
            item.usize_param("hash_size")?,
            item.f64_param("stride_ratio")?,
        )
    }

    /// Returns the qualifying threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns the fingerprint algorithm.
    pub fn method(&self) -> HashMethod {
        self.method
    }

    /// Returns the fingerprint side length.
    pub fn hash_size(&self) -> usize {
        self.hash_size
    }

    /// Returns the stride ratio.
    pub fn stride_ratio(&self) -> f64 {
        self.stride_ratio
    }

    /// Fingerprints a grayscale patch with the configured algorithm.
    pub fn fingerprint(&self, patch: ImageView<'_, u8>) -> Fingerprint {
        match self.method {
            HashMethod::AHash => average_hash(patch, self.hash_size),
            HashMethod::PHash => perceptual_hash(patch, self.hash_size),
            HashMethod::DHash => difference_hash(patch, self.hash_size),
        }
    }

    fn stride(&self, dim: u32) -> usize {
        ((f64::from(dim) * self.stride_ratio) as usize).max(1)
    }
}

impl Matcher for HashMatcher {
    fn name(&self) -> String {
        format!("Hash - {}", self.method)
    }

    fn match_impl(
        &self,
        original: &RgbImage,
        target: &RgbImage,
        _cfg: &MatcherConfig,
    ) -> AutoEditResult<Vec<MatchResult>> {
        let _span = trace_span!("hash_match", method = self.method.as_str()).entered();

        let target_gray = to_gray(target);
        let original_gray = to_gray(original);
        let template_hash = self.fingerprint(gray_view(&target_gray)?);
        let original_view = gray_view(&original_gray)?;

        let (targ_w, targ_h) = target.dimensions();
        let (orig_w, orig_h) = original.dimensions();
        let stride_x = self.stride(targ_w);
        let stride_y = self.stride(targ_h);
        let max_x = (orig_w - targ_w) as usize;
        let max_y = (orig_h - targ_h) as usize;
        trace_debug!(
            "[{}] {} windows (stride {}x{})",
            self.name(),
            (max_y / stride_y + 1) * (max_x / stride_x + 1),
            stride_x,
            stride_y
        );

        let tag = self.method.match_method();
        let mut matches = Vec::new();
        for y in (0..=max_y).step_by(stride_y) {
            for x in (0..=max_x).step_by(stride_x) {
                let window = original_view.roi(x, y, targ_w as usize, targ_h as usize)?;
                let similarity = template_hash.similarity(&self.fingerprint(window));
                if similarity >= self.threshold {
                    matches.push(MatchResult::new(
                        x as i64,
                        y as i64,
                        targ_w,
                        targ_h,
                        similarity as f32,
                        tag,
                    ));
                }
            }
        }
        Ok(matches)
    }

    fn spec_item(&self) -> Option<SpecItem> {
        let mut params = ParamMap::new();
        params.insert("threshold".into(), self.threshold.into());
        params.insert("method".into(), self.method.as_str().into());
        params.insert("hash_size".into(), self.hash_size.into());
        params.insert("stride_ratio".into(), self.stride_ratio.into());
        Some(SpecItem(HASH_KIND.to_string(), params))
    }
}
