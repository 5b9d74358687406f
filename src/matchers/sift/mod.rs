//! Keypoint matcher: ratio-tested descriptor correspondences plus a RANSAC
//! homography from target to original.

use crate::config::MatcherConfig;
use crate::homography::{fit_homography_ransac, project, RansacParams};
use crate::image::to_gray;
use crate::matchers::Matcher;
use crate::result::{MatchMethod, MatchResult};
use crate::spec::{ParamMap, SpecItem};
use crate::trace::{trace_debug, trace_span};
use crate::util::{AutoEditError, AutoEditResult};
use image::RgbImage;

pub mod detect;
pub mod kdtree;

pub use detect::{detect_and_describe, Descriptor, Features, Keypoint};
use kdtree::{KdTree, DEFAULT_CHECKS};

/// Descriptor kind tag for keypoint matchers.
pub const SIFT_KIND: &str = "sift";

/// Default number of ratio-test survivors required for a homography.
pub const DEFAULT_MIN_MATCH_COUNT: usize = 10;
/// Default neighbour count per target descriptor.
pub const DEFAULT_KNN_INDEX: usize = 2;

/// Reprojection tolerance in pixels for RANSAC.
const REPROJECTION_TOLERANCE: f64 = 5.0;
const RANSAC_SEED: u64 = 0x5eed;

/// Locates a target via keypoint correspondences and a homography.
///
/// `threshold` is the Lowe ratio: a target descriptor survives when its
/// nearest original descriptor is closer than `threshold` times the second
/// nearest. At most one result (the bounding box of the projected target
/// corners) is produced.
#[derive(Clone, Debug)]
pub struct SiftMatcher {
    threshold: f64,
    min_match_count: usize,
    knn_index: usize,
}

impl SiftMatcher {
    /// Creates a matcher with the default survivor count and neighbour count.
    pub fn new(threshold: f64) -> AutoEditResult<Self> {
        Self::with_params(threshold, DEFAULT_MIN_MATCH_COUNT, DEFAULT_KNN_INDEX)
    }

    /// Creates a matcher with explicit parameters; `knn_index` must be >= 2.
    pub fn with_params(
        threshold: f64,
        min_match_count: usize,
        knn_index: usize,
    ) -> AutoEditResult<Self> {
        if !threshold.is_finite() {
            return Err(AutoEditError::InvalidParameter("sift ratio threshold must be finite"));
        }
        if knn_index < 2 {
            return Err(AutoEditError::InvalidParameter("knn_index must be at least 2"));
        }
        Ok(Self {
            threshold,
            min_match_count,
            knn_index,
        })
    }

    /// Rebuilds a matcher from a descriptor item.
    ///
    /// `knn_index` is optional and defaults to 2.
    pub fn from_spec(item: &SpecItem) -> AutoEditResult<Self> {
        Self::with_params(
            item.f64_param("threshold")?,
            item.usize_param("min_match_count")?,
            item.usize_param_or("knn_index", DEFAULT_KNN_INDEX)?,
        )
    }

    /// Returns the ratio-test threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns the minimum number of ratio-test survivors.
    pub fn min_match_count(&self) -> usize {
        self.min_match_count
    }

    /// Returns the neighbour count per target descriptor.
    pub fn knn_index(&self) -> usize {
        self.knn_index
    }

    /// Pairs each target descriptor with its nearest original descriptor when
    /// the ratio test passes. Returns `(target_idx, original_idx)`.
    fn ratio_matches(&self, target: &Features, original: &Features) -> Vec<(usize, usize)> {
        let tree = KdTree::build(&original.descriptors);
        target
            .descriptors
            .iter()
            .enumerate()
            .filter_map(|(t_idx, desc)| {
                let neighbors = tree.knn(desc, self.knn_index, DEFAULT_CHECKS);
                match neighbors.as_slice() {
                    [best, second, ..]
                        if f64::from(best.distance)
                            < self.threshold * f64::from(second.distance) =>
                    {
                        Some((t_idx, best.index))
                    }
                    _ => None,
                }
            })
            .collect()
    }
}

impl Matcher for SiftMatcher {
    fn name(&self) -> String {
        "SIFT".to_string()
    }

    fn match_impl(
        &self,
        original: &RgbImage,
        target: &RgbImage,
        _cfg: &MatcherConfig,
    ) -> AutoEditResult<Vec<MatchResult>> {
        let _span = trace_span!("sift_match").entered();

        let original_features = detect_and_describe(&to_gray(original));
        let target_features = detect_and_describe(&to_gray(target));
        trace_debug!(
            "original keypoints: {}, target keypoints: {}",
            original_features.len(),
            target_features.len()
        );

        let pairs = self.ratio_matches(&target_features, &original_features);
        trace_debug!("ratio test survivors: {}", pairs.len());
        if pairs.len() < self.min_match_count || pairs.len() < 4 {
            return Ok(Vec::new());
        }

        let src: Vec<[f64; 2]> = pairs
            .iter()
            .map(|&(t, _)| {
                let kp = &target_features.keypoints[t];
                [f64::from(kp.x), f64::from(kp.y)]
            })
            .collect();
        let dst: Vec<[f64; 2]> = pairs
            .iter()
            .map(|&(_, o)| {
                let kp = &original_features.keypoints[o];
                [f64::from(kp.x), f64::from(kp.y)]
            })
            .collect();

        let params = RansacParams {
            inlier_threshold: REPROJECTION_TOLERANCE,
            seed: RANSAC_SEED,
            ..RansacParams::default()
        };
        let fit = fit_homography_ransac(&src, &dst, &params)?;

        let (w, h) = target.dimensions();
        let (wf, hf) = (f64::from(w) - 1.0, f64::from(h) - 1.0);
        let corners = [[0.0, 0.0], [0.0, hf], [wf, hf], [wf, 0.0]]
            .map(|[x, y]| project(&fit.h, x, y));
        if corners.iter().flatten().any(|v| !v.is_finite()) {
            return Err(AutoEditError::MatchFailed {
                reason: "homography maps target corners to infinity".to_string(),
            });
        }

        let x_min = corners.iter().map(|c| c[0]).fold(f64::INFINITY, f64::min) as i64;
        let x_max = corners.iter().map(|c| c[0]).fold(f64::NEG_INFINITY, f64::max) as i64;
        let y_min = corners.iter().map(|c| c[1]).fold(f64::INFINITY, f64::min) as i64;
        let y_max = corners.iter().map(|c| c[1]).fold(f64::NEG_INFINITY, f64::max) as i64;
        let width = u32::try_from((x_max - x_min).max(0)).unwrap_or(u32::MAX);
        let height = u32::try_from((y_max - y_min).max(0)).unwrap_or(u32::MAX);
        let similarity = fit.n_inliers as f32 / pairs.len() as f32;

        Ok(vec![MatchResult::new(
            x_min,
            y_min,
            width,
            height,
            similarity,
            MatchMethod::Sift,
        )])
    }

    fn spec_item(&self) -> Option<SpecItem> {
        let mut params = ParamMap::new();
        params.insert("threshold".into(), self.threshold.into());
        params.insert("min_match_count".into(), self.min_match_count.into());
        params.insert("knn_index".into(), self.knn_index.into());
        Some(SpecItem(SIFT_KIND.to_string(), params))
    }
}
