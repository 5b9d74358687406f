//! Normalized template correlation matcher.

use crate::candidate::overlap::keep_best_boxes;
use crate::config::MatcherConfig;
use crate::image::rgb_view;
use crate::kernel::scalar::{CcoeffNormedScalar, CcorrNormedScalar, SqdiffNormedScalar};
use crate::kernel::{Kernel, ScoreMap};
use crate::matchers::Matcher;
use crate::result::{MatchMethod, MatchResult};
use crate::spec::{ParamMap, SpecItem};
use crate::template::TemplatePlan;
use crate::trace::trace_span;
use crate::util::{AutoEditError, AutoEditResult};
use crate::ImageView;
use image::RgbImage;
use std::fmt;
use std::str::FromStr;

/// Descriptor kind tag for template matchers.
pub const TEMPLATE_KIND: &str = "tm";

/// Default qualifying score for template matching.
pub const DEFAULT_TEMPLATE_THRESHOLD: f64 = 0.9;

/// Template scoring method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemplateMethod {
    CcoeffNormed,
    CcorrNormed,
    SqdiffNormed,
}

impl TemplateMethod {
    /// Returns the method name used in descriptors and match tags.
    pub fn as_str(self) -> &'static str {
        self.match_method().as_str()
    }

    /// Returns the tag attached to results.
    pub fn match_method(self) -> MatchMethod {
        match self {
            Self::CcoeffNormed => MatchMethod::CcoeffNormed,
            Self::CcorrNormed => MatchMethod::CcorrNormed,
            Self::SqdiffNormed => MatchMethod::SqdiffNormed,
        }
    }

    /// True for the distance-style method where lower scores are better.
    pub fn is_distance(self) -> bool {
        matches!(self, Self::SqdiffNormed)
    }
}

impl FromStr for TemplateMethod {
    type Err = AutoEditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TM_CCOEFF_NORMED" => Ok(Self::CcoeffNormed),
            "TM_CCORR_NORMED" => Ok(Self::CcorrNormed),
            "TM_SQDIFF_NORMED" => Ok(Self::SqdiffNormed),
            other => Err(AutoEditError::InvalidMethod {
                kind: "template",
                method: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TemplateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locates a target by normalized correlation at every pixel offset.
#[derive(Clone, Debug)]
pub struct TemplateMatcher {
    threshold: f64,
    method: TemplateMethod,
}

impl TemplateMatcher {
    /// Creates a matcher; `threshold` must be finite.
    pub fn new(threshold: f64, method: TemplateMethod) -> AutoEditResult<Self> {
        if !threshold.is_finite() {
            return Err(AutoEditError::InvalidParameter("template threshold must be finite"));
        }
        Ok(Self { threshold, method })
    }

    /// Rebuilds a matcher from a descriptor item.
    pub fn from_spec(item: &SpecItem) -> AutoEditResult<Self> {
        let threshold = item.f64_param("threshold")?;
        let method = item.str_param("method")?.parse()?;
        Self::new(threshold, method)
    }

    /// Returns the qualifying threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns the scoring method.
    pub fn method(&self) -> TemplateMethod {
        self.method
    }

    fn score_map(&self, image: ImageView<'_, u8>, plan: &TemplatePlan) -> AutoEditResult<ScoreMap> {
        match self.method {
            TemplateMethod::CcoeffNormed => scan::<CcoeffNormedScalar>(image, plan),
            TemplateMethod::CcorrNormed => scan::<CcorrNormedScalar>(image, plan),
            TemplateMethod::SqdiffNormed => scan::<SqdiffNormedScalar>(image, plan),
        }
    }

    /// Maps a raw score to "higher is better" similarity when it qualifies.
    fn qualify(&self, score: f32) -> Option<f32> {
        if !score.is_finite() {
            return None;
        }
        let raw = f64::from(score);
        if self.method.is_distance() {
            (raw <= 1.0 - self.threshold).then(|| 1.0 - score)
        } else {
            (raw >= self.threshold).then_some(score)
        }
    }
}

#[cfg(feature = "rayon")]
fn scan<K: Kernel>(image: ImageView<'_, u8>, plan: &TemplatePlan) -> AutoEditResult<ScoreMap> {
    crate::kernel::rayon::scan_full_par::<K>(image, plan)
}

#[cfg(not(feature = "rayon"))]
fn scan<K: Kernel>(image: ImageView<'_, u8>, plan: &TemplatePlan) -> AutoEditResult<ScoreMap> {
    crate::kernel::scalar::scan_full::<K>(image, plan)
}

impl Matcher for TemplateMatcher {
    fn name(&self) -> String {
        format!("Template - {}", self.method)
    }

    fn match_impl(
        &self,
        original: &RgbImage,
        target: &RgbImage,
        cfg: &MatcherConfig,
    ) -> AutoEditResult<Vec<MatchResult>> {
        let _span = trace_span!("template_match", method = self.method.as_str()).entered();

        let plan = TemplatePlan::from_rgb(target)?;
        let map = self.score_map(rgb_view(original)?, &plan)?;
        let (targ_w, targ_h) = target.dimensions();
        let tag = self.method.match_method();

        let candidates = map.iter().filter_map(|(x, y, score)| {
            self.qualify(score).map(|similarity| {
                MatchResult::new(x as i64, y as i64, targ_w, targ_h, similarity, tag)
            })
        });

        if cfg.except_overlap {
            Ok(keep_best_boxes(candidates))
        } else {
            Ok(candidates.collect())
        }
    }

    fn spec_item(&self) -> Option<SpecItem> {
        let mut params = ParamMap::new();
        params.insert("threshold".into(), self.threshold.into());
        params.insert("method".into(), self.method.as_str().into());
        Some(SpecItem(TEMPLATE_KIND.to_string(), params))
    }
}
