//! Ordered matcher chains with shared options.

use crate::config::MatcherConfig;
use crate::matchers::hash::HASH_KIND;
use crate::matchers::sift::SIFT_KIND;
use crate::matchers::template::TEMPLATE_KIND;
use crate::matchers::{
    guarded_match, HashMatcher, HashMethod, Matcher, SiftMatcher, TemplateMatcher, TemplateMethod,
};
use crate::result::MatchResult;
use crate::spec::MatcherSpec;
use crate::trace::trace_debug;
use crate::util::{AutoEditError, AutoEditResult};
use image::RgbImage;
use std::fmt;

/// An ordered sequence of matchers plus the options they run with.
///
/// ```no_run
/// use autoedit::{HashMethod, MatcherBuilder, TemplateMethod};
///
/// let builder = MatcherBuilder::new()
///     .template(0.9, TemplateMethod::CcoeffNormed)?
///     .hash(0.95, HashMethod::PHash)?
///     .early_stop(true);
/// # Ok::<(), autoedit::AutoEditError>(())
/// ```
#[derive(Default)]
pub struct MatcherBuilder {
    matchers: Vec<Box<dyn Matcher>>,
    config: MatcherConfig,
}

impl fmt::Debug for MatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.matchers.iter().map(|m| m.name()).collect();
        f.debug_struct("MatcherBuilder")
            .field("matchers", &names)
            .field("config", &self.config)
            .finish()
    }
}

impl MatcherBuilder {
    /// Creates an empty chain with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a template matcher.
    pub fn template(self, threshold: f64, method: TemplateMethod) -> AutoEditResult<Self> {
        Ok(self.push(Box::new(TemplateMatcher::new(threshold, method)?)))
    }

    /// Appends a hash matcher with the default hash size and stride ratio.
    pub fn hash(self, threshold: f64, method: HashMethod) -> AutoEditResult<Self> {
        Ok(self.push(Box::new(HashMatcher::new(threshold, method)?)))
    }

    /// Appends a hash matcher with explicit hash size and stride ratio.
    pub fn hash_with(
        self,
        threshold: f64,
        method: HashMethod,
        hash_size: usize,
        stride_ratio: f64,
    ) -> AutoEditResult<Self> {
        let matcher = HashMatcher::with_params(threshold, method, hash_size, stride_ratio)?;
        Ok(self.push(Box::new(matcher)))
    }

    /// Appends a keypoint matcher with the default minimum match count.
    pub fn sift(self, threshold: f64) -> AutoEditResult<Self> {
        Ok(self.push(Box::new(SiftMatcher::new(threshold)?)))
    }

    /// Appends a keypoint matcher with an explicit minimum match count.
    pub fn sift_with(self, threshold: f64, min_match_count: usize) -> AutoEditResult<Self> {
        let matcher = SiftMatcher::with_params(
            threshold,
            min_match_count,
            crate::matchers::sift::DEFAULT_KNN_INDEX,
        )?;
        Ok(self.push(Box::new(matcher)))
    }

    /// Appends any matcher.
    pub fn push(mut self, matcher: Box<dyn Matcher>) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Sets the early-stop option.
    pub fn early_stop(mut self, enabled: bool) -> Self {
        self.config.early_stop = enabled;
        self
    }

    /// Sets the template overlap-suppression option.
    pub fn except_overlap(mut self, enabled: bool) -> Self {
        self.config.except_overlap = enabled;
        self
    }

    /// Replaces all options.
    pub fn with_config(mut self, config: MatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the configured chain in run order.
    pub fn matchers(&self) -> &[Box<dyn Matcher>] {
        &self.matchers
    }

    /// Returns the stored options.
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Runs every matcher in order and concatenates their results.
    pub fn match_pair(&self, original: &RgbImage, target: &RgbImage) -> Vec<MatchResult> {
        self.match_pair_with(original, target, &self.config)
    }

    /// Like [`match_pair`](Self::match_pair) but with per-call options.
    pub fn match_pair_with(
        &self,
        original: &RgbImage,
        target: &RgbImage,
        config: &MatcherConfig,
    ) -> Vec<MatchResult> {
        let mut matches = Vec::new();
        for matcher in &self.matchers {
            let found = guarded_match(matcher.as_ref(), Some(original), Some(target), config);
            let hit = !found.is_empty();
            matches.extend(found);
            if config.early_stop && hit {
                trace_debug!("[{}] early stop", matcher.name());
                break;
            }
        }
        matches
    }

    /// Describes the chain as data.
    ///
    /// Fails when a pushed matcher has no descriptor form.
    pub fn serialize(&self) -> AutoEditResult<(MatcherSpec, MatcherConfig)> {
        let items = self
            .matchers
            .iter()
            .map(|m| {
                m.spec_item().ok_or_else(|| {
                    AutoEditError::MalformedSpec(format!("matcher {} has no descriptor", m.name()))
                })
            })
            .collect::<AutoEditResult<Vec<_>>>()?;
        Ok((MatcherSpec::new(items), self.config))
    }

    /// Rebuilds a chain from a descriptor, in item order.
    pub fn deserialize(spec: &MatcherSpec, config: MatcherConfig) -> AutoEditResult<Self> {
        spec.validate()?;
        let mut builder = Self::new().with_config(config);
        for item in &spec.items {
            let matcher: Box<dyn Matcher> = match item.kind() {
                TEMPLATE_KIND => Box::new(TemplateMatcher::from_spec(item)?),
                HASH_KIND => Box::new(HashMatcher::from_spec(item)?),
                SIFT_KIND => Box::new(SiftMatcher::from_spec(item)?),
                other => return Err(AutoEditError::UnknownMatcherKind(other.to_string())),
            };
            builder = builder.push(matcher);
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::MatcherBuilder;
    use crate::matchers::{HashMethod, TemplateMethod};
    use crate::spec::{MatcherSpec, ParamMap, SpecItem};
    use crate::util::AutoEditError;

    #[test]
    fn fluent_calls_keep_order_and_options() {
        let builder = MatcherBuilder::new()
            .template(0.9, TemplateMethod::CcorrNormed)
            .unwrap()
            .hash(0.95, HashMethod::AHash)
            .unwrap()
            .sift(0.75)
            .unwrap()
            .early_stop(true)
            .except_overlap(false);

        let names: Vec<String> = builder.matchers().iter().map(|m| m.name()).collect();
        assert_eq!(names, ["Template - TM_CCORR_NORMED", "Hash - AHASH", "SIFT"]);
        assert!(builder.config().early_stop);
        assert!(!builder.config().except_overlap);
    }

    #[test]
    fn invalid_parameters_surface_from_fluent_calls() {
        assert!(MatcherBuilder::new()
            .hash_with(0.9, HashMethod::DHash, 0, 0.25)
            .is_err());
        assert!(MatcherBuilder::new().template(f64::NAN, TemplateMethod::CcoeffNormed).is_err());
    }

    #[test]
    fn unknown_kind_is_a_config_error() {
        let spec = MatcherSpec::new(vec![SpecItem("orb".to_string(), ParamMap::new())]);
        let err = MatcherBuilder::deserialize(&spec, Default::default()).unwrap_err();
        assert_eq!(err, AutoEditError::UnknownMatcherKind("orb".to_string()));
        assert!(err.is_config_error());
    }
}
