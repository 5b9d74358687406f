use autoedit::{
    guarded_match, AutoEditError, AutoEditResult, HashMatcher, HashMethod, MatchResult, Matcher,
    MatcherConfig, SiftMatcher, TemplateMatcher, TemplateMethod,
};
use image::{Rgb, RgbImage};

fn textured(width: u32, height: u32, seed: u32) -> RgbImage {
    let mut state = seed.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    RgbImage::from_fn(width, height, |_, _| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let v = (state >> 24) as u8;
        Rgb([v, v.wrapping_add(40), v / 2])
    })
}

fn all_variants() -> Vec<Box<dyn Matcher>> {
    vec![
        Box::new(TemplateMatcher::new(0.5, TemplateMethod::CcoeffNormed).unwrap()),
        Box::new(HashMatcher::new(0.0, HashMethod::AHash).unwrap()),
        Box::new(SiftMatcher::new(0.9).unwrap()),
    ]
}

struct Failing;

impl Matcher for Failing {
    fn name(&self) -> String {
        "failing".to_string()
    }

    fn match_impl(
        &self,
        _original: &RgbImage,
        _target: &RgbImage,
        _cfg: &MatcherConfig,
    ) -> AutoEditResult<Vec<MatchResult>> {
        Err(AutoEditError::MatchFailed {
            reason: "synthetic failure".to_string(),
        })
    }
}

struct Panicking;

impl Matcher for Panicking {
    fn name(&self) -> String {
        "panicking".to_string()
    }

    fn match_impl(
        &self,
        _original: &RgbImage,
        _target: &RgbImage,
        _cfg: &MatcherConfig,
    ) -> AutoEditResult<Vec<MatchResult>> {
        panic!("synthetic panic")
    }
}

#[test]
fn target_larger_than_original_yields_nothing() {
    let cfg = MatcherConfig::default();
    let original = textured(40, 40, 1);
    let wide = textured(41, 20, 2);
    let tall = textured(20, 41, 3);
    for matcher in all_variants() {
        assert!(guarded_match(matcher.as_ref(), Some(&original), Some(&wide), &cfg).is_empty());
        assert!(guarded_match(matcher.as_ref(), Some(&original), Some(&tall), &cfg).is_empty());
    }
}

#[test]
fn target_below_five_pixels_yields_nothing() {
    let cfg = MatcherConfig::default();
    let original = textured(40, 40, 4);
    let narrow = textured(4, 10, 5);
    let short = textured(10, 4, 6);
    for matcher in all_variants() {
        assert!(guarded_match(matcher.as_ref(), Some(&original), Some(&narrow), &cfg).is_empty());
        assert!(guarded_match(matcher.as_ref(), Some(&original), Some(&short), &cfg).is_empty());
    }
}

#[test]
fn five_pixel_target_is_accepted() {
    let cfg = MatcherConfig::default();
    let original = textured(30, 30, 7);
    let target = RgbImage::from_fn(5, 5, |x, y| *original.get_pixel(x + 10, y + 10));

    let matcher = HashMatcher::new(0.0, HashMethod::AHash).unwrap();
    let found = guarded_match(&matcher, Some(&original), Some(&target), &cfg);
    assert!(!found.is_empty());
    assert!(found.iter().all(|m| (m.w, m.h) == (5, 5)));
}

#[test]
fn missing_image_yields_nothing() {
    let cfg = MatcherConfig::default();
    let img = textured(30, 30, 8);
    for matcher in all_variants() {
        assert!(guarded_match(matcher.as_ref(), None, Some(&img), &cfg).is_empty());
        assert!(guarded_match(matcher.as_ref(), Some(&img), None, &cfg).is_empty());
        assert!(guarded_match(matcher.as_ref(), None, None, &cfg).is_empty());
    }
}

#[test]
fn variant_errors_and_panics_are_contained() {
    let cfg = MatcherConfig::default();
    let original = textured(30, 30, 9);
    let target = textured(10, 10, 10);
    assert!(guarded_match(&Failing, Some(&original), Some(&target), &cfg).is_empty());
    assert!(guarded_match(&Panicking, Some(&original), Some(&target), &cfg).is_empty());
}

#[test]
fn flat_target_does_not_fail_the_template_matcher() {
    let cfg = MatcherConfig::default();
    let original = textured(30, 30, 11);
    let flat = RgbImage::from_pixel(8, 8, Rgb([90, 90, 90]));
    let matcher = TemplateMatcher::new(0.9, TemplateMethod::CcoeffNormed).unwrap();
    assert!(guarded_match(&matcher, Some(&original), Some(&flat), &cfg).is_empty());
}
