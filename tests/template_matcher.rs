use autoedit::{guarded_match, MatchMethod, MatcherConfig, TemplateMatcher, TemplateMethod};
use image::{GenericImage, Rgb, RgbImage};

const PASTE: (u32, u32) = (60, 50);

fn noise(width: u32, height: u32, seed: u32) -> RgbImage {
    let mut state = seed.wrapping_mul(2_246_822_519).wrapping_add(7);
    RgbImage::from_fn(width, height, |_, _| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let v = (state >> 24) as u8;
        Rgb([v, v.rotate_left(3), 255 - v])
    })
}

fn smooth_target(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let (fx, fy) = (x as f32, y as f32);
        let r = 128.0 + 80.0 * (fx / 6.0).sin();
        let g = 128.0 + 80.0 * (fy / 5.0).cos();
        let b = 100.0 + 60.0 * ((fx + fy) / 7.0).sin();
        Rgb([r as u8, g as u8, b as u8])
    })
}

fn scene() -> (RgbImage, RgbImage) {
    let mut original = noise(200, 150, 3);
    let target = smooth_target(48, 40);
    original.copy_from(&target, PASTE.0, PASTE.1).unwrap();
    (original, target)
}

fn config(except_overlap: bool) -> MatcherConfig {
    MatcherConfig {
        except_overlap,
        ..MatcherConfig::default()
    }
}

#[test]
fn each_method_collapses_to_the_exact_paste() {
    let (original, target) = scene();
    for method in [
        TemplateMethod::CcoeffNormed,
        TemplateMethod::CcorrNormed,
        TemplateMethod::SqdiffNormed,
    ] {
        let matcher = TemplateMatcher::new(0.99, method).unwrap();
        let found = guarded_match(&matcher, Some(&original), Some(&target), &config(true));
        assert_eq!(found.len(), 1, "{method}: {found:?}");
        let hit = found[0];
        assert_eq!((hit.x, hit.y, hit.w, hit.h), (PASTE.0, PASTE.1, 48, 40));
        assert!(hit.similarity > 0.999);
        assert_eq!(hit.method, method.match_method());
    }
}

#[test]
fn dense_mode_reports_every_qualifying_position() {
    let (original, target) = scene();
    let matcher = TemplateMatcher::new(0.8, TemplateMethod::CcoeffNormed).unwrap();
    let dense = guarded_match(&matcher, Some(&original), Some(&target), &config(false));

    assert!(dense.len() > 1);
    assert!(dense.iter().all(|m| m.similarity >= 0.8));
    assert!(dense
        .iter()
        .any(|m| (m.x, m.y) == PASTE && m.method == MatchMethod::CcoeffNormed));
    assert!(dense
        .windows(2)
        .all(|pair| (pair[0].y, pair[0].x) < (pair[1].y, pair[1].x)));

    let collapsed = guarded_match(&matcher, Some(&original), Some(&target), &config(true));
    assert_eq!(collapsed.len(), 1);
    let best = dense
        .iter()
        .copied()
        .fold(dense[0], |acc, m| if m.similarity > acc.similarity { m } else { acc });
    assert_eq!(collapsed[0], best);
}

#[test]
fn collapsed_boxes_never_overlap() {
    let mut original = noise(240, 150, 5);
    let target = smooth_target(48, 40);
    original.copy_from(&target, 20, 30).unwrap();
    original.copy_from(&target, 150, 90).unwrap();

    let matcher = TemplateMatcher::new(0.9, TemplateMethod::CcoeffNormed).unwrap();
    let found = guarded_match(&matcher, Some(&original), Some(&target), &config(true));

    let corners: Vec<(u32, u32)> = found.iter().map(|m| (m.x, m.y)).collect();
    assert_eq!(corners, vec![(20, 30), (150, 90)]);
    for (i, a) in found.iter().enumerate() {
        for b in &found[i + 1..] {
            assert!(!a.overlaps(b));
        }
    }
}

#[test]
fn absent_target_yields_nothing() {
    let original = noise(120, 100, 9);
    let target = smooth_target(30, 30);
    let matcher = TemplateMatcher::new(0.9, TemplateMethod::CcoeffNormed).unwrap();
    assert!(guarded_match(&matcher, Some(&original), Some(&target), &config(true)).is_empty());
}

#[test]
fn unknown_method_name_is_rejected() {
    assert!("TM_CCOEFF".parse::<TemplateMethod>().is_err());
    assert_eq!(
        "TM_SQDIFF_NORMED".parse::<TemplateMethod>().unwrap(),
        TemplateMethod::SqdiffNormed
    );
}
