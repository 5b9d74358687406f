use autoedit::{guarded_match, MatchMethod, MatcherConfig, SiftMatcher};
use image::{GenericImage, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BASELINE: f32 = 60.0;

struct Blob {
    cx: f32,
    cy: f32,
    sigma: f32,
    amplitude: f32,
}

fn random_blobs(rng: &mut StdRng, count: usize, x: (f32, f32), y: (f32, f32)) -> Vec<Blob> {
    (0..count)
        .map(|_| {
            let sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
            Blob {
                cx: rng.random_range(x.0..x.1),
                cy: rng.random_range(y.0..y.1),
                sigma: rng.random_range(2.0..5.0),
                amplitude: sign * rng.random_range(60.0..120.0),
            }
        })
        .collect()
}

fn render(width: u32, height: u32, blobs: &[Blob]) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let (fx, fy) = (x as f32, y as f32);
        let v = blobs.iter().fold(BASELINE, |acc, b| {
            let d2 = (fx - b.cx).powi(2) + (fy - b.cy).powi(2);
            acc + b.amplitude * (-d2 / (2.0 * b.sigma * b.sigma)).exp()
        });
        let v = v.clamp(0.0, 255.0) as u8;
        Rgb([v, v, v])
    })
}

fn target(seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let blobs = random_blobs(&mut rng, 30, (16.0, 64.0), (16.0, 64.0));
    render(80, 80, &blobs)
}

fn original_with_distractors(seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let blobs = random_blobs(&mut rng, 25, (200.0, 245.0), (15.0, 145.0));
    render(256, 160, &blobs)
}

#[test]
fn recovers_the_bounding_box_of_a_pasted_target() {
    let target = target(11);
    let mut original = original_with_distractors(12);
    original.copy_from(&target, 48, 32).unwrap();

    let matcher = SiftMatcher::with_params(0.75, 4, 2).unwrap();
    let found = guarded_match(&matcher, Some(&original), Some(&target), &MatcherConfig::default());

    assert_eq!(found.len(), 1, "{found:?}");
    let m = found[0];
    assert_eq!(m.method, MatchMethod::Sift);
    assert!(m.x.abs_diff(48) <= 2, "{m:?}");
    assert!(m.y.abs_diff(32) <= 2, "{m:?}");
    assert!(m.w.abs_diff(79) <= 3, "{m:?}");
    assert!(m.h.abs_diff(79) <= 3, "{m:?}");
    assert!(m.similarity > 0.5 && m.similarity <= 1.0);
}

#[test]
fn repeated_runs_are_identical() {
    let target = target(21);
    let mut original = original_with_distractors(22);
    original.copy_from(&target, 96, 48).unwrap();

    let matcher = SiftMatcher::with_params(0.75, 4, 3).unwrap();
    let cfg = MatcherConfig::default();
    let first = guarded_match(&matcher, Some(&original), Some(&target), &cfg);
    let second = guarded_match(&matcher, Some(&original), Some(&target), &cfg);
    assert_eq!(first, second);
}

#[test]
fn too_few_survivors_yield_nothing() {
    let target = target(31);
    let original = original_with_distractors(32);

    let matcher = SiftMatcher::with_params(0.3, 10, 2).unwrap();
    assert!(
        guarded_match(&matcher, Some(&original), Some(&target), &MatcherConfig::default())
            .is_empty()
    );
}

#[test]
fn featureless_target_yields_nothing() {
    let original = original_with_distractors(41);
    let flat = RgbImage::from_pixel(40, 40, Rgb([60, 60, 60]));
    let matcher = SiftMatcher::with_params(0.75, 0, 2).unwrap();
    assert!(
        guarded_match(&matcher, Some(&original), Some(&flat), &MatcherConfig::default())
            .is_empty()
    );
}

#[test]
fn knn_index_below_two_is_rejected() {
    assert!(SiftMatcher::with_params(0.7, 10, 1).is_err());
    assert!(SiftMatcher::new(f64::NAN).is_err());
}
