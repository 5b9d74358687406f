//! Difference-of-Gaussians keypoints and 128-D gradient descriptors.
//!
//! Intensities are scaled to `[0, 1]`. The scale space starts at the input
//! resolution (no initial upsampling); each octave holds `INTERVALS + 3`
//! Gaussian levels and `INTERVALS + 2` DoG levels, and the next octave starts
//! from level `INTERVALS` decimated by two.

use crate::refine::quad1d::quad_peak_offset_1d;
use crate::util::math::{sin_cos_deg, wrap_deg_360};
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::gaussian_blur_f32;
use nalgebra::{Matrix3, Vector3};

/// Descriptor dimensionality (4x4 spatial cells x 8 orientation bins).
pub const DESCRIPTOR_LEN: usize = DESCR_WIDTH * DESCR_WIDTH * DESCR_BINS;

/// A unit-norm gradient descriptor.
pub type Descriptor = [f32; DESCRIPTOR_LEN];

type FloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

const INTERVALS: usize = 3;
const SIGMA: f32 = 1.6;
const INIT_SIGMA: f32 = 0.5;
const CONTRAST_THRESHOLD: f32 = 0.04;
const EDGE_RATIO: f32 = 10.0;
const BORDER: usize = 5;
const MAX_INTERP_STEPS: usize = 5;
const MIN_OCTAVE_SIDE: u32 = 2 * BORDER as u32 + 3;

const ORI_BINS: usize = 36;
const ORI_PEAK_RATIO: f32 = 0.8;
const ORI_SIG_FACTOR: f32 = 1.5;
const ORI_RADIUS_FACTOR: f32 = 3.0 * ORI_SIG_FACTOR;

const DESCR_WIDTH: usize = 4;
const DESCR_BINS: usize = 8;
const DESCR_SCALE_FACTOR: f32 = 3.0;
const DESCR_MAG_THRESHOLD: f32 = 0.2;

/// Detected keypoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    /// Column in input image pixels.
    pub x: f32,
    /// Row in input image pixels.
    pub y: f32,
    /// Blur scale in input image pixels.
    pub sigma: f32,
    /// Dominant gradient orientation in degrees, `[0, 360)`.
    pub angle: f32,
    /// Signed DoG response at the refined extremum.
    pub response: f32,
    layer: usize,
    octave_x: f32,
    octave_y: f32,
    octave_sigma: f32,
}

/// Keypoints with their descriptors, index-aligned.
#[derive(Clone, Debug, Default)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

struct Octave {
    gauss: Vec<FloatImage>,
    dog: Vec<FloatImage>,
}

#[inline]
fn at(img: &FloatImage, x: usize, y: usize) -> f32 {
    img.as_raw()[y * img.width() as usize + x]
}

/// Detects keypoints and computes their descriptors.
pub fn detect_and_describe(gray: &GrayImage) -> Features {
    let pyramid = build_pyramid(gray);
    let mut features = Features::default();

    for (o, octave) in pyramid.iter().enumerate() {
        for layer in 1..=INTERVALS {
            for extremum in find_extrema(octave, o, layer) {
                let gauss = &octave.gauss[extremum.layer];
                for angle in dominant_orientations(gauss, &extremum) {
                    let kp = Keypoint { angle, ..extremum };
                    features.descriptors.push(describe(gauss, &kp));
                    features.keypoints.push(kp);
                }
            }
        }
    }
    features
}

fn octave_count(width: u32, height: u32) -> usize {
    let min_side = width.min(height).max(1);
    let mut count = 0;
    let mut side = min_side;
    while side >= MIN_OCTAVE_SIDE {
        count += 1;
        side /= 2;
    }
    count
}

fn build_pyramid(gray: &GrayImage) -> Vec<Octave> {
    let (width, height) = gray.dimensions();
    let n_octaves = octave_count(width, height);
    if n_octaves == 0 {
        return Vec::new();
    }

    let k = 2f32.powf(1.0 / INTERVALS as f32);
    let mut sigmas = vec![SIGMA; INTERVALS + 3];
    for (i, s) in sigmas.iter_mut().enumerate().skip(1) {
        let prev = SIGMA * k.powi(i as i32 - 1);
        let total = prev * k;
        *s = (total * total - prev * prev).sqrt();
    }

    let base = FloatImage::from_fn(width, height, |x, y| {
        Luma([f32::from(gray.get_pixel(x, y)[0]) / 255.0])
    });
    let base_sigma = (SIGMA * SIGMA - INIT_SIGMA * INIT_SIGMA).sqrt();
    let mut seed = gaussian_blur_f32(&base, base_sigma);

    let mut octaves = Vec::with_capacity(n_octaves);
    for o in 0..n_octaves {
        if o > 0 {
            let prev: &Octave = &octaves[o - 1];
            seed = decimate(&prev.gauss[INTERVALS]);
        }
        let mut gauss = Vec::with_capacity(INTERVALS + 3);
        gauss.push(seed.clone());
        for s in &sigmas[1..] {
            let next = gaussian_blur_f32(&gauss[gauss.len() - 1], *s);
            gauss.push(next);
        }
        let dog = gauss
            .windows(2)
            .map(|pair| {
                let (lo, hi) = (&pair[0], &pair[1]);
                FloatImage::from_fn(lo.width(), lo.height(), |x, y| {
                    Luma([hi.get_pixel(x, y)[0] - lo.get_pixel(x, y)[0]])
                })
            })
            .collect();
        octaves.push(Octave { gauss, dog });
    }
    octaves
}

fn decimate(img: &FloatImage) -> FloatImage {
    let (w, h) = img.dimensions();
    FloatImage::from_fn((w / 2).max(1), (h / 2).max(1), |x, y| {
        *img.get_pixel(2 * x, 2 * y)
    })
}

fn is_extremum(dog: &[FloatImage], layer: usize, x: usize, y: usize, val: f32) -> bool {
    let is_max = val > 0.0;
    for l in layer - 1..=layer + 1 {
        for yy in y - 1..=y + 1 {
            for xx in x - 1..=x + 1 {
                if l == layer && yy == y && xx == x {
                    continue;
                }
                let other = at(&dog[l], xx, yy);
                if (is_max && other > val) || (!is_max && other < val) {
                    return false;
                }
            }
        }
    }
    true
}

fn find_extrema(octave: &Octave, o: usize, layer: usize) -> Vec<Keypoint> {
    let threshold = CONTRAST_THRESHOLD / INTERVALS as f32;
    let dog = &octave.dog[layer];
    let (w, h) = (dog.width() as usize, dog.height() as usize);
    let mut out = Vec::new();
    if w <= 2 * BORDER || h <= 2 * BORDER {
        return out;
    }

    for y in BORDER..h - BORDER {
        for x in BORDER..w - BORDER {
            let val = at(dog, x, y);
            if val.abs() <= 0.5 * threshold || !is_extremum(&octave.dog, layer, x, y, val) {
                continue;
            }
            if let Some(kp) = refine_extremum(&octave.dog, o, layer, x, y, threshold) {
                out.push(kp);
            }
        }
    }
    out
}

fn gradient_and_hessian(
    dog: &[FloatImage],
    layer: usize,
    x: usize,
    y: usize,
) -> (Vector3<f32>, Matrix3<f32>) {
    let cur = &dog[layer];
    let prev = &dog[layer - 1];
    let next = &dog[layer + 1];
    let v2 = 2.0 * at(cur, x, y);

    let dx = (at(cur, x + 1, y) - at(cur, x - 1, y)) * 0.5;
    let dy = (at(cur, x, y + 1) - at(cur, x, y - 1)) * 0.5;
    let ds = (at(next, x, y) - at(prev, x, y)) * 0.5;

    let dxx = at(cur, x + 1, y) + at(cur, x - 1, y) - v2;
    let dyy = at(cur, x, y + 1) + at(cur, x, y - 1) - v2;
    let dss = at(next, x, y) + at(prev, x, y) - v2;
    let dxy = (at(cur, x + 1, y + 1) - at(cur, x - 1, y + 1) - at(cur, x + 1, y - 1)
        + at(cur, x - 1, y - 1))
        * 0.25;
    let dxs = (at(next, x + 1, y) - at(next, x - 1, y) - at(prev, x + 1, y) + at(prev, x - 1, y))
        * 0.25;
    let dys = (at(next, x, y + 1) - at(next, x, y - 1) - at(prev, x, y + 1) + at(prev, x, y - 1))
        * 0.25;

    (
        Vector3::new(dx, dy, ds),
        Matrix3::new(dxx, dxy, dxs, dxy, dyy, dys, dxs, dys, dss),
    )
}

fn refine_extremum(
    dog: &[FloatImage],
    octave: usize,
    mut layer: usize,
    mut x: usize,
    mut y: usize,
    threshold: f32,
) -> Option<Keypoint> {
    let (w, h) = (dog[layer].width() as usize, dog[layer].height() as usize);
    let mut step = 0;
    let offset = loop {
        let (grad, hess) = gradient_and_hessian(dog, layer, x, y);
        let offset = -(hess.try_inverse()? * grad);
        if offset.iter().all(|v| v.abs() < 0.5) {
            break offset;
        }
        if offset.iter().any(|v| !v.is_finite() || v.abs() > (w.max(h) as f32)) {
            return None;
        }

        let nx = x as i64 + offset[0].round() as i64;
        let ny = y as i64 + offset[1].round() as i64;
        let nl = layer as i64 + offset[2].round() as i64;
        if nl < 1
            || nl > INTERVALS as i64
            || nx < BORDER as i64
            || nx >= (w - BORDER) as i64
            || ny < BORDER as i64
            || ny >= (h - BORDER) as i64
        {
            return None;
        }
        x = nx as usize;
        y = ny as usize;
        layer = nl as usize;

        step += 1;
        if step >= MAX_INTERP_STEPS {
            return None;
        }
    };

    let (grad, hess) = gradient_and_hessian(dog, layer, x, y);
    let response = at(&dog[layer], x, y) + 0.5 * grad.dot(&offset);
    if response.abs() < threshold {
        return None;
    }

    let (dxx, dyy, dxy) = (hess[(0, 0)], hess[(1, 1)], hess[(0, 1)]);
    let trace = dxx + dyy;
    let det = dxx * dyy - dxy * dxy;
    if det <= 0.0 || trace * trace * EDGE_RATIO >= (EDGE_RATIO + 1.0).powi(2) * det {
        return None;
    }

    let scale = (1usize << octave) as f32;
    let octave_x = x as f32 + offset[0];
    let octave_y = y as f32 + offset[1];
    let octave_sigma = SIGMA * 2f32.powf((layer as f32 + offset[2]) / INTERVALS as f32);
    Some(Keypoint {
        x: octave_x * scale,
        y: octave_y * scale,
        sigma: octave_sigma * scale,
        angle: 0.0,
        response,
        layer,
        octave_x,
        octave_y,
        octave_sigma,
    })
}

fn gradient(img: &FloatImage, x: usize, y: usize) -> (f32, f32) {
    (
        at(img, x + 1, y) - at(img, x - 1, y),
        at(img, x, y + 1) - at(img, x, y - 1),
    )
}

fn dominant_orientations(gauss: &FloatImage, kp: &Keypoint) -> Vec<f32> {
    let (w, h) = (gauss.width() as i64, gauss.height() as i64);
    let cx = kp.octave_x.round() as i64;
    let cy = kp.octave_y.round() as i64;
    let sigma = ORI_SIG_FACTOR * kp.octave_sigma;
    let radius = (ORI_RADIUS_FACTOR * kp.octave_sigma).round() as i64;
    let exp_scale = -1.0 / (2.0 * sigma * sigma);

    let mut raw = [0.0f32; ORI_BINS];
    for dy in -radius..=radius {
        let y = cy + dy;
        if y <= 0 || y >= h - 1 {
            continue;
        }
        for dx in -radius..=radius {
            let x = cx + dx;
            if x <= 0 || x >= w - 1 {
                continue;
            }
            let (gx, gy) = gradient(gauss, x as usize, y as usize);
            let mag = (gx * gx + gy * gy).sqrt();
            let angle = wrap_deg_360(gy.atan2(gx).to_degrees());
            let weight = (((dx * dx + dy * dy) as f32) * exp_scale).exp();
            let bin = (angle * ORI_BINS as f32 / 360.0).round() as usize % ORI_BINS;
            raw[bin] += weight * mag;
        }
    }

    let n = ORI_BINS;
    let hist: Vec<f32> = (0..n)
        .map(|i| {
            (raw[(i + n - 2) % n] + raw[(i + 2) % n]) * (1.0 / 16.0)
                + (raw[(i + n - 1) % n] + raw[(i + 1) % n]) * (4.0 / 16.0)
                + raw[i] * (6.0 / 16.0)
        })
        .collect();

    let max = hist.iter().copied().fold(0.0f32, f32::max);
    if max <= 0.0 {
        return Vec::new();
    }
    let mut angles = Vec::new();
    for i in 0..n {
        let left = hist[(i + n - 1) % n];
        let right = hist[(i + 1) % n];
        if hist[i] > left && hist[i] > right && hist[i] >= ORI_PEAK_RATIO * max {
            let offset = quad_peak_offset_1d(left, hist[i], right).unwrap_or(0.0);
            angles.push(wrap_deg_360((i as f32 + offset) * 360.0 / n as f32));
        }
    }
    angles
}

fn describe(gauss: &FloatImage, kp: &Keypoint) -> Descriptor {
    let d = DESCR_WIDTH as f32;
    let (w, h) = (gauss.width() as i64, gauss.height() as i64);
    let cx = kp.octave_x.round() as i64;
    let cy = kp.octave_y.round() as i64;
    let hist_width = DESCR_SCALE_FACTOR * kp.octave_sigma;
    let radius = ((hist_width * std::f32::consts::SQRT_2 * (d + 1.0) * 0.5).round() as i64)
        .min(((w * w + h * h) as f32).sqrt() as i64);
    let (sin_t, cos_t) = sin_cos_deg(kp.angle);
    let exp_scale = -1.0 / (d * d * 0.5);
    let bins_per_deg = DESCR_BINS as f32 / 360.0;

    let mut hist = [0.0f32; DESCRIPTOR_LEN];
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let (fx, fy) = (dx as f32, dy as f32);
            let x_rot = (fx * cos_t + fy * sin_t) / hist_width;
            let y_rot = (-fx * sin_t + fy * cos_t) / hist_width;
            let rbin = y_rot + d / 2.0 - 0.5;
            let cbin = x_rot + d / 2.0 - 0.5;
            if rbin <= -1.0 || rbin >= d || cbin <= -1.0 || cbin >= d {
                continue;
            }
            let (x, y) = (cx + dx, cy + dy);
            if x <= 0 || x >= w - 1 || y <= 0 || y >= h - 1 {
                continue;
            }

            let (gx, gy) = gradient(gauss, x as usize, y as usize);
            let mag = (gx * gx + gy * gy).sqrt();
            let weight = ((x_rot * x_rot + y_rot * y_rot) * exp_scale).exp();
            let obin = wrap_deg_360(gy.atan2(gx).to_degrees() - kp.angle) * bins_per_deg;
            accumulate(&mut hist, rbin, cbin, obin, mag * weight);
        }
    }

    normalize_descriptor(&mut hist);
    hist
}

/// Trilinear vote into the (row, col, orientation) histogram.
fn accumulate(hist: &mut Descriptor, rbin: f32, cbin: f32, obin: f32, value: f32) {
    let (r0, c0, o0) = (rbin.floor(), cbin.floor(), obin.floor());
    let (dr, dc, dob) = (rbin - r0, cbin - c0, obin - o0);
    let (r0, c0, o0) = (r0 as i64, c0 as i64, o0 as i64);

    for (ri, wr) in [(r0, 1.0 - dr), (r0 + 1, dr)] {
        if ri < 0 || ri >= DESCR_WIDTH as i64 {
            continue;
        }
        for (ci, wc) in [(c0, 1.0 - dc), (c0 + 1, dc)] {
            if ci < 0 || ci >= DESCR_WIDTH as i64 {
                continue;
            }
            for (oi, wo) in [(o0, 1.0 - dob), (o0 + 1, dob)] {
                let oi = oi.rem_euclid(DESCR_BINS as i64) as usize;
                let idx = (ri as usize * DESCR_WIDTH + ci as usize) * DESCR_BINS + oi;
                hist[idx] += value * wr * wc * wo;
            }
        }
    }
}

fn normalize_descriptor(hist: &mut Descriptor) {
    let norm = hist.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return;
    }
    let clip = DESCR_MAG_THRESHOLD * norm;
    hist.iter_mut().for_each(|v| *v = v.min(clip));
    let norm = hist.iter().map(|v| v * v).sum::<f32>().sqrt().max(f32::EPSILON);
    hist.iter_mut().for_each(|v| *v /= norm);
}
