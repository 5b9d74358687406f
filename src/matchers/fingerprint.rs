//! Perceptual fingerprints of grayscale patches.
//!
//! All three hashes downscale by area averaging to 8-bit samples, then
//! threshold:
//!
//! - average hash: `hash_size x hash_size`, pixel > mean
//! - perceptual hash: `4*hash_size` square, 2-D DCT-II, low-frequency
//!   `hash_size x hash_size` block without the DC row/column, > block mean
//! - difference hash: `(hash_size + 1) x hash_size`, right neighbor brighter

use crate::image::resize::resize_area_u8;
use crate::ImageView;
use std::f64::consts::PI;

/// Fixed-length binary fingerprint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fingerprint {
    bits: Vec<bool>,
}

impl Fingerprint {
    /// Returns the number of bits.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns true for an empty fingerprint.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Returns the bits in row-major order.
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Counts differing bits; `None` when the lengths differ.
    pub fn hamming(&self, other: &Fingerprint) -> Option<usize> {
        if self.bits.len() != other.bits.len() {
            return None;
        }
        Some(
            self.bits
                .iter()
                .zip(&other.bits)
                .filter(|(a, b)| a != b)
                .count(),
        )
    }

    /// Returns `1 - hamming / len` in `[0, 1]`; mismatched lengths score 0.
    pub fn similarity(&self, other: &Fingerprint) -> f64 {
        match self.hamming(other) {
            Some(_) if self.bits.is_empty() => 0.0,
            Some(distance) => (1.0 - distance as f64 / self.bits.len() as f64).clamp(0.0, 1.0),
            None => 0.0,
        }
    }
}

fn mean(values: &[f32]) -> f32 {
    values.iter().sum::<f32>() / values.len() as f32
}

/// Average hash.
pub fn average_hash(patch: ImageView<'_, u8>, hash_size: usize) -> Fingerprint {
    let small = resize_area_u8(patch, hash_size, hash_size);
    let avg = small.iter().map(|&v| f64::from(v)).sum::<f64>() / small.len() as f64;
    Fingerprint {
        bits: small.iter().map(|&v| f64::from(v) > avg).collect(),
    }
}

/// Perceptual (DCT) hash.
pub fn perceptual_hash(patch: ImageView<'_, u8>, hash_size: usize) -> Fingerprint {
    let size = hash_size * 4;
    let small: Vec<f32> = resize_area_u8(patch, size, size)
        .into_iter()
        .map(f32::from)
        .collect();
    let coeffs = dct_2d(&small, size);

    let mut block = Vec::with_capacity(hash_size * hash_size);
    for v in 1..=hash_size {
        for u in 1..=hash_size {
            block.push(coeffs[v * size + u]);
        }
    }
    let avg = mean(&block);
    Fingerprint {
        bits: block.iter().map(|&c| c > avg).collect(),
    }
}

/// Difference hash.
pub fn difference_hash(patch: ImageView<'_, u8>, hash_size: usize) -> Fingerprint {
    let width = hash_size + 1;
    let small = resize_area_u8(patch, width, hash_size);
    let mut bits = Vec::with_capacity(hash_size * hash_size);
    for row in small.chunks_exact(width) {
        for pair in row.windows(2) {
            bits.push(pair[1] > pair[0]);
        }
    }
    Fingerprint { bits }
}

/// Orthonormal 2-D DCT-II of a square row-major block.
pub(crate) fn dct_2d(input: &[f32], size: usize) -> Vec<f32> {
    let n = size as f64;
    let mut basis = vec![0.0f64; size * size];
    for k in 0..size {
        let alpha = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        for i in 0..size {
            basis[k * size + i] = alpha * (PI * (2 * i + 1) as f64 * k as f64 / (2.0 * n)).cos();
        }
    }

    let mut rows = vec![0.0f64; size * size];
    for y in 0..size {
        for k in 0..size {
            rows[y * size + k] = (0..size)
                .map(|i| basis[k * size + i] * f64::from(input[y * size + i]))
                .sum();
        }
    }

    let mut out = vec![0.0f32; size * size];
    for k in 0..size {
        for x in 0..size {
            out[k * size + x] = (0..size)
                .map(|i| basis[k * size + i] * rows[i * size + x])
                .sum::<f64>() as f32;
        }
    }
    out
}
