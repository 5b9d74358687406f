//! Fast-marching inpainting (Telea).
//!
//! Masked pixels are filled in order of increasing distance from the mask
//! boundary. Each new pixel is a weighted blend of already known pixels within
//! `radius`, each extrapolated along its intensity gradient; weights favour
//! close neighbours that lie along the marching direction and on a similar
//! distance level.

use super::mask::MASKED;
use image::{GrayImage, RgbImage};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Neighbourhood radius used by the editor.
pub const DEFAULT_RADIUS: u32 = 3;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Flag {
    Known,
    Band,
    Inside,
}

struct Front {
    t: f32,
    idx: usize,
}

impl PartialEq for Front {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Front {}

impl Ord for Front {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on arrival time, ties in raster order.
        other
            .t
            .total_cmp(&self.t)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

impl PartialOrd for Front {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Field {
    width: usize,
    height: usize,
    flags: Vec<Flag>,
    t: Vec<f32>,
    color: Vec<[f32; 3]>,
}

impl Field {
    fn neighbors4(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        let (x, y) = (idx % self.width, idx / self.width);
        let w = self.width;
        [
            (x > 0).then(|| idx - 1),
            (x + 1 < self.width).then(|| idx + 1),
            (y > 0).then(|| idx - w),
            (y + 1 < self.height).then(|| idx + w),
        ]
        .into_iter()
        .flatten()
    }

    fn known(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        let idx = y as usize * self.width + x as usize;
        (self.flags[idx] != Flag::Inside).then_some(idx)
    }

    fn t_at(&self, x: i64, y: i64) -> Option<f32> {
        self.known(x, y).map(|idx| self.t[idx])
    }

    /// Eikonal update from one horizontal and one vertical neighbour.
    fn solve(&self, a: Option<f32>, b: Option<f32>) -> f32 {
        match (a, b) {
            (Some(t1), Some(t2)) => {
                let diff = t1 - t2;
                if diff * diff >= 2.0 {
                    return 1.0 + t1.min(t2);
                }
                let r = (2.0 - diff * diff).sqrt();
                let s = (t1 + t2 - r) * 0.5;
                if s >= t1 && s >= t2 {
                    s
                } else {
                    let s = s + r;
                    if s >= t1 && s >= t2 {
                        s
                    } else {
                        1.0 + t1.min(t2)
                    }
                }
            }
            (Some(t), None) | (None, Some(t)) => 1.0 + t,
            (None, None) => f32::MAX,
        }
    }

    fn arrival_time(&self, x: i64, y: i64) -> f32 {
        let left = self.t_at(x - 1, y);
        let right = self.t_at(x + 1, y);
        let up = self.t_at(x, y - 1);
        let down = self.t_at(x, y + 1);
        [
            self.solve(left, up),
            self.solve(right, up),
            self.solve(left, down),
            self.solve(right, down),
        ]
        .into_iter()
        .fold(f32::MAX, f32::min)
    }

    fn grad_t(&self, x: i64, y: i64, t: f32) -> (f32, f32) {
        let axis = |prev: Option<f32>, next: Option<f32>| match (prev, next) {
            (Some(p), Some(n)) => (n - p) * 0.5,
            (Some(p), None) => t - p,
            (None, Some(n)) => n - t,
            (None, None) => 0.0,
        };
        (
            axis(self.t_at(x - 1, y), self.t_at(x + 1, y)),
            axis(self.t_at(x, y - 1), self.t_at(x, y + 1)),
        )
    }

    fn grad_color(&self, x: i64, y: i64, c: usize) -> (f32, f32) {
        let value = |idx: usize| self.color[idx][c];
        let here = self.color[y as usize * self.width + x as usize][c];
        let axis = |prev: Option<usize>, next: Option<usize>| match (prev, next) {
            (Some(p), Some(n)) => (value(n) - value(p)) * 0.5,
            (Some(p), None) => here - value(p),
            (None, Some(n)) => value(n) - here,
            (None, None) => 0.0,
        };
        (
            axis(self.known(x - 1, y), self.known(x + 1, y)),
            axis(self.known(x, y - 1), self.known(x, y + 1)),
        )
    }

    fn fill(&mut self, idx: usize, radius: i64) {
        let (px, py) = ((idx % self.width) as i64, (idx / self.width) as i64);
        let t_p = self.t[idx];
        let (gtx, gty) = self.grad_t(px, py, t_p);
        let mut acc = [0.0f32; 3];
        let mut norm = 0.0f32;

        for qy in py - radius..=py + radius {
            for qx in px - radius..=px + radius {
                let Some(q) = self.known(qx, qy) else {
                    continue;
                };
                if q == idx {
                    continue;
                }
                let (rx, ry) = ((px - qx) as f32, (py - qy) as f32);
                let len2 = rx * rx + ry * ry;
                if len2 > (radius * radius) as f32 {
                    continue;
                }
                let len = len2.sqrt();

                let mut dir = (rx * gtx + ry * gty).abs() / len;
                if dir <= 0.01 {
                    dir = 1e-6;
                }
                let dst = 1.0 / (len2 * len);
                let lev = 1.0 / (1.0 + (self.t[q] - t_p).abs());
                let weight = dir * dst * lev;

                for (c, slot) in acc.iter_mut().enumerate() {
                    let (gx, gy) = self.grad_color(qx, qy, c);
                    *slot += weight * (self.color[q][c] + gx * rx + gy * ry);
                }
                norm += weight;
            }
        }

        if norm > 0.0 {
            self.color[idx] = acc.map(|v| (v / norm).clamp(0.0, 255.0));
        }
    }
}

/// Fills every pixel of `img` where `mask` is [`MASKED`], in place.
///
/// Pixels outside the mask are left unchanged. A mask covering the whole image
/// has no known boundary and leaves the image unchanged.
pub fn inpaint_telea(img: &mut RgbImage, mask: &GrayImage, radius: u32) {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let flags: Vec<Flag> = mask
        .pixels()
        .map(|m| if m[0] == MASKED { Flag::Inside } else { Flag::Known })
        .collect();
    let t = flags
        .iter()
        .map(|f| if *f == Flag::Inside { f32::MAX } else { 0.0 })
        .collect();
    let color = img
        .pixels()
        .map(|p| p.0.map(f32::from))
        .collect();
    let mut field = Field {
        width,
        height,
        flags,
        t,
        color,
    };

    let mut heap = BinaryHeap::new();
    for idx in 0..width * height {
        if field.flags[idx] == Flag::Known
            && field
                .neighbors4(idx)
                .any(|n| field.flags[n] == Flag::Inside)
        {
            field.flags[idx] = Flag::Band;
            heap.push(Front { t: 0.0, idx });
        }
    }

    let radius = i64::from(radius.max(1));
    while let Some(Front { idx, .. }) = heap.pop() {
        if field.flags[idx] == Flag::Known {
            continue;
        }
        field.flags[idx] = Flag::Known;

        let neighbors: Vec<usize> = field.neighbors4(idx).collect();
        for n in neighbors {
            if field.flags[n] != Flag::Inside {
                continue;
            }
            let (nx, ny) = ((n % width) as i64, (n / width) as i64);
            field.t[n] = field.arrival_time(nx, ny);
            field.fill(n, radius);
            field.flags[n] = Flag::Band;
            heap.push(Front { t: field.t[n], idx: n });
        }
    }

    for (px, c) in img.pixels_mut().zip(&field.color) {
        px.0 = c.map(|v| v.round() as u8);
    }
}
