//! Planar homography estimation for keypoint matching.
//!
//! Hartley-normalized DLT from four or more correspondences, wrapped in a
//! seeded RANSAC loop so repeated runs on the same input agree.

use crate::util::{AutoEditError, AutoEditResult};
use nalgebra::{DMatrix, Matrix3, SymmetricEigen, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Projects `(x, y)` through `h`; points at infinity map to NaN.
pub fn project(h: &Matrix3<f64>, x: f64, y: f64) -> [f64; 2] {
    let p = h * Vector3::new(x, y, 1.0);
    if p[2].abs() < 1e-15 {
        return [f64::NAN, f64::NAN];
    }
    [p[0] / p[2], p[1] / p[2]]
}

/// Euclidean distance between `project(h, src)` and `dst`.
pub fn reprojection_error(h: &Matrix3<f64>, src: &[f64; 2], dst: &[f64; 2]) -> f64 {
    let p = project(h, src[0], src[1]);
    (p[0] - dst[0]).hypot(p[1] - dst[1])
}

/// Centroid to origin, mean distance sqrt(2).
fn normalize_points(pts: &[[f64; 2]]) -> (Matrix3<f64>, Vec<[f64; 2]>) {
    let n = pts.len() as f64;
    let cx = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean_dist = pts
        .iter()
        .map(|p| (p[0] - cx).hypot(p[1] - cy))
        .sum::<f64>()
        / n;
    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts
        .iter()
        .map(|p| [s * (p[0] - cx), s * (p[1] - cy)])
        .collect();
    (t, normalized)
}

/// Estimates `H` with `dst ~ project(H, src)` by direct linear transform.
pub fn estimate_homography_dlt(src: &[[f64; 2]], dst: &[[f64; 2]]) -> AutoEditResult<Matrix3<f64>> {
    let n = src.len();
    if n != dst.len() {
        return Err(AutoEditError::MatchFailed {
            reason: format!("correspondence length mismatch: {n} vs {}", dst.len()),
        });
    }
    if n < 4 {
        return Err(AutoEditError::MatchFailed {
            reason: format!("homography needs 4 correspondences, got {n}"),
        });
    }

    let (t_src, src_n) = normalize_points(src);
    let (t_dst, dst_n) = normalize_points(dst);

    let mut a = DMatrix::zeros(2 * n, 9);
    for (i, (s, d)) in src_n.iter().zip(&dst_n).enumerate() {
        let (sx, sy) = (s[0], s[1]);
        let (dx, dy) = (d[0], d[1]);

        a[(2 * i, 3)] = -sx;
        a[(2 * i, 4)] = -sy;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = dy * sx;
        a[(2 * i, 7)] = dy * sy;
        a[(2 * i, 8)] = dy;

        a[(2 * i + 1, 0)] = sx;
        a[(2 * i + 1, 1)] = sy;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -dx * sx;
        a[(2 * i + 1, 7)] = -dx * sy;
        a[(2 * i + 1, 8)] = -dx;
    }

    // Null vector of A is the eigenvector of A^T A with the smallest eigenvalue.
    let eig = SymmetricEigen::new(a.transpose() * &a);
    let min_idx = (0..9)
        .min_by(|&i, &j| {
            eig.eigenvalues[i]
                .abs()
                .total_cmp(&eig.eigenvalues[j].abs())
        })
        .unwrap_or(0);
    let v = eig.eigenvectors.column(min_idx);
    let h_norm = Matrix3::new(v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7], v[8]);

    let t_dst_inv = t_dst.try_inverse().ok_or_else(|| AutoEditError::MatchFailed {
        reason: "degenerate destination points".to_string(),
    })?;
    let h = t_dst_inv * h_norm * t_src;

    let scale = h[(2, 2)];
    if scale.abs() < 1e-15 {
        Ok(h)
    } else {
        Ok(h / scale)
    }
}

/// RANSAC parameters.
#[derive(Clone, Debug)]
pub struct RansacParams {
    /// Maximum number of minimal-sample iterations.
    pub max_iters: usize,
    /// Reprojection tolerance in pixels.
    pub inlier_threshold: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            max_iters: 2000,
            inlier_threshold: 5.0,
            seed: 0,
        }
    }
}

/// Outcome of a RANSAC fit.
#[derive(Clone, Debug)]
pub struct RansacFit {
    pub h: Matrix3<f64>,
    pub inlier_mask: Vec<bool>,
    pub n_inliers: usize,
}

fn count_inliers(h: &Matrix3<f64>, src: &[[f64; 2]], dst: &[[f64; 2]], tol: f64) -> Vec<bool> {
    src.iter()
        .zip(dst)
        .map(|(s, d)| reprojection_error(h, s, d) <= tol)
        .collect()
}

/// Fits a homography robust to outlier correspondences.
pub fn fit_homography_ransac(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    params: &RansacParams,
) -> AutoEditResult<RansacFit> {
    let n = src.len();
    if n < 4 || dst.len() != n {
        return Err(AutoEditError::MatchFailed {
            reason: format!("homography needs 4 correspondences, got {n}"),
        });
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<(Matrix3<f64>, Vec<bool>, usize)> = None;

    for _ in 0..params.max_iters {
        let mut indices = [0usize; 4];
        let mut filled = 0;
        while filled < 4 {
            let idx = rng.random_range(0..n);
            if !indices[..filled].contains(&idx) {
                indices[filled] = idx;
                filled += 1;
            }
        }

        let s4: Vec<[f64; 2]> = indices.iter().map(|&i| src[i]).collect();
        let d4: Vec<[f64; 2]> = indices.iter().map(|&i| dst[i]).collect();
        let Ok(h) = estimate_homography_dlt(&s4, &d4) else {
            continue;
        };

        let mask = count_inliers(&h, src, dst, params.inlier_threshold);
        let count = mask.iter().filter(|&&m| m).count();
        if best.as_ref().map_or(true, |(_, _, c)| count > *c) {
            best = Some((h, mask, count));
            if count * 10 > n * 9 {
                break;
            }
        }
    }

    let (best_h, best_mask, best_count) = best.ok_or_else(|| AutoEditError::MatchFailed {
        reason: "no non-degenerate homography sample".to_string(),
    })?;
    if best_count < 4 {
        return Ok(RansacFit {
            h: best_h,
            inlier_mask: best_mask,
            n_inliers: best_count,
        });
    }

    let inlier_src: Vec<[f64; 2]> = (0..n).filter(|&i| best_mask[i]).map(|i| src[i]).collect();
    let inlier_dst: Vec<[f64; 2]> = (0..n).filter(|&i| best_mask[i]).map(|i| dst[i]).collect();
    let refit = estimate_homography_dlt(&inlier_src, &inlier_dst).unwrap_or(best_h);
    let refit_mask = count_inliers(&refit, src, dst, params.inlier_threshold);
    let refit_count = refit_mask.iter().filter(|&&m| m).count();

    if refit_count >= best_count {
        Ok(RansacFit {
            h: refit,
            inlier_mask: refit_mask,
            n_inliers: refit_count,
        })
    } else {
        Ok(RansacFit {
            h: best_h,
            inlier_mask: best_mask,
            n_inliers: best_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_homography() -> Matrix3<f64> {
        Matrix3::new(1.1, 0.05, 40.0, -0.03, 0.95, 25.0, 0.0002, -0.0001, 1.0)
    }

    #[test]
    fn dlt_recovers_exact_correspondences() {
        let h_true = sample_homography();
        let src = [[0.0, 0.0], [100.0, 0.0], [100.0, 80.0], [0.0, 80.0], [50.0, 30.0]];
        let dst: Vec<[f64; 2]> = src.iter().map(|s| project(&h_true, s[0], s[1])).collect();

        let h = estimate_homography_dlt(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(&dst) {
            assert!(reprojection_error(&h, s, d) < 1e-6);
        }
    }

    #[test]
    fn dlt_rejects_too_few_points() {
        let pts = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]];
        assert!(estimate_homography_dlt(&pts, &pts).is_err());
    }

    #[test]
    fn ransac_ignores_outliers_and_is_deterministic() {
        let h_true = sample_homography();
        let mut rng = StdRng::seed_from_u64(7);
        let mut src = Vec::new();
        let mut dst = Vec::new();
        for i in 0..30 {
            let s = [(i % 6) as f64 * 20.0, (i / 6) as f64 * 20.0];
            src.push(s);
            dst.push(project(&h_true, s[0], s[1]));
        }
        for _ in 0..8 {
            src.push([rng.random_range(0.0..100.0), rng.random_range(0.0..100.0)]);
            dst.push([rng.random_range(0.0..400.0), rng.random_range(0.0..400.0)]);
        }

        let params = RansacParams::default();
        let fit = fit_homography_ransac(&src, &dst, &params).unwrap();
        assert!(fit.n_inliers >= 30);
        assert!(fit.inlier_mask[..30].iter().all(|&m| m));

        let again = fit_homography_ransac(&src, &dst, &params).unwrap();
        assert_eq!(fit.n_inliers, again.n_inliers);
        assert_eq!(fit.inlier_mask, again.inlier_mask);
    }
}
