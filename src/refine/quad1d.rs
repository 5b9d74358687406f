//! Parabolic peak interpolation over three samples.

/// Sub-bin offset of a peak from its two neighbours.
///
/// Samples are taken at `-1, 0, +1` (`left`, `center`, `right`). Returns the
/// vertex offset in `[-1, 1]` of the fitted parabola, or `None` when it is not
/// concave or any sample is non-finite.
pub fn quad_peak_offset_1d(left: f32, center: f32, right: f32) -> Option<f32> {
    if !(left.is_finite() && center.is_finite() && right.is_finite()) {
        return None;
    }

    let curvature = left - 2.0 * center + right;
    if curvature > -1e-6 {
        return None;
    }

    let dx = 0.5 * (left - right) / curvature;
    (dx.is_finite() && dx.abs() <= 1.0).then_some(dx)
}
