//! Mathematical helpers shared by the matchers.

/// Wraps an angle in degrees to the range [0, 360).
pub(crate) fn wrap_deg_360(angle_deg: f32) -> f32 {
    let mut wrapped = angle_deg % 360.0;
    if wrapped < 0.0 {
        wrapped += 360.0;
    }
    if wrapped >= 360.0 {
        wrapped -= 360.0;
    }
    wrapped
}

/// Computes sine and cosine for an angle in degrees.
pub(crate) fn sin_cos_deg(angle_deg: f32) -> (f32, f32) {
    angle_deg.to_radians().sin_cos()
}

/// Clamps a score into [0, 1]; non-finite values map to 0.
pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
