use glam::{Quat, Vec3};

/// A value type that keyframe tracks can blend between.
pub trait Interpolatable: Copy + Sized {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self;

    /// Accumulates `value` into a running blend whose weight so far is
    /// `accumulated_weight`. Used by the mixer when several actions drive the
    /// same property during a cross-fade.
    fn blend_weighted(acc: Self, accumulated_weight: f32, value: Self, weight: f32) -> Self {
        let total = accumulated_weight + weight;
        if total <= f32::EPSILON {
            return acc;
        }
        Self::interpolate_linear(acc, value, weight / total)
    }
}

impl Interpolatable for f32 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start + (end - start) * t
    }
}

impl Interpolatable for Vec3 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.lerp(end, t)
    }
}

impl Interpolatable for Quat {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.slerp(end, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_blend_of_equal_weights_is_midpoint() {
        let acc = Vec3::ZERO;
        let blended = Vec3::blend_weighted(acc, 1.0, Vec3::new(2.0, 0.0, 0.0), 1.0);
        assert!((blended.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn weighted_blend_with_zero_accumulated_takes_value() {
        let q = Quat::from_rotation_y(0.5);
        let blended = Quat::blend_weighted(Quat::IDENTITY, 0.0, q, 0.3);
        assert!(blended.angle_between(q) < 1e-5);
    }
}
