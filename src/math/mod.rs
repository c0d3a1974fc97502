//! # Math Module
//!
//! Vectors, matrices and quaternions come from `glam`; this module adds the
//! color type and a few scalar helpers used by the baker.

mod color;

pub use color::Color;
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// Linearly remap `value` from `[in_min, in_max]` to `[out_min, out_max]`,
/// clamping to the output range.
///
/// A degenerate input range (`in_max <= in_min`) maps everything at or past
/// the larger bound to `out_max` and everything else to `out_min`.
#[inline]
pub fn remap_clamped(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    let span = in_max - in_min;
    let t = if span <= f32::EPSILON {
        if value >= in_min.max(in_max) {
            1.0
        } else {
            0.0
        }
    } else {
        ((value - in_min) / span).clamp(0.0, 1.0)
    };
    out_min + (out_max - out_min) * t
}

/// GLSL-style `mix` on RGBA values.
#[inline]
pub fn mix4(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remap_clamped() {
        assert_eq!(remap_clamped(0.0, 2.0, 10.0, 0.0, 1.0), 0.0);
        assert_eq!(remap_clamped(2.0, 2.0, 10.0, 0.0, 1.0), 0.0);
        assert!((remap_clamped(6.0, 2.0, 10.0, 0.0, 1.0) - 0.5).abs() < 1e-6);
        assert_eq!(remap_clamped(10.0, 2.0, 10.0, 0.0, 1.0), 1.0);
        assert_eq!(remap_clamped(50.0, 2.0, 10.0, 0.0, 1.0), 1.0);
    }

    #[test]
    fn test_remap_degenerate_range() {
        assert_eq!(remap_clamped(1.0, 2.0, 2.0, 0.0, 0.8), 0.0);
        assert_eq!(remap_clamped(2.0, 2.0, 2.0, 0.0, 0.8), 0.8);
        assert_eq!(remap_clamped(1.0, 2.0, 1.0, 0.0, 0.8), 0.0);
    }

    #[test]
    fn test_mix4() {
        let out = mix4([0.0; 4], [1.0, 2.0, 3.0, 4.0], 0.5);
        assert_eq!(out, [0.5, 1.0, 1.5, 2.0]);
    }
}
