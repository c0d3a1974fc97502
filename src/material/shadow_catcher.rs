//! Shadow-compositing material: the read path of the light-map bake.

use crate::core::{Id, RenderTargetId};
use crate::math::Color;

/// Displays an accumulation texture as a soft shadow over whatever lies
/// beneath the receiving surface.
///
/// Per fragment:
///
/// ```text
/// baked = sample(map, uv)
/// color = tint * baked.r * blend_factor
/// alpha = max(0, 1 - (baked.r + baked.g + baked.b) / alpha_test_denominator) * opacity
/// discard if alpha < alpha_test
/// ```
///
/// Fully lit texels become transparent and occluded texels opaque.
/// `alpha_test` is driven by the bake scheduler as the estimate matures.
#[derive(Debug, Clone)]
pub struct ShadowCatcherMaterial {
    id: Id,
    /// Accumulation texture to composite.
    pub map: Option<RenderTargetId>,
    /// Surface tint.
    pub color: Color,
    /// Discard threshold on the output alpha.
    pub alpha_test: f32,
    /// Overall opacity multiplier.
    pub opacity: f32,
    /// Gain compensating for the running average's under-saturation.
    pub blend_factor: f32,
    /// Channel sum treated as fully lit.
    pub alpha_test_denominator: f32,
}

impl Default for ShadowCatcherMaterial {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ShadowCatcherMaterial {
    /// Default `blend_factor`.
    pub const DEFAULT_BLEND_FACTOR: f32 = 2.0;
    /// Default `alpha_test_denominator`.
    pub const DEFAULT_ALPHA_TEST_DENOMINATOR: f32 = 3.0;

    /// Create a catcher sampling `map`.
    pub fn new(map: Option<RenderTargetId>) -> Self {
        Self {
            id: Id::new(),
            map,
            color: Color::WHITE,
            alpha_test: 0.0,
            opacity: 1.0,
            blend_factor: Self::DEFAULT_BLEND_FACTOR,
            alpha_test_denominator: Self::DEFAULT_ALPHA_TEST_DENOMINATOR,
        }
    }

    /// Get the unique ID.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Composite one baked texel. `None` means the fragment is discarded.
    pub fn composite(&self, baked: [f32; 4]) -> Option<[f32; 4]> {
        let denominator = if self.alpha_test_denominator.abs() > f32::EPSILON {
            self.alpha_test_denominator
        } else {
            Self::DEFAULT_ALPHA_TEST_DENOMINATOR
        };
        let alpha = (1.0 - (baked[0] + baked[1] + baked[2]) / denominator).max(0.0) * self.opacity;
        if alpha < self.alpha_test {
            return None;
        }
        let color = self.color * (baked[0] * self.blend_factor);
        Some(color.with_alpha(alpha))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lit_texel_is_transparent() {
        let material = ShadowCatcherMaterial::new(None);
        let out = material.composite([1.0, 1.0, 1.0, 1.0]).unwrap();
        assert!(out[3].abs() < 1e-6);
        assert!((out[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_occluded_texel_is_opaque() {
        let mut material = ShadowCatcherMaterial::new(None);
        material.opacity = 0.8;
        material.color = Color::new(0.5, 0.25, 1.0);
        let out = material.composite([0.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(out, [0.0, 0.0, 0.0, 0.8]);
    }

    #[test]
    fn test_alpha_test_discards() {
        let mut material = ShadowCatcherMaterial::new(None);
        material.alpha_test = 0.5;
        // alpha = 1 - 2.4 / 3 = 0.2
        assert!(material.composite([0.8, 0.8, 0.8, 1.0]).is_none());
        // alpha = 1 - 0.3 / 3 = 0.9
        assert!(material.composite([0.1, 0.1, 0.1, 1.0]).is_some());
    }

    #[test]
    fn test_overexposed_texel_clamps_alpha() {
        let material = ShadowCatcherMaterial::new(None);
        let out = material.composite([3.0, 3.0, 3.0, 1.0]).unwrap();
        assert_eq!(out[3], 0.0);
    }
}
