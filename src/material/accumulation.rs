//! Accumulation shader: the write path of the light-map bake.

use crate::core::{Id, RenderTargetId};
use crate::math::mix4;

/// Blends freshly shaded light into the previous estimate.
///
/// The surface wearing this material is rasterized in light-map UV space,
/// so each fragment lands on its own texel of the bound render target:
///
/// ```text
/// output = mix(previous, raw, 1 / averaging_window)
/// ```
///
/// This is an exponential moving average. Every pass moves the estimate by
/// the same fraction, so it never locks; larger windows give less noise
/// but need more passes to wash out the zero-cleared start.
#[derive(Debug, Clone)]
pub struct AccumulationMaterial {
    id: Id,
    /// Texture holding the previous estimate.
    pub previous_shadow_map: Option<RenderTargetId>,
    /// Number of frames the running average spans.
    pub averaging_window: f32,
}

impl Default for AccumulationMaterial {
    fn default() -> Self {
        Self::new(None, 100.0)
    }
}

impl AccumulationMaterial {
    /// Create with a source texture and window.
    pub fn new(previous_shadow_map: Option<RenderTargetId>, averaging_window: f32) -> Self {
        Self {
            id: Id::new(),
            previous_shadow_map,
            averaging_window,
        }
    }

    /// Get the unique ID.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Weight of the new sample. Windows below one are treated as one.
    #[inline]
    pub fn blend_weight(&self) -> f32 {
        1.0 / self.averaging_window.max(1.0)
    }

    /// Blend a newly shaded texel into the previous one.
    #[inline]
    pub fn accumulate(&self, previous: [f32; 4], raw: [f32; 4]) -> [f32; 4] {
        mix4(previous, raw, self.blend_weight())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaky_average_from_zero() {
        let material = AccumulationMaterial::new(None, 4.0);
        let mut texel = [0.0; 4];
        for _ in 0..3 {
            texel = material.accumulate(texel, [1.0; 4]);
        }
        // 1 - (3/4)^3
        assert!((texel[0] - 0.578125).abs() < 1e-6);
    }

    #[test]
    fn test_estimate_keeps_moving() {
        let material = AccumulationMaterial::new(None, 10.0);
        let settled = [0.5; 4];
        let next = material.accumulate(settled, [1.0; 4]);
        assert!((next[0] - 0.55).abs() < 1e-6);
    }

    #[test]
    fn test_window_below_one_clamped() {
        let material = AccumulationMaterial::new(None, 0.0);
        assert_eq!(material.blend_weight(), 1.0);
        let out = material.accumulate([0.2; 4], [0.9; 4]);
        assert!(out.iter().all(|c| (c - 0.9).abs() < 1e-6));
    }
}
