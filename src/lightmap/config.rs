//! Bake configuration.

use crate::core::TextureFormat;
use crate::light::{ShadowSettings, MAX_LIGHTS};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Light-map baker configuration.
///
/// Fields can be set directly; the builder methods clamp to valid ranges
/// and [`BakeConfig::sanitized`] applies the same clamps to a hand-built
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    /// Accumulation texture edge size in texels.
    pub resolution: u32,
    /// Number of passes in one bake.
    pub frame_budget: u32,
    /// Running-average window (`1 / blend_window` is the per-pass weight).
    pub blend_window: f32,
    /// Number of lights in the pool. Fixed once the baker is built.
    pub light_pool_size: usize,
    /// Center of the local light jitter.
    pub light_origin: Vec3,
    /// Point every pool light aims at.
    pub light_target: Vec3,
    /// Edge length of the local jitter cube.
    pub light_jitter_radius: f32,
    /// Probability of a sky-hemisphere sample instead of local jitter.
    pub ambient_weight: f32,
    /// Alpha-test threshold the shadow catcher fades in to.
    pub fade_in_alpha_test: f32,
    /// Whether `tick` bakes at all.
    pub enabled: bool,
    /// Use `Rgba16Float` accumulation buffers.
    pub half_float: bool,
    /// Random seed for light placement; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Shadow settings shared by every pool light.
    pub shadow: ShadowSettings,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            resolution: 1024,
            frame_budget: 40,
            blend_window: 20.0,
            light_pool_size: 8,
            light_origin: Vec3::new(3.0, 8.0, 5.0),
            light_target: Vec3::ZERO,
            light_jitter_radius: 1.0,
            ambient_weight: 0.5,
            fade_in_alpha_test: 0.75,
            enabled: true,
            half_float: false,
            seed: None,
            shadow: ShadowSettings::default(),
        }
    }
}

impl BakeConfig {
    /// Create default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the texture resolution (clamped to 16..=8192).
    pub fn resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution.clamp(16, 8192);
        self
    }

    /// Set the pass budget (at least one).
    pub fn frame_budget(mut self, frames: u32) -> Self {
        self.frame_budget = frames.max(1);
        self
    }

    /// Set the averaging window (at least one).
    pub fn blend_window(mut self, window: f32) -> Self {
        self.blend_window = window.max(1.0);
        self
    }

    /// Set the light pool size (1..=MAX_LIGHTS).
    pub fn light_pool_size(mut self, size: usize) -> Self {
        self.light_pool_size = size.clamp(1, MAX_LIGHTS);
        self
    }

    /// Set the jitter origin.
    pub fn light_origin(mut self, origin: Vec3) -> Self {
        self.light_origin = origin;
        self
    }

    /// Set the jitter cube edge.
    pub fn light_jitter_radius(mut self, radius: f32) -> Self {
        self.light_jitter_radius = radius.max(0.0);
        self
    }

    /// Set the sky-sample probability (0-1).
    pub fn ambient_weight(mut self, weight: f32) -> Self {
        self.ambient_weight = weight.clamp(0.0, 1.0);
        self
    }

    /// Set the fade-in target (0-1).
    pub fn fade_in_alpha_test(mut self, alpha_test: f32) -> Self {
        self.fade_in_alpha_test = alpha_test.clamp(0.0, 1.0);
        self
    }

    /// Enable or disable baking.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Select half-float buffers.
    pub fn half_float(mut self, half_float: bool) -> Self {
        self.half_float = half_float;
        self
    }

    /// Fix the random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the shadow settings.
    pub fn shadow(mut self, shadow: ShadowSettings) -> Self {
        self.shadow = shadow;
        self
    }

    /// Apply every builder clamp.
    pub fn sanitized(self) -> Self {
        let resolution = self.resolution;
        let frames = self.frame_budget;
        let window = self.blend_window;
        let size = self.light_pool_size;
        let radius = self.light_jitter_radius;
        let weight = self.ambient_weight;
        let alpha_test = self.fade_in_alpha_test;
        self.resolution(resolution)
            .frame_budget(frames)
            .blend_window(window)
            .light_pool_size(size)
            .light_jitter_radius(radius)
            .ambient_weight(weight)
            .fade_in_alpha_test(alpha_test)
    }

    /// Accumulation buffer format.
    #[inline]
    pub fn format(&self) -> TextureFormat {
        if self.half_float {
            TextureFormat::Rgba16Float
        } else {
            TextureFormat::Rgba32Float
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BakeConfig::default();
        assert_eq!(config.light_pool_size, 8);
        assert_eq!(config.resolution, 1024);
        assert!(config.enabled);
        assert_eq!(config.format(), TextureFormat::Rgba32Float);
    }

    #[test]
    fn test_sanitized_clamps() {
        let config = BakeConfig {
            frame_budget: 0,
            blend_window: 0.25,
            light_pool_size: 64,
            ambient_weight: 2.0,
            fade_in_alpha_test: -1.0,
            ..BakeConfig::default()
        }
        .sanitized();
        assert_eq!(config.frame_budget, 1);
        assert_eq!(config.blend_window, 1.0);
        assert_eq!(config.light_pool_size, MAX_LIGHTS);
        assert_eq!(config.ambient_weight, 1.0);
        assert_eq!(config.fade_in_alpha_test, 0.0);
    }

    #[test]
    fn test_half_float_format() {
        assert_eq!(BakeConfig::new().half_float(true).format(), TextureFormat::Rgba16Float);
    }
}
