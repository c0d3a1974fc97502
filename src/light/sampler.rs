//! Randomized light placement for progressive baking.

use super::{DirectionalLight, ShadowSettings};
use crate::math::Color;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::{FRAC_PI_2, TAU};

/// Repositions a pool of directional lights each bake pass.
///
/// Every light independently picks one of two strategies:
///
/// - **local jitter** (probability `1 - ambient_weight`): a point in a cube
///   of edge `jitter_radius` centred on the light origin, giving soft
///   penumbrae around the key light;
/// - **sky** (probability `ambient_weight`): a point on the upper hemisphere
///   of radius `|origin|` around the world origin, giving an ambient
///   occlusion term.
#[derive(Debug, Clone)]
pub struct LightSampler<R: Rng = StdRng> {
    rng: R,
}

impl LightSampler<StdRng> {
    /// Deterministic sampler.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Sampler seeded from system entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Build `size` shadow-casting lights aimed at `target`.
    ///
    /// Each light carries `1 / size` of the total intensity so a texel lit by
    /// the whole pool shades to one.
    pub fn create_pool(size: usize, target: Vec3, shadow: ShadowSettings) -> Vec<DirectionalLight> {
        let intensity = 1.0 / size.max(1) as f32;
        (0..size)
            .map(|_| {
                let mut light = DirectionalLight::new(Color::WHITE, intensity).with_shadows(shadow);
                light.target = target;
                light
            })
            .collect()
    }
}

impl<R: Rng> LightSampler<R> {
    /// Wrap a random source.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Move every light to a fresh sample.
    pub fn resample(&mut self, lights: &mut [DirectionalLight], origin: Vec3, jitter_radius: f32, ambient_weight: f32) {
        for light in lights.iter_mut() {
            light.position = self.sample_position(origin, jitter_radius, ambient_weight);
        }
    }

    /// Draw one light position.
    pub fn sample_position(&mut self, origin: Vec3, jitter_radius: f32, ambient_weight: f32) -> Vec3 {
        let u: f32 = self.rng.gen();
        if u > ambient_weight {
            self.jitter(origin, jitter_radius)
        } else {
            self.hemisphere(origin.length())
        }
    }

    fn jitter(&mut self, origin: Vec3, radius: f32) -> Vec3 {
        let offset = Vec3::new(
            self.rng.gen::<f32>() - 0.5,
            self.rng.gen::<f32>() - 0.5,
            self.rng.gen::<f32>() - 0.5,
        );
        origin + offset * radius
    }

    fn hemisphere(&mut self, radius: f32) -> Vec3 {
        let a: f32 = self.rng.gen();
        let b: f32 = self.rng.gen();
        let lambda = (2.0 * a - 1.0).clamp(-1.0, 1.0).acos() - FRAC_PI_2;
        let phi = TAU * b;
        let (sin_l, cos_l) = lambda.sin_cos();
        let (sin_p, cos_p) = phi.sin_cos();
        // Reflect into the upper half so the sample stays on the sphere.
        Vec3::new(cos_l * cos_p, (cos_l * sin_p).abs(), sin_l) * radius
    }
}
