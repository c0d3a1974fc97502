//! Lighting module: directional lights and the bake light sampler.

mod directional;
mod sampler;
mod shadow;

pub use directional::DirectionalLight;
pub use sampler::LightSampler;
pub use shadow::{PcfMode, ShadowSettings};

/// Maximum number of lights supported in a single render pass.
pub const MAX_LIGHTS: usize = 16;
