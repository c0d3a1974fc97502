//! # Penumbra - Progressive Light-Map Baking
//!
//! Penumbra bakes soft shadows for a static receiver surface by
//! accumulating many cheap, randomly lit shadow-mapped renders into a float
//! texture in the receiver's light-map UV space, one pass per frame.
//!
//! ## Features
//!
//! - **Lightmap**: the [`lightmap::LightMapBaker`] scheduler, ping-pong
//!   accumulation buffers and the RAII material-swap scope
//! - **Light**: directional lights with orthographic shadow cameras and the
//!   randomized light sampler
//! - **Material**: standard, discard, accumulation and shadow-catcher
//!   materials
//! - **Renderers**: a CPU reference renderer and a wgpu renderer behind the
//!   same [`core::RenderBackend`] contract
//!
//! ## Example
//!
//! ```ignore
//! use penumbra::prelude::*;
//!
//! let mut renderer = SoftwareRenderer::new(256, 256);
//! let ground = Mesh::new(
//!     PlaneGeometry::new(10.0, 10.0).build(),
//!     Material::from(StandardMaterial::new()).into_ref(),
//! )
//! .into_ref();
//! let cube = Mesh::new(
//!     BoxGeometry::new(2.0, 2.0, 2.0).build(),
//!     Material::from(StandardMaterial::new()).into_ref(),
//! )
//! .into_ref();
//!
//! let mut baker = LightMapBaker::new(BakeConfig::default());
//! baker.initialize(&mut renderer)?;
//! baker.set_receiver(&ground);
//! baker.register_surfaces(&[cube, ground]);
//! baker.update(&mut renderer)?;
//!
//! while !baker.is_complete() {
//!     baker.tick(&mut renderer)?;
//! }
//! let png = baker.export_accumulation_texture(&mut renderer)?;
//! ```

#![warn(missing_docs)]

pub mod camera;
pub mod core;
pub mod geometry;
pub mod gpu;
pub mod light;
pub mod lightmap;
pub mod material;
pub mod math;
pub mod scene;
pub mod software;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::camera::*;
    pub use crate::core::*;
    pub use crate::geometry::*;
    pub use crate::gpu::GpuRenderer;
    pub use crate::light::*;
    pub use crate::lightmap::*;
    pub use crate::material::*;
    pub use crate::math::*;
    pub use crate::scene::*;
    pub use crate::software::SoftwareRenderer;
}

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = "Penumbra";
