//! CPU reference renderer.
//!
//! Slow but exact and available everywhere; the baker's tests and the
//! headless demo run on it.

mod raster;
mod renderer;
mod shadow_map;

pub use renderer::SoftwareRenderer;
