//! # GPU Module
//!
//! wgpu backend for the baker: float render targets, depth-array shadow
//! maps and the WGSL accumulation, shadow-catcher and standard shaders.

mod pipelines;
mod readback;
mod renderer;
mod uniforms;

pub use pipelines::{PipelineKind, Pipelines, DEPTH_FORMAT};
pub use readback::{decode_row, padded_bytes_per_row};
pub use renderer::GpuRenderer;
pub use uniforms::{CameraUniform, DrawUniform, GpuLight, LightsUniform};
