//! # Core Module
//!
//! Identifiers, errors, the renderer contract, and headless wgpu context
//! management.

mod backend;
mod context;
mod error;
mod id;

pub use backend::{RenderBackend, RenderTargetDescriptor, RenderTargetId, TextureFormat};
pub(crate) use backend::check_read_bounds;
pub use context::{check_downlevel_flags, Context, ContextError, REQUIRED_DOWNLEVEL_FLAGS};
pub use error::{BakeError, BakeResult};
pub use id::Id;

/// GPU context configuration options.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Backends to consider when picking an adapter.
    pub backends: wgpu::Backends,
    /// Power preference for GPU selection.
    pub power_preference: wgpu::PowerPreference,
    /// Accept only a software fallback adapter.
    pub force_fallback_adapter: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
        }
    }
}
