//! Error types shared by the renderers and the baker.

use super::{ContextError, RenderTargetId, TextureFormat};
use thiserror::Error;

/// Errors surfaced to the host application.
///
/// Everything here is a platform or usage failure; configuration problems
/// with individual surfaces are logged and skipped instead.
#[derive(Error, Debug)]
pub enum BakeError {
    /// The render target id was never allocated or was disposed.
    #[error("Render target {0} does not exist")]
    UnknownRenderTarget(RenderTargetId),

    /// A render target was requested with a zero dimension.
    #[error("Invalid render target size {width}x{height}")]
    InvalidTargetSize {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// A pixel read-back rectangle does not fit inside the target.
    #[error("Read of {width}x{height} at ({x}, {y}) exceeds the {target_width}x{target_height} target")]
    ReadOutOfBounds {
        /// Rectangle origin x.
        x: u32,
        /// Rectangle origin y.
        y: u32,
        /// Rectangle width.
        width: u32,
        /// Rectangle height.
        height: u32,
        /// Target width.
        target_width: u32,
        /// Target height.
        target_height: u32,
    },

    /// The renderer cannot allocate or render into this format.
    #[error("Texture format {0:?} is not supported by this renderer")]
    UnsupportedFormat(TextureFormat),

    /// The scene holds more lights than a single pass supports.
    #[error("Scene has {count} lights, at most {max} are supported")]
    TooManyLights {
        /// Lights in the scene.
        count: usize,
        /// Renderer limit.
        max: usize,
    },

    /// The baker was used before `initialize`.
    #[error("Light-map baker has not been initialized")]
    NotInitialized,

    /// GPU context creation failed.
    #[error("GPU context error: {0}")]
    Context(#[from] ContextError),

    /// Mapping a read-back buffer failed.
    #[error("Failed to map read-back buffer: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    /// The read-back callback never reported back.
    #[error("Read-back buffer mapping was cancelled")]
    MapCancelled,

    /// Encoding the exported texture failed.
    #[error("Failed to encode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Result alias used throughout the crate.
pub type BakeResult<T> = Result<T, BakeError>;
