//! The renderer contract the baker drives.
//!
//! A [`RenderBackend`] is the host engine as seen from the baker: it can
//! allocate float render targets, bind one of them (or the default
//! framebuffer), clear it, render a [`Scene`] through a [`Camera`], and read
//! pixels back. [`crate::software::SoftwareRenderer`] and
//! [`crate::gpu::GpuRenderer`] both implement it.

use super::BakeResult;
use crate::camera::Camera;
use crate::scene::Scene;
use serde::{Deserialize, Serialize};

/// Handle to a render target owned by a renderer.
///
/// Handles are plain indices into the renderer's target arena; they stay
/// valid when the renderer recreates the underlying storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTargetId(pub(crate) u32);

impl RenderTargetId {
    /// Arena slot index.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for RenderTargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rt{}", self.0)
    }
}

/// Texel formats available for render targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureFormat {
    /// 4 x 32-bit float.
    #[default]
    Rgba32Float,
    /// 4 x 16-bit float, for platforms without float32 render targets.
    Rgba16Float,
}

impl TextureFormat {
    /// Bytes per texel.
    #[inline]
    pub fn bytes_per_texel(&self) -> u32 {
        match self {
            Self::Rgba32Float => 16,
            Self::Rgba16Float => 8,
        }
    }

    /// Matching wgpu format.
    #[inline]
    pub fn to_wgpu(&self) -> wgpu::TextureFormat {
        match self {
            Self::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
            Self::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        }
    }
}

/// Parameters for [`RenderBackend::create_render_target`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderTargetDescriptor {
    /// Debug label.
    pub label: String,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Texel format.
    pub format: TextureFormat,
}

impl RenderTargetDescriptor {
    /// Square target of the given edge size.
    pub fn square(label: impl Into<String>, size: u32, format: TextureFormat) -> Self {
        Self {
            label: label.into(),
            width: size,
            height: size,
            format,
        }
    }
}

/// The operations the baker needs from a renderer.
pub trait RenderBackend {
    /// Allocate a render target. Contents start zeroed.
    fn create_render_target(&mut self, desc: &RenderTargetDescriptor) -> BakeResult<RenderTargetId>;

    /// Release a render target. Unknown ids are ignored.
    fn dispose_render_target(&mut self, target: RenderTargetId);

    /// Bind a render target, or the default framebuffer with `None`.
    fn set_render_target(&mut self, target: Option<RenderTargetId>);

    /// Currently bound render target.
    fn render_target(&self) -> Option<RenderTargetId>;

    /// Clear the bound target to zero in every channel.
    fn clear(&mut self) -> BakeResult<()>;

    /// Render the scene into the bound target.
    fn render(&mut self, scene: &Scene, camera: &Camera) -> BakeResult<()>;

    /// Read back a rectangle of RGBA texels, row-major from `(x, y)`.
    fn read_render_target_pixels(
        &mut self,
        target: RenderTargetId,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> BakeResult<Vec<[f32; 4]>>;

    /// Dimensions of a render target, if it exists.
    fn render_target_size(&self, target: RenderTargetId) -> Option<(u32, u32)>;
}

/// Check that a read-back rectangle fits inside a `target_width` x `target_height` target.
pub(crate) fn check_read_bounds(
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    target_width: u32,
    target_height: u32,
) -> BakeResult<()> {
    let fits_x = x.checked_add(width).is_some_and(|end| end <= target_width);
    let fits_y = y.checked_add(height).is_some_and(|end| end <= target_height);
    if fits_x && fits_y {
        Ok(())
    } else {
        Err(super::BakeError::ReadOutOfBounds {
            x,
            y,
            width,
            height,
            target_width,
            target_height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bounds() {
        assert!(check_read_bounds(0, 0, 4, 4, 4, 4).is_ok());
        assert!(check_read_bounds(1, 0, 4, 4, 4, 4).is_err());
        assert!(check_read_bounds(u32::MAX, 0, 2, 1, 4, 4).is_err());
    }

    #[test]
    fn test_format_sizes() {
        assert_eq!(TextureFormat::Rgba32Float.bytes_per_texel(), 16);
        assert_eq!(TextureFormat::Rgba16Float.bytes_per_texel(), 8);
        assert_eq!(TextureFormat::default(), TextureFormat::Rgba32Float);
    }
}
