//! Shadow settings for directional lights.

use serde::{Deserialize, Serialize};

/// PCF (Percentage Closer Filtering) mode for shadow lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum PcfMode {
    /// Single tap (hard shadows).
    None = 0,
    /// 3x3 taps.
    #[default]
    Soft3x3 = 1,
}

impl PcfMode {
    /// Half-width of the tap kernel in texels.
    #[inline]
    pub fn kernel_radius(&self) -> i32 {
        match self {
            Self::None => 0,
            Self::Soft3x3 => 1,
        }
    }
}

/// Per-light shadow camera and map parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowSettings {
    /// Shadow map edge size in texels.
    pub map_size: u32,
    /// Half-size of the orthographic shadow frustum.
    pub camera_extent: f32,
    /// Shadow camera near plane.
    pub near: f32,
    /// Shadow camera far plane.
    pub far: f32,
    /// Depth bias in normalized depth units.
    pub bias: f32,
    /// Filtering mode.
    pub pcf: PcfMode,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            map_size: 512,
            camera_extent: 10.0,
            near: 0.1,
            far: 100.0,
            bias: 0.002,
            pcf: PcfMode::Soft3x3,
        }
    }
}

impl ShadowSettings {
    /// Create default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the map size (clamped to 16..=8192).
    pub fn map_size(mut self, size: u32) -> Self {
        self.map_size = size.clamp(16, 8192);
        self
    }

    /// Set the frustum half-size.
    pub fn camera_extent(mut self, extent: f32) -> Self {
        self.camera_extent = extent.max(0.001);
        self
    }

    /// Set near and far planes.
    pub fn clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near.max(0.0);
        self.far = far.max(self.near + 0.001);
        self
    }

    /// Set the depth bias.
    pub fn bias(mut self, bias: f32) -> Self {
        self.bias = bias.max(0.0);
        self
    }

    /// Set the filtering mode.
    pub fn pcf(mut self, pcf: PcfMode) -> Self {
        self.pcf = pcf;
        self
    }
}
