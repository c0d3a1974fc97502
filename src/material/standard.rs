//! Standard lit material.

use crate::core::Id;
use crate::math::Color;

/// Diffuse material lit by the scene's directional lights with shadows.
#[derive(Debug, Clone)]
pub struct StandardMaterial {
    /// Unique ID.
    id: Id,
    /// Base color.
    pub color: Color,
    /// Constant ambient term added before shadowing.
    pub ambient: f32,
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardMaterial {
    /// Create a white material.
    pub fn new() -> Self {
        Self {
            id: Id::new(),
            color: Color::WHITE,
            ambient: 0.05,
        }
    }

    /// Create with a specific color.
    pub fn with_color(color: Color) -> Self {
        Self { color, ..Self::new() }
    }

    /// Get the unique ID.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Final color given the summed direct irradiance at the fragment.
    #[inline]
    pub fn shade(&self, irradiance: Color) -> [f32; 4] {
        let lit = self.color * (irradiance + Color::splat(self.ambient));
        lit.with_alpha(1.0)
    }
}
