//! Directional light (parallel rays from a positioned source).

use super::ShadowSettings;
use crate::camera::OrthographicCamera;
use crate::core::Id;
use crate::math::Color;
use glam::Vec3;

/// Directional light shining from `position` towards `target`.
///
/// Only the direction matters for shading; the position also places the
/// orthographic shadow camera.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    /// Unique ID.
    id: Id,
    /// Light color.
    pub color: Color,
    /// Light intensity.
    pub intensity: f32,
    /// Source position.
    pub position: Vec3,
    /// Point the light aims at.
    pub target: Vec3,
    /// Whether this light casts shadows.
    pub cast_shadow: bool,
    /// Shadow camera and map parameters.
    pub shadow: ShadowSettings,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Color::WHITE, 1.0)
    }
}

impl DirectionalLight {
    /// Create a light above the origin pointing down.
    pub fn new(color: Color, intensity: f32) -> Self {
        Self {
            id: Id::new(),
            color,
            intensity,
            position: Vec3::new(0.0, 10.0, 0.0),
            target: Vec3::ZERO,
            cast_shadow: false,
            shadow: ShadowSettings::default(),
        }
    }

    /// Get the unique ID.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Enable shadows with the given settings.
    pub fn with_shadows(mut self, shadow: ShadowSettings) -> Self {
        self.cast_shadow = true;
        self.shadow = shadow;
        self
    }

    /// Builder: set position.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Unit vector from the surface towards the light.
    ///
    /// Degenerate placements (position on the target) shine straight down.
    pub fn to_light(&self) -> Vec3 {
        let dir = self.position - self.target;
        if dir.length_squared() > 1e-12 {
            dir.normalize()
        } else {
            Vec3::Y
        }
    }

    /// Radiance scale: color times intensity.
    #[inline]
    pub fn radiance(&self) -> Color {
        self.color * self.intensity
    }

    /// Orthographic camera used to render this light's shadow map.
    pub fn shadow_camera(&self) -> OrthographicCamera {
        let mut camera = OrthographicCamera::symmetric(self.shadow.camera_extent, self.shadow.near, self.shadow.far);
        camera.position = self.target + self.to_light() * self.position.distance(self.target).max(self.shadow.near + 1e-3);
        camera.target = self.target;
        camera
    }
}
