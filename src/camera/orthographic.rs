//! Orthographic camera.

use glam::{Mat4, Vec3};

/// An orthographic projection camera.
///
/// Directional-light shadow maps are rendered through one of these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthographicCamera {
    /// Left plane.
    pub left: f32,
    /// Right plane.
    pub right: f32,
    /// Top plane.
    pub top: f32,
    /// Bottom plane.
    pub bottom: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
    /// Camera position.
    pub position: Vec3,
    /// Look-at target.
    pub target: Vec3,
    /// Up vector.
    pub up: Vec3,
}

impl OrthographicCamera {
    /// Create a new orthographic camera.
    pub fn new(left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
            near,
            far,
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
        }
    }

    /// Symmetric frustum spanning `[-extent, extent]` on both axes.
    pub fn symmetric(extent: f32, near: f32, far: f32) -> Self {
        Self::new(-extent, extent, extent, -extent, near, far)
    }

    /// View matrix.
    ///
    /// Falls back to a +Z up vector when looking straight along `up`.
    pub fn view_matrix(&self) -> Mat4 {
        let forward = (self.target - self.position).normalize_or_zero();
        let up = if forward.cross(self.up).length_squared() < 1e-8 {
            Vec3::Z
        } else {
            self.up
        };
        Mat4::look_at_rh(self.position, self.target, up)
    }

    /// Projection matrix (wgpu clip space, depth in `[0, 1]`).
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::orthographic_rh(self.left, self.right, self.bottom, self.top, self.near, self.far)
    }

    /// Combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_projects_to_center() {
        let mut camera = OrthographicCamera::symmetric(10.0, 0.1, 100.0);
        camera.position = Vec3::new(0.0, 50.0, 0.0);
        let clip = camera.view_projection_matrix().project_point3(Vec3::ZERO);
        assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }
}
