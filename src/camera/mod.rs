//! Camera module for view and projection.

mod orthographic;
mod perspective;

pub use orthographic::OrthographicCamera;
pub use perspective::PerspectiveCamera;

use glam::{Mat4, Vec3};

/// Any camera a renderer can draw through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Camera {
    /// Perspective projection.
    Perspective(PerspectiveCamera),
    /// Orthographic projection.
    Orthographic(OrthographicCamera),
}

impl Camera {
    /// Combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        match self {
            Self::Perspective(camera) => camera.view_projection_matrix(),
            Self::Orthographic(camera) => camera.view_projection_matrix(),
        }
    }

    /// Eye position.
    pub fn position(&self) -> Vec3 {
        match self {
            Self::Perspective(camera) => camera.position,
            Self::Orthographic(camera) => camera.position,
        }
    }
}

impl From<PerspectiveCamera> for Camera {
    fn from(camera: PerspectiveCamera) -> Self {
        Self::Perspective(camera)
    }
}

impl From<OrthographicCamera> for Camera {
    fn from(camera: OrthographicCamera) -> Self {
        Self::Orthographic(camera)
    }
}
