//! Mesh object combining geometry and material.

use crate::core::Id;
use crate::geometry::BufferGeometry;
use crate::material::MaterialRef;
use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};
use std::sync::{Arc, RwLock};

/// Shared, mutable mesh handle.
pub type MeshRef = Arc<RwLock<Mesh>>;

/// A mesh is a renderable object with geometry and material.
#[derive(Debug)]
pub struct Mesh {
    /// Unique identifier.
    id: Id,
    /// Object name.
    name: String,
    /// Geometry data.
    geometry: Arc<BufferGeometry>,
    /// Shared material handle.
    material: MaterialRef,
    /// Local position.
    pub position: Vec3,
    /// Local rotation.
    pub rotation: Quat,
    /// Local scale.
    pub scale: Vec3,
    /// Visibility flag.
    pub visible: bool,
    /// Cast shadows.
    pub cast_shadow: bool,
    /// Receive shadows.
    pub receive_shadow: bool,
    /// Frustum culling enabled.
    pub frustum_culled: bool,
    /// Render order (for transparency sorting).
    pub render_order: i32,
}

impl Mesh {
    /// Create a new mesh with geometry and material.
    pub fn new(geometry: impl Into<Arc<BufferGeometry>>, material: MaterialRef) -> Self {
        Self {
            id: Id::new(),
            name: String::new(),
            geometry: geometry.into(),
            material,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            visible: true,
            cast_shadow: true,
            receive_shadow: true,
            frustum_culled: true,
            render_order: 0,
        }
    }

    /// Builder: set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Get the unique ID.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get the object name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the object name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Get the geometry.
    #[inline]
    pub fn geometry(&self) -> &Arc<BufferGeometry> {
        &self.geometry
    }

    /// Replace the geometry.
    pub fn set_geometry(&mut self, geometry: impl Into<Arc<BufferGeometry>>) {
        self.geometry = geometry.into();
    }

    /// Get the material handle.
    #[inline]
    pub fn material(&self) -> &MaterialRef {
        &self.material
    }

    /// Swap in a material, returning the previous handle.
    pub fn set_material(&mut self, material: MaterialRef) -> MaterialRef {
        std::mem::replace(&mut self.material, material)
    }

    /// Set position.
    pub fn set_position(&mut self, x: f32, y: f32, z: f32) {
        self.position = Vec3::new(x, y, z);
    }

    /// Set rotation from Euler angles (radians, XYZ order).
    pub fn set_rotation_euler(&mut self, x: f32, y: f32, z: f32) {
        self.rotation = Quat::from_euler(EulerRot::XYZ, x, y, z);
    }

    /// Set scale.
    pub fn set_scale(&mut self, x: f32, y: f32, z: f32) {
        self.scale = Vec3::new(x, y, z);
    }

    /// Model matrix. Meshes are not parented, so this is also the world matrix.
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Inverse-transpose of the model matrix's upper 3x3.
    pub fn normal_matrix(&self) -> Mat3 {
        Mat3::from_mat4(self.world_matrix()).inverse().transpose()
    }

    /// World-space axis-aligned bounds of the geometry.
    pub fn world_bounding_box(&self) -> Option<(Vec3, Vec3)> {
        let (min, max) = self.geometry.bounding_box()?;
        let world = self.world_matrix();
        let mut out_min = Vec3::splat(f32::INFINITY);
        let mut out_max = Vec3::splat(f32::NEG_INFINITY);
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            );
            let p = world.transform_point3(corner);
            out_min = out_min.min(p);
            out_max = out_max.max(p);
        }
        Some((out_min, out_max))
    }

    /// Wrap in a shared handle.
    pub fn into_ref(self) -> MeshRef {
        Arc::new(RwLock::new(self))
    }
}
