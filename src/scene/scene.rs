//! Scene container: a flat list of meshes and directional lights.

use super::MeshRef;
use crate::core::Id;
use crate::light::DirectionalLight;
use crate::math::Color;
use std::sync::Arc;

/// The scene: everything a renderer draws in one call.
#[derive(Debug, Default)]
pub struct Scene {
    /// Unique identifier.
    id: Id,
    /// Scene name.
    name: String,
    /// Top-level meshes, drawn in insertion order (then `render_order`).
    meshes: Vec<MeshRef>,
    /// Directional lights.
    lights: Vec<DirectionalLight>,
    /// Clear color of the default framebuffer, if any.
    background: Option<Color>,
}

impl Scene {
    /// Create a new empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the scene ID.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get the scene name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the scene name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Get the background.
    #[inline]
    pub fn background(&self) -> Option<Color> {
        self.background
    }

    /// Set the background.
    pub fn set_background(&mut self, background: Option<Color>) {
        self.background = background;
    }

    /// Add a mesh. Adding the same handle twice is a no-op.
    pub fn add(&mut self, mesh: MeshRef) {
        if !self.contains(&mesh) {
            self.meshes.push(mesh);
        }
    }

    /// Remove a mesh by ID.
    pub fn remove(&mut self, id: Id) -> Option<MeshRef> {
        let index = self
            .meshes
            .iter()
            .position(|m| m.read().map(|guard| guard.id() == id).unwrap_or(false))?;
        Some(self.meshes.remove(index))
    }

    /// Remove a mesh by handle identity.
    pub fn remove_ref(&mut self, mesh: &MeshRef) -> bool {
        let before = self.meshes.len();
        self.meshes.retain(|m| !Arc::ptr_eq(m, mesh));
        self.meshes.len() != before
    }

    /// Whether the handle is part of this scene.
    pub fn contains(&self, mesh: &MeshRef) -> bool {
        self.meshes.iter().any(|m| Arc::ptr_eq(m, mesh))
    }

    /// Find the first mesh with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<MeshRef> {
        self.meshes
            .iter()
            .find(|m| m.read().map(|guard| guard.name() == name).unwrap_or(false))
            .cloned()
    }

    /// All meshes.
    #[inline]
    pub fn meshes(&self) -> &[MeshRef] {
        &self.meshes
    }

    /// Number of meshes.
    #[inline]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Add a directional light.
    pub fn add_light(&mut self, light: DirectionalLight) {
        self.lights.push(light);
    }

    /// All lights.
    #[inline]
    pub fn lights(&self) -> &[DirectionalLight] {
        &self.lights
    }

    /// Mutable access to the lights.
    #[inline]
    pub fn lights_mut(&mut self) -> &mut [DirectionalLight] {
        &mut self.lights
    }

    /// Replace every light.
    pub fn set_lights(&mut self, lights: Vec<DirectionalLight>) {
        self.lights = lights;
    }

    /// Remove all meshes and lights.
    pub fn clear(&mut self) {
        self.meshes.clear();
        self.lights.clear();
    }
}
