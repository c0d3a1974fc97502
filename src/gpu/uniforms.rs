//! GPU-friendly uniform blocks shared with the WGSL shaders.

use crate::light::{DirectionalLight, MAX_LIGHTS};
use crate::material::{AccumulationMaterial, ShadowCatcherMaterial, StandardMaterial};
use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};

/// View-projection of the camera a pass renders through.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct CameraUniform {
    /// Combined view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    /// Wrap a matrix.
    pub fn new(view_proj: Mat4) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
        }
    }
}

/// Per-draw transform and material parameters.
///
/// `color` and `params` are interpreted per material kind:
///
/// | kind           | color       | params                                            |
/// |----------------|-------------|---------------------------------------------------|
/// | standard       | base color  | x=ambient, y=receive_shadow                       |
/// | accumulation   | unused      | x=blend weight, y=receive_shadow, z=has_previous  |
/// | shadow catcher | tint        | x=alpha_test, y=opacity, z=blend_factor, w=denominator |
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct DrawUniform {
    /// Object-to-world matrix.
    pub model: [[f32; 4]; 4],
    /// Normal matrix, padded to 4x4.
    pub normal: [[f32; 4]; 4],
    /// Material color.
    pub color: [f32; 4],
    /// Material parameters.
    pub params: [f32; 4],
}

impl DrawUniform {
    /// Transform-only block, as used by the depth pass.
    pub fn transform(model: Mat4, normal: Mat3) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal: Mat4::from_mat3(normal).to_cols_array_2d(),
            color: [0.0; 4],
            params: [0.0; 4],
        }
    }

    /// Parameters for a lit surface.
    pub fn standard(mut self, material: &StandardMaterial, receive_shadow: bool) -> Self {
        self.color = material.color.with_alpha(1.0);
        self.params = [material.ambient, flag(receive_shadow), 0.0, 0.0];
        self
    }

    /// Parameters for the accumulation write.
    pub fn accumulation(mut self, material: &AccumulationMaterial, receive_shadow: bool, has_previous: bool) -> Self {
        self.params = [material.blend_weight(), flag(receive_shadow), flag(has_previous), 0.0];
        self
    }

    /// Parameters for the shadow catcher.
    pub fn shadow_catcher(mut self, material: &ShadowCatcherMaterial) -> Self {
        let denominator = if material.alpha_test_denominator.abs() > f32::EPSILON {
            material.alpha_test_denominator
        } else {
            ShadowCatcherMaterial::DEFAULT_ALPHA_TEST_DENOMINATOR
        };
        self.color = material.color.with_alpha(1.0);
        self.params = [material.alpha_test, material.opacity, material.blend_factor, denominator];
        self
    }
}

#[inline]
fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// One directional light as seen by the shaders.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct GpuLight {
    /// Shadow camera view-projection.
    pub view_proj: [[f32; 4]; 4],
    /// xyz = unit vector towards the light, w = shadow layer (-1 for none).
    pub direction: [f32; 4],
    /// rgb = radiance, w = depth bias.
    pub color: [f32; 4],
}

/// All lights of a render plus global shadow parameters.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct LightsUniform {
    /// Light slots; only the first `info.x` are read.
    pub lights: [GpuLight; MAX_LIGHTS],
    /// x = light count, y = PCF kernel radius, z = shadow map size, w unused.
    pub info: [f32; 4],
}

impl Default for LightsUniform {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl LightsUniform {
    /// Pack up to [`MAX_LIGHTS`] lights. Shadow-casting lights get
    /// consecutive layers of a `map_size` depth array.
    pub fn from_lights(lights: &[DirectionalLight], map_size: u32) -> Self {
        let mut uniform = Self::default();
        let mut layer = 0.0;
        let mut pcf_radius = 0;
        for (slot, light) in uniform.lights.iter_mut().zip(lights) {
            let to_light = light.to_light();
            let shadow_layer = if light.cast_shadow {
                let current = layer;
                layer += 1.0;
                pcf_radius = pcf_radius.max(light.shadow.pcf.kernel_radius());
                current
            } else {
                -1.0
            };
            *slot = GpuLight {
                view_proj: light.shadow_camera().view_projection_matrix().to_cols_array_2d(),
                direction: [to_light.x, to_light.y, to_light.z, shadow_layer],
                color: light.radiance().with_alpha(light.shadow.bias),
            };
        }
        uniform.info = [
            lights.len().min(MAX_LIGHTS) as f32,
            pcf_radius as f32,
            map_size as f32,
            0.0,
        ];
        uniform
    }

    /// Number of shadow layers in use.
    pub fn shadow_layers(&self) -> u32 {
        let count = self.info[0] as usize;
        self.lights[..count].iter().filter(|l| l.direction[3] >= 0.0).count() as u32
    }
}
