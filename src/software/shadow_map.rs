//! CPU shadow maps for directional lights.

use super::raster::rasterize_triangle;
use crate::light::{DirectionalLight, PcfMode};
use glam::{Mat4, Vec3};

/// A depth map rendered from a light's orthographic shadow camera.
#[derive(Debug, Clone)]
pub(crate) struct ShadowMap {
    size: u32,
    depth: Vec<f32>,
    view_projection: Mat4,
    bias: f32,
    pcf: PcfMode,
}

impl ShadowMap {
    /// Empty map (everything lit) for `light`.
    pub fn new(light: &DirectionalLight) -> Self {
        let size = light.shadow.map_size.max(1);
        Self {
            size,
            depth: vec![1.0; (size * size) as usize],
            view_projection: light.shadow_camera().view_projection_matrix(),
            bias: light.shadow.bias,
            pcf: light.shadow.pcf,
        }
    }

    /// Light-space view-projection matrix.
    #[inline]
    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    /// Rasterize world-space triangles, keeping the nearest depth.
    pub fn draw_triangles(&mut self, triangles: impl IntoIterator<Item = [Vec3; 3]>) {
        let size = self.size;
        let extent = size as f32;
        for world in triangles {
            let screen = world.map(|p| {
                let ndc = self.view_projection.project_point3(p);
                Vec3::new((ndc.x * 0.5 + 0.5) * extent, (0.5 - ndc.y * 0.5) * extent, ndc.z)
            });
            let depth = &mut self.depth;
            rasterize_triangle(size, size, screen, |x, y, _, z| {
                if !(0.0..=1.0).contains(&z) {
                    return;
                }
                let slot = &mut depth[(y * size + x) as usize];
                if z < *slot {
                    *slot = z;
                }
            });
        }
    }

    /// Fraction of filter taps that see `world` as lit.
    ///
    /// Points outside the shadow camera's frustum are fully lit.
    pub fn visibility(&self, world: Vec3) -> f32 {
        let ndc = self.view_projection.project_point3(world);
        if ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 || !(0.0..=1.0).contains(&ndc.z) {
            return 1.0;
        }
        let extent = self.size as f32;
        let cx = ((ndc.x * 0.5 + 0.5) * extent).floor() as i32;
        let cy = ((0.5 - ndc.y * 0.5) * extent).floor() as i32;
        let reference = ndc.z - self.bias;
        let radius = self.pcf.kernel_radius();
        let max = self.size as i32 - 1;

        let mut lit = 0u32;
        let mut taps = 0u32;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let x = (cx + dx).clamp(0, max) as u32;
                let y = (cy + dy).clamp(0, max) as u32;
                if reference <= self.depth[(y * self.size + x) as usize] {
                    lit += 1;
                }
                taps += 1;
            }
        }
        lit as f32 / taps as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::ShadowSettings;

    fn light() -> DirectionalLight {
        DirectionalLight::default()
            .with_position(Vec3::new(0.0, 10.0, 0.0))
            .with_shadows(ShadowSettings::new().map_size(64).camera_extent(4.0).clip_planes(0.1, 20.0))
    }

    fn square(y: f32, half: f32) -> [[Vec3; 3]; 2] {
        let a = Vec3::new(-half, y, -half);
        let b = Vec3::new(half, y, -half);
        let c = Vec3::new(half, y, half);
        let d = Vec3::new(-half, y, half);
        [[a, b, c], [a, c, d]]
    }

    #[test]
    fn test_empty_map_is_lit() {
        let map = ShadowMap::new(&light());
        assert_eq!(map.visibility(Vec3::ZERO), 1.0);
    }

    #[test]
    fn test_occluder_shadows_points_below() {
        let mut map = ShadowMap::new(&light());
        map.draw_triangles(square(2.0, 1.0));
        assert_eq!(map.visibility(Vec3::ZERO), 0.0);
        assert_eq!(map.visibility(Vec3::new(3.0, 0.0, 3.0)), 1.0);
        // Points above the occluder stay lit.
        assert_eq!(map.visibility(Vec3::new(0.0, 3.0, 0.0)), 1.0);
    }

    #[test]
    fn test_pcf_softens_edges() {
        let mut map = ShadowMap::new(&light());
        map.draw_triangles(square(2.0, 1.0));
        // One texel is 8/64 world units; sample right at the occluder edge.
        let v = map.visibility(Vec3::new(1.0 + 1.0 / 64.0, 0.0, 0.0));
        assert!(v > 0.0 && v < 1.0, "{v}");
    }

    #[test]
    fn test_outside_frustum_is_lit() {
        let mut map = ShadowMap::new(&light());
        map.draw_triangles(square(2.0, 10.0));
        assert_eq!(map.visibility(Vec3::new(50.0, 0.0, 0.0)), 1.0);
    }
}
