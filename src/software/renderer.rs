//! CPU implementation of the renderer contract.

use super::raster::rasterize_triangle;
use super::shadow_map::ShadowMap;
use crate::camera::Camera;
use crate::core::{
    check_read_bounds, BakeError, BakeResult, RenderBackend, RenderTargetDescriptor, RenderTargetId, TextureFormat,
};
use crate::geometry::{Attribute, BufferGeometry};
use crate::light::{DirectionalLight, MAX_LIGHTS};
use crate::material::{AccumulationMaterial, Material, ShadowCatcherMaterial, StandardMaterial};
use crate::math::Color;
use crate::scene::Scene;
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use half::f16;
use std::sync::{Arc, PoisonError};

/// A float texel store.
#[derive(Debug, Clone, Default)]
struct Target {
    width: u32,
    height: u32,
    format: TextureFormat,
    texels: Vec<[f32; 4]>,
}

impl Target {
    fn new(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            texels: vec![[0.0; 4]; (width as usize) * (height as usize)],
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + x as usize
    }

    fn fill(&mut self, value: [f32; 4]) {
        let value = self.quantize(value);
        self.texels.fill(value);
    }

    #[inline]
    fn quantize(&self, value: [f32; 4]) -> [f32; 4] {
        match self.format {
            TextureFormat::Rgba32Float => value,
            TextureFormat::Rgba16Float => value.map(|c| f16::from_f32(c).to_f32()),
        }
    }

    #[inline]
    fn write(&mut self, x: u32, y: u32, value: [f32; 4]) {
        let index = self.index(x, y);
        self.texels[index] = self.quantize(value);
    }

    #[inline]
    fn read(&self, x: u32, y: u32) -> [f32; 4] {
        self.texels[self.index(x, y)]
    }

    /// Nearest-texel lookup with clamp-to-edge addressing.
    fn sample(&self, uv: Vec2) -> [f32; 4] {
        if self.width == 0 || self.height == 0 {
            return [0.0; 4];
        }
        let x = (uv.x * self.width as f32).floor().clamp(0.0, (self.width - 1) as f32) as u32;
        let y = (uv.y * self.height as f32).floor().clamp(0.0, (self.height - 1) as f32) as u32;
        self.read(x, y)
    }
}

/// Per-mesh data snapshotted at the start of a render.
struct DrawItem {
    geometry: Arc<BufferGeometry>,
    material: Material,
    world: Mat4,
    normal: Mat3,
    cast_shadow: bool,
    receive_shadow: bool,
    frustum_culled: bool,
    render_order: i32,
    bounds: Option<(Vec3, Vec3)>,
}

impl DrawItem {
    fn world_positions(&self) -> Vec<Vec3> {
        self.geometry
            .positions()
            .iter()
            .map(|p| self.world.transform_point3(Vec3::from_array(*p)))
            .collect()
    }

    fn world_normals(&self) -> Vec<Vec3> {
        if self.geometry.has_attribute(Attribute::Normal) {
            self.geometry
                .normals()
                .iter()
                .map(|n| (self.normal * Vec3::from_array(*n)).normalize_or_zero())
                .collect()
        } else {
            let up = (self.normal * Vec3::Y).normalize_or_zero();
            vec![up; self.geometry.vertex_count()]
        }
    }

    /// Conservative test against a clip volume.
    fn outside(&self, view_projection: Mat4) -> bool {
        let Some((min, max)) = self.bounds else {
            return false;
        };
        let corners: Vec<Vec4> = (0..8)
            .map(|i| {
                let corner = Vec3::new(
                    if i & 1 == 0 { min.x } else { max.x },
                    if i & 2 == 0 { min.y } else { max.y },
                    if i & 4 == 0 { min.z } else { max.z },
                );
                view_projection * self.world.transform_point3(corner).extend(1.0)
            })
            .collect();
        let all = |test: fn(&Vec4) -> bool| corners.iter().all(test);
        all(|c| c.x < -c.w)
            || all(|c| c.x > c.w)
            || all(|c| c.y < -c.w)
            || all(|c| c.y > c.w)
            || all(|c| c.z < 0.0)
            || all(|c| c.z > c.w)
    }

    /// Drawing order: light-map writes, then opaque, then blended.
    fn pass_rank(&self) -> u8 {
        match self.material {
            Material::Accumulation(_) => 0,
            Material::Standard(_) | Material::Discard(_) => 1,
            Material::ShadowCatcher(_) => 2,
        }
    }
}

struct Lighting<'a> {
    lights: &'a [DirectionalLight],
    shadow_maps: Vec<Option<ShadowMap>>,
}

impl Lighting<'_> {
    fn irradiance(&self, position: Vec3, normal: Vec3, receive_shadow: bool) -> Color {
        self.lights
            .iter()
            .zip(&self.shadow_maps)
            .fold(Color::BLACK, |sum, (light, shadow_map)| {
                let n_dot_l = normal.dot(light.to_light()).max(0.0);
                if n_dot_l <= 0.0 {
                    return sum;
                }
                let visibility = match (receive_shadow, shadow_map) {
                    (true, Some(map)) => map.visibility(position),
                    _ => 1.0,
                };
                sum + light.radiance() * (n_dot_l * visibility)
            })
    }
}

/// Reference renderer running entirely on the CPU.
///
/// Supports everything the baker needs: float render targets, orthographic
/// shadow maps with PCF, UV-space accumulation and the shadow catcher. The
/// default framebuffer is an `Rgba32Float` image of the size given at
/// construction.
#[derive(Debug)]
pub struct SoftwareRenderer {
    targets: Vec<Option<Target>>,
    framebuffer: Target,
    bound: Option<RenderTargetId>,
}

impl SoftwareRenderer {
    /// Create a renderer with a `width` x `height` default framebuffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            targets: Vec::new(),
            framebuffer: Target::new(width, height, TextureFormat::Rgba32Float),
            bound: None,
        }
    }

    /// Default framebuffer size.
    #[inline]
    pub fn framebuffer_size(&self) -> (u32, u32) {
        (self.framebuffer.width, self.framebuffer.height)
    }

    /// Default framebuffer contents, row-major.
    #[inline]
    pub fn framebuffer_pixels(&self) -> &[[f32; 4]] {
        &self.framebuffer.texels
    }

    /// Set every texel of a target to `value`.
    pub fn fill_render_target(&mut self, target: RenderTargetId, value: [f32; 4]) -> BakeResult<()> {
        self.target_mut(target)?.fill(value);
        Ok(())
    }

    fn target(&self, id: RenderTargetId) -> Option<&Target> {
        self.targets.get(id.index()).and_then(Option::as_ref)
    }

    fn target_mut(&mut self, id: RenderTargetId) -> BakeResult<&mut Target> {
        self.targets
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(BakeError::UnknownRenderTarget(id))
    }

    /// Detach the bound target so sources can be read while it is written.
    fn take_bound(&mut self) -> BakeResult<Target> {
        match self.bound {
            Some(id) => self
                .targets
                .get_mut(id.index())
                .and_then(Option::take)
                .ok_or(BakeError::UnknownRenderTarget(id)),
            None => Ok(std::mem::take(&mut self.framebuffer)),
        }
    }

    fn restore_bound(&mut self, target: Target) {
        match self.bound {
            Some(id) => {
                if let Some(slot) = self.targets.get_mut(id.index()) {
                    *slot = Some(target);
                }
            }
            None => self.framebuffer = target,
        }
    }

    fn draw(&self, output: &mut Target, scene: &Scene, camera: &Camera) {
        let mut items: Vec<DrawItem> = scene
            .meshes()
            .iter()
            .filter_map(|mesh| {
                let mesh = mesh.read().unwrap_or_else(PoisonError::into_inner);
                if !mesh.visible || !mesh.geometry().has_attribute(Attribute::Position) {
                    return None;
                }
                let material = mesh.material().read().unwrap_or_else(PoisonError::into_inner).clone();
                Some(DrawItem {
                    geometry: mesh.geometry().clone(),
                    material,
                    world: mesh.world_matrix(),
                    normal: mesh.normal_matrix(),
                    cast_shadow: mesh.cast_shadow,
                    receive_shadow: mesh.receive_shadow,
                    frustum_culled: mesh.frustum_culled,
                    render_order: mesh.render_order,
                    bounds: mesh.geometry().bounding_box(),
                })
            })
            .collect();
        items.sort_by_key(|item| (item.pass_rank(), item.render_order));

        let lighting = Lighting {
            lights: scene.lights(),
            shadow_maps: scene
                .lights()
                .iter()
                .map(|light| light.cast_shadow.then(|| self.render_shadow_map(light, &items)))
                .collect(),
        };

        let view_projection = camera.view_projection_matrix();
        let mut depth = vec![1.0f32; output.texels.len()];
        for item in &items {
            match &item.material {
                Material::Accumulation(material) => self.draw_accumulation(output, item, material, &lighting),
                Material::Discard(_) => {}
                _ if item.frustum_culled && item.outside(view_projection) => {}
                Material::Standard(material) => {
                    draw_standard(output, &mut depth, item, material, &lighting, view_projection)
                }
                Material::ShadowCatcher(material) => {
                    self.draw_shadow_catcher(output, &depth, item, material, view_projection)
                }
            }
        }
    }

    fn render_shadow_map(&self, light: &DirectionalLight, items: &[DrawItem]) -> ShadowMap {
        let mut map = ShadowMap::new(light);
        for item in items.iter().filter(|item| item.cast_shadow) {
            if item.frustum_culled && item.outside(map.view_projection()) {
                continue;
            }
            let positions = item.world_positions();
            map.draw_triangles(item.geometry.triangles().map(|tri| tri.map(|i| positions[i])));
        }
        map
    }

    fn draw_accumulation(
        &self,
        output: &mut Target,
        item: &DrawItem,
        material: &AccumulationMaterial,
        lighting: &Lighting<'_>,
    ) {
        let Some(uvs) = item.geometry.lightmap_uvs() else {
            log::debug!("Accumulation mesh has no uvs; skipped");
            return;
        };
        let previous = material.previous_shadow_map.and_then(|id| self.target(id));
        let positions = item.world_positions();
        let normals = item.world_normals();
        let size = Vec2::new(output.width as f32, output.height as f32);
        let (width, height) = (output.width, output.height);

        for tri in item.geometry.triangles() {
            let screen = tri.map(|i| (Vec2::from_array(uvs[i]) * size).extend(0.0));
            rasterize_triangle(width, height, screen, |x, y, bary, _| {
                let position = interpolate(&positions, tri, bary);
                let normal = interpolate(&normals, tri, bary).normalize_or_zero();
                let raw = lighting.irradiance(position, normal, item.receive_shadow).with_alpha(1.0);
                let uv = (Vec2::new(x as f32, y as f32) + 0.5) / size;
                let previous = previous.map_or([0.0; 4], |source| source.sample(uv));
                output.write(x, y, material.accumulate(previous, raw));
            });
        }
    }

    fn draw_shadow_catcher(
        &self,
        output: &mut Target,
        depth: &[f32],
        item: &DrawItem,
        material: &ShadowCatcherMaterial,
        view_projection: Mat4,
    ) {
        let Some(map) = material.map.and_then(|id| self.target(id)) else {
            return;
        };
        let Some(uvs) = item.geometry.lightmap_uvs() else {
            return;
        };
        let uvs: Vec<Vec3> = uvs.iter().map(|uv| Vec2::from_array(*uv).extend(0.0)).collect();
        let positions = item.world_positions();
        let width = output.width;

        for tri in item.geometry.triangles() {
            let clip = tri.map(|i| view_projection * positions[i].extend(1.0));
            let Some(screen) = to_screen(clip, output.width, output.height) else {
                continue;
            };
            rasterize_triangle(output.width, output.height, screen, |x, y, bary, z| {
                let index = (y * width + x) as usize;
                if !(0.0..=1.0).contains(&z) || z >= depth[index] {
                    return;
                }
                let weights = perspective_weights(bary, clip);
                let uv = interpolate(&uvs, tri, weights).truncate();
                if let Some(src) = material.composite(map.sample(uv)) {
                    let dst = output.read(x, y);
                    output.write(x, y, blend_over(src, dst));
                }
            });
        }
    }

    fn render_checked(&mut self, scene: &Scene, camera: &Camera) -> BakeResult<()> {
        if scene.lights().len() > MAX_LIGHTS {
            return Err(BakeError::TooManyLights {
                count: scene.lights().len(),
                max: MAX_LIGHTS,
            });
        }
        let mut output = self.take_bound()?;
        self.draw(&mut output, scene, camera);
        self.restore_bound(output);
        Ok(())
    }
}

fn draw_standard(
    output: &mut Target,
    depth: &mut [f32],
    item: &DrawItem,
    material: &StandardMaterial,
    lighting: &Lighting<'_>,
    view_projection: Mat4,
) {
    let positions = item.world_positions();
    let normals = item.world_normals();
    let width = output.width;

    for tri in item.geometry.triangles() {
        let clip = tri.map(|i| view_projection * positions[i].extend(1.0));
        let Some(screen) = to_screen(clip, output.width, output.height) else {
            continue;
        };
        rasterize_triangle(output.width, output.height, screen, |x, y, bary, z| {
            let index = (y * width + x) as usize;
            if !(0.0..=1.0).contains(&z) || z >= depth[index] {
                return;
            }
            depth[index] = z;
            let weights = perspective_weights(bary, clip);
            let position = interpolate(&positions, tri, weights);
            let normal = interpolate(&normals, tri, weights).normalize_or_zero();
            let irradiance = lighting.irradiance(position, normal, item.receive_shadow);
            output.write(x, y, material.shade(irradiance));
        });
    }
}

/// Clip-space to pixel coordinates; `None` if a vertex is behind the eye.
fn to_screen(clip: [Vec4; 3], width: u32, height: u32) -> Option<[Vec3; 3]> {
    if clip.iter().any(|c| c.w <= 1e-6) {
        return None;
    }
    Some(clip.map(|c| {
        let ndc = c.truncate() / c.w;
        Vec3::new(
            (ndc.x * 0.5 + 0.5) * width as f32,
            (0.5 - ndc.y * 0.5) * height as f32,
            ndc.z,
        )
    }))
}

/// Screen-space barycentrics to perspective-correct weights.
fn perspective_weights(bary: [f32; 3], clip: [Vec4; 3]) -> [f32; 3] {
    let w = [bary[0] / clip[0].w, bary[1] / clip[1].w, bary[2] / clip[2].w];
    let sum = w[0] + w[1] + w[2];
    if sum.abs() < f32::EPSILON {
        bary
    } else {
        w.map(|v| v / sum)
    }
}

#[inline]
fn interpolate(values: &[Vec3], tri: [usize; 3], weights: [f32; 3]) -> Vec3 {
    values[tri[0]] * weights[0] + values[tri[1]] * weights[1] + values[tri[2]] * weights[2]
}

/// Premultiplied-free "source over" blending.
#[inline]
fn blend_over(src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
    let a = src[3].clamp(0.0, 1.0);
    [
        src[0] * a + dst[0] * (1.0 - a),
        src[1] * a + dst[1] * (1.0 - a),
        src[2] * a + dst[2] * (1.0 - a),
        a + dst[3] * (1.0 - a),
    ]
}

impl RenderBackend for SoftwareRenderer {
    fn create_render_target(&mut self, desc: &RenderTargetDescriptor) -> BakeResult<RenderTargetId> {
        if desc.width == 0 || desc.height == 0 {
            return Err(BakeError::InvalidTargetSize {
                width: desc.width,
                height: desc.height,
            });
        }
        let target = Target::new(desc.width, desc.height, desc.format);
        let index = match self.targets.iter().position(Option::is_none) {
            Some(free) => {
                self.targets[free] = Some(target);
                free
            }
            None => {
                self.targets.push(Some(target));
                self.targets.len() - 1
            }
        };
        let id = RenderTargetId(index as u32);
        log::trace!("Created render target {id} '{}'", desc.label);
        Ok(id)
    }

    fn dispose_render_target(&mut self, target: RenderTargetId) {
        if let Some(slot) = self.targets.get_mut(target.index()) {
            *slot = None;
        }
        if self.bound == Some(target) {
            self.bound = None;
        }
    }

    fn set_render_target(&mut self, target: Option<RenderTargetId>) {
        self.bound = target;
    }

    fn render_target(&self) -> Option<RenderTargetId> {
        self.bound
    }

    fn clear(&mut self) -> BakeResult<()> {
        match self.bound {
            Some(id) => self.target_mut(id)?.fill([0.0; 4]),
            None => self.framebuffer.fill([0.0; 4]),
        }
        Ok(())
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> BakeResult<()> {
        self.render_checked(scene, camera)
    }

    fn read_render_target_pixels(
        &mut self,
        target: RenderTargetId,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> BakeResult<Vec<[f32; 4]>> {
        let source = self.target(target).ok_or(BakeError::UnknownRenderTarget(target))?;
        check_read_bounds(x, y, width, height, source.width, source.height)?;
        let mut out = Vec::with_capacity((width as usize) * (height as usize));
        for row in y..y + height {
            let start = source.index(x, row);
            out.extend_from_slice(&source.texels[start..start + width as usize]);
        }
        Ok(out)
    }

    fn render_target_size(&self, target: RenderTargetId) -> Option<(u32, u32)> {
        self.target(target).map(|t| (t.width, t.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PerspectiveCamera;
    use crate::geometry::{BoxGeometry, PlaneGeometry};
    use crate::light::ShadowSettings;
    use crate::scene::Mesh;

    fn sun() -> DirectionalLight {
        DirectionalLight::new(Color::WHITE, 1.0)
            .with_position(Vec3::new(0.0, 10.0, 0.0))
            .with_shadows(ShadowSettings::new().map_size(128).camera_extent(6.0).clip_planes(0.1, 30.0))
    }

    fn mesh(geometry: BufferGeometry, material: impl Into<Material>) -> crate::scene::MeshRef {
        let material: Material = material.into();
        Mesh::new(geometry, material.into_ref()).into_ref()
    }

    fn camera() -> Camera {
        PerspectiveCamera::new(50.0, 1.0, 0.1, 100.0)
            .with_position(Vec3::new(0.0, 12.0, 0.01))
            .looking_at(Vec3::ZERO)
            .into()
    }

    #[test]
    fn test_target_lifecycle() {
        let mut renderer = SoftwareRenderer::new(4, 4);
        let desc = RenderTargetDescriptor::square("t", 8, TextureFormat::Rgba32Float);
        let a = renderer.create_render_target(&desc).unwrap();
        let b = renderer.create_render_target(&desc).unwrap();
        assert_ne!(a, b);
        renderer.dispose_render_target(a);
        assert!(renderer.render_target_size(a).is_none());
        let c = renderer.create_render_target(&desc).unwrap();
        assert_eq!(c, a);
        assert!(renderer
            .create_render_target(&RenderTargetDescriptor::square("z", 0, TextureFormat::Rgba32Float))
            .is_err());
    }

    #[test]
    fn test_unknown_target_errors() {
        let mut renderer = SoftwareRenderer::new(4, 4);
        renderer.set_render_target(Some(RenderTargetId(7)));
        assert!(matches!(renderer.clear(), Err(BakeError::UnknownRenderTarget(_))));
        assert!(renderer.render(&Scene::new(), &camera()).is_err());
        assert!(renderer.read_render_target_pixels(RenderTargetId(7), 0, 0, 1, 1).is_err());
    }

    #[test]
    fn test_half_float_quantizes() {
        let mut renderer = SoftwareRenderer::new(4, 4);
        let target = renderer
            .create_render_target(&RenderTargetDescriptor::square("h", 2, TextureFormat::Rgba16Float))
            .unwrap();
        renderer.fill_render_target(target, [0.1, 0.2, 0.3, 1.0]).unwrap();
        let texel = renderer.read_render_target_pixels(target, 1, 1, 1, 1).unwrap()[0];
        assert_eq!(texel[0], f16::from_f32(0.1).to_f32());
        assert_ne!(texel[0], 0.1);
    }

    #[test]
    fn test_read_window() {
        let mut renderer = SoftwareRenderer::new(4, 4);
        let target = renderer
            .create_render_target(&RenderTargetDescriptor::square("r", 4, TextureFormat::Rgba32Float))
            .unwrap();
        renderer.fill_render_target(target, [1.0; 4]).unwrap();
        assert_eq!(renderer.read_render_target_pixels(target, 1, 2, 3, 2).unwrap().len(), 6);
        assert!(renderer.read_render_target_pixels(target, 2, 2, 3, 2).is_err());
    }

    #[test]
    fn test_accumulation_shadowed_under_occluder() {
        let mut renderer = SoftwareRenderer::new(4, 4);
        let target = renderer
            .create_render_target(&RenderTargetDescriptor::square("acc", 16, TextureFormat::Rgba32Float))
            .unwrap();
        let mut scene = Scene::new();
        scene.add_light(sun());
        let floor = mesh(PlaneGeometry::new(8.0, 8.0).build(), AccumulationMaterial::new(None, 1.0));
        floor.write().unwrap().cast_shadow = false;
        let blocker = mesh(BoxGeometry::new(2.0, 2.0, 2.0).build(), crate::material::DiscardMaterial::new());
        blocker.write().unwrap().set_position(0.0, 1.0, 0.0);
        scene.add(floor);
        scene.add(blocker);

        renderer.set_render_target(Some(target));
        renderer.render(&scene, &camera()).unwrap();
        let texels = renderer.read_render_target_pixels(target, 0, 0, 16, 16).unwrap();
        let center = texels[8 * 16 + 8];
        let corner = texels[16 + 1];
        assert!(center[0] < 0.05, "{center:?}");
        assert!((corner[0] - 1.0).abs() < 1e-4, "{corner:?}");
        assert_eq!(corner[3], 1.0);
    }

    #[test]
    fn test_accumulation_blends_with_previous() {
        let mut renderer = SoftwareRenderer::new(4, 4);
        let desc = RenderTargetDescriptor::square("acc", 4, TextureFormat::Rgba32Float);
        let front = renderer.create_render_target(&desc).unwrap();
        let back = renderer.create_render_target(&desc).unwrap();
        renderer.fill_render_target(front, [0.5, 0.5, 0.5, 1.0]).unwrap();

        let mut scene = Scene::new();
        scene.add_light(DirectionalLight::new(Color::WHITE, 1.0));
        scene.add(mesh(PlaneGeometry::new(2.0, 2.0).build(), AccumulationMaterial::new(Some(front), 2.0)));
        renderer.set_render_target(Some(back));
        renderer.render(&scene, &camera()).unwrap();
        let texel = renderer.read_render_target_pixels(back, 2, 2, 1, 1).unwrap()[0];
        assert!((texel[0] - 0.75).abs() < 1e-5, "{texel:?}");
    }

    #[test]
    fn test_standard_material_lit_from_above() {
        let mut renderer = SoftwareRenderer::new(16, 16);
        let mut scene = Scene::new();
        scene.add_light(DirectionalLight::new(Color::WHITE, 1.0));
        scene.add(mesh(
            PlaneGeometry::new(20.0, 20.0).build(),
            StandardMaterial::with_color(Color::new(1.0, 0.5, 0.25)),
        ));
        renderer.render(&scene, &camera()).unwrap();
        let pixel = renderer.framebuffer_pixels()[8 * 16 + 8];
        assert!((pixel[0] - 1.05).abs() < 1e-4, "{pixel:?}");
        assert!((pixel[1] - 0.525).abs() < 1e-4);
    }

    #[test]
    fn test_frustum_culled_mesh_skipped() {
        let mut renderer = SoftwareRenderer::new(8, 8);
        let mut scene = Scene::new();
        scene.add_light(DirectionalLight::new(Color::WHITE, 1.0));
        let far_away = mesh(BoxGeometry::new(1.0, 1.0, 1.0).build(), StandardMaterial::new());
        far_away.write().unwrap().set_position(500.0, 0.0, 0.0);
        scene.add(far_away);
        renderer.render(&scene, &camera()).unwrap();
        assert!(renderer.framebuffer_pixels().iter().all(|p| *p == [0.0; 4]));
    }

    #[test]
    fn test_shadow_catcher_composites_and_discards() {
        let mut renderer = SoftwareRenderer::new(16, 16);
        let baked = renderer
            .create_render_target(&RenderTargetDescriptor::square("baked", 4, TextureFormat::Rgba32Float))
            .unwrap();
        // Dark texels: alpha = 1 - 0.3 / 3 = 0.9.
        renderer.fill_render_target(baked, [0.1, 0.1, 0.1, 1.0]).unwrap();

        let mut catcher = ShadowCatcherMaterial::new(Some(baked));
        catcher.alpha_test = 0.5;
        let mut scene = Scene::new();
        let floor = mesh(PlaneGeometry::new(20.0, 20.0).build(), catcher.clone());
        scene.add(floor.clone());
        renderer.render(&scene, &camera()).unwrap();
        let pixel = renderer.framebuffer_pixels()[8 * 16 + 8];
        assert!((pixel[3] - 0.9).abs() < 1e-5, "{pixel:?}");
        assert!((pixel[0] - 0.2 * 0.9).abs() < 1e-5);

        // Lit texels fall below the alpha test.
        renderer.fill_render_target(baked, [0.9, 0.9, 0.9, 1.0]).unwrap();
        renderer.clear().unwrap();
        renderer.render(&scene, &camera()).unwrap();
        assert!(renderer.framebuffer_pixels().iter().all(|p| *p == [0.0; 4]));

        // No map: nothing drawn.
        catcher.map = None;
        floor.write().unwrap().set_material(Material::from(catcher).into_ref());
        renderer.render(&scene, &camera()).unwrap();
        assert!(renderer.framebuffer_pixels().iter().all(|p| *p == [0.0; 4]));
    }

    #[test]
    fn test_too_many_lights() {
        let mut renderer = SoftwareRenderer::new(4, 4);
        let mut scene = Scene::new();
        for _ in 0..=MAX_LIGHTS {
            scene.add_light(DirectionalLight::default());
        }
        assert!(matches!(
            renderer.render(&scene, &camera()),
            Err(BakeError::TooManyLights { .. })
        ));
    }
}
