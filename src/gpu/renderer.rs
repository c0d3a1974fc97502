//! wgpu implementation of the renderer contract.

use super::pipelines::{PipelineKind, Pipelines};
use super::readback;
use super::uniforms::{CameraUniform, DrawUniform, LightsUniform};
use crate::camera::Camera;
use crate::core::{
    check_read_bounds, BakeError, BakeResult, Context, ContextConfig, Id, RenderBackend, RenderTargetDescriptor,
    RenderTargetId, TextureFormat,
};
use crate::geometry::{Attribute, BufferGeometry};
use crate::light::MAX_LIGHTS;
use crate::material::Material;
use crate::scene::Scene;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use wgpu::util::BufferInitDescriptor;

/// Usages every color target is created with.
const TARGET_USAGES: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
    .union(wgpu::TextureUsages::TEXTURE_BINDING)
    .union(wgpu::TextureUsages::COPY_SRC)
    .union(wgpu::TextureUsages::COPY_DST);

/// Reject `format` unless `allowed` covers every color target usage.
fn check_target_format(format: TextureFormat, allowed: wgpu::TextureUsages) -> BakeResult<()> {
    if allowed.contains(TARGET_USAGES) {
        Ok(())
    } else {
        Err(BakeError::UnsupportedFormat(format))
    }
}

/// A float color texture.
struct GpuTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    format: TextureFormat,
}

impl GpuTarget {
    fn new(device: &wgpu::Device, label: &str, width: u32, height: u32, format: TextureFormat) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: format.to_wgpu(),
            usage: TARGET_USAGES,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
            format,
        }
    }
}

/// Uploaded vertex and index buffers of one geometry.
struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// Depth array holding one shadow map per shadow-casting light.
struct ShadowArray {
    array_view: wgpu::TextureView,
    layer_views: Vec<wgpu::TextureView>,
    size: u32,
}

impl ShadowArray {
    fn new(context: &Context, size: u32, layers: u32) -> Self {
        let texture = context.create_depth_texture("Shadow Map Array", size, size, layers);
        let array_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Shadow Map Array View"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let layer_views = (0..layers.max(1))
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("Shadow Map Layer"),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();
        Self {
            array_view,
            layer_views,
            size,
        }
    }

    fn fits(&self, size: u32, layers: u32) -> bool {
        self.size == size && self.layer_views.len() as u32 >= layers
    }
}

/// Per-mesh data snapshotted at the start of a render.
struct DrawItem {
    geometry: Arc<BufferGeometry>,
    material: Material,
    uniform: DrawUniform,
    cast_shadow: bool,
    receive_shadow: bool,
    render_order: i32,
}

impl DrawItem {
    fn pass_rank(&self) -> u8 {
        match self.material {
            Material::Accumulation(_) => 0,
            Material::Standard(_) | Material::Discard(_) => 1,
            Material::ShadowCatcher(_) => 2,
        }
    }
}

/// A color-pass draw: pipeline and index of the snapshotted item.
struct ColorDraw {
    kind: PipelineKind,
    item: usize,
}

/// Hardware renderer on a headless wgpu device.
///
/// Mirrors [`crate::software::SoftwareRenderer`]: same draw order, the same
/// shading and compositing math in WGSL, one depth-array layer per
/// shadow-casting light with PCF through a comparison sampler. Frustum
/// culling is left to the hardware clipper. The default framebuffer is an
/// offscreen `Rgba16Float` texture so the shadow catcher can blend into it.
pub struct GpuRenderer {
    context: Context,
    pipelines: Pipelines,
    targets: Vec<Option<GpuTarget>>,
    framebuffer: GpuTarget,
    bound: Option<RenderTargetId>,
    geometries: HashMap<Id, GpuGeometry>,
    shadow_array: Option<ShadowArray>,
    shadow_sampler: wgpu::Sampler,
    depth: Option<(u32, u32, wgpu::TextureView)>,
    blank: GpuTarget,
}

impl GpuRenderer {
    /// Create a renderer on an existing context.
    ///
    /// Fails with [`BakeError::UnsupportedFormat`] when the device cannot
    /// render into half-float textures.
    pub fn new(context: Context, width: u32, height: u32) -> BakeResult<Self> {
        let fallback = TextureFormat::Rgba16Float;
        check_target_format(fallback, context.allowed_texture_usages(fallback.to_wgpu()))?;
        let device = &context.device;
        let pipelines = Pipelines::new(device);

        // Nearest comparison taps; PCF is done in the shader
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let framebuffer = GpuTarget::new(
            device,
            "Default Framebuffer",
            width.max(1),
            height.max(1),
            fallback,
        );
        let blank = GpuTarget::new(device, "Blank Source", 1, 1, fallback);

        Ok(Self {
            context,
            pipelines,
            targets: Vec::new(),
            framebuffer,
            bound: None,
            geometries: HashMap::new(),
            shadow_array: None,
            shadow_sampler,
            depth: None,
            blank,
        })
    }

    /// Create a renderer on a fresh headless context.
    pub fn headless(width: u32, height: u32) -> BakeResult<Self> {
        let context = Context::new_blocking(&ContextConfig::default())?;
        Self::new(context, width, height)
    }

    /// The wgpu context.
    #[inline]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Default framebuffer size.
    #[inline]
    pub fn framebuffer_size(&self) -> (u32, u32) {
        (self.framebuffer.width, self.framebuffer.height)
    }

    /// Read back the whole default framebuffer.
    pub fn read_framebuffer_pixels(&self) -> BakeResult<Vec<[f32; 4]>> {
        let target = &self.framebuffer;
        readback::read_texture(
            &self.context.device,
            &self.context.queue,
            &target.texture,
            target.format,
            0,
            0,
            target.width,
            target.height,
        )
    }

    fn target(&self, id: RenderTargetId) -> Option<&GpuTarget> {
        self.targets.get(id.index()).and_then(Option::as_ref)
    }

    fn bound_target(&self) -> BakeResult<&GpuTarget> {
        match self.bound {
            Some(id) => self.target(id).ok_or(BakeError::UnknownRenderTarget(id)),
            None => Ok(&self.framebuffer),
        }
    }

    /// A readable source texture that is not the bound attachment.
    fn source_view(&self, id: Option<RenderTargetId>) -> Option<&wgpu::TextureView> {
        id.filter(|id| Some(*id) != self.bound)
            .and_then(|id| self.target(id))
            .map(|target| &target.view)
    }

    fn upload_geometry(&mut self, geometry: &BufferGeometry) {
        if self.geometries.contains_key(&geometry.id()) {
            return;
        }
        let vertices = geometry.interleaved();
        let indices = geometry.index_list();
        let vertex_buffer = self.context.create_buffer_init(&BufferInitDescriptor {
            label: Some("Bake Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.context.create_buffer_init(&BufferInitDescriptor {
            label: Some("Bake Index Buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.geometries.insert(
            geometry.id(),
            GpuGeometry {
                vertex_buffer,
                index_buffer,
                index_count: indices.len() as u32,
            },
        );
    }

    fn ensure_shadow_array(&mut self, size: u32, layers: u32) {
        let fits = self.shadow_array.as_ref().is_some_and(|array| array.fits(size, layers));
        if !fits {
            log::debug!("Allocating {layers} shadow layers at {size}x{size}");
            self.shadow_array = Some(ShadowArray::new(&self.context, size, layers));
        }
    }

    fn ensure_depth(&mut self, width: u32, height: u32) {
        let fits = matches!(self.depth, Some((w, h, _)) if w == width && h == height);
        if !fits {
            let texture = self.context.create_depth_texture("Bake Depth", width, height, 1);
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.depth = Some((width, height, view));
        }
    }

    fn snapshot(scene: &Scene) -> Vec<DrawItem> {
        let mut items: Vec<DrawItem> = scene
            .meshes()
            .iter()
            .filter_map(|mesh| {
                let mesh = mesh.read().unwrap_or_else(PoisonError::into_inner);
                let geometry = mesh.geometry();
                if !mesh.visible || !geometry.has_attribute(Attribute::Position) || geometry.triangle_count() == 0 {
                    return None;
                }
                let material = mesh.material().read().unwrap_or_else(PoisonError::into_inner).clone();
                Some(DrawItem {
                    geometry: geometry.clone(),
                    material,
                    uniform: DrawUniform::transform(mesh.world_matrix(), mesh.normal_matrix()),
                    cast_shadow: mesh.cast_shadow,
                    receive_shadow: mesh.receive_shadow,
                    render_order: mesh.render_order,
                })
            })
            .collect();
        items.sort_by_key(|item| (item.pass_rank(), item.render_order));
        items
    }

    /// Per-draw uniform and bind group. `None` kind means depth only.
    fn prepare_draw(&self, item: &DrawItem) -> (Option<PipelineKind>, wgpu::BindGroup) {
        let has_uvs = item.geometry.lightmap_uvs().is_some();
        let (kind, uniform, source) = match &item.material {
            Material::Standard(material) => (
                Some(PipelineKind::Standard),
                item.uniform.standard(material, item.receive_shadow),
                None,
            ),
            Material::Discard(_) => (None, item.uniform, None),
            Material::Accumulation(material) => {
                if !has_uvs {
                    log::debug!("Accumulation mesh has no uvs; skipped");
                }
                let source = self.source_view(material.previous_shadow_map);
                (
                    has_uvs.then_some(PipelineKind::Accumulation),
                    item.uniform.accumulation(material, item.receive_shadow, source.is_some()),
                    source,
                )
            }
            Material::ShadowCatcher(material) => {
                let source = self.source_view(material.map).filter(|_| has_uvs);
                (
                    source.map(|_| PipelineKind::ShadowCatcher),
                    item.uniform.shadow_catcher(material),
                    source,
                )
            }
        };

        let buffer = self.context.create_buffer_init(&BufferInitDescriptor {
            label: Some("Draw Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = self.context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Bind Group"),
            layout: self.pipelines.draw_layout(),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(source.unwrap_or(&self.blank.view)),
                },
            ],
        });
        (kind, bind_group)
    }

    fn uniform_bind_group(&self, layout: &wgpu::BindGroupLayout, label: &str, contents: &[u8]) -> wgpu::BindGroup {
        let buffer = self.context.create_buffer_init(&BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::UNIFORM,
        });
        self.context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    fn encode_shadow_maps(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        scene: &Scene,
        items: &[DrawItem],
        bind_groups: &[wgpu::BindGroup],
    ) {
        let Some(array) = self.shadow_array.as_ref() else {
            return;
        };
        let shadow_lights = scene.lights().iter().filter(|light| light.cast_shadow);
        for (light, layer_view) in shadow_lights.zip(&array.layer_views) {
            let light_camera = CameraUniform::new(light.shadow_camera().view_projection_matrix());
            let light_bind_group = self.uniform_bind_group(
                self.pipelines.light_camera_layout(),
                "Shadow Light Camera",
                bytemuck::bytes_of(&light_camera),
            );

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Depth Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: layer_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(self.pipelines.shadow_depth());
            pass.set_bind_group(0, &light_bind_group, &[]);
            for (item, bind_group) in items.iter().zip(bind_groups) {
                if !item.cast_shadow {
                    continue;
                }
                if let Some(gpu) = self.geometries.get(&item.geometry.id()) {
                    pass.set_bind_group(1, bind_group, &[]);
                    pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                    pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..gpu.index_count, 0, 0..1);
                }
            }
        }
    }

    fn render_checked(&mut self, scene: &Scene, camera: &Camera) -> BakeResult<()> {
        if scene.lights().len() > MAX_LIGHTS {
            return Err(BakeError::TooManyLights {
                count: scene.lights().len(),
                max: MAX_LIGHTS,
            });
        }
        let (width, height, format) = {
            let target = self.bound_target()?;
            (target.width, target.height, target.format.to_wgpu())
        };

        let items = Self::snapshot(scene);
        for item in &items {
            self.upload_geometry(&item.geometry);
        }

        let shadow_casters = scene.lights().iter().filter(|light| light.cast_shadow);
        let shadow_size = shadow_casters.clone().map(|light| light.shadow.map_size).max().unwrap_or(1);
        let shadow_layers = shadow_casters.count() as u32;
        self.ensure_shadow_array(shadow_size, shadow_layers.max(1));
        self.ensure_depth(width, height);
        for kind in [PipelineKind::Standard, PipelineKind::Accumulation, PipelineKind::ShadowCatcher] {
            self.pipelines.prepare(&self.context.device, kind, format);
        }

        let mut bind_groups = Vec::with_capacity(items.len());
        let mut color_draws = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let (kind, bind_group) = self.prepare_draw(item);
            if let Some(kind) = kind {
                color_draws.push(ColorDraw { kind, item: index });
            }
            bind_groups.push(bind_group);
        }

        let lights = LightsUniform::from_lights(scene.lights(), shadow_size);
        let camera_uniform = CameraUniform::new(camera.view_projection_matrix());
        let frame_bind_group = self.frame_bind_group(&camera_uniform, &lights)?;

        let mut encoder = self.context.create_command_encoder("Bake Render Encoder");
        self.encode_shadow_maps(&mut encoder, scene, &items, &bind_groups);
        {
            let target = self.bound_target()?;
            let (_, _, depth_view) = self.depth.as_ref().ok_or(BakeError::NotInitialized)?;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Bake Color Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_bind_group(0, &frame_bind_group, &[]);
            for draw in &color_draws {
                let geometry = items[draw.item].geometry.id();
                let (Some(pipeline), Some(gpu)) =
                    (self.pipelines.color(draw.kind, format), self.geometries.get(&geometry))
                else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(1, &bind_groups[draw.item], &[]);
                pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..gpu.index_count, 0, 0..1);
            }
        }
        self.context.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn frame_bind_group(&self, camera: &CameraUniform, lights: &LightsUniform) -> BakeResult<wgpu::BindGroup> {
        let array = self.shadow_array.as_ref().ok_or(BakeError::NotInitialized)?;
        let camera_buffer = self.context.create_buffer_init(&BufferInitDescriptor {
            label: Some("Bake Camera Buffer"),
            contents: bytemuck::bytes_of(camera),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let lights_buffer = self.context.create_buffer_init(&BufferInitDescriptor {
            label: Some("Bake Lights Buffer"),
            contents: bytemuck::bytes_of(lights),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        Ok(self.context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bake Frame Bind Group"),
            layout: self.pipelines.frame_layout(),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&array.array_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.shadow_sampler),
                },
            ],
        }))
    }
}

impl RenderBackend for GpuRenderer {
    fn create_render_target(&mut self, desc: &RenderTargetDescriptor) -> BakeResult<RenderTargetId> {
        let max = self.context.device.limits().max_texture_dimension_2d;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(BakeError::InvalidTargetSize {
                width: desc.width,
                height: desc.height,
            });
        }
        if let Err(err) = check_target_format(desc.format, self.context.allowed_texture_usages(desc.format.to_wgpu())) {
            log::warn!("Cannot create render target '{}': {err}", desc.label);
            return Err(err);
        }
        let target = GpuTarget::new(&self.context.device, &desc.label, desc.width, desc.height, desc.format);
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
        log::trace!("Created GPU render target {id} '{}'", desc.label);
        Ok(id)
    }

    fn dispose_render_target(&mut self, target: RenderTargetId) {
        if let Some(slot) = self.targets.get_mut(target.index()) {
            if let Some(gpu) = slot.take() {
                gpu.texture.destroy();
            }
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
        let target = self.bound_target()?;
        let mut encoder = self.context.create_command_encoder("Bake Clear Encoder");
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Bake Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.context.submit(std::iter::once(encoder.finish()));
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
        let gpu = self.target(target).ok_or(BakeError::UnknownRenderTarget(target))?;
        check_read_bounds(x, y, width, height, gpu.width, gpu.height)?;
        readback::read_texture(
            &self.context.device,
            &self.context.queue,
            &gpu.texture,
            gpu.format,
            x,
            y,
            width,
            height,
        )
    }

    fn render_target_size(&self, target: RenderTargetId) -> Option<(u32, u32)> {
        self.target(target).map(|gpu| (gpu.width, gpu.height))
    }
}
