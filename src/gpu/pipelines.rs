//! Render pipelines for the bake passes, cached per target format.

use crate::geometry::Vertex;
use std::collections::HashMap;

const COMMON_SHADER: &str = include_str!("../shaders/common.wgsl");
const STANDARD_SHADER: &str = include_str!("../shaders/standard.wgsl");
const ACCUMULATION_SHADER: &str = include_str!("../shaders/accumulation.wgsl");
const SHADOW_CATCHER_SHADER: &str = include_str!("../shaders/shadow_catcher.wgsl");
const SHADOW_DEPTH_SHADER: &str = include_str!("../shaders/shadow_depth.wgsl");

/// Depth format for shadow maps and color passes.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Color pipeline variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// Lit opaque surfaces.
    Standard,
    /// UV-space light-map write.
    Accumulation,
    /// Alpha-composited shadow catcher.
    ShadowCatcher,
}

impl PipelineKind {
    fn label(&self) -> &'static str {
        match self {
            Self::Standard => "Standard Pipeline",
            Self::Accumulation => "Accumulation Pipeline",
            Self::ShadowCatcher => "Shadow Catcher Pipeline",
        }
    }

    fn shader(&self) -> &'static str {
        match self {
            Self::Standard => STANDARD_SHADER,
            Self::Accumulation => ACCUMULATION_SHADER,
            Self::ShadowCatcher => SHADOW_CATCHER_SHADER,
        }
    }

    fn depth_state(&self) -> wgpu::DepthStencilState {
        let (depth_write_enabled, depth_compare) = match self {
            Self::Standard => (true, wgpu::CompareFunction::Less),
            Self::Accumulation => (false, wgpu::CompareFunction::Always),
            Self::ShadowCatcher => (false, wgpu::CompareFunction::Less),
        };
        wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }

    /// Only the catcher blends, and only into formats that support it.
    fn blend(&self, format: wgpu::TextureFormat) -> Option<wgpu::BlendState> {
        match (self, format) {
            (Self::ShadowCatcher, wgpu::TextureFormat::Rgba16Float) => Some(wgpu::BlendState::ALPHA_BLENDING),
            _ => None,
        }
    }
}

/// Bind group layouts and lazily built pipelines.
pub struct Pipelines {
    frame_layout: wgpu::BindGroupLayout,
    draw_layout: wgpu::BindGroupLayout,
    light_camera_layout: wgpu::BindGroupLayout,
    color_layout: wgpu::PipelineLayout,
    shadow_depth: wgpu::RenderPipeline,
    color: HashMap<(PipelineKind, wgpu::TextureFormat), wgpu::RenderPipeline>,
}

impl Pipelines {
    /// Create the layouts and the depth-only pipeline.
    pub fn new(device: &wgpu::Device) -> Self {
        // Frame bind group layout (group 0): camera, lights, shadow array, sampler
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bake Frame Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX),
                uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        // Draw bind group layout (group 1): per-draw uniform and source texture
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bake Draw Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let light_camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Light Camera Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });

        let color_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bake Color Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &draw_layout],
            push_constant_ranges: &[],
        });

        let shadow_depth = Self::create_shadow_depth(device, &light_camera_layout, &draw_layout);

        Self {
            frame_layout,
            draw_layout,
            light_camera_layout,
            color_layout,
            shadow_depth,
            color: HashMap::new(),
        }
    }

    fn create_shadow_depth(
        device: &wgpu::Device,
        light_camera_layout: &wgpu::BindGroupLayout,
        draw_layout: &wgpu::BindGroupLayout,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shadow Depth Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADOW_DEPTH_SHADER.into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow Depth Pipeline Layout"),
            bind_group_layouts: &[light_camera_layout, draw_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Shadow Depth Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Occluders are double sided while baking
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    /// Build the color pipeline for `kind` into `format` if not cached yet.
    pub fn prepare(&mut self, device: &wgpu::Device, kind: PipelineKind, format: wgpu::TextureFormat) {
        let layout = &self.color_layout;
        self.color.entry((kind, format)).or_insert_with(|| {
            log::debug!("Building {} for {format:?}", kind.label());
            let source = format!("{COMMON_SHADER}\n{}", kind.shader());
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(kind.label()),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(kind.label()),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: kind.blend(format),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(kind.depth_state()),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });
    }

    /// Cached color pipeline, if [`Pipelines::prepare`] built it.
    #[inline]
    pub fn color(&self, kind: PipelineKind, format: wgpu::TextureFormat) -> Option<&wgpu::RenderPipeline> {
        self.color.get(&(kind, format))
    }

    /// Depth-only shadow pipeline.
    #[inline]
    pub fn shadow_depth(&self) -> &wgpu::RenderPipeline {
        &self.shadow_depth
    }

    /// Group 0 layout of the color passes.
    #[inline]
    pub fn frame_layout(&self) -> &wgpu::BindGroupLayout {
        &self.frame_layout
    }

    /// Group 1 layout shared by every pass.
    #[inline]
    pub fn draw_layout(&self) -> &wgpu::BindGroupLayout {
        &self.draw_layout
    }

    /// Group 0 layout of the depth pass.
    #[inline]
    pub fn light_camera_layout(&self) -> &wgpu::BindGroupLayout {
        &self.light_camera_layout
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
