//! Headless wgpu context management.

use super::ContextConfig;
use thiserror::Error;

/// Errors that can occur during context creation.
#[derive(Error, Debug)]
pub enum ContextError {
    /// Failed to request adapter.
    #[error("Failed to request adapter: no suitable GPU found")]
    AdapterRequest,

    /// Failed to request device.
    #[error("Failed to request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// The adapter lacks capabilities the bake passes rely on.
    #[error("Adapter is missing required capabilities: {0:?}")]
    MissingCapabilities(wgpu::DownlevelFlags),
}

/// Downlevel capabilities the shadow and accumulation passes need.
pub const REQUIRED_DOWNLEVEL_FLAGS: wgpu::DownlevelFlags = wgpu::DownlevelFlags::COMPARISON_SAMPLERS;

/// Check an adapter's downlevel flags against [`REQUIRED_DOWNLEVEL_FLAGS`].
pub fn check_downlevel_flags(flags: wgpu::DownlevelFlags) -> Result<(), ContextError> {
    let missing = REQUIRED_DOWNLEVEL_FLAGS.difference(flags);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ContextError::MissingCapabilities(missing))
    }
}

/// The wgpu device and queue used for baking.
///
/// Baking never presents, so there is no surface; the host's display
/// pipeline can share the device by constructing the context from its own
/// handles with [`Context::from_parts`].
pub struct Context {
    /// The wgpu instance.
    pub instance: wgpu::Instance,
    /// The GPU adapter.
    pub adapter: wgpu::Adapter,
    /// The GPU device.
    pub device: wgpu::Device,
    /// The command queue.
    pub queue: wgpu::Queue,
    /// Depth format used for shadow maps and color passes.
    pub depth_format: wgpu::TextureFormat,
}

impl Context {
    /// Create a headless context.
    pub async fn new(config: &ContextConfig) -> Result<Self, ContextError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: config.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: None,
                force_fallback_adapter: config.force_fallback_adapter,
            })
            .await
            .ok_or(ContextError::AdapterRequest)?;

        let info = adapter.get_info();
        log::info!("Bake adapter: {} ({:?})", info.name, info.backend);
        if let Err(err) = check_downlevel_flags(adapter.get_downlevel_capabilities().flags) {
            log::error!("Adapter {} cannot bake: {err}", info.name);
            return Err(err);
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Penumbra Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        Ok(Self::from_parts(instance, adapter, device, queue))
    }

    /// Blocking variant of [`Context::new`].
    pub fn new_blocking(config: &ContextConfig) -> Result<Self, ContextError> {
        pollster::block_on(Self::new(config))
    }

    /// Wrap handles created by the host.
    pub fn from_parts(
        instance: wgpu::Instance,
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
    ) -> Self {
        Self {
            instance,
            adapter,
            device,
            queue,
            depth_format: wgpu::TextureFormat::Depth32Float,
        }
    }

    /// Usages a texture of `format` may have on this device.
    ///
    /// Devices that are not WebGPU compliant report per-adapter format
    /// support, which can be narrower than the guaranteed set.
    pub fn allowed_texture_usages(&self, format: wgpu::TextureFormat) -> wgpu::TextureUsages {
        let guaranteed = format.guaranteed_format_features(self.device.features()).allowed_usages;
        let adapter = self.adapter.get_texture_format_features(format).allowed_usages;
        guaranteed.intersection(adapter)
    }

    /// Create a command encoder.
    pub fn create_command_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Submit commands to the queue.
    pub fn submit(&self, commands: impl IntoIterator<Item = wgpu::CommandBuffer>) {
        self.queue.submit(commands);
    }

    /// Create a depth texture of the given size and layer count.
    pub fn create_depth_texture(&self, label: &str, width: u32, height: u32, layers: u32) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: layers.max(1),
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.depth_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
    }

    /// Create a buffer with data.
    pub fn create_buffer_init(&self, descriptor: &wgpu::util::BufferInitDescriptor) -> wgpu::Buffer {
        use wgpu::util::DeviceExt;
        self.device.create_buffer_init(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_samplers_required() {
        let missing = check_downlevel_flags(wgpu::DownlevelFlags::empty());
        assert!(matches!(
            missing,
            Err(ContextError::MissingCapabilities(flags)) if flags == wgpu::DownlevelFlags::COMPARISON_SAMPLERS
        ));
        assert!(check_downlevel_flags(wgpu::DownlevelFlags::all()).is_ok());
        assert!(check_downlevel_flags(
            wgpu::DownlevelFlags::all().difference(wgpu::DownlevelFlags::COMPARISON_SAMPLERS)
        )
        .is_err());
    }
}
