//! Texture to CPU copies for pixel read-back.

use crate::core::{BakeError, BakeResult, TextureFormat};
use half::f16;
use std::sync::mpsc;

/// Row pitch of a copy of `width` texels, padded to wgpu's copy alignment.
pub fn padded_bytes_per_row(width: u32, format: TextureFormat) -> u32 {
    let unpadded = width * format.bytes_per_texel();
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Copy a rectangle of `texture` into host memory and decode it to RGBA floats.
#[allow(clippy::too_many_arguments)]
pub fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    format: TextureFormat,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> BakeResult<Vec<[f32; 4]>> {
    if width == 0 || height == 0 {
        return Ok(Vec::new());
    }
    let bytes_per_row = padded_bytes_per_row(width, format);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Read-back Buffer"),
        size: u64::from(bytes_per_row) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Read-back Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d { x, y, z: 0 },
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (sender, receiver) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    receiver.recv().map_err(|_| BakeError::MapCancelled)??;

    let texels = {
        let data = slice.get_mapped_range();
        let row_bytes = (width * format.bytes_per_texel()) as usize;
        data.chunks(bytes_per_row as usize)
            .take(height as usize)
            .flat_map(|row| decode_row(&row[..row_bytes], format))
            .collect()
    };
    buffer.unmap();
    Ok(texels)
}

/// Decode tightly packed texels of `format`.
pub fn decode_row(bytes: &[u8], format: TextureFormat) -> Vec<[f32; 4]> {
    match format {
        TextureFormat::Rgba32Float => bytes
            .chunks_exact(16)
            .map(|texel| {
                let mut out = [0.0f32; 4];
                for (channel, chunk) in out.iter_mut().zip(texel.chunks_exact(4)) {
                    *channel = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                }
                out
            })
            .collect(),
        TextureFormat::Rgba16Float => bytes
            .chunks_exact(8)
            .map(|texel| {
                let mut out = [0.0f32; 4];
                for (channel, chunk) in out.iter_mut().zip(texel.chunks_exact(2)) {
                    *channel = f16::from_le_bytes([chunk[0], chunk[1]]).to_f32();
                }
                out
            })
            .collect(),
    }
}
