use std::path::Path;

use anyhow::{Context as AnyhowContext, Result};

use super::targets::{RenderTarget, TARGET_FORMAT};

const BYTES_PER_PIXEL: u32 = 4;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ReadbackError {
    #[error("cannot read back a {format:?} texture")]
    UnsupportedFormat { format: wgpu::TextureFormat },
    #[error("failed to map readback buffer: {0}")]
    Map(#[from] wgpu::BufferAsyncError),
    #[error("readback callback was dropped before completing")]
    ChannelClosed,
}

/// Copies `target` into host memory as tightly packed RGBA8 rows, top row first.
pub(crate) fn read_target_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    target: &RenderTarget,
) -> Result<Vec<u8>, ReadbackError> {
    let format = target.texture.format();
    if format != TARGET_FORMAT {
        return Err(ReadbackError::UnsupportedFormat { format });
    }
    let (width, height) = (target.size.width, target.size.height);
    let bytes_per_row = width * BYTES_PER_PIXEL;
    let padded_bytes_per_row = padded_row_bytes(width);

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback buffer"),
        size: padded_bytes_per_row as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &target.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        target.size.extent(),
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = crossbeam_channel::bounded(1);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = device.poll(wgpu::PollType::Wait);
    rx.recv().map_err(|_| ReadbackError::ChannelClosed)??;

    let pixels = {
        let data = slice.get_mapped_range();
        unpad_rows(&data, bytes_per_row, padded_bytes_per_row, height)
    };
    buffer.unmap();
    Ok(pixels)
}

/// Reads `target` back and writes it to `path` as a PNG.
pub(crate) fn save_target_png(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    target: &RenderTarget,
    path: &Path,
) -> Result<()> {
    let pixels = read_target_rgba(device, queue, target)?;
    let image = image::RgbaImage::from_raw(target.size.width, target.size.height, pixels)
        .context("readback produced a buffer of the wrong size")?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "exported frame");
    Ok(())
}

fn padded_row_bytes(width: u32) -> u32 {
    (width * BYTES_PER_PIXEL).div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
        * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

fn unpad_rows(data: &[u8], bytes_per_row: u32, padded_bytes_per_row: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((bytes_per_row * height) as usize);
    for row in data
        .chunks(padded_bytes_per_row as usize)
        .take(height as usize)
    {
        pixels.extend_from_slice(&row[..bytes_per_row as usize]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_row_bytes(64), 256);
        assert_eq!(padded_row_bytes(65), 512);
        assert_eq!(padded_row_bytes(1), 256);
    }

    #[test]
    fn unpadding_drops_row_tails() {
        let padded = 8;
        let data: Vec<u8> = (0..16).collect();
        let pixels = unpad_rows(&data, 4, padded, 2);
        assert_eq!(pixels, vec![0, 1, 2, 3, 8, 9, 10, 11]);
    }
}
