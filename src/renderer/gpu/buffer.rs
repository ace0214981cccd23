use std::sync::{mpsc, Arc};

use wgpu::{Device, Extent3d, Queue, Texture, TextureView};

use crate::batch::ScissorRect;
use crate::error::{Error, Result};
use crate::hash::next_hash_code;
use crate::render_buffer::{demultiply_in_place, RenderBuffer};

pub(crate) const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// A render-target texture holding premultiplied RGBA.
pub struct GpuRenderBuffer {
    id: u64,
    device: Arc<Device>,
    queue: Arc<Queue>,
    texture: Texture,
    view: TextureView,
    width: u32,
    height: u32,
    /// Scissor rectangles, innermost last, each already intersected with
    /// the ones below.
    clip_stack: Vec<ScissorRect>,
}

fn create_texture(device: &Device, width: u32, height: u32) -> Result<(Texture, TextureView)> {
    let max = device.limits().max_texture_dimension_2d;
    if width > max || height > max {
        return Err(Error::ResourceExhausted { width, height });
    }
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Render Buffer"),
        size: Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SURFACE_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Ok((texture, view))
}

impl GpuRenderBuffer {
    /// A transparent surface. Zero sizes are bumped to one pixel.
    pub fn new(device: Arc<Device>, queue: Arc<Queue>, width: u32, height: u32) -> Result<Self> {
        let (width, height) = (width.max(1), height.max(1));
        let (texture, view) = create_texture(&device, width, height)?;
        let mut buffer = Self {
            id: next_hash_code(),
            device,
            queue,
            texture,
            view,
            width,
            height,
            clip_stack: Vec::new(),
        };
        buffer.clear();
        Ok(buffer)
    }

    /// Identity used to look the surface up while batches are encoded.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn view(&self) -> &TextureView {
        &self.view
    }

    pub(crate) fn scissor(&self) -> Option<ScissorRect> {
        self.clip_stack.last().copied()
    }

    /// Push `rect`, clamped to the surface and to the current clip.
    pub(crate) fn push_clip(&mut self, x0: f32, y0: f32, x1: f32, y1: f32) {
        let (mut left, mut top, mut right, mut bottom) = (
            x0.floor().max(0.0) as u32,
            y0.floor().max(0.0) as u32,
            (x1.ceil().max(0.0) as u32).min(self.width),
            (y1.ceil().max(0.0) as u32).min(self.height),
        );
        if let Some(parent) = self.clip_stack.last() {
            left = left.max(parent.x);
            top = top.max(parent.y);
            right = right.min(parent.x + parent.width);
            bottom = bottom.min(parent.y + parent.height);
        }
        self.clip_stack.push(ScissorRect {
            x: left.min(right),
            y: top.min(bottom),
            width: right.saturating_sub(left),
            height: bottom.saturating_sub(top),
        });
    }

    pub(crate) fn pop_clip(&mut self) {
        self.clip_stack.pop();
    }
}

/// Outcome of a buffer mapping, as delivered by the map callback.
fn map_result(
    received: std::result::Result<std::result::Result<(), wgpu::BufferAsyncError>, mpsc::RecvError>,
) -> Result<()> {
    match received {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(Error::PixelReadback(e.to_string())),
        Err(_) => Err(Error::PixelReadback("map callback dropped".into())),
    }
}

impl RenderBuffer for GpuRenderBuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn resize(&mut self, width: u32, height: u32, use_max_size: bool) -> Result<()> {
        let (width, height) = if use_max_size {
            (width.max(self.width), height.max(self.height))
        } else {
            (width.max(1), height.max(1))
        };
        if width == self.width && height == self.height {
            return Ok(());
        }
        let (texture, view) = create_texture(&self.device, width, height)?;
        self.texture = texture;
        self.view = view;
        self.width = width;
        self.height = height;
        self.clip_stack.clear();
        self.clear();
        Ok(())
    }

    fn clear(&mut self) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Buffer Clear"),
            });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Buffer Clear Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        self.queue.submit(Some(encoder.finish()));
    }

    fn get_pixels(&mut self, x: i32, y: i32, width: u32, height: u32) -> Result<Vec<u8>> {
        let mut out = vec![0u8; width as usize * height as usize * 4];

        let x0 = x.max(0) as u32;
        let y0 = y.max(0) as u32;
        let x1 = (x as i64 + width as i64).clamp(0, self.width as i64) as u32;
        let y1 = (y as i64 + height as i64).clamp(0, self.height as i64) as u32;
        if x0 >= x1 || y0 >= y1 {
            return Ok(out);
        }
        let (copy_w, copy_h) = (x1 - x0, y1 - y0);

        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = (copy_w * 4).div_ceil(align) * align;
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Render Buffer Readback"),
            size: padded_row as u64 * copy_h as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Buffer Readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: x0, y: y0, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(copy_h),
                },
            },
            Extent3d {
                width: copy_w,
                height: copy_h,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| Error::PixelReadback(e.to_string()))?;
        map_result(receiver.recv())?;

        {
            let mapped = slice.get_mapped_range();
            let row_bytes = (copy_w * 4) as usize;
            for row in 0..copy_h as usize {
                let src = row * padded_row as usize;
                let dst_row = (y0 as i64 - y as i64) as usize + row;
                let dst = (dst_row * width as usize + (x0 as i64 - x as i64) as usize) * 4;
                out[dst..dst + row_bytes].copy_from_slice(&mapped[src..src + row_bytes]);
            }
        }
        staging.unmap();

        demultiply_in_place(&mut out);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_failures_become_readback_errors() {
        assert!(map_result(Ok(Ok(()))).is_ok());
        assert!(matches!(
            map_result(Ok(Err(wgpu::BufferAsyncError))),
            Err(Error::PixelReadback(_))
        ));
        assert!(matches!(map_result(Err(mpsc::RecvError)), Err(Error::PixelReadback(_))));
    }
}
