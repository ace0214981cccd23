use std::collections::HashMap;

use resvg::tiny_skia::Pixmap;
use wgpu::{Device, Extent3d, Queue, TextureView};

use crate::bitmap_data::{BitmapId, BitmapRegistry};
use crate::error::{Error, Result};
use crate::nodes::{GraphicsNode, GraphicsPath};
use crate::renderer::canvas::raster::{premultiplied_pixmap, rasterize_graphics};

/// Bitmaps evicted once the cache grows past this many entries.
const MAX_CACHED_TEXTURES: usize = 256;

struct CachedTexture {
    revision: u64,
    view: TextureView,
    width: u32,
    height: u32,
    last_used_frame: u64,
}

struct CachedGraphics {
    paths: Vec<GraphicsPath>,
    view: TextureView,
    width: u32,
    height: u32,
    /// Local-space position of the top-left texel.
    x: f32,
    y: f32,
    last_used_frame: u64,
}

/// Uploaded texture as the batcher sees it.
pub(crate) struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub x: f32,
    pub y: f32,
}

/// GPU copies of bitmaps and of rasterized vector graphics.
#[derive(Default)]
pub(crate) struct TextureCache {
    bitmaps: HashMap<BitmapId, CachedTexture>,
    graphics: HashMap<u64, CachedGraphics>,
    current_frame: u64,
}

fn upload(device: &Device, queue: &Queue, pixmap: &Pixmap, label: &str) -> Result<TextureView> {
    let (width, height) = (pixmap.width(), pixmap.height());
    let max = device.limits().max_texture_dimension_2d;
    if width > max || height > max {
        return Err(Error::ResourceExhausted { width, height });
    }
    let size = Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixmap.data(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    Ok(texture.create_view(&wgpu::TextureViewDescriptor::default()))
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bitmaps.len() + self.graphics.len()
    }

    /// Make sure the current pixels of `id` are on the GPU. Returns `None`
    /// for unknown bitmaps and for bitmaps without CPU pixels.
    pub fn prepare_bitmap(
        &mut self,
        device: &Device,
        queue: &Queue,
        bitmaps: &BitmapRegistry,
        id: BitmapId,
    ) -> Result<Option<TextureInfo>> {
        let Some(data) = bitmaps.get(id) else {
            return Ok(None);
        };
        let Some(image) = data.pixels() else {
            log::trace!("Bitmap {:?} has no CPU pixels, skipped", id);
            return Ok(None);
        };
        let frame = self.current_frame;
        if let Some(cached) = self.bitmaps.get_mut(&id) {
            if cached.revision == data.revision {
                cached.last_used_frame = frame;
                return Ok(Some(TextureInfo {
                    width: cached.width,
                    height: cached.height,
                    x: 0.0,
                    y: 0.0,
                }));
            }
        }

        let pixmap = premultiplied_pixmap(image)?;
        let view = upload(device, queue, &pixmap, "Bitmap Texture")?;
        log::debug!("Uploaded bitmap {:?} ({}x{})", id, pixmap.width(), pixmap.height());
        self.bitmaps.insert(
            id,
            CachedTexture {
                revision: data.revision,
                view,
                width: pixmap.width(),
                height: pixmap.height(),
                last_used_frame: frame,
            },
        );
        Ok(Some(TextureInfo {
            width: pixmap.width(),
            height: pixmap.height(),
            x: 0.0,
            y: 0.0,
        }))
    }

    /// Rasterize `node` unless the same paths are already uploaded.
    pub fn prepare_graphics(&mut self, device: &Device, queue: &Queue, node: &GraphicsNode) -> Result<Option<TextureInfo>> {
        let frame = self.current_frame;
        if let Some(cached) = self.graphics.get_mut(&node.cache_key) {
            if cached.paths == node.paths {
                cached.last_used_frame = frame;
                return Ok(Some(TextureInfo {
                    width: cached.width,
                    height: cached.height,
                    x: cached.x,
                    y: cached.y,
                }));
            }
        }

        let Some((pixmap, x, y)) = rasterize_graphics(node)? else {
            self.graphics.remove(&node.cache_key);
            return Ok(None);
        };
        let view = upload(device, queue, &pixmap, "Graphics Texture")?;
        let info = TextureInfo {
            width: pixmap.width(),
            height: pixmap.height(),
            x,
            y,
        };
        self.graphics.insert(
            node.cache_key,
            CachedGraphics {
                paths: node.paths.clone(),
                view,
                width: info.width,
                height: info.height,
                x,
                y,
                last_used_frame: frame,
            },
        );
        Ok(Some(info))
    }

    pub fn bitmap_view(&self, id: BitmapId) -> Option<&TextureView> {
        self.bitmaps.get(&id).map(|c| &c.view)
    }

    pub fn graphics_view(&self, key: u64) -> Option<&TextureView> {
        self.graphics.get(&key).map(|c| &c.view)
    }

    /// Drop disposed bitmaps, then evict the least recently used entries
    /// if the cache grew too large.
    pub fn end_frame(&mut self, disposed: &[BitmapId]) {
        for id in disposed {
            if self.bitmaps.remove(id).is_some() {
                log::debug!("Released texture of disposed bitmap {:?}", id);
            }
        }
        self.current_frame += 1;

        if self.len() <= MAX_CACHED_TEXTURES {
            return;
        }
        let target = MAX_CACHED_TEXTURES / 2;
        while self.len() > target {
            let oldest_bitmap = self
                .bitmaps
                .iter()
                .min_by_key(|(_, c)| c.last_used_frame)
                .map(|(k, c)| (*k, c.last_used_frame));
            let oldest_graphics = self
                .graphics
                .iter()
                .min_by_key(|(_, c)| c.last_used_frame)
                .map(|(k, c)| (*k, c.last_used_frame));
            match (oldest_bitmap, oldest_graphics) {
                (Some((id, a)), Some((_, b))) if a <= b => {
                    self.bitmaps.remove(&id);
                }
                (_, Some((key, _))) => {
                    self.graphics.remove(&key);
                }
                (Some((id, _)), None) => {
                    self.bitmaps.remove(&id);
                }
                (None, None) => break,
            }
        }
    }
}
