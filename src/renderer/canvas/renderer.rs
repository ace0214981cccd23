use std::collections::HashMap;

use resvg::tiny_skia::{FilterQuality, Mask, Paint, Pattern, Pixmap, Rect, SpreadMode};

use crate::bitmap_data::{BitmapId, BitmapRegistry};
use crate::error::Result;
use crate::geom::{Matrix, Rectangle};
use crate::nodes::{MeshNode, RenderNode};
use crate::renderer::{DrawState, RenderBackend, Renderer};

use super::buffer::CanvasRenderBuffer;
use super::raster::{
    draw_graphics_path, image_transform, premultiplied_pixmap, to_blend_mode, to_transform, triangle_path,
    triangle_transform,
};

/// Renderer that rasterizes on the CPU.
pub type CanvasRenderer = Renderer<CanvasBackend>;

impl CanvasRenderer {
    pub fn new() -> Self {
        Self::with_backend(CanvasBackend::new())
    }
}

impl Default for CanvasRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// tiny-skia backend. Draws immediately, so flushing is a no-op.
#[derive(Default)]
pub struct CanvasBackend {
    /// Premultiplied copies of bitmaps, tagged with the revision they
    /// were made from.
    pixmaps: HashMap<BitmapId, (u64, Pixmap)>,
}

impl CanvasBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bitmaps with a premultiplied copy.
    pub fn cached_bitmaps(&self) -> usize {
        self.pixmaps.len()
    }
}

/// Premultiplied pixels of `id`, refreshed when the bitmap changed.
fn cached_pixmap<'a>(
    cache: &'a mut HashMap<BitmapId, (u64, Pixmap)>,
    bitmaps: &BitmapRegistry,
    id: BitmapId,
) -> Result<Option<&'a Pixmap>> {
    let Some(data) = bitmaps.get(id) else {
        return Ok(None);
    };
    let Some(image) = data.pixels() else {
        log::trace!("Bitmap {:?} has no CPU pixels, skipped", id);
        return Ok(None);
    };
    let stale = cache.get(&id).map_or(true, |(revision, _)| *revision != data.revision);
    if stale {
        cache.insert(id, (data.revision, premultiplied_pixmap(image)?));
    }
    Ok(cache.get(&id).map(|(_, pixmap)| pixmap))
}

fn quality(smoothing: bool) -> FilterQuality {
    if smoothing {
        FilterQuality::Bilinear
    } else {
        FilterQuality::Nearest
    }
}

/// Fill `dest` with the `source` pixels of `texture`.
#[allow(clippy::too_many_arguments)]
fn fill_image(
    target: &mut Pixmap,
    mask: Option<&Mask>,
    texture: &Pixmap,
    source: &Rectangle,
    dest: &Rectangle,
    rotated: bool,
    smoothing: bool,
    state: &DrawState,
) {
    if source.is_empty() {
        return;
    }
    let Some(rect) = Rect::from_xywh(dest.x, dest.y, dest.width, dest.height) else {
        return;
    };
    let shader = Pattern::new(
        texture.as_ref(),
        SpreadMode::Pad,
        quality(smoothing),
        state.alpha,
        to_transform(&image_transform(source, dest, rotated)),
    );
    let paint = Paint {
        shader,
        blend_mode: to_blend_mode(state.blend_mode),
        ..Paint::default()
    };
    target.fill_rect(rect, &paint, to_transform(&state.matrix), mask);
}

/// Draw each triangle with the texture mapped affinely onto it.
fn fill_mesh(target: &mut Pixmap, mask: Option<&Mask>, texture: &Pixmap, mesh: &MeshNode, state: &DrawState) {
    let vertex = |i: u16| -> Option<((f32, f32), (f32, f32))> {
        let i = i as usize * 2;
        let position = (*mesh.vertices.get(i)?, *mesh.vertices.get(i + 1)?);
        let uv = (*mesh.uvs.get(i)?, *mesh.uvs.get(i + 1)?);
        Some((position, uv))
    };
    let transform = to_transform(&state.matrix);
    let blend_mode = to_blend_mode(state.blend_mode);

    for draw in &mesh.draw_data {
        let source = draw.source;
        let texel = |(u, v): (f32, f32)| {
            if mesh.rotated {
                (source.x + (1.0 - v) * source.height, source.y + u * source.width)
            } else {
                (source.x + u * source.width, source.y + v * source.height)
            }
        };
        for triangle in mesh.indices.chunks_exact(3) {
            let (Some(p0), Some(p1), Some(p2)) = (vertex(triangle[0]), vertex(triangle[1]), vertex(triangle[2])) else {
                continue;
            };
            let positions = [p0.0, p1.0, p2.0];
            let texels = [texel(p0.1), texel(p1.1), texel(p2.1)];
            let (Some(map), Some(path)) = (triangle_transform(texels, positions), triangle_path(positions)) else {
                continue;
            };
            let shader = Pattern::new(
                texture.as_ref(),
                SpreadMode::Pad,
                quality(mesh.smoothing),
                state.alpha,
                to_transform(&map),
            );
            let paint = Paint {
                shader,
                blend_mode,
                ..Paint::default()
            };
            target.fill_path(&path, &paint, resvg::tiny_skia::FillRule::Winding, transform, mask);
        }
    }
}

impl RenderBackend for CanvasBackend {
    type Buffer = CanvasRenderBuffer;

    fn create_buffer(&mut self, width: u32, height: u32) -> Result<CanvasRenderBuffer> {
        CanvasRenderBuffer::new(width, height)
    }

    fn draw_node(
        &mut self,
        bitmaps: &BitmapRegistry,
        node: &RenderNode,
        buffer: &mut CanvasRenderBuffer,
        state: &DrawState,
    ) -> Result<()> {
        let (target, mask) = buffer.target();
        match node {
            RenderNode::Bitmap(bitmap) => {
                let Some(texture) = bitmap.image else {
                    return Ok(());
                };
                if let Some(texture) = cached_pixmap(&mut self.pixmaps, bitmaps, texture)? {
                    for draw in &bitmap.draw_data {
                        fill_image(
                            target,
                            mask,
                            texture,
                            &draw.source,
                            &draw.dest,
                            bitmap.rotated,
                            bitmap.smoothing,
                            state,
                        );
                    }
                }
            }
            RenderNode::NormalBitmap(bitmap) => {
                let Some(texture) = bitmap.image else {
                    return Ok(());
                };
                if let Some(texture) = cached_pixmap(&mut self.pixmaps, bitmaps, texture)? {
                    fill_image(
                        target,
                        mask,
                        texture,
                        &bitmap.source,
                        &bitmap.draw,
                        bitmap.rotated,
                        bitmap.smoothing,
                        state,
                    );
                }
            }
            RenderNode::Mesh(mesh) => {
                let Some(texture) = mesh.image else {
                    return Ok(());
                };
                if let Some(texture) = cached_pixmap(&mut self.pixmaps, bitmaps, texture)? {
                    fill_mesh(target, mask, texture, mesh, state);
                }
            }
            RenderNode::Graphics(graphics) => {
                let transform = to_transform(&state.matrix);
                let blend_mode = to_blend_mode(state.blend_mode);
                for path in &graphics.paths {
                    draw_graphics_path(target, path, transform, state.alpha, blend_mode, mask);
                }
            }
            // Glyph shaping is out of scope for the CPU backend.
            RenderNode::Text(_) => {}
            RenderNode::Group(_) => {}
        }
        Ok(())
    }

    fn draw_buffer(
        &mut self,
        source: &CanvasRenderBuffer,
        node: &crate::nodes::BitmapNode,
        target: &mut CanvasRenderBuffer,
        state: &DrawState,
    ) -> Result<()> {
        let (pixmap, mask) = target.target();
        for draw in &node.draw_data {
            fill_image(
                pixmap,
                mask,
                source.pixmap(),
                &draw.source,
                &draw.dest,
                false,
                node.smoothing,
                state,
            );
        }
        Ok(())
    }

    fn push_clip(&mut self, buffer: &mut CanvasRenderBuffer, rect: &Rectangle, matrix: &Matrix) {
        buffer.push_clip(rect, matrix);
    }

    fn pop_clip(&mut self, buffer: &mut CanvasRenderBuffer) {
        buffer.pop_clip();
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_frame(&mut self, disposed: &[BitmapId]) {
        for id in disposed {
            if self.pixmaps.remove(id).is_some() {
                log::debug!("Dropped pixmap of disposed bitmap {:?}", id);
            }
        }
    }
}
