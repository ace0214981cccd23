use std::collections::HashMap;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use wgpu::{Device, Queue, TextureView};

use crate::batch::{Batch, BatchSink, BatchState, Batcher, ScissorRect, TextureSource};
use crate::bitmap_data::{BitmapId, BitmapRegistry};
use crate::error::Result;
use crate::geom::{Matrix, Rectangle};
use crate::nodes::{BitmapNode, RenderNode};
use crate::render_buffer::RenderBuffer;
use crate::renderer::{DrawState, RenderBackend, Renderer};

use super::buffer::GpuRenderBuffer;
use super::context::GpuContext;
use super::pipeline::{BatchPipelines, ScreenUniform};
use super::textures::TextureCache;

/// Renderer that batches draws into wgpu render passes.
pub type GpuRenderer = Renderer<GpuBackend>;

impl GpuRenderer {
    pub fn new(context: &GpuContext, batch_size: usize) -> Self {
        Self::with_backend(GpuBackend::new(context, batch_size))
    }
}

/// Render target of the pending batch.
struct Target {
    id: u64,
    view: TextureView,
    width: u32,
    height: u32,
}

/// Everything a batch needs once it is encoded.
struct GpuResources {
    device: Arc<Device>,
    queue: Arc<Queue>,
    pipelines: BatchPipelines,
    textures: TextureCache,
    /// Views of buffers sampled by pending batches.
    surfaces: HashMap<u64, TextureView>,
    target: Option<Target>,
}

/// Encodes each flushed batch as one render pass and submits it.
struct BatchEncoder<'a>(&'a GpuResources);

impl BatchSink for BatchEncoder<'_> {
    fn flush(&mut self, batch: &Batch<'_>) {
        let res = self.0;
        let Some(target) = res.target.as_ref() else {
            log::warn!("Batch flushed without a render target, dropped");
            return;
        };
        let source = match batch.state.texture {
            TextureSource::Bitmap(id) => res.textures.bitmap_view(id),
            TextureSource::Graphics(key) => res.textures.graphics_view(key),
            TextureSource::Surface(id) => res.surfaces.get(&id),
        };
        let Some(source) = source else {
            log::warn!("Texture {:?} is not resident, batch dropped", batch.state.texture);
            return;
        };
        if let Some(scissor) = batch.state.scissor {
            if scissor.width == 0 || scissor.height == 0 {
                return;
            }
        }

        let device = &res.device;
        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Batch Uniform Buffer"),
            contents: bytemuck::cast_slice(&[ScreenUniform::new(target.width, target.height)]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Batch Bind Group"),
            layout: &res.pipelines.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(res.pipelines.sampler(batch.state.smoothing)),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform.as_entire_binding(),
                },
            ],
        });
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Batch Vertex Buffer"),
            contents: bytemuck::cast_slice(batch.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Batch Index Buffer"),
            contents: bytemuck::cast_slice(batch.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Batch Encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Batch Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(res.pipelines.pipeline(batch.state.blend_mode));
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            if let Some(s) = batch.state.scissor {
                pass.set_scissor_rect(s.x, s.y, s.width, s.height);
            }
            pass.draw_indexed(0..batch.indices.len() as u32, 0, 0..1);
        }
        res.queue.submit(Some(encoder.finish()));
    }
}

/// wgpu backend. Draws are queued in a [`Batcher`] and submitted when
/// the render state or target changes, or on [`RenderBackend::flush`].
pub struct GpuBackend {
    resources: GpuResources,
    batcher: Batcher,
    reported_flushes: u64,
}

impl GpuBackend {
    pub fn new(context: &GpuContext, batch_size: usize) -> Self {
        Self {
            resources: GpuResources {
                device: context.device.clone(),
                queue: context.queue.clone(),
                pipelines: BatchPipelines::new(&context.device),
                textures: TextureCache::new(),
                surfaces: HashMap::new(),
                target: None,
            },
            batcher: Batcher::new(batch_size),
            reported_flushes: 0,
        }
    }

    /// Change the batch capacity. Pending draws are submitted first.
    pub fn set_batch_size(&mut self, size: usize) {
        self.submit();
        self.batcher.set_batch_size(size);
    }

    pub fn batch_size(&self) -> usize {
        self.batcher.batch_size()
    }

    /// Bitmaps and graphics currently uploaded.
    pub fn resident_textures(&self) -> usize {
        self.resources.textures.len()
    }

    fn submit(&mut self) {
        self.batcher.flush(&mut BatchEncoder(&self.resources));
    }

    /// Point pending draws at `buffer`, submitting whatever was queued
    /// for another target.
    fn bind_target(&mut self, buffer: &GpuRenderBuffer) {
        let current = self
            .resources
            .target
            .as_ref()
            .is_some_and(|t| t.id == buffer.id() && t.width == buffer.width() && t.height == buffer.height());
        if current {
            return;
        }
        self.submit();
        self.resources.target = Some(Target {
            id: buffer.id(),
            view: buffer.view().clone(),
            width: buffer.width(),
            height: buffer.height(),
        });
    }

    fn draw_quads<'a>(
        &mut self,
        state: &BatchState,
        draw: &DrawState,
        rotated: bool,
        quads: impl IntoIterator<Item = (&'a Rectangle, &'a Rectangle)>,
    ) {
        let mut sink = BatchEncoder(&self.resources);
        for (source, dest) in quads {
            self.batcher
                .draw_quad(state, &draw.matrix, draw.alpha, source, dest, rotated, &mut sink);
        }
    }
}

fn batch_state(texture: TextureSource, width: u32, height: u32, draw: &DrawState, smoothing: bool, scissor: Option<ScissorRect>) -> BatchState {
    BatchState {
        texture,
        texture_width: width as f32,
        texture_height: height as f32,
        blend_mode: draw.blend_mode,
        smoothing,
        scissor,
    }
}

impl RenderBackend for GpuBackend {
    type Buffer = GpuRenderBuffer;

    fn create_buffer(&mut self, width: u32, height: u32) -> Result<GpuRenderBuffer> {
        GpuRenderBuffer::new(self.resources.device.clone(), self.resources.queue.clone(), width, height)
    }

    fn draw_node(
        &mut self,
        bitmaps: &BitmapRegistry,
        node: &RenderNode,
        buffer: &mut GpuRenderBuffer,
        state: &DrawState,
    ) -> Result<()> {
        self.bind_target(buffer);
        let scissor = buffer.scissor();
        let res = &mut self.resources;

        match node {
            RenderNode::Bitmap(bitmap) => {
                let Some(id) = bitmap.image else {
                    return Ok(());
                };
                let Some(info) = res.textures.prepare_bitmap(&res.device, &res.queue, bitmaps, id)? else {
                    return Ok(());
                };
                let batch = batch_state(TextureSource::Bitmap(id), info.width, info.height, state, bitmap.smoothing, scissor);
                self.draw_quads(
                    &batch,
                    state,
                    bitmap.rotated,
                    bitmap.draw_data.iter().map(|d| (&d.source, &d.dest)),
                );
            }
            RenderNode::NormalBitmap(bitmap) => {
                let Some(id) = bitmap.image else {
                    return Ok(());
                };
                let Some(info) = res.textures.prepare_bitmap(&res.device, &res.queue, bitmaps, id)? else {
                    return Ok(());
                };
                let batch = batch_state(TextureSource::Bitmap(id), info.width, info.height, state, bitmap.smoothing, scissor);
                self.draw_quads(&batch, state, bitmap.rotated, [(&bitmap.source, &bitmap.draw)]);
            }
            RenderNode::Mesh(mesh) => {
                let Some(id) = mesh.image else {
                    return Ok(());
                };
                let Some(info) = res.textures.prepare_bitmap(&res.device, &res.queue, bitmaps, id)? else {
                    return Ok(());
                };
                let batch = batch_state(TextureSource::Bitmap(id), info.width, info.height, state, mesh.smoothing, scissor);
                let mut sink = BatchEncoder(&self.resources);
                for draw in &mesh.draw_data {
                    self.batcher.draw_mesh(
                        &batch,
                        &state.matrix,
                        state.alpha,
                        &draw.source,
                        &mesh.vertices,
                        &mesh.uvs,
                        &mesh.indices,
                        mesh.rotated,
                        &mut sink,
                    );
                }
            }
            RenderNode::Graphics(graphics) => {
                let Some(info) = res.textures.prepare_graphics(&res.device, &res.queue, graphics)? else {
                    return Ok(());
                };
                let batch = batch_state(
                    TextureSource::Graphics(graphics.cache_key),
                    info.width,
                    info.height,
                    state,
                    true,
                    scissor,
                );
                let (w, h) = (info.width as f32, info.height as f32);
                let source = Rectangle::new(0.0, 0.0, w, h);
                let dest = Rectangle::new(info.x, info.y, w, h);
                self.draw_quads(&batch, state, false, [(&source, &dest)]);
            }
            // Glyph shaping is not part of the GPU backend.
            RenderNode::Text(_) => {}
            RenderNode::Group(_) => {}
        }
        Ok(())
    }

    fn draw_buffer(
        &mut self,
        source: &GpuRenderBuffer,
        node: &BitmapNode,
        target: &mut GpuRenderBuffer,
        state: &DrawState,
    ) -> Result<()> {
        self.bind_target(target);
        self.resources
            .surfaces
            .insert(source.id(), source.view().clone());
        let batch = batch_state(
            TextureSource::Surface(source.id()),
            source.width(),
            source.height(),
            state,
            node.smoothing,
            target.scissor(),
        );
        self.draw_quads(&batch, state, false, node.draw_data.iter().map(|d| (&d.source, &d.dest)));
        Ok(())
    }

    fn push_clip(&mut self, buffer: &mut GpuRenderBuffer, rect: &Rectangle, matrix: &Matrix) {
        // Scissors are axis aligned; rotated clips use their bounding box.
        let mut bounds = *rect;
        matrix.transform_bounds(&mut bounds);
        buffer.push_clip(bounds.left(), bounds.top(), bounds.right(), bounds.bottom());
    }

    fn pop_clip(&mut self, buffer: &mut GpuRenderBuffer) {
        buffer.pop_clip();
    }

    fn flush(&mut self) -> Result<()> {
        self.submit();
        self.resources.surfaces.clear();
        self.resources.target = None;
        Ok(())
    }

    fn end_frame(&mut self, disposed: &[BitmapId]) {
        self.resources.textures.end_frame(disposed);
    }

    fn take_batch_flushes(&mut self) -> u64 {
        let total = self.batcher.flush_count();
        let delta = total - self.reported_flushes;
        self.reported_flushes = total;
        delta
    }
}
