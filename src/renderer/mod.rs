//! Drawing display trees into render buffers.
//!
//! [`Renderer`] walks the tree and decides *what* to draw: render modes,
//! alpha, clipping, offscreen compositing and cached display lists. A
//! [`RenderBackend`] decides *how*: the canvas backend rasterizes with
//! tiny-skia, the GPU backend batches quads into wgpu draw calls.

mod canvas;
mod display_list;
mod gpu;
mod walker;

use std::collections::HashMap;

use crate::bitmap_data::{BitmapId, BitmapRegistry};
use crate::display::{BlendMode, DisplayId, Scene};
use crate::error::Result;
use crate::geom::{Matrix, Rectangle};
use crate::nodes::{BitmapNode, RenderNode};
use crate::pool::Pool;
use crate::render_buffer::RenderBuffer;
use crate::render_stats::RenderStats;

pub use canvas::{CanvasBackend, CanvasRenderBuffer, CanvasRenderer};
pub use display_list::DisplayList;
pub use gpu::{GpuBackend, GpuContext, GpuRenderBuffer, GpuRenderer};

/// Transform, opacity and compositing for one draw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawState {
    /// Local space to buffer pixels.
    pub matrix: Matrix,
    pub alpha: f32,
    pub blend_mode: BlendMode,
}

impl DrawState {
    pub fn new(matrix: Matrix) -> Self {
        Self {
            matrix,
            alpha: 1.0,
            blend_mode: BlendMode::Normal,
        }
    }
}

/// Entry points the display-list and hit-test paths call into.
pub trait SystemRenderer {
    type Buffer: RenderBuffer;

    /// Draw `root` and its subtree into `buffer`, with `matrix` mapping the
    /// root's content space to buffer pixels. The root's own transform is
    /// not applied. Offscreen passes (`for_render_texture`) do not count
    /// as frames. Returns the number of render nodes drawn.
    fn render(
        &mut self,
        scene: &mut Scene,
        root: DisplayId,
        buffer: &mut Self::Buffer,
        matrix: &Matrix,
        for_render_texture: bool,
    ) -> Result<u32>;

    /// Draw a single render node. With `for_hit_test` the draw is not
    /// counted in the statistics.
    fn draw_node_to_buffer(
        &mut self,
        bitmaps: &BitmapRegistry,
        node: &RenderNode,
        buffer: &mut Self::Buffer,
        matrix: &Matrix,
        for_hit_test: bool,
    ) -> Result<u32>;
}

/// Pixel pipeline behind a [`Renderer`].
///
/// Draws may be deferred until [`RenderBackend::flush`]. The renderer
/// flushes before it clears, resizes or reads back a buffer.
pub trait RenderBackend {
    type Buffer: RenderBuffer;

    /// Allocate a transparent surface.
    fn create_buffer(&mut self, width: u32, height: u32) -> Result<Self::Buffer>;

    /// Draw one leaf node. Group nodes and the per-node matrix, alpha and
    /// blend overrides are resolved by the caller into `state`.
    fn draw_node(
        &mut self,
        bitmaps: &BitmapRegistry,
        node: &RenderNode,
        buffer: &mut Self::Buffer,
        state: &DrawState,
    ) -> Result<()>;

    /// Draw the blits of `node` using the pixels of `source`.
    fn draw_buffer(
        &mut self,
        source: &Self::Buffer,
        node: &BitmapNode,
        target: &mut Self::Buffer,
        state: &DrawState,
    ) -> Result<()>;

    /// Restrict later draws into `buffer` to `rect` mapped by `matrix`,
    /// intersected with the current clip.
    fn push_clip(&mut self, buffer: &mut Self::Buffer, rect: &Rectangle, matrix: &Matrix);

    fn pop_clip(&mut self, buffer: &mut Self::Buffer);

    /// Submit deferred draws.
    fn flush(&mut self) -> Result<()>;

    /// Frame boundary: forget resources of disposed bitmaps and age caches.
    fn end_frame(&mut self, disposed: &[BitmapId]);

    /// Batches submitted since the last call.
    fn take_batch_flushes(&mut self) -> u64 {
        0
    }
}

/// Backend-independent renderer. See [`CanvasRenderer`] and
/// [`GpuRenderer`] for the concrete flavors.
pub struct Renderer<B: RenderBackend> {
    backend: B,
    buffers: Pool<B::Buffer>,
    display_lists: HashMap<DisplayId, DisplayList<B::Buffer>>,
    stats: RenderStats,
}

impl<B: RenderBackend> Renderer<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            buffers: Pool::new(),
            display_lists: HashMap::new(),
            stats: RenderStats::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Allocate a surface to render into.
    pub fn create_buffer(&mut self, width: u32, height: u32) -> Result<B::Buffer> {
        self.backend.create_buffer(width, height)
    }

    /// Cached surface of a `cache_as_bitmap` object, once it was drawn.
    pub fn display_list(&self, id: DisplayId) -> Option<&DisplayList<B::Buffer>> {
        self.display_lists.get(&id)
    }

    /// Offscreen buffers available for reuse.
    pub fn pooled_buffers(&self) -> usize {
        self.buffers.available()
    }

    /// Submit deferred draws so `buffer` contents can be read.
    pub fn flush(&mut self) -> Result<()> {
        self.backend.flush()
    }

    /// Draw a whole frame: the stage, scaled by the configured canvas
    /// scale, into `buffer`, which is resized to the scaled stage size.
    pub fn render_stage(&mut self, scene: &mut Scene, buffer: &mut B::Buffer) -> Result<u32> {
        let config = scene.config();
        let (sx, sy) = (config.canvas_scale_x, config.canvas_scale_y);
        let width = (config.width as f32 * sx).ceil() as u32;
        let height = (config.height as f32 * sy).ceil() as u32;

        self.backend.flush()?;
        if buffer.width() != width || buffer.height() != height {
            buffer.resize(width, height, false)?;
        }
        buffer.clear();

        let stage = scene.stage();
        let matrix = Matrix::new(sx, 0.0, 0.0, sy, 0.0, 0.0);
        let count = self.render(scene, stage, buffer, &matrix, false)?;

        self.prune_display_lists(scene);
        let disposed = scene.bitmaps_mut().take_disposed();
        self.backend.end_frame(&disposed);
        Ok(count)
    }

    /// Release display lists whose object is gone or stopped caching.
    fn prune_display_lists(&mut self, scene: &Scene) {
        let stale: Vec<DisplayId> = self
            .display_lists
            .keys()
            .filter(|id| !scene.get(**id).is_some_and(|o| o.cache_as_bitmap()))
            .copied()
            .collect();
        for id in stale {
            if let Some(list) = self.display_lists.remove(&id) {
                log::debug!("Releasing display list of {:?}", id);
                self.buffers.release(list.into_buffer());
            }
        }
    }

    /// Take a cleared buffer of at least `width` x `height` from the pool.
    fn acquire_buffer(&mut self, width: u32, height: u32) -> Result<B::Buffer> {
        self.backend.flush()?;
        let backend = &mut self.backend;
        let mut buffer = self
            .buffers
            .try_create(|| backend.create_buffer(width, height))?;
        if let Err(e) = buffer.resize(width, height, true) {
            self.buffers.release(buffer);
            return Err(e);
        }
        buffer.clear();
        Ok(buffer)
    }
}

impl<B: RenderBackend> SystemRenderer for Renderer<B> {
    type Buffer = B::Buffer;

    fn render(
        &mut self,
        scene: &mut Scene,
        root: DisplayId,
        buffer: &mut B::Buffer,
        matrix: &Matrix,
        for_render_texture: bool,
    ) -> Result<u32> {
        let count = self.draw_display_object(scene, root, buffer, &DrawState::new(*matrix), true)?;
        self.backend.flush()?;

        self.stats.record_draw_calls(count as u64);
        let flushes = self.backend.take_batch_flushes();
        self.stats.record_batch_flushes(flushes);
        if !for_render_texture {
            self.stats.end_frame();
        }
        Ok(count)
    }

    fn draw_node_to_buffer(
        &mut self,
        bitmaps: &BitmapRegistry,
        node: &RenderNode,
        buffer: &mut B::Buffer,
        matrix: &Matrix,
        for_hit_test: bool,
    ) -> Result<u32> {
        let count = self.draw_render_node(bitmaps, node, buffer, &DrawState::new(*matrix))?;
        self.backend.flush()?;
        if !for_hit_test {
            self.stats.record_draw_calls(count as u64);
        }
        Ok(count)
    }
}

/// Bitmap node that stretches the top-left `source_width` x
/// `source_height` pixels of a `buffer_width` x `buffer_height` surface
/// over `dest`.
pub(crate) fn blit_node(
    dest: Rectangle,
    source_width: u32,
    source_height: u32,
    buffer_width: u32,
    buffer_height: u32,
) -> BitmapNode {
    use crate::nodes::ImageNode;

    let mut node = BitmapNode::new();
    node.smoothing = false;
    node.image_width = buffer_width as f32;
    node.image_height = buffer_height as f32;
    node.draw_image(
        0.0,
        0.0,
        source_width as f32,
        source_height as f32,
        dest.x,
        dest.y,
        dest.width,
        dest.height,
    );
    node
}
