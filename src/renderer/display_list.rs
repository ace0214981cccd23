use crate::display::{DisplayId, Scene};
use crate::error::{Error, Result};
use crate::geom::Matrix;
use crate::nodes::{BitmapNode, ImageNode};
use crate::render_buffer::RenderBuffer;

use super::{DrawState, RenderBackend, Renderer};

/// Cached rendering of a `cache_as_bitmap` subtree.
///
/// The subtree is drawn once into `buffer` and then composited as a
/// single blit until something inside it changes.
pub struct DisplayList<Buf> {
    root: DisplayId,
    buffer: Buf,
    /// Negated origin of the content bounds, in content space.
    offset_x: f32,
    offset_y: f32,
    /// Content space to buffer pixels.
    offset_matrix: Matrix,
    canvas_scale: (f32, f32),
    node: BitmapNode,
}

impl<Buf: RenderBuffer> DisplayList<Buf> {
    fn new(root: DisplayId, buffer: Buf) -> Self {
        Self {
            root,
            buffer,
            offset_x: 0.0,
            offset_y: 0.0,
            offset_matrix: Matrix::IDENTITY,
            canvas_scale: (0.0, 0.0),
            node: BitmapNode::new(),
        }
    }

    pub fn root(&self) -> DisplayId {
        self.root
    }

    pub fn buffer(&self) -> &Buf {
        &self.buffer
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut Buf {
        &mut self.buffer
    }

    pub fn offset_matrix(&self) -> &Matrix {
        &self.offset_matrix
    }

    /// The single blit that stands in for the subtree.
    pub fn node(&self) -> &BitmapNode {
        &self.node
    }

    pub(crate) fn into_buffer(self) -> Buf {
        self.buffer
    }

    /// Fit the surface to `bounds` at `scale`. Only resizes when the
    /// offset or the size actually changed.
    fn change_surface_size(&mut self, scene: &mut Scene, scale: (f32, f32)) -> Result<()> {
        let bounds = scene.get_original_bounds(self.root)?;
        let min_size = scene.config().min_surface_size;
        let (sx, sy) = scale;

        let offset_x = -bounds.x;
        let offset_y = -bounds.y;
        let width = ((bounds.width * sx).ceil() as u32).max(min_size).max(1);
        let height = ((bounds.height * sy).ceil() as u32).max(min_size).max(1);

        let offset_changed = offset_x != self.offset_x || offset_y != self.offset_y;
        if offset_changed || width != self.buffer.width() || height != self.buffer.height() {
            self.offset_x = offset_x;
            self.offset_y = offset_y;
            if width != self.buffer.width() || height != self.buffer.height() {
                log::debug!("Resizing display list of {:?} to {}x{}", self.root, width, height);
                self.buffer.resize(width, height, false)?;
            }
        }
        self.canvas_scale = scale;
        self.offset_matrix = Matrix::new(sx, 0.0, 0.0, sy, offset_x * sx, offset_y * sy);
        Ok(())
    }

    fn rebuild_node(&mut self) {
        let (sx, sy) = self.canvas_scale;
        let (width, height) = (self.buffer.width() as f32, self.buffer.height() as f32);
        self.node.clean_before_render();
        self.node.image_width = width;
        self.node.image_height = height;
        self.node.draw_image(
            0.0,
            0.0,
            width,
            height,
            -self.offset_x,
            -self.offset_y,
            width / sx,
            height / sy,
        );
    }
}

impl<B: RenderBackend> Renderer<B> {
    /// Draw `id` through its display list, creating or refreshing the list
    /// as needed. Returns `None` when caching had to be turned off and
    /// the caller should draw the subtree directly.
    pub(super) fn draw_cached(
        &mut self,
        scene: &mut Scene,
        id: DisplayId,
        buffer: &mut B::Buffer,
        state: &DrawState,
    ) -> Result<Option<u32>> {
        let config = scene.config();
        let scale = (config.canvas_scale_x, config.canvas_scale_y);

        let (mut list, fresh) = match self.display_lists.remove(&id) {
            Some(list) => (list, false),
            None => match self.create_display_list(scene, id) {
                Some(list) => (list, true),
                None => return Ok(None),
            },
        };

        let obj = scene.object(id)?;
        if fresh || obj.is_cache_dirty() || obj.is_render_dirty() || list.canvas_scale != scale {
            match self.draw_to_surface(scene, &mut list, scale) {
                Ok(()) => {}
                Err(Error::ResourceExhausted { width, height }) => {
                    log::warn!(
                        "Display list surface {}x{} for {:?} could not be allocated, caching disabled",
                        width,
                        height,
                        id
                    );
                    scene.disable_cache_as_bitmap(id);
                    self.buffers.release(list.into_buffer());
                    return Ok(None);
                }
                Err(e) => {
                    self.buffers.release(list.into_buffer());
                    return Err(e);
                }
            }
        }

        let drawn = self.backend.draw_buffer(&list.buffer, &list.node, buffer, state);
        self.display_lists.insert(id, list);
        drawn.map(|_| Some(1))
    }

    /// Allocate the surface for a new display list. Allocation failure
    /// turns caching off for `id` instead of failing the frame.
    fn create_display_list(&mut self, scene: &mut Scene, id: DisplayId) -> Option<DisplayList<B::Buffer>> {
        let size = scene.config().min_surface_size.max(1);
        let backend = &mut self.backend;
        match self.buffers.try_create(|| backend.create_buffer(size, size)) {
            Ok(buffer) => {
                log::debug!("Created display list for {:?}", id);
                Some(DisplayList::new(id, buffer))
            }
            Err(e) => {
                log::warn!("Display list for {:?} could not be created: {}", id, e);
                scene.disable_cache_as_bitmap(id);
                None
            }
        }
    }

    /// Redraw the subtree into the list's surface and rebuild its blit.
    fn draw_to_surface(&mut self, scene: &mut Scene, list: &mut DisplayList<B::Buffer>, scale: (f32, f32)) -> Result<()> {
        self.stats.record_cache_redraw();
        self.backend.flush()?;
        list.change_surface_size(scene, scale)?;
        list.buffer.clear();

        let state = DrawState::new(list.offset_matrix);
        let count = self.draw_display_object(scene, list.root, &mut list.buffer, &state, true)?;
        self.stats.record_draw_calls(count as u64);

        list.rebuild_node();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageConfig;
    use crate::display::{DisplayKind, GraphicsContent};
    use crate::filters::Filter;
    use crate::geom::Rectangle;
    use crate::nodes::GraphicsPath;
    use crate::renderer::{CanvasRenderBuffer, CanvasRenderer};
    use resvg::tiny_skia::Color;

    /// Stage holding a cached container with one red rectangle inside.
    fn cached_rect(config: StageConfig, rect: Rectangle) -> (Scene, DisplayId) {
        let mut scene = Scene::new(config.width(16).height(16));
        let stage = scene.stage();
        let group = scene.create(DisplayKind::container());
        let shape = scene.create(DisplayKind::Graphics(GraphicsContent {
            paths: vec![GraphicsPath::fill_rect(rect, 0xFF0000, 1.0)],
        }));
        scene.add_child(stage, group).unwrap();
        scene.add_child(group, shape).unwrap();
        scene.set_cache_as_bitmap(group, true).unwrap();
        (scene, group)
    }

    #[test]
    fn test_empty_content_gets_the_minimum_surface() {
        let mut scene = Scene::new(StageConfig::new().min_surface_size(16));
        let id = scene.create(DisplayKind::container());

        let buffer = CanvasRenderBuffer::new(1, 1).unwrap();
        let mut list = DisplayList::new(id, buffer);
        list.change_surface_size(&mut scene, (2.0, 2.0)).unwrap();

        assert_eq!(list.buffer().width(), 16);
        assert_eq!(list.buffer().height(), 16);
        assert_eq!(list.offset_matrix().a, 2.0);

        list.rebuild_node();
        let draw = list.node().draw_data[0];
        assert_eq!(draw.source.width, 16.0);
        assert_eq!(draw.dest.width, 8.0);
    }

    #[test]
    fn test_unallocatable_list_falls_back_to_direct_draw() {
        let config = StageConfig::new().min_surface_size(1 << 30);
        let (mut scene, group) = cached_rect(config, Rectangle::new(0.0, 0.0, 4.0, 4.0));
        let mut renderer = CanvasRenderer::new();
        let mut buffer = renderer.create_buffer(16, 16).unwrap();

        let drawn = renderer
            .draw_cached(&mut scene, group, &mut buffer, &DrawState::new(Matrix::IDENTITY))
            .unwrap();
        assert!(drawn.is_none());
        assert!(!scene.object(group).unwrap().cache_as_bitmap());
        assert!(renderer.display_list(group).is_none());

        renderer.render_stage(&mut scene, &mut buffer).unwrap();
        assert_eq!(buffer.get_pixels(1, 1, 1, 1).unwrap(), vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_oversize_content_disables_caching() {
        let config = StageConfig::new().min_surface_size(1);
        let (mut scene, group) = cached_rect(config, Rectangle::new(0.0, 0.0, 4.0, 4.0));
        // Padding alone pushes the surface past what a pixmap can address.
        scene
            .set_filters(group, vec![Filter::Custom { padding: (1u32 << 29) as f32 }])
            .unwrap();
        let mut renderer = CanvasRenderer::new();
        let mut buffer = renderer.create_buffer(16, 16).unwrap();

        renderer.render_stage(&mut scene, &mut buffer).unwrap();
        assert!(!scene.object(group).unwrap().cache_as_bitmap());
        assert!(renderer.display_list(group).is_none());
        assert_eq!(buffer.get_pixels(1, 1, 1, 1).unwrap(), vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_unchanged_bounds_keep_the_surface() {
        let config = StageConfig::new().min_surface_size(1);
        let (mut scene, group) = cached_rect(config, Rectangle::new(2.0, 3.0, 10.0, 5.0));

        let mut list = DisplayList::new(group, CanvasRenderBuffer::new(1, 1).unwrap());
        list.change_surface_size(&mut scene, (1.0, 1.0)).unwrap();
        assert_eq!((list.buffer().width(), list.buffer().height()), (10, 5));
        assert_eq!(list.offset_matrix().tx, -2.0);

        list.buffer_mut().pixmap_mut().fill(Color::from_rgba8(0, 0, 255, 255));
        list.change_surface_size(&mut scene, (1.0, 1.0)).unwrap();
        assert_eq!((list.buffer().width(), list.buffer().height()), (10, 5));
        // A reallocated surface would have come back transparent.
        assert_eq!(list.buffer_mut().get_pixels(0, 0, 1, 1).unwrap(), vec![0, 0, 255, 255]);
    }
}
