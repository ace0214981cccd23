use crate::bitmap_data::BitmapRegistry;
use crate::constants::{HIT_TEST_BUFFER_SIZE, SINGULAR_EPSILON};
use crate::display::{BlendMode, DisplayId, RenderMode, Scene};
use crate::display::{content_offset, local_matrix};
use crate::error::{Error, Result};
use crate::geom::{Matrix, Rectangle};
use crate::nodes::RenderNode;
use crate::render_buffer::RenderBuffer;

use super::{blit_node, DrawState, RenderBackend, Renderer, SystemRenderer};

impl<B: RenderBackend> Renderer<B> {
    /// Draw an object's own node and then its children.
    ///
    /// `state.matrix` maps the object's content space to buffer pixels.
    /// The object's render mode is ignored here; parents dispatch on it.
    /// Roots never draw through their own display list.
    pub(super) fn draw_display_object(
        &mut self,
        scene: &mut Scene,
        id: DisplayId,
        buffer: &mut B::Buffer,
        state: &DrawState,
        is_root: bool,
    ) -> Result<u32> {
        if !is_root && scene.object(id)?.cache_as_bitmap() {
            if let Some(count) = self.draw_cached(scene, id, buffer, state)? {
                return Ok(count);
            }
        }

        if scene.refresh_render_node(id) {
            self.stats.record_node_regenerated();
        }
        let mut count = {
            let obj = scene.object(id)?;
            match obj.render_node() {
                Some(node) => self.draw_render_node(scene.bitmaps(), node, buffer, state)?,
                None => 0,
            }
        };
        scene.clear_cache_dirty(id);

        let children = scene.object(id)?.children().to_vec();
        let inner = DrawState {
            blend_mode: BlendMode::Normal,
            ..*state
        };
        for child in children {
            count += self.draw_child(scene, child, buffer, &inner)?;
        }
        Ok(count)
    }

    /// Place a child under its parent's state and draw it the way its
    /// render mode asks for.
    fn draw_child(&mut self, scene: &mut Scene, id: DisplayId, buffer: &mut B::Buffer, parent: &DrawState) -> Result<u32> {
        let obj = scene.object_mut(id)?;
        let mode = obj.render_mode();
        if mode == RenderMode::None {
            return Ok(0);
        }

        let matrix = if obj.use_translate() {
            let local = local_matrix(obj);
            parent
                .matrix
                .pre_multiply(&local)
                .pre_multiply(&content_offset(obj))
        } else {
            let offset = content_offset(obj);
            translated(&parent.matrix, obj.x() + offset.tx, obj.y() + offset.ty)
        };
        let state = DrawState {
            matrix,
            alpha: parent.alpha * obj.alpha(),
            blend_mode: BlendMode::Normal,
        };

        match mode {
            RenderMode::None => Ok(0),
            // Filters only contribute padding; their pixels are drawn as is.
            RenderMode::Filter | RenderMode::Default => self.draw_display_object(scene, id, buffer, &state, false),
            RenderMode::Clip => self.draw_with_clip(scene, id, buffer, &state),
            RenderMode::ScrollRect => self.draw_with_scroll_rect(scene, id, buffer, &state),
        }
    }

    fn draw_with_scroll_rect(&mut self, scene: &mut Scene, id: DisplayId, buffer: &mut B::Buffer, state: &DrawState) -> Result<u32> {
        let obj = scene.object(id)?;
        let Some(rect) = obj.scroll_rect().or(obj.mask_rect()) else {
            return self.draw_display_object(scene, id, buffer, state, false);
        };
        if rect.is_empty() {
            return Ok(0);
        }
        // Scroll position is already part of the content offset, so the
        // rectangle is in content space like everything else.
        self.backend.push_clip(buffer, &rect, &state.matrix);
        let result = self.draw_display_object(scene, id, buffer, state, false);
        self.backend.pop_clip(buffer);
        result
    }

    /// Composite through an offscreen buffer, for blend modes and masks.
    fn draw_with_clip(&mut self, scene: &mut Scene, id: DisplayId, buffer: &mut B::Buffer, state: &DrawState) -> Result<u32> {
        let obj = scene.object(id)?;
        let blend_mode = obj.blend_mode();
        let rect = obj.scroll_rect().or(obj.mask_rect());
        let mask = obj
            .mask()
            .filter(|&m| scene.get(m).is_some_and(|o| o.is_on_stage()));

        // A blend mode alone on a leaf needs no offscreen pass.
        if mask.is_none() && rect.is_none() && obj.children().is_empty() {
            let blended = DrawState { blend_mode, ..*state };
            return self.draw_display_object(scene, id, buffer, &blended, false);
        }

        let bounds = scene.get_original_bounds(id)?;
        if bounds.width <= 0.0 || bounds.height <= 0.0 {
            return Ok(0);
        }
        let bx = bounds.x.floor();
        let by = bounds.y.floor();
        let width = (bounds.x + bounds.width - bx).ceil();
        let height = (bounds.y + bounds.height - by).ceil();

        // Render at the target resolution so scaled content stays sharp.
        let (sx, sy) = surface_scale(&state.matrix);
        if sx <= 0.0 || sy <= 0.0 {
            return Ok(0);
        }
        let pixel_width = (width * sx).ceil().max(1.0) as u32;
        let pixel_height = (height * sy).ceil().max(1.0) as u32;
        let origin = Matrix::new(sx, 0.0, 0.0, sy, -bx * sx, -by * sy);

        let mut offscreen = self.acquire_buffer(pixel_width, pixel_height)?;
        let result = self.draw_clipped_content(scene, id, mask, &mut offscreen, &origin, pixel_width, pixel_height);
        let result = result.and_then(|count| {
            if let Some(rect) = rect {
                self.backend.push_clip(buffer, &rect, &state.matrix);
            }
            let node = blit_node(
                Rectangle::new(bx, by, width, height),
                pixel_width,
                pixel_height,
                offscreen.width(),
                offscreen.height(),
            );
            let composite = DrawState { blend_mode, ..*state };
            let drawn = self.backend.draw_buffer(&offscreen, &node, buffer, &composite);
            if rect.is_some() {
                self.backend.pop_clip(buffer);
            }
            drawn.map(|_| count + 1)
        });
        self.buffers.release(offscreen);
        result
    }

    /// Draw `id` into `offscreen` through `origin`, which maps its bounds
    /// onto the top-left `width` x `height` pixels, then cut it down to
    /// the mask's coverage.
    #[allow(clippy::too_many_arguments)]
    fn draw_clipped_content(
        &mut self,
        scene: &mut Scene,
        id: DisplayId,
        mask: Option<DisplayId>,
        offscreen: &mut B::Buffer,
        origin: &Matrix,
        width: u32,
        height: u32,
    ) -> Result<u32> {
        let mut count = self.draw_display_object(scene, id, offscreen, &DrawState::new(*origin), false)?;

        let Some(mask) = mask else {
            return Ok(count);
        };
        let concatenated = scene.get_concatenated_matrix(id)?;
        if concatenated.determinant().abs() < SINGULAR_EPSILON {
            return Ok(count);
        }
        let mask_matrix = origin.pre_multiply(
            &concatenated
                .inverted()
                .pre_multiply(&scene.get_concatenated_matrix(mask)?),
        );

        let mut mask_buffer = self.acquire_buffer(width, height)?;
        let result = self
            .draw_display_object(scene, mask, &mut mask_buffer, &DrawState::new(mask_matrix), false)
            .and_then(|drawn| {
                let node = blit_node(
                    Rectangle::new(0.0, 0.0, width as f32, height as f32),
                    width,
                    height,
                    mask_buffer.width(),
                    mask_buffer.height(),
                );
                let state = DrawState {
                    blend_mode: BlendMode::DestinationIn,
                    ..DrawState::new(Matrix::IDENTITY)
                };
                self.backend
                    .draw_buffer(&mask_buffer, &node, offscreen, &state)
                    .map(|_| drawn)
            });
        self.buffers.release(mask_buffer);
        count += result?;
        Ok(count)
    }

    /// Draw a render node, expanding groups and applying the node's own
    /// matrix, alpha and blend overrides.
    pub(super) fn draw_render_node(
        &mut self,
        bitmaps: &BitmapRegistry,
        node: &RenderNode,
        buffer: &mut B::Buffer,
        state: &DrawState,
    ) -> Result<u32> {
        let state = match node {
            RenderNode::Group(group) => {
                let inner = DrawState {
                    matrix: group.matrix.map_or(state.matrix, |m| state.matrix.pre_multiply(&m)),
                    blend_mode: group.blend_mode.unwrap_or(state.blend_mode),
                    ..*state
                };
                let mut count = 0;
                for child in &group.children {
                    count += self.draw_render_node(bitmaps, child, buffer, &inner)?;
                }
                return Ok(count);
            }
            _ if node.is_empty() => return Ok(0),
            RenderNode::Bitmap(bitmap) => DrawState {
                matrix: bitmap.matrix.map_or(state.matrix, |m| state.matrix.pre_multiply(&m)),
                alpha: state.alpha * bitmap.alpha.unwrap_or(1.0),
                blend_mode: bitmap.blend_mode.unwrap_or(state.blend_mode),
            },
            RenderNode::Mesh(mesh) => DrawState {
                matrix: mesh.matrix.map_or(state.matrix, |m| state.matrix.pre_multiply(&m)),
                alpha: state.alpha * mesh.alpha.unwrap_or(1.0),
                blend_mode: mesh.blend_mode.unwrap_or(state.blend_mode),
            },
            _ => *state,
        };
        self.backend.draw_node(bitmaps, node, buffer, &state)?;
        Ok(1)
    }

    /// Whether the stage point hits `id`.
    ///
    /// Without `shape_flag`, or when pixel tests are disabled in the
    /// config, this is the geometric test. Otherwise the object is drawn
    /// around the point and the pixel's alpha decides. Readback failures
    /// are reported as [`Error::PixelReadback`].
    pub fn hit_test_point(&mut self, scene: &mut Scene, id: DisplayId, stage_x: f32, stage_y: f32, shape_flag: bool) -> Result<bool> {
        if !scene.hit_test_point(id, stage_x, stage_y)? {
            return Ok(false);
        }
        if !shape_flag || !scene.config().pixel_hit_test {
            return Ok(true);
        }
        let local = scene.global_to_local(id, stage_x, stage_y)?;

        if self.display_lists.contains_key(&id) {
            self.backend.flush().map_err(readback_error)?;
            if let Some(list) = self.display_lists.get_mut(&id) {
                let p = list.offset_matrix().transform_point(local.x, local.y);
                let pixel = list
                    .buffer_mut()
                    .get_pixels(p.x.floor() as i32, p.y.floor() as i32, 1, 1)
                    .map_err(readback_error)?;
                return Ok(pixel.get(3).is_some_and(|&a| a != 0));
            }
        }

        let size = HIT_TEST_BUFFER_SIZE;
        let mut scratch = self.acquire_buffer(size, size).map_err(readback_error)?;
        let matrix = Matrix::translation(1.0 - local.x, 1.0 - local.y);
        let result = self
            .render(scene, id, &mut scratch, &matrix, true)
            .and_then(|_| scratch.get_pixels(1, 1, 1, 1));
        self.buffers.release(scratch);
        let pixel = result.map_err(readback_error)?;
        Ok(pixel.get(3).is_some_and(|&a| a != 0))
    }
}

/// `matrix` followed by a translation applied first, without a full
/// multiply.
fn translated(matrix: &Matrix, dx: f32, dy: f32) -> Matrix {
    Matrix {
        tx: matrix.a * dx + matrix.c * dy + matrix.tx,
        ty: matrix.b * dx + matrix.d * dy + matrix.ty,
        ..*matrix
    }
}

/// Pixels per content unit along each axis of `matrix`.
fn surface_scale(matrix: &Matrix) -> (f32, f32) {
    (
        (matrix.a * matrix.a + matrix.b * matrix.b).sqrt(),
        (matrix.c * matrix.c + matrix.d * matrix.d).sqrt(),
    )
}

fn readback_error(error: Error) -> Error {
    match error {
        Error::PixelReadback(message) => Error::PixelReadback(message),
        other => Error::PixelReadback(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translated_matches_full_multiply() {
        let m = Matrix::new(2.0, 0.5, -0.5, 3.0, 10.0, 20.0);
        let fast = translated(&m, 4.0, -6.0);
        let full = m.pre_multiply(&Matrix::translation(4.0, -6.0));
        assert!((fast.tx - full.tx).abs() < 1e-4);
        assert!((fast.ty - full.ty).abs() < 1e-4);
        assert_eq!(fast.a, full.a);
        assert_eq!(fast.d, full.d);
    }

    #[test]
    fn test_surface_scale_ignores_rotation_and_mirroring() {
        let (sx, sy) = surface_scale(&Matrix::new(0.0, 2.0, -3.0, 0.0, 5.0, 5.0));
        assert!((sx - 2.0).abs() < 1e-6);
        assert!((sy - 3.0).abs() < 1e-6);

        let (sx, sy) = surface_scale(&Matrix::new(-2.0, 0.0, 0.0, 0.5, 0.0, 0.0));
        assert_eq!((sx, sy), (2.0, 0.5));
    }

    #[test]
    fn test_readback_errors_are_wrapped() {
        let err = readback_error(Error::Gpu("lost".into()));
        assert!(matches!(err, Error::PixelReadback(ref m) if m.contains("lost")));
    }
}
