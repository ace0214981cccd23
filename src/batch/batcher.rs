use crate::bitmap_data::BitmapId;
use crate::display::BlendMode;
use crate::geom::{Matrix, Rectangle};

use super::vertex_array::{BatchVertex, VertexArray};

/// Texture a batch samples from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSource {
    Bitmap(BitmapId),
    /// Rasterized vector graphics, keyed by the node's cache key.
    Graphics(u64),
    /// A renderer-owned surface, such as a cached display list or an
    /// offscreen compositing buffer.
    Surface(u64),
}

/// Scissor rectangle in target pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Everything that must stay constant within one draw call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchState {
    pub texture: TextureSource,
    pub texture_width: f32,
    pub texture_height: f32,
    pub blend_mode: BlendMode,
    pub smoothing: bool,
    pub scissor: Option<ScissorRect>,
}

/// A flushed batch, borrowed from the batcher for the duration of
/// [`BatchSink::flush`].
pub struct Batch<'a> {
    pub state: &'a BatchState,
    pub vertices: &'a [BatchVertex],
    pub indices: &'a [u16],
}

/// Receives batches as they fill up or change state.
pub trait BatchSink {
    fn flush(&mut self, batch: &Batch<'_>);
}

/// Collects quads and meshes into a [`VertexArray`] and hands them to a
/// sink whenever the render state changes or the array is full.
pub struct Batcher {
    array: VertexArray,
    state: Option<BatchState>,
    flushes: u64,
}

impl Batcher {
    pub fn new(batch_size: usize) -> Self {
        Self {
            array: VertexArray::new(batch_size),
            state: None,
            flushes: 0,
        }
    }

    /// Change the capacity. Pending geometry is dropped, so call this
    /// between frames only.
    pub fn set_batch_size(&mut self, size: usize) {
        if !self.array.is_empty() {
            log::debug!("Batch resized with {} pending vertices", self.array.vertices().len());
        }
        if self.array.set_batch_size(size) {
            self.state = None;
        }
    }

    pub fn batch_size(&self) -> usize {
        self.array.batch_size()
    }

    /// Number of batches handed to sinks so far.
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    pub fn has_pending(&self) -> bool {
        !self.array.is_empty()
    }

    /// Make room for `vertices`/`indices` under `state`, flushing first if
    /// needed. Returns false when the geometry can never fit in one batch.
    fn prepare(&mut self, state: &BatchState, vertices: usize, indices: usize, sink: &mut impl BatchSink) -> bool {
        if vertices > self.array.vertex_capacity() || indices > self.array.index_capacity() {
            return false;
        }
        if self.state.as_ref() != Some(state) {
            self.flush(sink);
            self.state = Some(*state);
        } else if self.array.reach_max_size(vertices, indices) {
            self.flush(sink);
        }
        true
    }

    /// Queue one textured quad. See [`VertexArray::cache_quad`].
    #[allow(clippy::too_many_arguments)]
    pub fn draw_quad(
        &mut self,
        state: &BatchState,
        matrix: &Matrix,
        alpha: f32,
        source: &Rectangle,
        dest: &Rectangle,
        rotated: bool,
        sink: &mut impl BatchSink,
    ) {
        if !self.prepare(state, 4, 6, sink) {
            return;
        }
        self.array.cache_quad(
            matrix,
            alpha,
            source,
            dest,
            state.texture_width,
            state.texture_height,
            rotated,
        );
    }

    /// Queue a mesh. A mesh larger than a whole batch is dropped.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_mesh(
        &mut self,
        state: &BatchState,
        matrix: &Matrix,
        alpha: f32,
        source: &Rectangle,
        vertices: &[f32],
        uvs: &[f32],
        indices: &[u16],
        rotated: bool,
        sink: &mut impl BatchSink,
    ) {
        let vertex_count = uvs.len().min(vertices.len()) / 2;
        if indices.iter().any(|&i| i as usize >= vertex_count) {
            log::warn!(
                "Mesh index out of range for {} vertices, skipped",
                vertex_count
            );
            return;
        }
        if !self.prepare(state, vertex_count, indices.len(), sink) {
            log::warn!(
                "Mesh with {} vertices and {} indices exceeds the batch size of {} quads, skipped",
                vertex_count,
                indices.len(),
                self.array.batch_size()
            );
            return;
        }
        self.array.cache_mesh(
            matrix,
            alpha,
            source,
            state.texture_width,
            state.texture_height,
            vertices,
            uvs,
            indices,
            rotated,
        );
    }

    /// Hand pending geometry to `sink`. Returns whether a batch was emitted.
    pub fn flush(&mut self, sink: &mut impl BatchSink) -> bool {
        let Some(state) = self.state.as_ref() else {
            return false;
        };
        if self.array.is_empty() {
            return false;
        }
        log::trace!(
            "Flushing batch: {} vertices, {} indices, {:?}",
            self.array.vertices().len(),
            self.array.indices().len(),
            state.texture
        );
        sink.flush(&Batch {
            state,
            vertices: self.array.vertices(),
            indices: self.array.indices(),
        });
        self.array.clear();
        self.flushes += 1;
        true
    }

    /// Drop pending geometry without drawing it.
    pub fn discard(&mut self) {
        self.array.clear();
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap_data::{BitmapData, BitmapRegistry};

    #[derive(Default)]
    struct RecordingSink {
        batches: Vec<(BatchState, usize, usize)>,
    }

    impl BatchSink for RecordingSink {
        fn flush(&mut self, batch: &Batch<'_>) {
            self.batches
                .push((*batch.state, batch.vertices.len(), batch.indices.len()));
        }
    }

    fn state(blend_mode: BlendMode) -> BatchState {
        let mut registry = BitmapRegistry::new();
        let id = registry.insert(BitmapData::surface(16, 16));
        BatchState {
            texture: TextureSource::Bitmap(id),
            texture_width: 16.0,
            texture_height: 16.0,
            blend_mode,
            smoothing: true,
            scissor: None,
        }
    }

    fn unit() -> Rectangle {
        Rectangle::new(0.0, 0.0, 16.0, 16.0)
    }

    #[test]
    fn test_overflow_splits_into_two_batches() {
        let n = 5;
        let mut batcher = Batcher::new(n);
        let mut sink = RecordingSink::default();
        let state = state(BlendMode::Normal);

        for _ in 0..=n {
            batcher.draw_quad(&state, &Matrix::IDENTITY, 1.0, &unit(), &unit(), false, &mut sink);
        }
        batcher.flush(&mut sink);

        let quads: Vec<usize> = sink.batches.iter().map(|(_, v, _)| v / 4).collect();
        assert_eq!(quads, vec![n, 1]);
        assert_eq!(batcher.flush_count(), 2);
    }

    #[test]
    fn test_state_change_flushes() {
        let mut batcher = Batcher::new(100);
        let mut sink = RecordingSink::default();
        let normal = state(BlendMode::Normal);
        let add = BatchState {
            blend_mode: BlendMode::Add,
            ..normal
        };

        batcher.draw_quad(&normal, &Matrix::IDENTITY, 1.0, &unit(), &unit(), false, &mut sink);
        batcher.draw_quad(&normal, &Matrix::IDENTITY, 1.0, &unit(), &unit(), false, &mut sink);
        batcher.draw_quad(&add, &Matrix::IDENTITY, 1.0, &unit(), &unit(), false, &mut sink);
        batcher.flush(&mut sink);

        assert_eq!(sink.batches.len(), 2);
        assert_eq!(sink.batches[0].0.blend_mode, BlendMode::Normal);
        assert_eq!(sink.batches[0].1, 8);
        assert_eq!(sink.batches[1].0.blend_mode, BlendMode::Add);
    }

    #[test]
    fn test_empty_flush_emits_nothing() {
        let mut batcher = Batcher::new(4);
        let mut sink = RecordingSink::default();
        assert!(!batcher.flush(&mut sink));
        assert!(sink.batches.is_empty());
    }

    #[test]
    fn test_oversize_mesh_is_dropped() {
        let mut batcher = Batcher::new(1);
        let mut sink = RecordingSink::default();
        let vertices = vec![0.0; 12];
        let uvs = vec![0.0; 12];
        let indices = [0, 1, 2, 3, 4, 5];
        batcher.draw_mesh(
            &state(BlendMode::Normal),
            &Matrix::IDENTITY,
            1.0,
            &unit(),
            &vertices,
            &uvs,
            &indices,
            false,
            &mut sink,
        );
        assert!(!batcher.has_pending());
        assert!(!batcher.flush(&mut sink));
    }

    #[test]
    fn test_mesh_with_out_of_range_index_is_dropped() {
        let mut batcher = Batcher::new(10);
        let mut sink = RecordingSink::default();
        let vertices = vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let uvs = vertices.clone();
        let indices = [0, 1, 3];
        batcher.draw_mesh(
            &state(BlendMode::Normal),
            &Matrix::IDENTITY,
            1.0,
            &unit(),
            &vertices,
            &uvs,
            &indices,
            false,
            &mut sink,
        );
        assert!(!batcher.has_pending());

        batcher.draw_mesh(
            &state(BlendMode::Normal),
            &Matrix::IDENTITY,
            1.0,
            &unit(),
            &vertices,
            &uvs,
            &[0, 1, 2],
            false,
            &mut sink,
        );
        assert!(batcher.has_pending());
    }
}
