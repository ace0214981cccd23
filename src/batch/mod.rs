//! Vertex batching: turns draw commands into size-bounded vertex and
//! index batches.

mod batcher;
mod vertex_array;

pub use batcher::{Batch, BatchSink, BatchState, Batcher, ScissorRect, TextureSource};
pub use vertex_array::{BatchVertex, VertexArray};
