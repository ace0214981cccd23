//! CPU rasterization with tiny-skia.

mod buffer;
pub(crate) mod raster;
mod renderer;

pub use buffer::CanvasRenderBuffer;
pub use renderer::{CanvasBackend, CanvasRenderer};
