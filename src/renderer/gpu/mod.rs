//! Batched rendering with wgpu.

mod buffer;
mod context;
mod pipeline;
mod renderer;
mod textures;

pub use buffer::GpuRenderBuffer;
pub use context::GpuContext;
pub use renderer::{GpuBackend, GpuRenderer};
