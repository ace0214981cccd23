//! A 2D scene-graph rendering core.
//!
//! Build a tree of display objects in a [`Scene`], then draw it with a
//! [`CanvasRenderer`] (CPU, tiny-skia) or a [`GpuRenderer`] (wgpu).
//! Geometry, bounds and render nodes are computed lazily and cached
//! until something marks them dirty.
//!
//! ```no_run
//! use stagecraft::prelude::*;
//!
//! let mut scene = Scene::new(StageConfig::new().width(64).height(64));
//! let shape = scene.create(DisplayKind::Graphics(GraphicsContent::new()));
//! scene.add_child(scene.stage(), shape).unwrap();
//!
//! let mut renderer = CanvasRenderer::new();
//! let mut buffer = renderer.create_buffer(64, 64).unwrap();
//! renderer.render_stage(&mut scene, &mut buffer).unwrap();
//! ```

pub mod batch;
pub mod bitmap_data;
pub mod config;
pub mod constants;
pub mod display;
pub mod error;
pub mod filters;
pub mod geom;
pub mod hash;
pub mod math;
pub mod nodes;
pub mod pool;
pub mod render_buffer;
pub mod render_stats;
pub mod renderer;
pub mod texture;

pub use bitmap_data::{BitmapData, BitmapId, BitmapRegistry};
pub use config::StageConfig;
pub use display::{BlendMode, DisplayId, DisplayKind, DisplayObject, RenderMode, Scene};
pub use error::{Error, Result};
pub use geom::{Matrix, Point, Rectangle};
pub use render_buffer::RenderBuffer;
pub use render_stats::RenderStats;
pub use renderer::{CanvasRenderBuffer, CanvasRenderer, GpuContext, GpuRenderBuffer, GpuRenderer, SystemRenderer};
pub use texture::Texture;

pub mod prelude {
    pub use crate::display::{
        BitmapContent, GraphicsContent, MeshContent, StageEvent, TextContent,
    };
    pub use crate::filters::{BlurFilter, DropShadowFilter, Filter, GlowFilter};
    pub use crate::nodes::{GraphicsPath, PathShape};
    pub use crate::texture::BitmapFillMode;
    pub use crate::{
        BitmapData, BitmapId, BlendMode, CanvasRenderBuffer, CanvasRenderer, DisplayId, DisplayKind, Error,
        GpuContext, GpuRenderBuffer, GpuRenderer, Matrix, Point, Rectangle, RenderBuffer, Result, Scene,
        StageConfig, SystemRenderer, Texture,
    };
}
