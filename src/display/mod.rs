//! The display-object tree.
//!
//! Objects live in a [`Scene`] arena and are addressed by [`DisplayId`].
//! Geometry changes mark cached state dirty up the parent chain; the
//! renderers consume that state lazily when a frame is drawn.

mod appearance;
mod bounds;
mod kind;
mod object;
mod scene;
mod transform;

use bitflags::bitflags;

pub use kind::{
    BitmapContent, DisplayKind, GraphicsContent, MeshContent, NodeParams, Renderable, TextContent,
};
pub use object::DisplayObject;
pub use scene::{FrameCallback, Scene, StageEvent};
pub(crate) use transform::{content_offset, local_matrix};

/// Unique identifier for a display object in a [`Scene`].
///
/// Uses a generational index: a stale id never resolves to an object that
/// was later allocated in the same slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct DisplayId {
    index: u32,
    generation: u32,
}

impl DisplayId {
    fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Combines generation (high bits) with index (low bits).
    pub fn as_u64(self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }
}

bitflags! {
    /// Stale derived state of a display object.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct DirtyFlags: u8 {
        /// Local matrix no longer matches scale/skew/rotation.
        const MATRIX = 1 << 0;
        /// Bounds or cached surface are stale.
        const CACHE  = 1 << 1;
        /// Render node must be regenerated.
        const RENDER = 1 << 2;
    }
}

/// How a display object is composited onto what is below it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Source over.
    #[default]
    Normal,
    /// Additive ("lighter").
    Add,
    /// Punches the object's alpha out of the destination.
    Erase,
    /// Keeps the destination only where the source is opaque. Used to
    /// apply masks.
    DestinationIn,
}

/// Drawing strategy picked for an object from its current properties.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Invisible, transparent or used as a mask.
    None,
    /// Has filters.
    Filter,
    /// Needs offscreen compositing for a blend mode or mask object.
    Clip,
    /// Clipped to a scroll or mask rectangle.
    ScrollRect,
    #[default]
    Default,
}
