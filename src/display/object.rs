use crate::filters::Filter;
use crate::geom::{Matrix, Rectangle};
use crate::nodes::RenderNode;

use super::{BlendMode, DirtyFlags, DisplayId, DisplayKind, RenderMode};

/// A node of the display tree.
///
/// Fields are mutated through [`Scene`](super::Scene) so that every change
/// goes through dirty tracking. The getters here are plain reads.
#[derive(Debug)]
pub struct DisplayObject {
    pub(crate) hash_code: u64,
    pub(crate) name: String,
    pub(crate) kind: DisplayKind,

    pub(crate) parent: Option<DisplayId>,
    pub(crate) children: Vec<DisplayId>,
    pub(crate) on_stage: bool,
    /// Depth below the stage (stage is 1), 0 when detached.
    pub(crate) nest_level: u32,

    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) scale_x: f32,
    pub(crate) scale_y: f32,
    /// Degrees in (-180, 180].
    pub(crate) rotation: f32,
    pub(crate) skew_x_deg: f32,
    pub(crate) skew_y_deg: f32,
    /// Skew plus rotation, radians. These feed the matrix.
    pub(crate) skew_x: f32,
    pub(crate) skew_y: f32,
    pub(crate) explicit_width: f32,
    pub(crate) explicit_height: f32,
    pub(crate) anchor_offset_x: f32,
    pub(crate) anchor_offset_y: f32,
    pub(crate) matrix: Matrix,
    pub(crate) use_translate: bool,

    pub(crate) visible: bool,
    pub(crate) alpha: f32,
    pub(crate) blend_mode: BlendMode,
    pub(crate) scroll_rect: Option<Rectangle>,
    pub(crate) mask_rect: Option<Rectangle>,
    pub(crate) mask: Option<DisplayId>,
    pub(crate) masked_object: Option<DisplayId>,
    pub(crate) filters: Vec<Filter>,
    pub(crate) cache_as_bitmap: bool,
    pub(crate) touch_enabled: bool,
    pub(crate) touch_children: bool,

    pub(crate) flags: DirtyFlags,
    pub(crate) render_mode: RenderMode,
    pub(crate) render_node: Option<RenderNode>,

    /// Back-pointer to the sparse slot, for swap-remove fixup.
    pub(crate) sparse_index: u32,
}

impl DisplayObject {
    pub(crate) fn new(hash_code: u64, kind: DisplayKind, sparse_index: u32) -> Self {
        Self {
            hash_code,
            name: String::new(),
            kind,
            parent: None,
            children: Vec::new(),
            on_stage: false,
            nest_level: 0,
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            skew_x_deg: 0.0,
            skew_y_deg: 0.0,
            skew_x: 0.0,
            skew_y: 0.0,
            explicit_width: f32::NAN,
            explicit_height: f32::NAN,
            anchor_offset_x: 0.0,
            anchor_offset_y: 0.0,
            matrix: Matrix::IDENTITY,
            use_translate: false,
            visible: true,
            alpha: 1.0,
            blend_mode: BlendMode::Normal,
            scroll_rect: None,
            mask_rect: None,
            mask: None,
            masked_object: None,
            filters: Vec::new(),
            cache_as_bitmap: false,
            touch_enabled: false,
            touch_children: true,
            flags: DirtyFlags::RENDER,
            render_mode: RenderMode::Default,
            render_node: None,
            sparse_index,
        }
    }

    /// Engine-wide unique identity.
    pub fn hash_code(&self) -> u64 {
        self.hash_code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &DisplayKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<DisplayId> {
        self.parent
    }

    pub fn children(&self) -> &[DisplayId] {
        &self.children
    }

    pub fn is_on_stage(&self) -> bool {
        self.on_stage
    }

    pub fn nest_level(&self) -> u32 {
        self.nest_level
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn scale_x(&self) -> f32 {
        self.scale_x
    }

    pub fn scale_y(&self) -> f32 {
        self.scale_y
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn skew_x(&self) -> f32 {
        self.skew_x_deg
    }

    pub fn skew_y(&self) -> f32 {
        self.skew_y_deg
    }

    pub fn explicit_width(&self) -> f32 {
        self.explicit_width
    }

    pub fn explicit_height(&self) -> f32 {
        self.explicit_height
    }

    pub fn anchor_offset_x(&self) -> f32 {
        self.anchor_offset_x
    }

    pub fn anchor_offset_y(&self) -> f32 {
        self.anchor_offset_y
    }

    pub fn has_anchor(&self) -> bool {
        self.anchor_offset_x != 0.0 || self.anchor_offset_y != 0.0
    }

    /// True when the linear part of the matrix is not the identity, so a
    /// plain translation is not enough to place the object.
    pub fn use_translate(&self) -> bool {
        self.use_translate
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn scroll_rect(&self) -> Option<Rectangle> {
        self.scroll_rect
    }

    pub fn mask_rect(&self) -> Option<Rectangle> {
        self.mask_rect
    }

    pub fn mask(&self) -> Option<DisplayId> {
        self.mask
    }

    pub fn masked_object(&self) -> Option<DisplayId> {
        self.masked_object
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn cache_as_bitmap(&self) -> bool {
        self.cache_as_bitmap
    }

    pub fn touch_enabled(&self) -> bool {
        self.touch_enabled
    }

    pub fn touch_children(&self) -> bool {
        self.touch_children
    }

    pub fn flags(&self) -> DirtyFlags {
        self.flags
    }

    pub fn is_cache_dirty(&self) -> bool {
        self.flags.contains(DirtyFlags::CACHE)
    }

    pub fn is_render_dirty(&self) -> bool {
        self.flags.contains(DirtyFlags::RENDER)
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    /// Last generated render node, without regenerating it.
    pub fn render_node(&self) -> Option<&RenderNode> {
        self.render_node.as_ref()
    }

    pub(crate) fn update_use_translate(&mut self) {
        self.use_translate = !(self.scale_x == 1.0
            && self.scale_y == 1.0
            && self.skew_x == 0.0
            && self.skew_y == 0.0);
    }
}
