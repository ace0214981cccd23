//! Visibility, compositing, masking and the render mode derived from them.

use crate::error::Result;
use crate::filters::Filter;
use crate::geom::Rectangle;

use super::{BlendMode, DirtyFlags, DisplayId, RenderMode, Scene};

impl Scene {
    pub fn set_visible(&mut self, id: DisplayId, visible: bool) -> Result<()> {
        let obj = self.object_mut(id)?;
        if obj.visible == visible {
            return Ok(());
        }
        obj.visible = visible;
        self.update_render_mode(id);
        self.notify_changed(id);
        Ok(())
    }

    pub fn set_alpha(&mut self, id: DisplayId, alpha: f32) -> Result<()> {
        let obj = self.object_mut(id)?;
        if obj.alpha == alpha {
            return Ok(());
        }
        obj.alpha = alpha;
        self.update_render_mode(id);
        self.notify_changed(id);
        Ok(())
    }

    pub fn set_blend_mode(&mut self, id: DisplayId, blend_mode: BlendMode) -> Result<()> {
        let obj = self.object_mut(id)?;
        if obj.blend_mode == blend_mode {
            return Ok(());
        }
        obj.blend_mode = blend_mode;
        self.update_render_mode(id);
        self.notify_changed(id);
        Ok(())
    }

    pub fn set_filters(&mut self, id: DisplayId, filters: Vec<Filter>) -> Result<()> {
        self.object_mut(id)?.filters = filters;
        self.update_render_mode(id);
        self.notify_changed(id);
        Ok(())
    }

    /// Render this subtree into a cached surface and reuse it until the
    /// subtree changes. The renderer creates the surface lazily and turns
    /// the flag back off if it cannot.
    pub fn set_cache_as_bitmap(&mut self, id: DisplayId, value: bool) -> Result<()> {
        let obj = self.object_mut(id)?;
        if obj.cache_as_bitmap == value {
            return Ok(());
        }
        obj.cache_as_bitmap = value;
        obj.flags.insert(DirtyFlags::CACHE);
        self.notify_changed(id);
        Ok(())
    }

    pub(crate) fn disable_cache_as_bitmap(&mut self, id: DisplayId) {
        if let Some(obj) = self.get_mut(id) {
            obj.cache_as_bitmap = false;
        }
    }

    pub fn set_touch_enabled(&mut self, id: DisplayId, value: bool) -> Result<()> {
        self.object_mut(id)?.touch_enabled = value;
        Ok(())
    }

    pub fn set_touch_children(&mut self, id: DisplayId, value: bool) -> Result<()> {
        self.object_mut(id)?.touch_children = value;
        Ok(())
    }

    /// Clip to `rect`, scrolled so `rect.x`/`rect.y` shows at the origin.
    /// Replaces any mask.
    pub fn set_scroll_rect(&mut self, id: DisplayId, rect: Option<Rectangle>) -> Result<()> {
        let obj = self.object(id)?;
        if rect.is_none() && obj.scroll_rect.is_none() {
            self.update_render_mode(id);
            return Ok(());
        }
        if rect.is_some() {
            self.unlink_mask(id);
            self.object_mut(id)?.mask_rect = None;
        }
        self.object_mut(id)?.scroll_rect = rect;
        self.update_render_mode(id);
        self.notify_changed(id);
        Ok(())
    }

    /// Clip to `rect` in content space without scrolling. Replaces any
    /// mask object and scroll rect.
    pub fn set_mask_rect(&mut self, id: DisplayId, rect: Option<Rectangle>) -> Result<()> {
        self.object(id)?;
        self.unlink_mask(id);
        let obj = self.object_mut(id)?;
        if rect.is_some() {
            obj.scroll_rect = None;
        }
        obj.mask_rect = rect;
        self.update_render_mode(id);
        self.notify_changed(id);
        Ok(())
    }

    /// Use `mask` as the mask of `id`, or clear every mask with `None`.
    ///
    /// The link is kept on both sides. A mask can serve one object at a
    /// time, so it is taken from its previous owner first.
    pub fn set_mask(&mut self, id: DisplayId, mask: Option<DisplayId>) -> Result<()> {
        if mask == Some(id) {
            return Ok(());
        }
        let current = self.object(id)?.mask;
        match mask {
            Some(mask) => {
                if current == Some(mask) {
                    return Ok(());
                }
                let previous_owner = self.object(mask)?.masked_object;
                if let Some(owner) = previous_owner {
                    self.set_mask(owner, None)?;
                }
                self.unlink_mask(id);

                self.object_mut(mask)?.masked_object = Some(id);
                let obj = self.object_mut(id)?;
                obj.mask = Some(mask);
                obj.mask_rect = None;
                obj.scroll_rect = None;
                self.update_render_mode(mask);
            }
            None => {
                self.unlink_mask(id);
                self.object_mut(id)?.mask_rect = None;
            }
        }
        self.update_render_mode(id);
        self.notify_changed(id);
        Ok(())
    }

    /// Break the link between `id` and its mask object, if any.
    fn unlink_mask(&mut self, id: DisplayId) {
        let Some(mask) = self.get_mut(id).and_then(|o| o.mask.take()) else {
            return;
        };
        if let Some(mask_obj) = self.get_mut(mask) {
            mask_obj.masked_object = None;
        }
        self.update_render_mode(mask);
    }

    /// Re-derive the render mode, highest priority first.
    pub(crate) fn update_render_mode(&mut self, id: DisplayId) {
        let Some(obj) = self.get(id) else {
            return;
        };
        let mask_on_stage = obj
            .mask
            .and_then(|m| self.get(m))
            .is_some_and(|m| m.on_stage);
        let mode = if !obj.visible || obj.alpha <= 0.0 || obj.masked_object.is_some() {
            RenderMode::None
        } else if !obj.filters.is_empty() {
            RenderMode::Filter
        } else if obj.blend_mode != BlendMode::Normal || mask_on_stage {
            RenderMode::Clip
        } else if obj.scroll_rect.is_some() || obj.mask_rect.is_some() {
            RenderMode::ScrollRect
        } else {
            RenderMode::Default
        };
        if let Some(obj) = self.get_mut(id) {
            obj.render_mode = mode;
        }
    }
}
