//! Arena storage for display objects.
//!
//! The scene keeps every object in a dense `Vec` with a sparse map from
//! generational [`DisplayId`]s to dense slots, so lookups are O(1) and
//! removal is a swap-remove. It also owns the per-scene state the frame
//! driver needs: the stage root, the bitmap registry, the queue of stage
//! notifications and the enter-frame/render callback lists.

use image::RgbaImage;

use crate::bitmap_data::{BitmapData, BitmapId, BitmapRegistry};
use crate::config::StageConfig;
use crate::error::{Error, Result};
use crate::hash::next_hash_code;
use crate::nodes::RenderNode;

use super::kind::{NodeParams, Renderable};
use super::{DirtyFlags, DisplayId, DisplayKind, DisplayObject};

/// Notifications produced by tree mutations, drained by the event layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageEvent {
    Added(DisplayId),
    Removed(DisplayId),
    AddedToStage(DisplayId),
    RemovedFromStage(DisplayId),
}

/// Per-frame hook registered for a display object.
pub type FrameCallback = Box<dyn FnMut(&mut Scene, DisplayId)>;

/// Entry in the sparse map, pointing to a dense array slot.
struct SparseEntry {
    dense_index: usize,
    generation: u32,
}

#[derive(Default)]
struct CallbackList {
    entries: Vec<(DisplayId, FrameCallback)>,
    /// Removals requested while the list was being dispatched.
    pending_removals: Vec<DisplayId>,
    dispatching: bool,
}

pub struct Scene {
    dense: Vec<DisplayObject>,
    sparse: Vec<Option<SparseEntry>>,
    free_indices: Vec<u32>,
    stage: DisplayId,
    config: StageConfig,
    bitmaps: BitmapRegistry,
    events: Vec<StageEvent>,
    enter_frame: CallbackList,
    render_callbacks: CallbackList,
    cache_dirty_marks: u64,
}

impl Scene {
    /// Create a scene with an empty stage.
    pub fn new(config: StageConfig) -> Self {
        let mut scene = Self {
            dense: Vec::new(),
            sparse: Vec::new(),
            free_indices: Vec::new(),
            stage: DisplayId::new(0, 0),
            config,
            bitmaps: BitmapRegistry::new(),
            events: Vec::new(),
            enter_frame: CallbackList::default(),
            render_callbacks: CallbackList::default(),
            cache_dirty_marks: 0,
        };
        let stage = scene.create(DisplayKind::container());
        if let Some(obj) = scene.get_mut(stage) {
            obj.on_stage = true;
            obj.nest_level = 1;
            obj.name = "stage".to_string();
        }
        scene.stage = stage;
        scene
    }

    pub fn stage(&self) -> DisplayId {
        self.stage
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Resize the stage. Marks the whole stage for redraw.
    pub fn set_stage_size(&mut self, width: u32, height: u32) {
        if self.config.width == width && self.config.height == height {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        let stage = self.stage;
        self.mark_dirty_up(stage);
    }

    pub fn bitmaps(&self) -> &BitmapRegistry {
        &self.bitmaps
    }

    pub(crate) fn bitmaps_mut(&mut self) -> &mut BitmapRegistry {
        &mut self.bitmaps
    }

    /// Number of cache-dirty transitions since the scene was created.
    pub fn cache_dirty_marks(&self) -> u64 {
        self.cache_dirty_marks
    }

    /// Register a detached display object and return its id.
    pub fn create(&mut self, kind: DisplayKind) -> DisplayId {
        let (sparse_index, generation) = if let Some(idx) = self.free_indices.pop() {
            let old_gen = self.sparse[idx as usize]
                .as_ref()
                .map(|e| e.generation)
                .unwrap_or(0);
            (idx, old_gen.wrapping_add(1))
        } else {
            let idx = self.sparse.len() as u32;
            self.sparse.push(None);
            (idx, 0)
        };

        let dense_index = self.dense.len();
        let id = DisplayId::new(sparse_index, generation);
        let bitmap = kind.bitmap();
        self.dense
            .push(DisplayObject::new(next_hash_code(), kind, sparse_index));
        self.sparse[sparse_index as usize] = Some(SparseEntry {
            dense_index,
            generation,
        });
        if let Some(bitmap) = bitmap {
            self.bitmaps.add_dependent(bitmap, id);
        }
        id
    }

    /// Remove an object and its whole subtree from the scene.
    ///
    /// Mask links, bitmap dependencies and frame callbacks that refer to
    /// the removed objects are dropped. The stage cannot be disposed.
    pub fn dispose(&mut self, id: DisplayId) {
        if id == self.stage || !self.contains_id(id) {
            return;
        }
        if let Some(parent) = self.get(id).and_then(|o| o.parent) {
            let _ = self.remove_child(parent, id);
        }
        self.dispose_subtree(id);
    }

    fn dispose_subtree(&mut self, id: DisplayId) {
        let children = match self.get(id) {
            Some(obj) => obj.children.clone(),
            None => return,
        };
        for child in children {
            self.dispose_subtree(child);
        }

        let _ = self.set_mask(id, None);
        let masked = self.get(id).and_then(|o| o.masked_object);
        if let Some(masked) = masked {
            let _ = self.set_mask(masked, None);
        }
        if let Some(bitmap) = self.get(id).and_then(|o| o.kind.bitmap()) {
            self.bitmaps.remove_dependent(bitmap, id);
        }
        self.remove_enter_frame(id);
        self.remove_render_callback(id);
        self.unregister(id);
    }

    fn unregister(&mut self, id: DisplayId) {
        let Some(dense_index) = self.get_dense_index(id) else {
            return;
        };
        let last_dense_index = self.dense.len() - 1;
        self.dense.swap_remove(dense_index);

        if dense_index != last_dense_index {
            let moved_sparse_idx = self.dense[dense_index].sparse_index;
            if let Some(entry) = self.sparse[moved_sparse_idx as usize].as_mut() {
                entry.dense_index = dense_index;
            }
        }

        // Keep the generation so the next allocation in this slot differs.
        if let Some(entry) = self.sparse[id.index as usize].as_mut() {
            entry.dense_index = usize::MAX;
        }
        self.free_indices.push(id.index);
    }

    fn get_dense_index(&self, id: DisplayId) -> Option<usize> {
        self.sparse
            .get(id.index as usize)
            .and_then(|e| e.as_ref())
            .filter(|e| e.generation == id.generation && e.dense_index != usize::MAX)
            .map(|e| e.dense_index)
    }

    /// Check if an id refers to a live object.
    pub fn contains_id(&self, id: DisplayId) -> bool {
        self.get_dense_index(id).is_some()
    }

    pub fn get(&self, id: DisplayId) -> Option<&DisplayObject> {
        self.get_dense_index(id).map(|idx| &self.dense[idx])
    }

    pub(crate) fn get_mut(&mut self, id: DisplayId) -> Option<&mut DisplayObject> {
        self.get_dense_index(id).map(move |idx| &mut self.dense[idx])
    }

    /// Like [`Scene::get`] but reports stale ids as an error.
    pub fn object(&self, id: DisplayId) -> Result<&DisplayObject> {
        self.get(id).ok_or(Error::UnknownDisplayObject(id))
    }

    pub(crate) fn object_mut(&mut self, id: DisplayId) -> Result<&mut DisplayObject> {
        self.get_mut(id).ok_or(Error::UnknownDisplayObject(id))
    }

    /// Number of live objects, the stage included.
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn set_name(&mut self, id: DisplayId, name: impl Into<String>) -> Result<()> {
        self.object_mut(id)?.name = name.into();
        Ok(())
    }

    // ----- children -----

    pub fn add_child(&mut self, parent: DisplayId, child: DisplayId) -> Result<()> {
        self.add_child_at(parent, child, usize::MAX)
    }

    /// Insert `child` at `index`. Out-of-range indices append. A child that
    /// already belongs to `parent` is moved instead.
    pub fn add_child_at(&mut self, parent: DisplayId, child: DisplayId, index: usize) -> Result<()> {
        let parent_obj = self.object(parent)?;
        if !parent_obj.kind.is_container() {
            return Err(Error::NotAContainer(parent));
        }
        let len = parent_obj.children.len();
        let host = self.object(child)?.parent;

        if host == Some(parent) {
            let index = if index >= len { len - 1 } else { index };
            return self.set_child_index(parent, child, index);
        }
        if let Some(host) = host {
            self.remove_child(host, child)?;
        }

        let (on_stage, nest_level) = {
            let parent_obj = self.object_mut(parent)?;
            let index = index.min(parent_obj.children.len());
            parent_obj.children.insert(index, child);
            (parent_obj.on_stage, parent_obj.nest_level)
        };
        self.object_mut(child)?.parent = Some(parent);
        self.events.push(StageEvent::Added(child));
        if on_stage {
            self.attach_to_stage(child, nest_level + 1);
        }
        self.mark_dirty_up(parent);
        Ok(())
    }

    pub fn remove_child(&mut self, parent: DisplayId, child: DisplayId) -> Result<()> {
        let index = self
            .object(parent)?
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(Error::NotAChild { parent, child })?;
        self.remove_child_at(parent, index).map(|_| ())
    }

    /// Remove and return the child at `index`.
    pub fn remove_child_at(&mut self, parent: DisplayId, index: usize) -> Result<Option<DisplayId>> {
        let parent_obj = self.object_mut(parent)?;
        if index >= parent_obj.children.len() {
            return Ok(None);
        }
        let child = parent_obj.children.remove(index);
        self.events.push(StageEvent::Removed(child));
        if self.get(child).is_some_and(|c| c.on_stage) {
            self.detach_from_stage(child);
        }
        if let Some(obj) = self.get_mut(child) {
            obj.parent = None;
        }
        self.mark_dirty_up(parent);
        Ok(Some(child))
    }

    /// Remove every child of `parent`, last first.
    pub fn remove_children(&mut self, parent: DisplayId) -> Result<()> {
        let count = self.object(parent)?.children.len();
        for index in (0..count).rev() {
            self.remove_child_at(parent, index)?;
        }
        Ok(())
    }

    /// Move `child` to `index` in its parent's list. Out-of-range indices
    /// move it to the top.
    pub fn set_child_index(&mut self, parent: DisplayId, child: DisplayId, index: usize) -> Result<()> {
        let parent_obj = self.object_mut(parent)?;
        let current = parent_obj
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(Error::NotAChild { parent, child })?;
        let last = parent_obj.children.len() - 1;
        let index = index.min(last);
        if current == index {
            return Ok(());
        }
        parent_obj.children.remove(current);
        parent_obj.children.insert(index, child);
        self.mark_dirty_up(parent);
        Ok(())
    }

    pub fn swap_children(&mut self, parent: DisplayId, a: DisplayId, b: DisplayId) -> Result<()> {
        let parent_obj = self.object_mut(parent)?;
        let index_a = parent_obj
            .children
            .iter()
            .position(|&c| c == a)
            .ok_or(Error::NotAChild { parent, child: a })?;
        let index_b = parent_obj
            .children
            .iter()
            .position(|&c| c == b)
            .ok_or(Error::NotAChild { parent, child: b })?;
        if index_a == index_b {
            return Ok(());
        }
        parent_obj.children.swap(index_a, index_b);
        self.mark_dirty_up(parent);
        Ok(())
    }

    pub fn get_child_index(&self, parent: DisplayId, child: DisplayId) -> Option<usize> {
        self.get(parent)?.children.iter().position(|&c| c == child)
    }

    pub fn get_child_at(&self, parent: DisplayId, index: usize) -> Option<DisplayId> {
        self.get(parent)?.children.get(index).copied()
    }

    pub fn num_children(&self, parent: DisplayId) -> usize {
        self.get(parent).map(|o| o.children.len()).unwrap_or(0)
    }

    /// True if `id` is `container` itself or one of its descendants.
    pub fn contains(&self, container: DisplayId, id: DisplayId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == container {
                return true;
            }
            current = self.get(cur).and_then(|o| o.parent);
        }
        false
    }

    fn attach_to_stage(&mut self, id: DisplayId, nest_level: u32) {
        let children = match self.get_mut(id) {
            Some(obj) => {
                obj.on_stage = true;
                obj.nest_level = nest_level;
                obj.children.clone()
            }
            None => return,
        };
        self.events.push(StageEvent::AddedToStage(id));
        self.refresh_mask_owner(id);
        for child in children {
            self.attach_to_stage(child, nest_level + 1);
        }
    }

    fn detach_from_stage(&mut self, id: DisplayId) {
        let children = match self.get_mut(id) {
            Some(obj) => {
                obj.on_stage = false;
                obj.nest_level = 0;
                obj.children.clone()
            }
            None => return,
        };
        self.events.push(StageEvent::RemovedFromStage(id));
        self.refresh_mask_owner(id);
        for child in children {
            self.detach_from_stage(child);
        }
    }

    /// A mask switches its owner to CLIP mode only while on stage.
    fn refresh_mask_owner(&mut self, id: DisplayId) {
        if let Some(masked) = self.get(id).and_then(|o| o.masked_object) {
            self.update_render_mode(masked);
        }
    }

    /// Drain stage notifications queued by tree mutations.
    pub fn take_events(&mut self) -> Vec<StageEvent> {
        std::mem::take(&mut self.events)
    }

    // ----- invalidation -----

    /// Set the cache flag on `start` and its ancestors, stopping at the
    /// first one already dirty.
    pub(crate) fn mark_dirty_up(&mut self, start: DisplayId) {
        let mut current = Some(start);
        while let Some(id) = current {
            let Some(obj) = self.get_mut(id) else {
                return;
            };
            if obj.flags.contains(DirtyFlags::CACHE) {
                return;
            }
            obj.flags.insert(DirtyFlags::CACHE);
            current = obj.parent;
            self.cache_dirty_marks += 1;
        }
    }

    /// A property of `id` changed: its parent and the object it masks must
    /// redraw.
    pub(crate) fn notify_changed(&mut self, id: DisplayId) {
        let (parent, masked) = match self.get(id) {
            Some(obj) => (obj.parent, obj.masked_object),
            None => return,
        };
        if let Some(parent) = parent {
            self.mark_dirty_up(parent);
        }
        if let Some(masked) = masked {
            self.mark_dirty_up(masked);
        }
    }

    /// The content of `id` changed: its render node is stale.
    pub(crate) fn mark_render_dirty(&mut self, id: DisplayId) {
        if let Some(obj) = self.get_mut(id) {
            obj.flags.insert(DirtyFlags::RENDER);
        }
        self.notify_changed(id);
    }

    #[cfg(test)]
    pub(crate) fn clear_all_cache_dirty(&mut self) {
        for obj in self.dense.iter_mut() {
            obj.flags.remove(DirtyFlags::CACHE);
        }
    }

    pub(crate) fn clear_cache_dirty(&mut self, id: DisplayId) {
        if let Some(obj) = self.get_mut(id) {
            obj.flags.remove(DirtyFlags::CACHE);
        }
    }

    /// Current render node of `id`, regenerated first if its content
    /// changed since the last call.
    pub fn get_render_node(&mut self, id: DisplayId) -> Option<&RenderNode> {
        self.refresh_render_node(id);
        self.get(id)?.render_node.as_ref()
    }

    /// Regenerate the render node of `id` if its content is stale.
    /// Returns whether it was regenerated.
    pub(crate) fn refresh_render_node(&mut self, id: DisplayId) -> bool {
        let texture_scale_factor = self.config.texture_scale_factor;
        let Some(obj) = self.get_mut(id) else {
            return false;
        };
        if !obj.flags.contains(DirtyFlags::RENDER) {
            return false;
        }
        if let Some(node) = obj.render_node.as_mut() {
            node.clean_before_render();
        }
        let params = NodeParams {
            explicit_width: obj.explicit_width,
            explicit_height: obj.explicit_height,
            texture_scale_factor,
            cache_key: obj.hash_code,
        };
        obj.kind.update_render_node(&mut obj.render_node, &params);
        obj.flags.remove(DirtyFlags::RENDER);
        true
    }

    // ----- content -----

    /// Replace what an object draws. Containers keep their children only
    /// while they stay containers.
    pub fn set_kind(&mut self, id: DisplayId, kind: DisplayKind) -> Result<()> {
        self.update_kind(id, |k| *k = kind)
    }

    /// Mutate an object's content in place.
    pub fn update_kind(&mut self, id: DisplayId, f: impl FnOnce(&mut DisplayKind)) -> Result<()> {
        let obj = self.object_mut(id)?;
        let old_bitmap = obj.kind.bitmap();
        f(&mut obj.kind);
        let new_bitmap = obj.kind.bitmap();
        let orphans = if obj.kind.is_container() {
            Vec::new()
        } else {
            obj.children.clone()
        };

        if old_bitmap != new_bitmap {
            if let Some(old) = old_bitmap {
                self.bitmaps.remove_dependent(old, id);
            }
            if let Some(new) = new_bitmap {
                self.bitmaps.add_dependent(new, id);
            }
        }
        for child in orphans {
            self.remove_child(id, child)?;
        }
        self.mark_render_dirty(id);
        Ok(())
    }

    // ----- bitmaps -----

    pub fn add_bitmap(&mut self, data: BitmapData) -> BitmapId {
        self.bitmaps.insert(data)
    }

    /// Replace the pixels of a bitmap and redraw everything using it.
    pub fn update_bitmap(&mut self, id: BitmapId, image: RgbaImage) {
        self.bitmaps.update_pixels(id, image);
        self.invalidate_bitmap(id);
    }

    /// Mark every object drawing `id` for regeneration.
    pub fn invalidate_bitmap(&mut self, id: BitmapId) {
        let dependents = self.bitmaps.dependents(id).to_vec();
        for object in dependents {
            self.mark_render_dirty(object);
        }
    }

    /// Drop a bitmap. Objects drawing it lose their texture and redraw.
    pub fn dispose_bitmap(&mut self, id: BitmapId) {
        let dependents = self.bitmaps.remove(id);
        for object in dependents {
            if let Some(obj) = self.get_mut(object) {
                match &mut obj.kind {
                    DisplayKind::Bitmap(content) => content.texture = None,
                    DisplayKind::Mesh(content) => content.texture = None,
                    _ => {}
                }
            }
            self.mark_render_dirty(object);
        }
    }

    // ----- frame callbacks -----

    pub fn on_enter_frame(&mut self, id: DisplayId, callback: FrameCallback) {
        self.enter_frame.entries.push((id, callback));
    }

    pub fn remove_enter_frame(&mut self, id: DisplayId) {
        self.enter_frame.remove(id);
    }

    pub fn on_render(&mut self, id: DisplayId, callback: FrameCallback) {
        self.render_callbacks.entries.push((id, callback));
    }

    pub fn remove_render_callback(&mut self, id: DisplayId) {
        self.render_callbacks.remove(id);
    }

    /// Run the enter-frame callbacks, in registration order.
    pub fn dispatch_enter_frame(&mut self) {
        let list = std::mem::take(&mut self.enter_frame);
        self.enter_frame = self.dispatch(list, |s| &mut s.enter_frame);
    }

    /// Run the render callbacks, in registration order.
    pub fn dispatch_render(&mut self) {
        let list = std::mem::take(&mut self.render_callbacks);
        self.render_callbacks = self.dispatch(list, |s| &mut s.render_callbacks);
    }

    fn dispatch(
        &mut self,
        mut list: CallbackList,
        slot: impl Fn(&mut Scene) -> &mut CallbackList,
    ) -> CallbackList {
        slot(self).dispatching = true;
        for (id, callback) in list.entries.iter_mut() {
            if self.contains_id(*id) && !slot(self).pending_removals.contains(id) {
                callback(self, *id);
            }
        }
        let added = std::mem::take(slot(self));
        list.entries.extend(added.entries);
        for id in added.pending_removals {
            list.entries.retain(|(target, _)| *target != id);
        }
        list
    }
}

impl CallbackList {
    fn remove(&mut self, id: DisplayId) {
        self.entries.retain(|(target, _)| *target != id);
        if self.dispatching {
            self.pending_removals.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn scene() -> Scene {
        Scene::new(StageConfig::default())
    }

    #[test]
    fn test_generational_ids() {
        let mut scene = scene();
        let a = scene.create(DisplayKind::container());
        scene.dispose(a);
        let b = scene.create(DisplayKind::container());

        assert!(!scene.contains_id(a));
        assert!(scene.contains_id(b));
        assert_eq!(a.index, b.index);
        assert_ne!(a.generation, b.generation);
    }

    #[test]
    fn test_add_child_sets_stage_and_nest_level() {
        let mut scene = scene();
        let stage = scene.stage();
        let parent = scene.create(DisplayKind::container());
        let child = scene.create(DisplayKind::container());
        scene.add_child(parent, child).unwrap();
        assert!(!scene.object(child).unwrap().is_on_stage());

        scene.add_child(stage, parent).unwrap();
        assert_eq!(scene.object(parent).unwrap().nest_level(), 2);
        assert_eq!(scene.object(child).unwrap().nest_level(), 3);
        assert!(scene.object(child).unwrap().is_on_stage());

        let events = scene.take_events();
        assert!(events.contains(&StageEvent::AddedToStage(child)));

        scene.remove_child(stage, parent).unwrap();
        assert!(!scene.object(child).unwrap().is_on_stage());
        assert!(scene
            .take_events()
            .contains(&StageEvent::RemovedFromStage(child)));
    }

    #[test]
    fn test_reparent_moves_child() {
        let mut scene = scene();
        let a = scene.create(DisplayKind::container());
        let b = scene.create(DisplayKind::container());
        let child = scene.create(DisplayKind::container());
        scene.add_child(a, child).unwrap();
        scene.add_child(b, child).unwrap();

        assert_eq!(scene.num_children(a), 0);
        assert_eq!(scene.object(child).unwrap().parent(), Some(b));
    }

    #[test]
    fn test_child_order_operations() {
        let mut scene = scene();
        let parent = scene.create(DisplayKind::container());
        let ids: Vec<_> = (0..3)
            .map(|_| scene.create(DisplayKind::container()))
            .collect();
        for &id in &ids {
            scene.add_child(parent, id).unwrap();
        }
        let extra = scene.create(DisplayKind::container());
        scene.add_child_at(parent, extra, 0).unwrap();
        assert_eq!(scene.get_child_at(parent, 0), Some(extra));

        scene.set_child_index(parent, extra, 99).unwrap();
        assert_eq!(scene.get_child_index(parent, extra), Some(3));

        scene.swap_children(parent, ids[0], extra).unwrap();
        assert_eq!(scene.get_child_at(parent, 0), Some(extra));
        assert_eq!(scene.get_child_at(parent, 3), Some(ids[0]));

        scene.remove_children(parent).unwrap();
        assert_eq!(scene.num_children(parent), 0);
    }

    #[test]
    fn test_leaf_cannot_hold_children() {
        let mut scene = scene();
        let leaf = scene.create(DisplayKind::Graphics(Default::default()));
        let child = scene.create(DisplayKind::container());
        assert!(matches!(
            scene.add_child(leaf, child),
            Err(Error::NotAContainer(_))
        ));
    }

    #[test]
    fn test_contains_descendant() {
        let mut scene = scene();
        let stage = scene.stage();
        let a = scene.create(DisplayKind::container());
        let b = scene.create(DisplayKind::container());
        scene.add_child(stage, a).unwrap();
        scene.add_child(a, b).unwrap();
        assert!(scene.contains(stage, b));
        assert!(scene.contains(a, a));
        assert!(!scene.contains(b, a));
    }

    #[test]
    fn test_dispose_removes_subtree() {
        let mut scene = scene();
        let stage = scene.stage();
        let a = scene.create(DisplayKind::container());
        let b = scene.create(DisplayKind::container());
        scene.add_child(stage, a).unwrap();
        scene.add_child(a, b).unwrap();

        scene.dispose(a);
        assert!(!scene.contains_id(a));
        assert!(!scene.contains_id(b));
        assert_eq!(scene.num_children(stage), 0);
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_enter_frame_callbacks() {
        let mut scene = scene();
        let id = scene.create(DisplayKind::container());
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        scene.on_enter_frame(
            id,
            Box::new(move |scene, target| {
                counter.set(counter.get() + 1);
                scene.remove_enter_frame(target);
            }),
        );

        scene.dispatch_enter_frame();
        scene.dispatch_enter_frame();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_render_node_is_memoized() {
        let mut scene = scene();
        let id = scene.create(DisplayKind::Graphics(Default::default()));
        scene
            .update_kind(id, |kind| {
                if let DisplayKind::Graphics(g) = kind {
                    g.paths.push(crate::nodes::GraphicsPath::fill_rect(
                        crate::geom::Rectangle::new(0.0, 0.0, 10.0, 10.0),
                        0xFF0000,
                        1.0,
                    ));
                }
            })
            .unwrap();

        assert_eq!(scene.get_render_node(id).map(|n| n.render_count()), Some(1));
        assert!(!scene.object(id).unwrap().is_render_dirty());
        // A second read must not append the path again.
        assert_eq!(scene.get_render_node(id).map(|n| n.render_count()), Some(1));
    }
}
