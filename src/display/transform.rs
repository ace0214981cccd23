//! Local transform properties and the matrices derived from them.
//!
//! Scale, rotation and skew are the source of truth; the local matrix is
//! rebuilt from them lazily. Translation is copied into the matrix on
//! every read.

use crate::error::Result;
use crate::geom::{Matrix, Point};
use crate::math::{clamp_rotation, DEG_TO_RAD, RAD_TO_DEG};

use super::{DirtyFlags, DisplayId, DisplayObject, Scene};

impl Scene {
    /// Apply `f` and, when it reports a change, tell the parent chain and
    /// the masked object.
    fn change(&mut self, id: DisplayId, f: impl FnOnce(&mut DisplayObject) -> bool) -> Result<bool> {
        let changed = f(self.object_mut(id)?);
        if changed {
            self.notify_changed(id);
        }
        Ok(changed)
    }

    pub fn set_x(&mut self, id: DisplayId, value: f32) -> Result<bool> {
        self.change(id, |obj| {
            if obj.x == value {
                return false;
            }
            obj.x = value;
            true
        })
    }

    pub fn set_y(&mut self, id: DisplayId, value: f32) -> Result<bool> {
        self.change(id, |obj| {
            if obj.y == value {
                return false;
            }
            obj.y = value;
            true
        })
    }

    pub fn set_scale_x(&mut self, id: DisplayId, value: f32) -> Result<bool> {
        self.change(id, |obj| {
            if obj.scale_x == value {
                return false;
            }
            obj.scale_x = value;
            obj.flags.insert(DirtyFlags::MATRIX);
            obj.update_use_translate();
            true
        })
    }

    pub fn set_scale_y(&mut self, id: DisplayId, value: f32) -> Result<bool> {
        self.change(id, |obj| {
            if obj.scale_y == value {
                return false;
            }
            obj.scale_y = value;
            obj.flags.insert(DirtyFlags::MATRIX);
            obj.update_use_translate();
            true
        })
    }

    /// Set rotation in degrees. The value is wrapped into (-180, 180].
    pub fn set_rotation(&mut self, id: DisplayId, value: f32) -> Result<bool> {
        let value = clamp_rotation(value);
        self.change(id, |obj| {
            if obj.rotation == value {
                return false;
            }
            let angle = (value - obj.rotation) * DEG_TO_RAD;
            obj.skew_x += angle;
            obj.skew_y += angle;
            obj.rotation = value;
            obj.flags.insert(DirtyFlags::MATRIX);
            obj.update_use_translate();
            true
        })
    }

    /// Set horizontal skew in degrees.
    pub fn set_skew_x(&mut self, id: DisplayId, value: f32) -> Result<bool> {
        self.change(id, |obj| {
            if obj.skew_x_deg == value {
                return false;
            }
            obj.skew_x_deg = value;
            obj.skew_x = (clamp_rotation(value) + obj.rotation) * DEG_TO_RAD;
            obj.flags.insert(DirtyFlags::MATRIX);
            obj.update_use_translate();
            true
        })
    }

    /// Set vertical skew in degrees.
    pub fn set_skew_y(&mut self, id: DisplayId, value: f32) -> Result<bool> {
        self.change(id, |obj| {
            if obj.skew_y_deg == value {
                return false;
            }
            obj.skew_y_deg = value;
            obj.skew_y = (clamp_rotation(value) + obj.rotation) * DEG_TO_RAD;
            obj.flags.insert(DirtyFlags::MATRIX);
            obj.update_use_translate();
            true
        })
    }

    pub fn set_anchor_offset_x(&mut self, id: DisplayId, value: f32) -> Result<bool> {
        self.change(id, |obj| {
            if obj.anchor_offset_x == value {
                return false;
            }
            obj.anchor_offset_x = value;
            true
        })
    }

    pub fn set_anchor_offset_y(&mut self, id: DisplayId, value: f32) -> Result<bool> {
        self.change(id, |obj| {
            if obj.anchor_offset_y == value {
                return false;
            }
            obj.anchor_offset_y = value;
            true
        })
    }

    /// Override the measured width. NaN restores automatic sizing.
    pub fn set_width(&mut self, id: DisplayId, value: f32) -> Result<bool> {
        let changed = {
            let obj = self.object_mut(id)?;
            let same = obj.explicit_width == value || (obj.explicit_width.is_nan() && value.is_nan());
            if !same {
                obj.explicit_width = value;
            }
            !same
        };
        if changed {
            self.mark_render_dirty(id);
        }
        Ok(changed)
    }

    /// Override the measured height. NaN restores automatic sizing.
    pub fn set_height(&mut self, id: DisplayId, value: f32) -> Result<bool> {
        let changed = {
            let obj = self.object_mut(id)?;
            let same =
                obj.explicit_height == value || (obj.explicit_height.is_nan() && value.is_nan());
            if !same {
                obj.explicit_height = value;
            }
            !same
        };
        if changed {
            self.mark_render_dirty(id);
        }
        Ok(changed)
    }

    /// Explicit width if set, otherwise the measured width.
    pub fn width(&mut self, id: DisplayId) -> Result<f32> {
        let explicit = self.object(id)?.explicit_width;
        if explicit.is_nan() {
            Ok(self.get_original_bounds(id)?.width)
        } else {
            Ok(explicit)
        }
    }

    /// Explicit height if set, otherwise the measured height.
    pub fn height(&mut self, id: DisplayId) -> Result<f32> {
        let explicit = self.object(id)?.explicit_height;
        if explicit.is_nan() {
            Ok(self.get_original_bounds(id)?.height)
        } else {
            Ok(explicit)
        }
    }

    /// Local matrix, rebuilt from scale and skew if they changed.
    pub fn get_matrix(&mut self, id: DisplayId) -> Result<Matrix> {
        let obj = self.object_mut(id)?;
        Ok(local_matrix(obj))
    }

    /// Replace the local matrix.
    ///
    /// With `update_properties` the scale, rotation and skew are derived
    /// back from the matrix. Otherwise they keep their old values and the
    /// next change to one of them rebuilds the matrix from those.
    pub fn set_matrix(&mut self, id: DisplayId, matrix: &Matrix, update_properties: bool) -> Result<()> {
        self.change(id, |obj| {
            obj.matrix.a = matrix.a;
            obj.matrix.b = matrix.b;
            obj.matrix.c = matrix.c;
            obj.matrix.d = matrix.d;
            obj.x = matrix.tx;
            obj.y = matrix.ty;
            obj.flags.remove(DirtyFlags::MATRIX);
            obj.use_translate = !(matrix.a == 1.0 && matrix.b == 0.0 && matrix.c == 0.0 && matrix.d == 1.0);
            if update_properties {
                obj.scale_x = matrix.scale_x();
                obj.scale_y = matrix.scale_y();
                obj.skew_x = matrix.skew_x();
                obj.skew_y = matrix.skew_y();
                obj.rotation = clamp_rotation(obj.skew_y * RAD_TO_DEG);
                obj.skew_x_deg = clamp_rotation(obj.skew_x * RAD_TO_DEG - obj.rotation);
                obj.skew_y_deg = 0.0;
            }
            true
        })?;
        Ok(())
    }

    /// Matrix from local space (after anchor and scroll offset) to stage
    /// space. Recomputed from the ancestors on every call.
    pub fn get_concatenated_matrix(&mut self, id: DisplayId) -> Result<Matrix> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            chain.push(cur);
            current = self.object(cur)?.parent;
        }

        let mut matrix = Matrix::IDENTITY;
        for &cur in chain.iter().rev() {
            let obj = self.object_mut(cur)?;
            matrix = matrix.pre_multiply(&local_matrix(obj));
            matrix = matrix.pre_multiply(&content_offset(obj));
        }
        Ok(matrix)
    }

    pub fn get_inverted_concatenated_matrix(&mut self, id: DisplayId) -> Result<Matrix> {
        Ok(self.get_concatenated_matrix(id)?.inverted())
    }

    /// Convert a stage point into the local space of `id`.
    pub fn global_to_local(&mut self, id: DisplayId, stage_x: f32, stage_y: f32) -> Result<Point> {
        Ok(self
            .get_inverted_concatenated_matrix(id)?
            .transform_point(stage_x, stage_y))
    }

    /// Convert a local point of `id` into stage space.
    pub fn local_to_global(&mut self, id: DisplayId, local_x: f32, local_y: f32) -> Result<Point> {
        Ok(self
            .get_concatenated_matrix(id)?
            .transform_point(local_x, local_y))
    }
}

/// Rebuild the matrix if needed and copy the translation in.
pub(crate) fn local_matrix(obj: &mut DisplayObject) -> Matrix {
    if obj.flags.contains(DirtyFlags::MATRIX) {
        obj.flags.remove(DirtyFlags::MATRIX);
        obj.matrix
            .update_scale_and_rotation(obj.scale_x, obj.scale_y, obj.skew_x, obj.skew_y);
    }
    obj.matrix.tx = obj.x;
    obj.matrix.ty = obj.y;
    obj.matrix
}

/// Translation from content space into the object's local space: the
/// scroll origin and the anchor offset.
pub(crate) fn content_offset(obj: &DisplayObject) -> Matrix {
    match obj.scroll_rect {
        Some(rect) => Matrix::translation(-rect.x - obj.anchor_offset_x, -rect.y - obj.anchor_offset_y),
        None => Matrix::translation(-obj.anchor_offset_x, -obj.anchor_offset_y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageConfig;
    use crate::display::DisplayKind;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn matrix_approx_eq(m1: &Matrix, m2: &Matrix) -> bool {
        approx_eq(m1.a, m2.a)
            && approx_eq(m1.b, m2.b)
            && approx_eq(m1.c, m2.c)
            && approx_eq(m1.d, m2.d)
            && approx_eq(m1.tx, m2.tx)
            && approx_eq(m1.ty, m2.ty)
    }

    fn scene_with_chain(depth: usize) -> (Scene, Vec<DisplayId>) {
        let mut scene = Scene::new(StageConfig::default());
        let mut ids = Vec::new();
        let mut parent = scene.stage();
        for _ in 0..depth {
            let id = scene.create(DisplayKind::container());
            scene.add_child(parent, id).unwrap();
            ids.push(id);
            parent = id;
        }
        (scene, ids)
    }

    #[test]
    fn test_concatenated_translation_chain() {
        let (mut scene, ids) = scene_with_chain(3);
        let offsets = [(10.0, 0.0), (0.0, 10.0), (5.0, 5.0)];
        for (&id, &(x, y)) in ids.iter().zip(offsets.iter()) {
            scene.set_x(id, x).unwrap();
            scene.set_y(id, y).unwrap();
        }
        let m = scene.get_concatenated_matrix(ids[2]).unwrap();
        assert!(approx_eq(m.tx, 15.0));
        assert!(approx_eq(m.ty, 15.0));
        assert!(approx_eq(m.a, 1.0) && approx_eq(m.d, 1.0));
    }

    #[test]
    fn test_matrix_matches_direct_construction() {
        let (mut scene, ids) = scene_with_chain(1);
        let id = ids[0];
        scene.set_scale_x(id, 3.0).unwrap();
        scene.set_rotation(id, 45.0).unwrap();
        scene.set_skew_x(id, 10.0).unwrap();
        scene.set_rotation(id, 30.0).unwrap();
        scene.set_scale_x(id, 2.0).unwrap();
        scene.set_scale_y(id, 0.5).unwrap();
        scene.set_x(id, 7.0).unwrap();

        let mut expected = Matrix::IDENTITY;
        expected.update_scale_and_rotation(2.0, 0.5, 40.0 * DEG_TO_RAD, 30.0 * DEG_TO_RAD);
        expected.tx = 7.0;

        let actual = scene.get_matrix(id).unwrap();
        assert!(matrix_approx_eq(&actual, &expected), "{actual:?} != {expected:?}");
        assert!(scene.object(id).unwrap().use_translate());
    }

    #[test]
    fn test_rotation_is_clamped() {
        let (mut scene, ids) = scene_with_chain(1);
        scene.set_rotation(ids[0], 270.0).unwrap();
        assert_eq!(scene.object(ids[0]).unwrap().rotation(), -90.0);
        let m = scene.get_matrix(ids[0]).unwrap();
        assert!(matrix_approx_eq(&m, &Matrix::new(0.0, -1.0, 1.0, 0.0, 0.0, 0.0)));
    }

    #[test]
    fn test_identity_transform_keeps_translate_fast_path() {
        let (mut scene, ids) = scene_with_chain(1);
        scene.set_scale_x(ids[0], 2.0).unwrap();
        assert!(scene.object(ids[0]).unwrap().use_translate());
        scene.set_scale_x(ids[0], 1.0).unwrap();
        assert!(!scene.object(ids[0]).unwrap().use_translate());
    }

    #[test]
    fn test_dirty_marks_stop_at_dirty_ancestor() {
        let (mut scene, ids) = scene_with_chain(4);
        scene.clear_all_cache_dirty();
        let before = scene.cache_dirty_marks();

        scene.set_x(ids[3], 5.0).unwrap();
        // Three containers plus the stage above the leaf.
        assert_eq!(scene.cache_dirty_marks() - before, 4);
        for &id in &ids[..3] {
            assert!(scene.object(id).unwrap().is_cache_dirty());
        }
        assert!(scene.object(scene.stage()).unwrap().is_cache_dirty());

        scene.set_y(ids[3], 5.0).unwrap();
        scene.set_rotation(ids[2], 10.0).unwrap();
        assert_eq!(scene.cache_dirty_marks() - before, 4);
    }

    #[test]
    fn test_unchanged_value_is_a_no_op() {
        let (mut scene, ids) = scene_with_chain(1);
        scene.clear_all_cache_dirty();
        assert!(!scene.set_x(ids[0], 0.0).unwrap());
        assert!(!scene.object(scene.stage()).unwrap().is_cache_dirty());
    }

    #[test]
    fn test_anchor_and_scroll_offset_concatenated() {
        let (mut scene, ids) = scene_with_chain(1);
        let id = ids[0];
        scene.set_x(id, 100.0).unwrap();
        scene.set_anchor_offset_x(id, 10.0).unwrap();
        let p = scene.local_to_global(id, 0.0, 0.0).unwrap();
        assert!(approx_eq(p.x, 90.0));

        scene
            .set_scroll_rect(id, Some(crate::geom::Rectangle::new(20.0, 0.0, 50.0, 50.0)))
            .unwrap();
        let p = scene.local_to_global(id, 20.0, 0.0).unwrap();
        assert!(approx_eq(p.x, 90.0));

        let back = scene.global_to_local(id, 90.0, 0.0).unwrap();
        assert!(approx_eq(back.x, 20.0));
    }

    #[test]
    fn test_set_matrix_updates_properties() {
        let (mut scene, ids) = scene_with_chain(1);
        let id = ids[0];
        let mut m = Matrix::IDENTITY;
        m.update_scale_and_rotation(2.0, 3.0, 90.0 * DEG_TO_RAD, 90.0 * DEG_TO_RAD);
        m.tx = 4.0;
        m.ty = 5.0;
        scene.set_matrix(id, &m, true).unwrap();

        let obj = scene.object(id).unwrap();
        assert!(approx_eq(obj.x(), 4.0));
        assert!(approx_eq(obj.scale_x(), 2.0));
        assert!(approx_eq(obj.scale_y(), 3.0));
        assert!(approx_eq(obj.rotation(), 90.0));
        assert!(approx_eq(obj.skew_x(), 0.0));

        // Touching a property rebuilds the same matrix from the derived values.
        scene.set_x(id, 4.0).unwrap();
        scene.set_scale_x(id, 2.0001).unwrap();
        scene.set_scale_x(id, 2.0).unwrap();
        let rebuilt = scene.get_matrix(id).unwrap();
        assert!(matrix_approx_eq(&rebuilt, &m), "{rebuilt:?} != {m:?}");
    }
}
