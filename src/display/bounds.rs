use crate::error::Result;
use crate::filters::FilterOffset;
use crate::geom::Rectangle;

use super::kind::Renderable;
use super::transform::local_matrix;
use super::{DisplayId, Scene};

impl Scene {
    /// Area covered by the object's own content, in content space.
    pub fn get_content_bounds(&self, id: DisplayId) -> Result<Rectangle> {
        let obj = self.object(id)?;
        Ok(obj
            .kind
            .measure_content_bounds(obj.explicit_width, obj.explicit_height))
    }

    /// Content plus children, grown by the padding of the object's filters.
    pub fn get_original_bounds(&mut self, id: DisplayId) -> Result<Rectangle> {
        let content = self.get_content_bounds(id)?;
        let mut bounds = self.measure_child_bounds(id, content)?;

        let offset = FilterOffset::measure(&self.object(id)?.filters);
        if !offset.is_zero() {
            bounds.x += offset.min_x;
            bounds.y += offset.min_y;
            bounds.width += -offset.min_x + offset.max_x;
            bounds.height += -offset.min_y + offset.max_y;
        }
        Ok(bounds)
    }

    /// Union of `bounds` with every child's bounds in this object's space.
    /// Empty rectangles do not contribute.
    fn measure_child_bounds(&mut self, id: DisplayId, bounds: Rectangle) -> Result<Rectangle> {
        let children = self.object(id)?.children.clone();
        let mut result = bounds;
        for child in children {
            let mut child_bounds = self.get_bounds(child, true)?;
            let matrix = local_matrix(self.object_mut(child)?);
            matrix.transform_bounds(&mut child_bounds);
            result = result.union(&child_bounds);
        }
        Ok(result)
    }

    /// Original bounds, shifted by the anchor offset when
    /// `calculate_anchor` is set.
    pub fn get_bounds(&mut self, id: DisplayId, calculate_anchor: bool) -> Result<Rectangle> {
        let mut bounds = self.get_original_bounds(id)?;
        if calculate_anchor {
            let obj = self.object(id)?;
            bounds.x -= obj.anchor_offset_x;
            bounds.y -= obj.anchor_offset_y;
        }
        Ok(bounds)
    }

    /// Bounds of `id` expressed in the space of `target`, or in stage space
    /// when `target` is `None`.
    pub fn get_transformed_bounds(&mut self, id: DisplayId, target: Option<DisplayId>) -> Result<Rectangle> {
        let mut bounds = self.get_original_bounds(id)?;
        if target == Some(id) {
            return Ok(bounds);
        }
        let concatenated = self.get_concatenated_matrix(id)?;
        let matrix = match target {
            Some(target) => self
                .get_inverted_concatenated_matrix(target)?
                .pre_multiply(&concatenated),
            None => concatenated,
        };
        matrix.transform_bounds(&mut bounds);
        Ok(bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageConfig;
    use crate::display::{DisplayKind, GraphicsContent};
    use crate::filters::{BlurFilter, Filter};
    use crate::nodes::GraphicsPath;

    fn rect_shape(scene: &mut Scene, w: f32, h: f32) -> DisplayId {
        let mut content = GraphicsContent::new();
        content
            .paths
            .push(GraphicsPath::fill_rect(Rectangle::new(0.0, 0.0, w, h), 0x00FF00, 1.0));
        scene.create(DisplayKind::Graphics(content))
    }

    #[test]
    fn test_container_folds_child_bounds() {
        let mut scene = Scene::new(StageConfig::default());
        let container = scene.create(DisplayKind::container());
        let a = rect_shape(&mut scene, 10.0, 10.0);
        let b = rect_shape(&mut scene, 10.0, 10.0);
        scene.add_child(container, a).unwrap();
        scene.add_child(container, b).unwrap();
        scene.set_x(b, 30.0).unwrap();
        scene.set_y(b, 20.0).unwrap();

        assert_eq!(
            scene.get_original_bounds(container).unwrap(),
            Rectangle::new(0.0, 0.0, 40.0, 30.0)
        );
        assert_eq!(scene.width(container).unwrap(), 40.0);
    }

    #[test]
    fn test_child_anchor_and_scale() {
        let mut scene = Scene::new(StageConfig::default());
        let container = scene.create(DisplayKind::container());
        let child = rect_shape(&mut scene, 10.0, 10.0);
        scene.add_child(container, child).unwrap();
        scene.set_anchor_offset_x(child, 5.0).unwrap();
        scene.set_scale_y(child, 2.0).unwrap();

        assert_eq!(
            scene.get_original_bounds(container).unwrap(),
            Rectangle::new(-5.0, 0.0, 10.0, 20.0)
        );
    }

    #[test]
    fn test_filter_padding_expands_bounds() {
        let mut scene = Scene::new(StageConfig::default());
        let shape = rect_shape(&mut scene, 10.0, 10.0);
        scene
            .set_filters(shape, vec![Filter::Blur(BlurFilter {
                blur_x: 4.0,
                blur_y: 2.0,
                quality: 1,
            })])
            .unwrap();
        assert_eq!(
            scene.get_original_bounds(shape).unwrap(),
            Rectangle::new(-4.0, -2.0, 18.0, 14.0)
        );
    }

    #[test]
    fn test_transformed_bounds_in_stage_space() {
        let mut scene = Scene::new(StageConfig::default());
        let stage = scene.stage();
        let parent = scene.create(DisplayKind::container());
        let shape = rect_shape(&mut scene, 10.0, 20.0);
        scene.add_child(stage, parent).unwrap();
        scene.add_child(parent, shape).unwrap();
        scene.set_x(parent, 100.0).unwrap();
        scene.set_rotation(shape, 90.0).unwrap();

        assert_eq!(
            scene.get_transformed_bounds(shape, None).unwrap(),
            Rectangle::new(80.0, 0.0, 20.0, 10.0)
        );
        assert_eq!(
            scene.get_transformed_bounds(shape, Some(parent)).unwrap(),
            Rectangle::new(-20.0, 0.0, 20.0, 10.0)
        );
    }
}
