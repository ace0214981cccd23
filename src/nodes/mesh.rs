use crate::bitmap_data::BitmapId;
use crate::display::BlendMode;
use crate::geom::{Matrix, Rectangle};

use super::bitmap::ImageDraw;

/// A textured triangle mesh.
///
/// `vertices` and `uvs` hold interleaved x/y pairs; `uvs` are normalized
/// over the source rectangle of each draw.
#[derive(Clone, Debug)]
pub struct MeshNode {
    pub image: Option<BitmapId>,
    pub smoothing: bool,
    pub image_width: f32,
    pub image_height: f32,
    pub matrix: Option<Matrix>,
    pub vertices: Vec<f32>,
    pub uvs: Vec<f32>,
    pub indices: Vec<u16>,
    pub bounds: Rectangle,
    pub blend_mode: Option<BlendMode>,
    pub alpha: Option<f32>,
    pub rotated: bool,
    pub draw_data: Vec<ImageDraw>,
    pub(crate) render_count: usize,
}

impl Default for MeshNode {
    fn default() -> Self {
        Self {
            image: None,
            smoothing: true,
            image_width: 0.0,
            image_height: 0.0,
            matrix: None,
            vertices: Vec::new(),
            uvs: Vec::new(),
            indices: Vec::new(),
            bounds: Rectangle::EMPTY,
            blend_mode: None,
            alpha: None,
            rotated: false,
            draw_data: Vec::new(),
            render_count: 0,
        }
    }
}

impl MeshNode {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_mesh(
        &mut self,
        source_x: f32,
        source_y: f32,
        source_w: f32,
        source_h: f32,
        draw_x: f32,
        draw_y: f32,
        draw_w: f32,
        draw_h: f32,
    ) {
        self.draw_data.push(ImageDraw {
            source: Rectangle::new(source_x, source_y, source_w, source_h),
            dest: Rectangle::new(draw_x, draw_y, draw_w, draw_h),
        });
        self.render_count += 1;
    }

    /// Number of vertices described by `vertices`.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 2
    }

    /// Recompute `bounds` from the vertex positions.
    pub fn update_bounds(&mut self) {
        self.bounds = vertex_bounds(&self.vertices);
    }

    pub fn clean_before_render(&mut self) {
        self.draw_data.clear();
        self.render_count = 0;
        self.image = None;
        self.matrix = None;
    }
}

/// Axis-aligned box around interleaved `x, y` vertex pairs.
pub fn vertex_bounds(vertices: &[f32]) -> Rectangle {
    let mut points = vertices.chunks_exact(2);
    let Some(first) = points.next() else {
        return Rectangle::EMPTY;
    };
    let (mut min_x, mut min_y) = (first[0], first[1]);
    let (mut max_x, mut max_y) = (first[0], first[1]);
    for p in points {
        min_x = min_x.min(p[0]);
        max_x = max_x.max(p[0]);
        min_y = min_y.min(p[1]);
        max_y = max_y.max(p[1]);
    }
    Rectangle::from_extents(min_x, min_y, max_x, max_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_from_vertices() {
        let mut mesh = MeshNode::new();
        mesh.vertices = vec![0.0, 0.0, 50.0, -10.0, 20.0, 30.0];
        mesh.update_bounds();
        assert_eq!(mesh.bounds, Rectangle::new(0.0, -10.0, 50.0, 40.0));
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn test_clean_keeps_geometry() {
        let mut mesh = MeshNode::new();
        mesh.vertices = vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0];
        mesh.draw_mesh(0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0);
        mesh.clean_before_render();
        assert_eq!(mesh.render_count, 0);
        assert!(mesh.draw_data.is_empty());
        assert_eq!(mesh.vertices.len(), 6);
    }
}
