use crate::geom::{Point, Rectangle};

#[derive(Clone, Debug, PartialEq)]
pub enum PathShape {
    Rect(Rectangle),
    /// Ellipse inscribed in the rectangle.
    Ellipse(Rectangle),
    /// Closed polygon.
    Polygon(Vec<Point>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FillStyle {
    /// 0xRRGGBB
    pub color: u32,
    pub alpha: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub thickness: f32,
    /// 0xRRGGBB
    pub color: u32,
    pub alpha: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphicsPath {
    pub shape: PathShape,
    pub fill: Option<FillStyle>,
    pub stroke: Option<StrokeStyle>,
}

impl GraphicsPath {
    pub fn fill_rect(rect: Rectangle, color: u32, alpha: f32) -> Self {
        Self {
            shape: PathShape::Rect(rect),
            fill: Some(FillStyle { color, alpha }),
            stroke: None,
        }
    }

    pub fn fill_ellipse(rect: Rectangle, color: u32, alpha: f32) -> Self {
        Self {
            shape: PathShape::Ellipse(rect),
            fill: Some(FillStyle { color, alpha }),
            stroke: None,
        }
    }

    /// Area covered by the path, including half the stroke width.
    pub fn bounds(&self) -> Rectangle {
        let mut bounds = match &self.shape {
            PathShape::Rect(r) | PathShape::Ellipse(r) => *r,
            PathShape::Polygon(points) => {
                let mut iter = points.iter();
                let Some(first) = iter.next() else {
                    return Rectangle::EMPTY;
                };
                let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
                for p in iter {
                    min_x = min_x.min(p.x);
                    min_y = min_y.min(p.y);
                    max_x = max_x.max(p.x);
                    max_y = max_y.max(p.y);
                }
                Rectangle::from_extents(min_x, min_y, max_x, max_y)
            }
        };
        if let Some(stroke) = &self.stroke {
            let half = stroke.thickness / 2.0;
            bounds.inflate(half, half);
        }
        bounds
    }
}

/// Vector paths, rasterized by the renderer when `dirty_render` is set.
#[derive(Clone, Debug)]
pub struct GraphicsNode {
    pub paths: Vec<GraphicsPath>,
    /// Identity used by renderers to cache the rasterized result.
    pub cache_key: u64,
    pub dirty_render: bool,
    pub(crate) render_count: usize,
}

impl GraphicsNode {
    pub fn new(cache_key: u64) -> Self {
        Self {
            paths: Vec::new(),
            cache_key,
            dirty_render: true,
            render_count: 0,
        }
    }

    pub fn draw_path(&mut self, path: GraphicsPath) {
        self.paths.push(path);
        self.render_count += 1;
        self.dirty_render = true;
    }

    /// Union of all path bounds.
    pub fn bounds(&self) -> Rectangle {
        self.paths
            .iter()
            .fold(Rectangle::EMPTY, |acc, p| acc.union(&p.bounds()))
    }

    pub fn clean_before_render(&mut self) {
        self.paths.clear();
        self.render_count = 0;
        self.dirty_render = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stroke_inflates_bounds() {
        let path = GraphicsPath {
            shape: PathShape::Rect(Rectangle::new(0.0, 0.0, 10.0, 10.0)),
            fill: None,
            stroke: Some(StrokeStyle {
                thickness: 4.0,
                color: 0,
                alpha: 1.0,
            }),
        };
        assert_eq!(path.bounds(), Rectangle::new(-2.0, -2.0, 14.0, 14.0));
    }

    #[test]
    fn test_polygon_bounds() {
        let path = GraphicsPath {
            shape: PathShape::Polygon(vec![
                Point::new(5.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ]),
            fill: Some(FillStyle {
                color: 0xFF0000,
                alpha: 1.0,
            }),
            stroke: None,
        };
        assert_eq!(path.bounds(), Rectangle::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_node_bounds_union() {
        let mut node = GraphicsNode::new(1);
        node.draw_path(GraphicsPath::fill_rect(Rectangle::new(0.0, 0.0, 10.0, 10.0), 0, 1.0));
        node.draw_path(GraphicsPath::fill_ellipse(Rectangle::new(20.0, 5.0, 10.0, 10.0), 0, 1.0));
        assert_eq!(node.bounds(), Rectangle::new(0.0, 0.0, 30.0, 15.0));
        assert_eq!(node.render_count, 2);
    }
}
