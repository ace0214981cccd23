//! tiny-skia helpers shared by the canvas backend and the GPU backend's
//! vector path rasterization.

use image::RgbaImage;
use resvg::tiny_skia::{
    self, ColorU8, FillRule, Mask, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, Transform,
};

use crate::display::BlendMode;
use crate::error::{Error, Result};
use crate::geom::{Matrix, Rectangle};
use crate::nodes::{GraphicsNode, GraphicsPath, PathShape};

pub(crate) fn to_transform(m: &Matrix) -> Transform {
    Transform::from_row(m.a, m.b, m.c, m.d, m.tx, m.ty)
}

pub(crate) fn to_blend_mode(mode: BlendMode) -> tiny_skia::BlendMode {
    match mode {
        BlendMode::Normal => tiny_skia::BlendMode::SourceOver,
        BlendMode::Add => tiny_skia::BlendMode::Plus,
        BlendMode::Erase => tiny_skia::BlendMode::DestinationOut,
        BlendMode::DestinationIn => tiny_skia::BlendMode::DestinationIn,
    }
}

/// Copy straight-alpha pixels into a premultiplied pixmap.
pub(crate) fn premultiplied_pixmap(image: &RgbaImage) -> Result<Pixmap> {
    let (width, height) = image.dimensions();
    let mut pixmap = Pixmap::new(width.max(1), height.max(1)).ok_or(Error::ResourceExhausted { width, height })?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Maps bitmap pixels of `source` onto `dest` in local space. Rotated
/// sources are stored turned a quarter clockwise in the atlas, with their
/// width and height swapped.
pub(crate) fn image_transform(source: &Rectangle, dest: &Rectangle, rotated: bool) -> Matrix {
    let sx = dest.width / source.width;
    let sy = dest.height / source.height;
    if rotated {
        Matrix::new(
            0.0,
            -sy,
            sx,
            0.0,
            dest.x - source.y * sx,
            dest.y + (source.x + source.height) * sy,
        )
    } else {
        Matrix::new(sx, 0.0, 0.0, sy, dest.x - source.x * sx, dest.y - source.y * sy)
    }
}

/// The affine map taking triangle `from` onto triangle `to`, or `None`
/// for a degenerate `from`.
pub(crate) fn triangle_transform(from: [(f32, f32); 3], to: [(f32, f32); 3]) -> Option<Matrix> {
    let [(u0, v0), (u1, v1), (u2, v2)] = from;
    let [(x0, y0), (x1, y1), (x2, y2)] = to;

    let (du1, dv1, du2, dv2) = (u1 - u0, v1 - v0, u2 - u0, v2 - v0);
    let det = du1 * dv2 - du2 * dv1;
    if det.abs() < f32::EPSILON {
        return None;
    }
    let (dx1, dy1, dx2, dy2) = (x1 - x0, y1 - y0, x2 - x0, y2 - y0);

    let a = (dx1 * dv2 - dx2 * dv1) / det;
    let c = (dx2 * du1 - dx1 * du2) / det;
    let b = (dy1 * dv2 - dy2 * dv1) / det;
    let d = (dy2 * du1 - dy1 * du2) / det;
    Some(Matrix::new(a, b, c, d, x0 - a * u0 - c * v0, y0 - b * u0 - d * v0))
}

pub(crate) fn triangle_path(points: [(f32, f32); 3]) -> Option<Path> {
    let mut pb = PathBuilder::new();
    pb.move_to(points[0].0, points[0].1);
    pb.line_to(points[1].0, points[1].1);
    pb.line_to(points[2].0, points[2].1);
    pb.close();
    pb.finish()
}

fn shape_path(shape: &PathShape) -> Option<Path> {
    match shape {
        PathShape::Rect(r) => Rect::from_xywh(r.x, r.y, r.width, r.height).map(PathBuilder::from_rect),
        PathShape::Ellipse(r) => Rect::from_xywh(r.x, r.y, r.width, r.height).and_then(PathBuilder::from_oval),
        PathShape::Polygon(points) => {
            let (first, rest) = points.split_first()?;
            let mut pb = PathBuilder::new();
            pb.move_to(first.x, first.y);
            for p in rest {
                pb.line_to(p.x, p.y);
            }
            pb.close();
            pb.finish()
        }
    }
}

fn color_paint(color: u32, alpha: f32, blend_mode: tiny_skia::BlendMode) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(
        (color >> 16) as u8,
        (color >> 8) as u8,
        color as u8,
        (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
    );
    paint.blend_mode = blend_mode;
    paint.anti_alias = true;
    paint
}

/// Fill and stroke one path.
pub(crate) fn draw_graphics_path(
    pixmap: &mut Pixmap,
    path: &GraphicsPath,
    transform: Transform,
    alpha: f32,
    blend_mode: tiny_skia::BlendMode,
    mask: Option<&Mask>,
) {
    let Some(shape) = shape_path(&path.shape) else {
        return;
    };
    if let Some(fill) = &path.fill {
        let paint = color_paint(fill.color, fill.alpha * alpha, blend_mode);
        pixmap.fill_path(&shape, &paint, FillRule::Winding, transform, mask);
    }
    if let Some(stroke) = &path.stroke {
        if stroke.thickness > 0.0 {
            let paint = color_paint(stroke.color, stroke.alpha * alpha, blend_mode);
            let style = Stroke {
                width: stroke.thickness,
                ..Stroke::default()
            };
            pixmap.stroke_path(&shape, &paint, &style, transform, mask);
        }
    }
}

/// Rasterize a graphics node into its own pixmap. Returns the pixmap and
/// the local-space position of its top-left pixel, or `None` for empty
/// content.
pub(crate) fn rasterize_graphics(node: &GraphicsNode) -> Result<Option<(Pixmap, f32, f32)>> {
    let bounds = node.bounds();
    if bounds.is_empty() {
        return Ok(None);
    }
    let x = bounds.x.floor();
    let y = bounds.y.floor();
    let width = (bounds.right() - x).ceil().max(1.0) as u32;
    let height = (bounds.bottom() - y).ceil().max(1.0) as u32;
    let mut pixmap = Pixmap::new(width, height).ok_or(Error::ResourceExhausted { width, height })?;

    let transform = Transform::from_translate(-x, -y);
    for path in &node.paths {
        draw_graphics_path(&mut pixmap, path, transform, 1.0, tiny_skia::BlendMode::SourceOver, None);
    }
    Ok(Some((pixmap, x, y)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_image_transform_maps_source_corners() {
        let source = Rectangle::new(10.0, 20.0, 30.0, 40.0);
        let dest = Rectangle::new(0.0, 0.0, 60.0, 20.0);
        let m = image_transform(&source, &dest, false);
        let p = m.transform_point(40.0, 60.0);
        assert!(approx(p.x, 60.0) && approx(p.y, 20.0));
    }

    #[test]
    fn test_rotated_image_transform() {
        // The 30x40 region is stored as 40 wide and 30 tall.
        let source = Rectangle::new(0.0, 0.0, 30.0, 40.0);
        let dest = Rectangle::new(0.0, 0.0, 30.0, 40.0);
        let m = image_transform(&source, &dest, true);
        let top_left = m.transform_point(40.0, 0.0);
        let bottom_right = m.transform_point(0.0, 30.0);
        assert!(approx(top_left.x, 0.0) && approx(top_left.y, 0.0));
        assert!(approx(bottom_right.x, 30.0) && approx(bottom_right.y, 40.0));
    }

    #[test]
    fn test_triangle_transform() {
        let from = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
        let to = [(5.0, 5.0), (7.0, 5.0), (5.0, 8.0)];
        let m = triangle_transform(from, to).unwrap();
        let p = m.transform_point(1.0, 1.0);
        assert!(approx(p.x, 7.0) && approx(p.y, 8.0));
        assert!(triangle_transform([(0.0, 0.0); 3], to).is_none());
    }

    #[test]
    fn test_rasterize_graphics_bounds() {
        let mut node = GraphicsNode::new(1);
        node.draw_path(GraphicsPath::fill_rect(Rectangle::new(2.5, 3.0, 4.0, 4.0), 0x00FF00, 1.0));
        let (pixmap, x, y) = rasterize_graphics(&node).unwrap().unwrap();
        assert_eq!((x, y), (2.0, 3.0));
        assert_eq!((pixmap.width(), pixmap.height()), (5, 4));
        let px = pixmap.pixel(2, 2).unwrap();
        assert_eq!((px.green(), px.alpha()), (255, 255));
    }
}
