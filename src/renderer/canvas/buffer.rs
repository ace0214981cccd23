use resvg::tiny_skia::{Color, FillRule, Mask, PathBuilder, Pixmap, Rect};

use crate::error::{Error, Result};
use crate::geom::{Matrix, Rectangle};
use crate::render_buffer::{demultiply_in_place, RenderBuffer};

use super::raster::to_transform;

/// A CPU surface backed by a premultiplied tiny-skia pixmap.
pub struct CanvasRenderBuffer {
    pixmap: Pixmap,
    /// Active clips, innermost last. Each mask already includes the ones
    /// below it.
    clip_stack: Vec<Mask>,
}

impl CanvasRenderBuffer {
    /// A transparent surface. Zero sizes are bumped to one pixel.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            pixmap: allocate(width, height)?,
            clip_stack: Vec::new(),
        })
    }

    /// Premultiplied pixels.
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub(crate) fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    pub(crate) fn current_mask(&self) -> Option<&Mask> {
        self.clip_stack.last()
    }

    /// Split borrow for drawing under the current clip.
    pub(crate) fn target(&mut self) -> (&mut Pixmap, Option<&Mask>) {
        (&mut self.pixmap, self.clip_stack.last())
    }

    pub(crate) fn push_clip(&mut self, rect: &Rectangle, matrix: &Matrix) {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        let path = Rect::from_xywh(rect.x, rect.y, rect.width, rect.height).map(PathBuilder::from_rect);
        let transform = to_transform(matrix);

        let mask = match (self.clip_stack.last(), path) {
            (Some(parent), Some(path)) => {
                let mut mask = parent.clone();
                mask.intersect_path(&path, FillRule::Winding, true, transform);
                Some(mask)
            }
            (None, Some(path)) => Mask::new(width, height).map(|mut mask| {
                mask.fill_path(&path, FillRule::Winding, true, transform);
                mask
            }),
            // Degenerate rectangles clip everything away.
            (_, None) => Mask::new(width, height),
        };
        match mask {
            Some(mask) => self.clip_stack.push(mask),
            None => log::warn!("Could not allocate a {}x{} clip mask", width, height),
        }
    }

    /// Pop the innermost clip. Unbalanced pops are ignored.
    pub(crate) fn pop_clip(&mut self) {
        self.clip_stack.pop();
    }
}

fn allocate(width: u32, height: u32) -> Result<Pixmap> {
    let (width, height) = (width.max(1), height.max(1));
    Pixmap::new(width, height).ok_or(Error::ResourceExhausted { width, height })
}

impl RenderBuffer for CanvasRenderBuffer {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn resize(&mut self, width: u32, height: u32, use_max_size: bool) -> Result<()> {
        let (width, height) = if use_max_size {
            (width.max(self.width()), height.max(self.height()))
        } else {
            (width, height)
        };
        if width.max(1) == self.width() && height.max(1) == self.height() {
            return Ok(());
        }
        self.pixmap = allocate(width, height)?;
        self.clip_stack.clear();
        Ok(())
    }

    fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    fn get_pixels(&mut self, x: i32, y: i32, width: u32, height: u32) -> Result<Vec<u8>> {
        let mut out = vec![0u8; width as usize * height as usize * 4];
        let (surface_w, surface_h) = (self.width() as i64, self.height() as i64);
        let data = self.pixmap.data();

        for row in 0..height as i64 {
            let sy = y as i64 + row;
            if sy < 0 || sy >= surface_h {
                continue;
            }
            let x0 = (x as i64).max(0);
            let x1 = (x as i64 + width as i64).min(surface_w);
            if x0 >= x1 {
                continue;
            }
            let src = ((sy * surface_w + x0) * 4) as usize;
            let dst = ((row * width as i64 + (x0 - x as i64)) * 4) as usize;
            let len = ((x1 - x0) * 4) as usize;
            out[dst..dst + len].copy_from_slice(&data[src..src + len]);
        }
        demultiply_in_place(&mut out);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resvg::tiny_skia::{Paint, Transform};

    fn fill_red(buffer: &mut CanvasRenderBuffer, rect: Rect) {
        let mut paint = Paint::default();
        paint.set_color_rgba8(255, 0, 0, 255);
        let (pixmap, mask) = buffer.target();
        pixmap.fill_rect(rect, &paint, Transform::identity(), mask);
    }

    #[test]
    fn test_zero_size_is_bumped() {
        let buffer = CanvasRenderBuffer::new(0, 0).unwrap();
        assert_eq!((buffer.width(), buffer.height()), (1, 1));
    }

    #[test]
    fn test_use_max_size_only_grows() {
        let mut buffer = CanvasRenderBuffer::new(10, 10).unwrap();
        buffer.resize(4, 20, true).unwrap();
        assert_eq!((buffer.width(), buffer.height()), (10, 20));
        buffer.resize(4, 4, false).unwrap();
        assert_eq!((buffer.width(), buffer.height()), (4, 4));
    }

    #[test]
    fn test_out_of_bounds_reads_are_transparent() {
        let mut buffer = CanvasRenderBuffer::new(2, 2).unwrap();
        fill_red(&mut buffer, Rect::from_xywh(0.0, 0.0, 2.0, 2.0).unwrap());

        let pixels = buffer.get_pixels(-1, 1, 2, 2).unwrap();
        assert_eq!(&pixels[0..4], &[0, 0, 0, 0]);
        assert_eq!(&pixels[4..8], &[255, 0, 0, 255]);
        assert_eq!(&pixels[8..16], &[0; 8]);
    }

    #[test]
    fn test_clip_restricts_drawing() {
        let mut buffer = CanvasRenderBuffer::new(4, 4).unwrap();
        buffer.push_clip(&Rectangle::new(0.0, 0.0, 2.0, 4.0), &Matrix::IDENTITY);
        fill_red(&mut buffer, Rect::from_xywh(0.0, 0.0, 4.0, 4.0).unwrap());
        buffer.pop_clip();

        assert_eq!(buffer.get_pixels(0, 0, 1, 1).unwrap()[3], 255);
        assert_eq!(buffer.get_pixels(3, 0, 1, 1).unwrap()[3], 0);
        assert!(buffer.current_mask().is_none());
    }
}
